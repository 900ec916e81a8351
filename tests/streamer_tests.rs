use std::collections::HashMap;
use std::time::{Duration, Instant};

use strata::{ChunkCoord, ChunkStreamer, MeshBuild, MeshSink, StreamConfig, Vec3};
use strata_terrain::TerrainParams;

#[derive(Default)]
struct RecordingSink {
    uploads: HashMap<(ChunkCoord, i32), usize>,
    removals: Vec<ChunkCoord>,
}

impl MeshSink for RecordingSink {
    fn upload_chunk_mesh(&mut self, coord: ChunkCoord, lod: i32, _mesh: &MeshBuild) {
        *self.uploads.entry((coord, lod)).or_default() += 1;
    }

    fn remove_chunk(&mut self, coord: ChunkCoord) {
        self.removals.push(coord);
    }
}

fn small_config() -> StreamConfig {
    StreamConfig {
        chunk_size_xy: 8,
        chunk_height_z: 32,
        voxel_scale: 1.0,
        render_distance: 1,
        lod0_render_distance: 2,
        lod_step_multiplier: 2,
        max_lod_level: 4,
        chunk_gen_rate: 1000.0,
        lod_build_rate: 1000.0,
        max_voxel_jobs: 4,
        seam_depth_steps: 4,
        render_mode: "cubes".to_string(),
    }
}

fn streamer_with(cfg: StreamConfig) -> ChunkStreamer {
    ChunkStreamer::new(77, TerrainParams::default(), cfg)
}

/// Ticks until `pred` holds or the deadline passes (voxel gen is async).
fn tick_until(
    streamer: &mut ChunkStreamer,
    sink: &mut RecordingSink,
    observer: Vec3,
    pred: impl Fn(&ChunkStreamer, &RecordingSink) -> bool,
) -> bool {
    let deadline = Instant::now() + Duration::from_secs(20);
    while Instant::now() < deadline {
        streamer.tick(observer, 0.016, sink);
        if pred(streamer, sink) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    false
}

#[test]
fn lod_thresholds_grow_geometrically() {
    let cfg = StreamConfig {
        render_distance: 14,
        lod0_render_distance: 6,
        lod_step_multiplier: 2,
        max_lod_level: 4,
        ..small_config()
    };
    let streamer = streamer_with(cfg);
    // Thresholds 6, 12, 24: distance 13 exceeds 6 and 12 but not 24.
    assert_eq!(streamer.compute_lod(ChunkCoord::new(13, 0)), 2);
    assert_eq!(streamer.compute_lod(ChunkCoord::new(0, 0)), 0);
    assert_eq!(streamer.compute_lod(ChunkCoord::new(6, 0)), 0);
    assert_eq!(streamer.compute_lod(ChunkCoord::new(7, 0)), 1);
    assert_eq!(streamer.compute_lod(ChunkCoord::new(0, -25)), 3);
    // Far beyond every threshold the level caps out.
    assert_eq!(streamer.compute_lod(ChunkCoord::new(1000, 0)), 4);
}

#[test]
fn first_tick_registers_render_square() {
    let mut streamer = streamer_with(small_config());
    let mut sink = RecordingSink::default();
    streamer.tick(Vec3::ZERO, 0.016, &mut sink);
    assert_eq!(streamer.active_chunk_count(), 9);
    assert_eq!(streamer.center_chunk(), ChunkCoord::new(0, 0));
}

#[test]
fn voxels_arrive_and_lod0_meshes_upload() {
    let mut streamer = streamer_with(small_config());
    let mut sink = RecordingSink::default();
    let done = tick_until(&mut streamer, &mut sink, Vec3::ZERO, |s, k| {
        s.is_voxel_ready(ChunkCoord::new(0, 0))
            && k.uploads.contains_key(&(ChunkCoord::new(0, 0), 0))
    });
    assert!(done, "center chunk never produced a LOD 0 mesh");
}

#[test]
fn moving_observer_destroys_out_of_range_chunks() {
    let mut streamer = streamer_with(small_config());
    let mut sink = RecordingSink::default();
    streamer.tick(Vec3::ZERO, 0.016, &mut sink);
    let old_corner = ChunkCoord::new(-1, -1);
    assert!(streamer.chunk_lod(old_corner).is_some());

    // 10 chunks east; the entire old square is out of range.
    let far = Vec3::new(10.0 * 8.0, 0.0, 0.0);
    streamer.tick(far, 0.016, &mut sink);
    assert_eq!(streamer.active_chunk_count(), 9);
    assert!(streamer.chunk_lod(old_corner).is_none());
    assert!(sink.removals.contains(&old_corner));
}

#[test]
fn edit_requires_voxels_then_round_trips() {
    let mut streamer = streamer_with(small_config());
    let mut sink = RecordingSink::default();

    // Before voxels exist the edit is rejected outright.
    streamer.tick(Vec3::ZERO, 0.0, &mut sink);
    let spot = Vec3::new(3.0, 3.0, 30.0);
    if !streamer.is_voxel_ready(ChunkCoord::new(0, 0)) {
        assert!(!streamer.add_voxel(spot));
    }

    assert!(tick_until(&mut streamer, &mut sink, Vec3::ZERO, |s, _| {
        s.is_voxel_ready(ChunkCoord::new(0, 0))
    }));

    // Flip the voxel from whatever the terrain produced, then flip it back.
    let solid_before = streamer.is_voxel_solid_global(3, 3, 30);
    if solid_before {
        assert!(streamer.remove_voxel(spot));
        assert!(!streamer.is_voxel_solid_global(3, 3, 30));
        assert!(streamer.add_voxel(spot));
        assert!(streamer.is_voxel_solid_global(3, 3, 30));
    } else {
        assert!(streamer.add_voxel(spot));
        assert!(streamer.is_voxel_solid_global(3, 3, 30));
        assert!(streamer.remove_voxel(spot));
        assert!(!streamer.is_voxel_solid_global(3, 3, 30));
    }
}

#[test]
fn edit_marks_neighbors_seam_dirty_and_remeshes() {
    let mut streamer = streamer_with(small_config());
    let mut sink = RecordingSink::default();
    let center = ChunkCoord::new(0, 0);

    assert!(tick_until(&mut streamer, &mut sink, Vec3::ZERO, |s, k| {
        s.is_voxel_ready(center) && k.uploads.contains_key(&(center, 0))
    }));
    let before = sink.uploads[&(center, 0)];

    assert!(streamer.add_voxel(Vec3::new(3.0, 3.0, 30.0)));
    for n in center.neighbors4() {
        assert!(streamer.is_seam_dirty(n), "neighbor {n:?} not dirtied");
    }

    assert!(
        tick_until(&mut streamer, &mut sink, Vec3::ZERO, |_, k| {
            k.uploads.get(&(center, 0)).copied().unwrap_or(0) > before
        }),
        "edited chunk was never remeshed"
    );
}

#[test]
fn zero_gen_rate_blocks_all_generation() {
    let cfg = StreamConfig {
        chunk_gen_rate: 0.0,
        ..small_config()
    };
    let mut streamer = streamer_with(cfg);
    let mut sink = RecordingSink::default();
    for _ in 0..50 {
        streamer.tick(Vec3::ZERO, 0.016, &mut sink);
    }
    assert!(!streamer.is_voxel_ready(ChunkCoord::new(0, 0)));
    assert!(sink.uploads.is_empty());
}

#[test]
fn coarse_chunks_upload_lod_meshes_without_voxels() {
    // lod0 distance 1 pushes the outer ring of a radius-2 square to LOD 1;
    // those build procedurally and never wait on voxel jobs.
    let cfg = StreamConfig {
        render_distance: 2,
        lod0_render_distance: 1,
        render_mode: "marching".to_string(),
        ..small_config()
    };
    let mut streamer = streamer_with(cfg);
    let mut sink = RecordingSink::default();
    let corner = ChunkCoord::new(2, 2);
    assert!(tick_until(&mut streamer, &mut sink, Vec3::ZERO, |_, k| {
        k.uploads.contains_key(&(corner, 1))
    }));
    assert!(!streamer.is_voxel_ready(corner));
}

#[test]
fn lod_change_remeshes_coarse_neighbors() {
    let cfg = StreamConfig {
        render_distance: 2,
        lod0_render_distance: 1,
        ..small_config()
    };
    let mut streamer = streamer_with(cfg);
    let mut sink = RecordingSink::default();
    let neighbor = ChunkCoord::new(2, 2);

    assert!(tick_until(&mut streamer, &mut sink, Vec3::ZERO, |_, k| {
        k.uploads.contains_key(&(neighbor, 1))
    }));
    let before = sink.uploads[&(neighbor, 1)];

    // One chunk east: (2,1) drops from LOD 1 to LOD 0, so its coarse
    // neighbor (2,2) must be re-dirtied, rebuilt at its own level, and end
    // up clean again.
    let east = Vec3::new(8.0, 0.0, 0.0);
    assert!(
        tick_until(&mut streamer, &mut sink, east, |s, k| {
            k.uploads.get(&(neighbor, 1)).copied().unwrap_or(0) > before
                && !s.is_seam_dirty(neighbor)
        }),
        "coarse neighbor of a LOD-changed chunk kept its stale mesh"
    );
    assert_eq!(streamer.chunk_lod(ChunkCoord::new(2, 1)), Some(0));
}

#[test]
fn late_voxel_result_keeps_coarsened_chunk_at_its_level() {
    let cfg = StreamConfig {
        render_distance: 2,
        lod0_render_distance: 1,
        max_voxel_jobs: 16,
        ..small_config()
    };
    let mut streamer = streamer_with(cfg);
    let mut sink = RecordingSink::default();
    let chunk = ChunkCoord::new(1, 1);

    // One tick at the origin dispatches voxel jobs for the fine square but
    // applies no results yet.
    streamer.tick(Vec3::ZERO, 0.1, &mut sink);
    assert_eq!(streamer.chunk_lod(chunk), Some(0));
    assert!(!sink.uploads.contains_key(&(chunk, 0)));

    // Step south-west before the result lands: the chunk coarsens to LOD 1
    // while its voxel job is still in flight. The late result must feed a
    // rebuild at the current level, never a fine mesh over the coarse one.
    let observer = Vec3::new(-4.0, -4.0, 0.0);
    assert!(tick_until(&mut streamer, &mut sink, observer, |s, k| {
        s.is_voxel_ready(chunk) && k.uploads.contains_key(&(chunk, 1))
    }));
    assert_eq!(streamer.chunk_lod(chunk), Some(1));
    assert!(
        !sink.uploads.contains_key(&(chunk, 0)),
        "late voxel result rebuilt the coarsened chunk at LOD 0"
    );
}
