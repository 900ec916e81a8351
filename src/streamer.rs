//! Chunk lifecycle scheduling: registration, LOD selection, queue draining,
//! and the async voxel-generation handoff. Everything here runs on one
//! thread; only voxel generation itself happens on workers.

use std::collections::VecDeque;
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use strata_chunk::{ChunkCoord, VoxelGrid};
use strata_geom::Vec3;
use strata_mesh_cpu::{
    FieldSampler, MeshBuild, MeshError, MeshRequest, RenderMode, WorldVoxels, build_chunk_mesh,
};
use strata_runtime::Runtime;
use strata_terrain::TerrainGenerator;

use crate::config::StreamConfig;
use crate::sink::MeshSink;

/// Where a chunk is in its generation pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenPhase {
    None,
    Voxels,
    MeshLod0,
}

struct ChunkEntry {
    grid: VoxelGrid,
    lod_level: i32,
    phase: GenPhase,
    voxels_generated: bool,
    lod0_built: bool,
    lod0_seam_dirty: bool,
    queued_for_voxel_gen: bool,
    voxel_task_in_progress: bool,
    /// Id of the in-flight voxel job, for discarding stale results after a
    /// destroy/re-register cycle at the same coordinate.
    active_job: u64,
}

impl ChunkEntry {
    fn new(coord: ChunkCoord, size_xy: i32, height_z: i32, lod_level: i32) -> Self {
        Self {
            grid: VoxelGrid::new(coord, size_xy, height_z),
            lod_level,
            phase: GenPhase::Voxels,
            voxels_generated: false,
            lod0_built: false,
            lod0_seam_dirty: false,
            queued_for_voxel_gen: false,
            voxel_task_in_progress: false,
            active_job: 0,
        }
    }
}

/// Immutable world view handed to the meshers.
struct WorldView<'a> {
    chunks: &'a HashMap<ChunkCoord, ChunkEntry>,
    center: ChunkCoord,
    render_distance: i32,
}

impl WorldVoxels for WorldView<'_> {
    fn grid(&self, coord: ChunkCoord) -> Option<&VoxelGrid> {
        self.chunks
            .get(&coord)
            .filter(|e| e.voxels_generated)
            .map(|e| &e.grid)
    }

    fn within_render_distance(&self, coord: ChunkCoord) -> bool {
        coord.chebyshev(self.center) <= self.render_distance
    }

    fn lod_level(&self, coord: ChunkCoord) -> Option<i32> {
        self.chunks.get(&coord).map(|e| e.lod_level)
    }
}

/// Streams chunks around a moving observer.
///
/// Owns all chunk state, the work queues, and the voxel-generation runtime.
/// `tick` must be called from one thread; the queues and flags are never
/// touched concurrently.
pub struct ChunkStreamer {
    cfg: StreamConfig,
    mode: RenderMode,
    terrain: Arc<TerrainGenerator>,
    runtime: Runtime,
    chunks: HashMap<ChunkCoord, ChunkEntry>,
    center: ChunkCoord,
    initialized: bool,
    gen_queue: VecDeque<ChunkCoord>,
    lod_queue: VecDeque<ChunkCoord>,
    pending_lod: HashMap<ChunkCoord, i32>,
    gen_accumulator: f32,
    lod_accumulator: f32,
}

impl ChunkStreamer {
    pub fn new(seed: i32, terrain_params: strata_terrain::TerrainParams, cfg: StreamConfig) -> Self {
        let terrain = Arc::new(TerrainGenerator::new(seed, terrain_params));
        let runtime = Runtime::new(
            terrain.clone(),
            cfg.chunk_size_xy,
            cfg.chunk_height_z,
            cfg.max_voxel_jobs,
        );
        let mode = cfg.render_mode();
        Self {
            cfg,
            mode,
            terrain,
            runtime,
            chunks: HashMap::new(),
            center: ChunkCoord::new(0, 0),
            initialized: false,
            gen_queue: VecDeque::new(),
            lod_queue: VecDeque::new(),
            pending_lod: HashMap::new(),
            gen_accumulator: 0.0,
            lod_accumulator: 0.0,
        }
    }

    pub fn terrain(&self) -> &TerrainGenerator {
        &self.terrain
    }

    pub fn config(&self) -> &StreamConfig {
        &self.cfg
    }

    pub fn center_chunk(&self) -> ChunkCoord {
        self.center
    }

    pub fn active_chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunk_lod(&self, coord: ChunkCoord) -> Option<i32> {
        self.chunks.get(&coord).map(|e| e.lod_level)
    }

    pub fn chunk_phase(&self, coord: ChunkCoord) -> Option<GenPhase> {
        self.chunks.get(&coord).map(|e| e.phase)
    }

    pub fn is_voxel_ready(&self, coord: ChunkCoord) -> bool {
        self.chunks
            .get(&coord)
            .is_some_and(|e| e.voxels_generated)
    }

    pub fn is_seam_dirty(&self, coord: ChunkCoord) -> bool {
        self.chunks
            .get(&coord)
            .is_some_and(|e| e.lod0_seam_dirty)
    }

    /// Observer world position to chunk coordinate.
    pub fn chunk_of_position(&self, pos: Vec3) -> ChunkCoord {
        let gx = (pos.x / self.cfg.voxel_scale).floor() as i32;
        let gy = (pos.y / self.cfg.voxel_scale).floor() as i32;
        ChunkCoord::of_global(gx, gy, self.cfg.chunk_size_xy)
    }

    /// Chebyshev-ring LOD with geometrically growing thresholds.
    pub fn compute_lod(&self, coord: ChunkCoord) -> i32 {
        let dist = coord.chebyshev(self.center);
        let mut lod = 0;
        let mut threshold = self.cfg.lod0_render_distance;
        while dist > threshold && lod < self.cfg.max_lod_level {
            threshold *= self.cfg.lod_step_multiplier;
            lod += 1;
        }
        lod.clamp(0, self.cfg.max_lod_level)
    }

    /// One scheduler step. `dt` is the elapsed frame time in seconds.
    pub fn tick(&mut self, observer: Vec3, dt: f32, sink: &mut dyn MeshSink) {
        let new_center = self.chunk_of_position(observer);
        if !self.initialized || new_center != self.center {
            self.center = new_center;
            self.initialized = true;
            self.refresh_chunk_set(sink);
        }

        self.apply_voxel_results();
        self.update_desired_lods();
        self.lod0_safety_net();
        self.drain_gen_queue(dt, sink);
        self.drain_lod_queue(dt, sink);
    }

    /// Registers chunks that entered the render square and destroys chunks
    /// that left it. In-flight jobs for destroyed chunks are discarded when
    /// their results arrive.
    fn refresh_chunk_set(&mut self, sink: &mut dyn MeshSink) {
        let r = self.cfg.render_distance;
        let mut desired = HashSet::with_capacity(((2 * r + 1) * (2 * r + 1)) as usize);
        for dx in -r..=r {
            for dy in -r..=r {
                let coord = self.center.offset(dx, dy);
                desired.insert(coord);
                if !self.chunks.contains_key(&coord) {
                    self.register_chunk(coord);
                }
            }
        }

        let to_remove: Vec<ChunkCoord> = self
            .chunks
            .keys()
            .filter(|c| !desired.contains(*c))
            .copied()
            .collect();
        for coord in to_remove {
            self.chunks.remove(&coord);
            self.pending_lod.remove(&coord);
            sink.remove_chunk(coord);
        }
        log::debug!(
            "center {:?}: {} active chunks, {} queued for gen",
            self.center,
            self.chunks.len(),
            self.gen_queue.len()
        );
    }

    fn register_chunk(&mut self, coord: ChunkCoord) {
        let world_size = self.cfg.chunk_size_xy as f32 * self.cfg.voxel_scale;
        let wx = coord.cx as f32 * world_size;
        let wy = coord.cy as f32 * world_size;
        if !wx.is_finite() || !wy.is_finite() || wx.abs() > 1e6 || wy.abs() > 1e6 {
            log::error!("invalid spawn location for chunk {coord:?}, skipping");
            return;
        }

        let lod = self.compute_lod(coord);
        let mut entry = ChunkEntry::new(coord, self.cfg.chunk_size_xy, self.cfg.chunk_height_z, lod);
        if lod != 0 {
            entry.phase = GenPhase::None;
        } else {
            entry.queued_for_voxel_gen = true;
        }
        // The entry must be resident before anything is enqueued for it;
        // enqueue_lod_build refuses coords it cannot find.
        self.chunks.insert(coord, entry);
        if lod == 0 {
            self.gen_queue.push_back(coord);
        } else {
            self.enqueue_lod_build(coord, lod);
        }
    }

    /// Marshals finished voxel jobs into their chunks. Results for chunks
    /// that were destroyed (or re-registered under a newer job) are dropped.
    fn apply_voxel_results(&mut self) {
        for out in self.runtime.drain_results() {
            let Some(entry) = self.chunks.get_mut(&out.coord) else {
                log::debug!("discarding voxel result for destroyed chunk {:?}", out.coord);
                continue;
            };
            if !entry.voxel_task_in_progress || entry.active_job != out.job_id {
                log::debug!("discarding stale voxel result for {:?}", out.coord);
                continue;
            }
            entry.voxel_task_in_progress = false;
            if !entry.grid.replace_voxels(out.voxels) {
                log::error!("voxel result for {:?} had wrong dimensions", out.coord);
                continue;
            }
            entry.voxels_generated = true;
            let lod = entry.lod_level;
            if lod == 0 {
                entry.phase = GenPhase::MeshLod0;
                if !entry.queued_for_voxel_gen {
                    entry.queued_for_voxel_gen = true;
                    self.gen_queue.push_back(out.coord);
                }
            } else {
                // The chunk coarsened while its voxel job was in flight.
                // Keep the voxels for a later return to LOD 0 but rebuild
                // at the level it renders at now.
                entry.phase = GenPhase::None;
            }
            if lod > 0 {
                self.enqueue_lod_build(out.coord, lod);
            }
            // A previously-absent neighbor now has data; border meshes on
            // all four sides are stale.
            self.mark_neighbors_seam_dirty(out.coord);
        }
    }

    fn update_desired_lods(&mut self) {
        let coords: Vec<ChunkCoord> = self.chunks.keys().copied().collect();
        for coord in coords {
            let desired = self.compute_lod(coord);
            let Some(entry) = self.chunks.get_mut(&coord) else {
                continue;
            };
            if desired == entry.lod_level {
                continue;
            }
            entry.lod_level = desired;
            self.mark_seam_dirty(coord);
            self.mark_neighbors_seam_dirty(coord);

            let Some(entry) = self.chunks.get_mut(&coord) else {
                continue;
            };
            if desired == 0 {
                if !entry.voxels_generated {
                    entry.phase = GenPhase::Voxels;
                } else {
                    entry.phase = GenPhase::MeshLod0;
                }
                if !entry.queued_for_voxel_gen {
                    entry.queued_for_voxel_gen = true;
                    self.gen_queue.push_back(coord);
                }
            } else {
                self.enqueue_lod_build(coord, desired);
            }
        }
    }

    /// Defends against dropped queue entries: any LOD 0 chunk with missing
    /// voxels or no initial mesh gets re-enqueued.
    fn lod0_safety_net(&mut self) {
        let mut requeue = Vec::new();
        for (&coord, entry) in &self.chunks {
            if entry.lod_level != 0 || entry.queued_for_voxel_gen {
                continue;
            }
            if !entry.voxels_generated && !entry.voxel_task_in_progress {
                requeue.push((coord, GenPhase::Voxels));
            } else if entry.voxels_generated && !entry.lod0_built {
                requeue.push((coord, GenPhase::MeshLod0));
            }
        }
        for (coord, phase) in requeue {
            if let Some(entry) = self.chunks.get_mut(&coord) {
                entry.phase = phase;
                entry.queued_for_voxel_gen = true;
                self.gen_queue.push_back(coord);
            }
        }
    }

    fn sort_gen_queue_by_distance(&mut self) {
        let center = self.center;
        let mut items: Vec<ChunkCoord> = self.gen_queue.drain(..).collect();
        items.sort_by_key(|c| c.distance_sq(center));
        self.gen_queue.extend(items);
    }

    fn drain_gen_queue(&mut self, dt: f32, sink: &mut dyn MeshSink) {
        if self.gen_queue.is_empty() {
            return;
        }
        self.gen_accumulator += dt * self.cfg.chunk_gen_rate;
        let mut budget = self.gen_accumulator.floor() as i32;
        if budget <= 0 {
            return;
        }
        self.gen_accumulator -= budget as f32;
        self.sort_gen_queue_by_distance();

        while budget > 0 {
            let Some(coord) = self.gen_queue.pop_front() else {
                break;
            };
            budget -= 1;
            let phase = {
                let Some(entry) = self.chunks.get_mut(&coord) else {
                    continue;
                };
                entry.queued_for_voxel_gen = false;
                entry.phase
            };
            match phase {
                GenPhase::Voxels => self.dispatch_voxel_gen(coord),
                GenPhase::MeshLod0 => self.build_lod0_mesh(coord, sink),
                GenPhase::None => {
                    if self
                        .chunks
                        .get(&coord)
                        .is_some_and(|e| e.lod0_seam_dirty && e.voxels_generated)
                    {
                        self.build_lod0_mesh(coord, sink);
                    }
                }
            }
        }
    }

    /// Busy-wait via re-queue: at capacity (or with a job already in flight)
    /// the chunk goes back to the end of the queue instead of blocking.
    fn dispatch_voxel_gen(&mut self, coord: ChunkCoord) {
        let Some(entry) = self.chunks.get_mut(&coord) else {
            return;
        };
        if entry.voxel_task_in_progress || self.runtime.at_capacity() {
            if !entry.queued_for_voxel_gen {
                entry.queued_for_voxel_gen = true;
                self.gen_queue.push_back(coord);
            }
            return;
        }
        match self.runtime.submit(coord) {
            Some(job_id) => {
                entry.voxel_task_in_progress = true;
                entry.active_job = job_id;
            }
            None => {
                entry.queued_for_voxel_gen = true;
                self.gen_queue.push_back(coord);
            }
        }
    }

    fn build_lod0_mesh(&mut self, coord: ChunkCoord, sink: &mut dyn MeshSink) {
        let Some(entry) = self.chunks.get(&coord) else {
            return;
        };
        if entry.lod_level != 0 {
            // Stale fine-phase entry for a chunk that has since coarsened;
            // a fine mesh here would overwrite the correct coarse one.
            let lod = entry.lod_level;
            if let Some(entry) = self.chunks.get_mut(&coord) {
                entry.phase = GenPhase::None;
            }
            self.enqueue_lod_build(coord, lod);
            return;
        }
        if entry.lod0_built && !entry.lod0_seam_dirty {
            return;
        }
        match self.build_mesh_for(coord, 0) {
            Ok(mesh) => {
                sink.upload_chunk_mesh(coord, 0, &mesh);
                if let Some(entry) = self.chunks.get_mut(&coord) {
                    entry.lod0_built = true;
                    entry.lod0_seam_dirty = false;
                    entry.phase = GenPhase::None;
                }
            }
            Err(err @ (MeshError::VoxelsNotReady | MeshError::NeighborsNotReady)) => {
                // Leave the dirty flag set and retry once dependencies land.
                log::debug!("lod0 build for {coord:?} deferred: {err}");
                if let Some(entry) = self.chunks.get_mut(&coord) {
                    entry.lod0_seam_dirty = true;
                    if !entry.queued_for_voxel_gen {
                        entry.queued_for_voxel_gen = true;
                        self.gen_queue.push_back(coord);
                    }
                }
            }
            Err(err) => {
                log::error!("lod0 build for {coord:?} failed: {err}");
            }
        }
    }

    fn drain_lod_queue(&mut self, dt: f32, sink: &mut dyn MeshSink) {
        if self.lod_queue.is_empty() {
            return;
        }
        self.lod_accumulator += dt * self.cfg.lod_build_rate;
        let mut budget = self.lod_accumulator.floor() as i32;
        if budget <= 0 {
            return;
        }
        self.lod_accumulator -= budget as f32;

        while budget > 0 {
            let Some(coord) = self.lod_queue.pop_front() else {
                break;
            };
            budget -= 1;
            if !self.chunks.contains_key(&coord) {
                self.pending_lod.remove(&coord);
                continue;
            }
            let Some(lod) = self.pending_lod.remove(&coord) else {
                continue;
            };
            if lod <= 0 {
                continue;
            }
            match self.build_mesh_for(coord, lod) {
                Ok(mesh) => {
                    sink.upload_chunk_mesh(coord, lod, &mesh);
                    if let Some(entry) = self.chunks.get_mut(&coord) {
                        entry.lod0_seam_dirty = false;
                    }
                }
                Err(err) => log::error!("lod {lod} build for {coord:?} failed: {err}"),
            }
        }
    }

    fn enqueue_lod_build(&mut self, coord: ChunkCoord, lod: i32) {
        if !self.chunks.contains_key(&coord) {
            return;
        }
        self.pending_lod.insert(coord, lod);
        if !self.lod_queue.contains(&coord) {
            self.lod_queue.push_back(coord);
        }
    }

    fn mark_seam_dirty(&mut self, coord: ChunkCoord) {
        let mut enqueue_gen = false;
        let mut rebuild_lod = None;
        if let Some(entry) = self.chunks.get_mut(&coord) {
            entry.lod0_seam_dirty = true;
            if entry.lod_level == 0 {
                if entry.voxels_generated {
                    entry.phase = GenPhase::MeshLod0;
                    if !entry.queued_for_voxel_gen {
                        entry.queued_for_voxel_gen = true;
                        enqueue_gen = true;
                    }
                }
            } else {
                // Coarse meshes depend on neighbor LOD deltas too; schedule
                // a rebuild at the chunk's current level.
                rebuild_lod = Some(entry.lod_level);
            }
        }
        if enqueue_gen {
            self.gen_queue.push_back(coord);
        }
        if let Some(lod) = rebuild_lod {
            self.enqueue_lod_build(coord, lod);
        }
    }

    fn mark_neighbors_seam_dirty(&mut self, coord: ChunkCoord) {
        for n in coord.neighbors4() {
            self.mark_seam_dirty(n);
        }
    }

    /// Builds the mesh for `coord` at `lod`. Pure with respect to scheduler
    /// state; flag updates happen at the call sites.
    fn build_mesh_for(&self, coord: ChunkCoord, lod: i32) -> Result<MeshBuild, MeshError> {
        let entry = self.chunks.get(&coord).ok_or(MeshError::VoxelsNotReady)?;
        let procedural_only = lod > 0;
        let view = WorldView {
            chunks: &self.chunks,
            center: self.center,
            render_distance: self.cfg.render_distance,
        };
        let grid = (lod == 0 && entry.voxels_generated).then_some(&entry.grid);
        let req = MeshRequest {
            coord,
            grid,
            terrain: &self.terrain,
            world: Some(&view),
            procedural_only,
            size_xy: self.cfg.chunk_size_xy,
            height_z: self.cfg.chunk_height_z,
            step: 1 << lod,
            voxel_scale: self.cfg.voxel_scale,
            seam_depth_steps: self.cfg.seam_depth_steps,
        };
        build_chunk_mesh(self.mode, &req)
    }

    /// Resolves a world-space position to a global voxel coordinate.
    pub fn world_pos_to_global_voxel(&self, pos: Vec3) -> (i32, i32, i32) {
        (
            (pos.x / self.cfg.voxel_scale).floor() as i32,
            (pos.y / self.cfg.voxel_scale).floor() as i32,
            (pos.z / self.cfg.voxel_scale).floor() as i32,
        )
    }

    /// Global solidity query with the conservative absent-means-solid bias.
    pub fn is_voxel_solid_global(&self, gx: i32, gy: i32, gz: i32) -> bool {
        let coord = ChunkCoord::of_global(gx, gy, self.cfg.chunk_size_xy);
        let Some(entry) = self.chunks.get(&coord) else {
            return true;
        };
        if !entry.voxels_generated {
            return true;
        }
        if gz < 0 || gz >= self.cfg.chunk_height_z {
            return true;
        }
        let lx = gx - coord.cx * self.cfg.chunk_size_xy;
        let ly = gy - coord.cy * self.cfg.chunk_size_xy;
        entry.grid.is_solid_local(lx, ly, gz)
    }

    /// Global signed density with the marching-cubes sentinel ladder:
    /// solid below the world, air above it and beyond the streamed horizon,
    /// resident voxel data ahead of the terrain function.
    pub fn density_global(&self, gx: i32, gy: i32, gz: i32) -> f32 {
        let view = WorldView {
            chunks: &self.chunks,
            center: self.center,
            render_distance: self.cfg.render_distance,
        };
        let sampler = FieldSampler::with_world(
            &self.terrain,
            &view,
            self.cfg.chunk_size_xy,
            self.cfg.chunk_height_z,
        );
        sampler.density(gx, gy, gz)
    }

    pub fn add_voxel(&mut self, pos: Vec3) -> bool {
        self.edit_voxel(pos, true)
    }

    pub fn remove_voxel(&mut self, pos: Vec3) -> bool {
        self.edit_voxel(pos, false)
    }

    /// Single-voxel edit by world position. Requires the owning chunk to be
    /// registered and voxel-ready; otherwise fails without side effects.
    fn edit_voxel(&mut self, pos: Vec3, solid: bool) -> bool {
        let (gx, gy, gz) = self.world_pos_to_global_voxel(pos);
        let coord = ChunkCoord::of_global(gx, gy, self.cfg.chunk_size_xy);
        let lx = gx - coord.cx * self.cfg.chunk_size_xy;
        let ly = gy - coord.cy * self.cfg.chunk_size_xy;

        let Some(entry) = self.chunks.get_mut(&coord) else {
            return false;
        };
        if !entry.voxels_generated {
            return false;
        }
        if !entry.grid.set_voxel_local(lx, ly, gz, solid) {
            return false;
        }
        self.mark_seam_dirty(coord);
        self.mark_neighbors_seam_dirty(coord);
        true
    }
}
