use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use strata::{ChunkCoord, ChunkStreamer, Config, MeshBuild, MeshSink, Vec3, load_config_from_path};
use strata_terrain::TerrainParams;

/// Headless terrain streamer: walks an observer through the world and logs
/// meshing activity. Point a renderer at `MeshSink` to draw it.
#[derive(Parser, Debug)]
#[command(name = "strata", version)]
struct Args {
    /// Optional TOML config file (stream + terrain sections).
    #[arg(long)]
    config: Option<PathBuf>,

    /// World seed; overrides the config file. Random when absent from both.
    #[arg(long)]
    seed: Option<i32>,

    /// Number of scheduler ticks to run.
    #[arg(long, default_value_t = 600)]
    ticks: u32,

    /// Simulated frame time in seconds.
    #[arg(long, default_value_t = 0.016)]
    dt: f32,

    /// Observer speed in world units per second.
    #[arg(long, default_value_t = 400.0)]
    speed: f32,
}

/// Counts uploads and logs per-chunk geometry sizes.
#[derive(Default)]
struct StatsSink {
    uploads: usize,
    removals: usize,
    triangles: usize,
}

impl MeshSink for StatsSink {
    fn upload_chunk_mesh(&mut self, coord: ChunkCoord, lod: i32, mesh: &MeshBuild) {
        self.uploads += 1;
        self.triangles += mesh.triangle_count();
        log::info!(
            "mesh {:?} lod {}: {} verts, {} tris",
            coord,
            lod,
            mesh.vertex_count(),
            mesh.triangle_count()
        );
    }

    fn remove_chunk(&mut self, coord: ChunkCoord) {
        self.removals += 1;
        log::debug!("removed chunk {coord:?}");
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let cfg = match &args.config {
        Some(path) => match load_config_from_path(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                log::error!("failed to load {}: {err}", path.display());
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };

    let seed = args.seed.or(cfg.seed).unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos() as i32)
            .unwrap_or(0)
    });
    log::info!("world seed {seed}");

    let params = TerrainParams::from_config(&cfg.terrain);
    let mut streamer = ChunkStreamer::new(seed, params, cfg.stream.clone());
    let mut sink = StatsSink::default();

    let mut observer = Vec3::new(0.0, 0.0, 0.0);
    for tick in 0..args.ticks {
        observer.x += args.speed * args.dt;
        streamer.tick(observer, args.dt, &mut sink);
        if tick % 120 == 0 {
            log::info!(
                "tick {tick}: center {:?}, {} chunks active, {} uploads",
                streamer.center_chunk(),
                streamer.active_chunk_count(),
                sink.uploads
            );
        }
    }

    log::info!(
        "done: {} uploads ({} triangles), {} removals",
        sink.uploads,
        sink.triangles,
        sink.removals
    );
}
