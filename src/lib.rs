//! Streaming voxel terrain engine: deterministic worldgen, chunked voxel
//! storage, dual meshing (cubes / marching cubes), and distance-based LOD
//! scheduling around a moving observer.
#![forbid(unsafe_code)]

pub mod config;
pub mod sink;
pub mod streamer;

pub use config::{Config, StreamConfig, load_config_from_path};
pub use sink::{MeshSink, NullSink};
pub use streamer::{ChunkStreamer, GenPhase};

pub use strata_chunk::ChunkCoord;
pub use strata_geom::Vec3;
pub use strata_mesh_cpu::{MeshBuild, RenderMode};
pub use strata_terrain::{Biome, TerrainGenerator, TerrainParams};
