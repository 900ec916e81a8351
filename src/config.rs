use std::error::Error;
use std::path::Path;

use serde::Deserialize;
use strata_mesh_cpu::RenderMode;
use strata_terrain::TerrainConfig;

fn d_chunk_size_xy() -> i32 {
    32
}
fn d_chunk_height_z() -> i32 {
    128
}
fn d_voxel_scale() -> f32 {
    // World units per voxel (centimeters; one meter per voxel).
    100.0
}
fn d_render_distance() -> i32 {
    4
}
fn d_lod0_render_distance() -> i32 {
    6
}
fn d_lod_step_multiplier() -> i32 {
    2
}
fn d_max_lod_level() -> i32 {
    4
}
fn d_chunk_gen_rate() -> f32 {
    60.0
}
fn d_lod_build_rate() -> f32 {
    30.0
}
fn d_max_voxel_jobs() -> usize {
    4
}
fn d_seam_depth_steps() -> i32 {
    4
}
fn d_render_mode() -> String {
    "cubes".to_string()
}

/// Streaming/scheduling knobs, loadable from TOML with full defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    #[serde(default = "d_chunk_size_xy")]
    pub chunk_size_xy: i32,
    #[serde(default = "d_chunk_height_z")]
    pub chunk_height_z: i32,
    #[serde(default = "d_voxel_scale")]
    pub voxel_scale: f32,
    #[serde(default = "d_render_distance")]
    pub render_distance: i32,
    #[serde(default = "d_lod0_render_distance")]
    pub lod0_render_distance: i32,
    #[serde(default = "d_lod_step_multiplier")]
    pub lod_step_multiplier: i32,
    #[serde(default = "d_max_lod_level")]
    pub max_lod_level: i32,
    /// Voxel-generation queue drain rate, chunks per second.
    #[serde(default = "d_chunk_gen_rate")]
    pub chunk_gen_rate: f32,
    /// Coarse-LOD mesh build rate, chunks per second.
    #[serde(default = "d_lod_build_rate")]
    pub lod_build_rate: f32,
    #[serde(default = "d_max_voxel_jobs")]
    pub max_voxel_jobs: usize,
    #[serde(default = "d_seam_depth_steps")]
    pub seam_depth_steps: i32,
    /// "cubes" or "marching".
    #[serde(default = "d_render_mode")]
    pub render_mode: String,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            chunk_size_xy: d_chunk_size_xy(),
            chunk_height_z: d_chunk_height_z(),
            voxel_scale: d_voxel_scale(),
            render_distance: d_render_distance(),
            lod0_render_distance: d_lod0_render_distance(),
            lod_step_multiplier: d_lod_step_multiplier(),
            max_lod_level: d_max_lod_level(),
            chunk_gen_rate: d_chunk_gen_rate(),
            lod_build_rate: d_lod_build_rate(),
            max_voxel_jobs: d_max_voxel_jobs(),
            seam_depth_steps: d_seam_depth_steps(),
            render_mode: d_render_mode(),
        }
    }
}

impl StreamConfig {
    pub fn render_mode(&self) -> RenderMode {
        match self.render_mode.as_str() {
            "marching" | "marching_cubes" => RenderMode::MarchingCubes,
            _ => RenderMode::Cubes,
        }
    }
}

/// Top-level engine configuration: an optional fixed seed plus the stream
/// and terrain sections.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub seed: Option<i32>,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub terrain: TerrainConfig,
}

pub fn load_config_from_path(path: &Path) -> Result<Config, Box<dyn Error>> {
    let text = std::fs::read_to_string(path)?;
    let cfg: Config = toml::from_str(&text)?;
    Ok(cfg)
}
