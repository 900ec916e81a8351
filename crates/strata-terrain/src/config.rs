use serde::Deserialize;
use std::error::Error;
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Deserialize)]
pub struct TerrainConfig {
    #[serde(default)]
    pub seed: Option<i32>,
    #[serde(default)]
    pub continent: Continent,
    #[serde(default = "d_plains_layer")]
    pub plains: BiomeLayer,
    #[serde(default = "d_hills_layer")]
    pub hills: BiomeLayer,
    #[serde(default = "d_mountains_layer")]
    pub mountains: BiomeLayer,
    #[serde(default)]
    pub biomes: BiomeBands,
    #[serde(default)]
    pub micro: Micro,
    #[serde(default)]
    pub rivers: Rivers,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            seed: None,
            continent: Continent::default(),
            plains: d_plains_layer(),
            hills: d_hills_layer(),
            mountains: d_mountains_layer(),
            biomes: BiomeBands::default(),
            micro: Micro::default(),
            rivers: Rivers::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Continent {
    #[serde(default = "d_continent_freq")]
    pub frequency: f32,
    #[serde(default = "d_continent_amp")]
    pub amplitude: f32,
    #[serde(default = "d_continent_base")]
    pub base_height: f32,
}
fn d_continent_freq() -> f32 {
    0.001
}
fn d_continent_amp() -> f32 {
    20.0
}
fn d_continent_base() -> f32 {
    30.0
}
impl Default for Continent {
    fn default() -> Self {
        Self {
            frequency: d_continent_freq(),
            amplitude: d_continent_amp(),
            base_height: d_continent_base(),
        }
    }
}

/// One biome's height channel. Defaults differ per biome, so each gets its
/// own default function on the config root.
#[derive(Clone, Debug, Deserialize)]
pub struct BiomeLayer {
    pub frequency: f32,
    pub amplitude: f32,
    pub base_height: f32,
}

fn d_plains_layer() -> BiomeLayer {
    BiomeLayer {
        frequency: 0.005,
        amplitude: 3.0,
        base_height: 20.0,
    }
}
fn d_hills_layer() -> BiomeLayer {
    BiomeLayer {
        frequency: 0.01,
        amplitude: 8.0,
        base_height: 25.0,
    }
}
fn d_mountains_layer() -> BiomeLayer {
    BiomeLayer {
        frequency: 0.005,
        amplitude: 25.0,
        base_height: 40.0,
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct BiomeBands {
    #[serde(default = "d_biome_freq")]
    pub frequency: f32,
    #[serde(default = "d_edge_low")]
    pub edge_low: f32,
    #[serde(default = "d_plains_edge")]
    pub plains_edge: f32,
    #[serde(default = "d_mountains_edge")]
    pub mountains_edge: f32,
    #[serde(default = "d_edge_high")]
    pub edge_high: f32,
    #[serde(default = "d_plains_boost")]
    pub plains_boost: f32,
}
fn d_biome_freq() -> f32 {
    0.0005
}
fn d_edge_low() -> f32 {
    0.2
}
fn d_plains_edge() -> f32 {
    0.45
}
fn d_mountains_edge() -> f32 {
    0.55
}
fn d_edge_high() -> f32 {
    0.8
}
fn d_plains_boost() -> f32 {
    1.25
}
impl Default for BiomeBands {
    fn default() -> Self {
        Self {
            frequency: d_biome_freq(),
            edge_low: d_edge_low(),
            plains_edge: d_plains_edge(),
            mountains_edge: d_mountains_edge(),
            edge_high: d_edge_high(),
            plains_boost: d_plains_boost(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Micro {
    #[serde(default = "d_micro_freq")]
    pub frequency: f32,
    #[serde(default = "d_micro_amp")]
    pub amplitude: f32,
}
fn d_micro_freq() -> f32 {
    0.05
}
fn d_micro_amp() -> f32 {
    0.75
}
impl Default for Micro {
    fn default() -> Self {
        Self {
            frequency: d_micro_freq(),
            amplitude: d_micro_amp(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Rivers {
    #[serde(default)]
    pub enable: bool,
    #[serde(default = "d_river_freq")]
    pub frequency: f32,
    #[serde(default = "d_river_width")]
    pub width: f32,
    #[serde(default = "d_river_depth")]
    pub depth: f32,
}
fn d_river_freq() -> f32 {
    0.002
}
fn d_river_width() -> f32 {
    0.05
}
fn d_river_depth() -> f32 {
    12.0
}
impl Default for Rivers {
    fn default() -> Self {
        Self {
            enable: false,
            frequency: d_river_freq(),
            width: d_river_width(),
            depth: d_river_depth(),
        }
    }
}

/// Flattened snapshot of [`TerrainConfig`] used in tight sampling loops.
#[derive(Clone, Debug)]
pub struct TerrainParams {
    pub continent_frequency: f32,
    pub continent_amplitude: f32,
    pub continent_base_height: f32,
    pub plains_frequency: f32,
    pub plains_amplitude: f32,
    pub plains_base_height: f32,
    pub hills_frequency: f32,
    pub hills_amplitude: f32,
    pub hills_base_height: f32,
    pub mountains_frequency: f32,
    pub mountains_amplitude: f32,
    pub mountains_base_height: f32,
    pub biome_frequency: f32,
    pub biome_edge_low: f32,
    pub biome_plains_edge: f32,
    pub biome_mountains_edge: f32,
    pub biome_edge_high: f32,
    pub plains_boost: f32,
    pub micro_frequency: f32,
    pub micro_amplitude: f32,
    pub rivers_enable: bool,
    pub river_frequency: f32,
    pub river_width: f32,
    pub river_depth: f32,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self::from_config(&TerrainConfig::default())
    }
}

impl TerrainParams {
    pub fn from_config(cfg: &TerrainConfig) -> Self {
        Self {
            continent_frequency: cfg.continent.frequency,
            continent_amplitude: cfg.continent.amplitude,
            continent_base_height: cfg.continent.base_height,
            plains_frequency: cfg.plains.frequency,
            plains_amplitude: cfg.plains.amplitude,
            plains_base_height: cfg.plains.base_height,
            hills_frequency: cfg.hills.frequency,
            hills_amplitude: cfg.hills.amplitude,
            hills_base_height: cfg.hills.base_height,
            mountains_frequency: cfg.mountains.frequency,
            mountains_amplitude: cfg.mountains.amplitude,
            mountains_base_height: cfg.mountains.base_height,
            biome_frequency: cfg.biomes.frequency,
            biome_edge_low: cfg.biomes.edge_low,
            biome_plains_edge: cfg.biomes.plains_edge,
            biome_mountains_edge: cfg.biomes.mountains_edge,
            biome_edge_high: cfg.biomes.edge_high,
            plains_boost: cfg.biomes.plains_boost,
            micro_frequency: cfg.micro.frequency,
            micro_amplitude: cfg.micro.amplitude,
            rivers_enable: cfg.rivers.enable,
            river_frequency: cfg.rivers.frequency,
            river_width: cfg.rivers.width,
            river_depth: cfg.rivers.depth,
        }
    }
}

pub fn load_params_from_path(path: &Path) -> Result<TerrainParams, Box<dyn Error>> {
    let s = fs::read_to_string(path)?;
    let cfg: TerrainConfig = toml::from_str(&s)?;
    Ok(TerrainParams::from_config(&cfg))
}
