//! Deterministic density/biome field generation and terrain parameters.
#![forbid(unsafe_code)]

mod config;
mod generator;
mod noise;

pub use config::{TerrainConfig, TerrainParams, load_params_from_path};
pub use generator::{Biome, BiomeWeights, TerrainGenerator};
pub use noise::{NoiseField, salt, smoothstep};
