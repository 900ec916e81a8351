use fastnoise_lite::{FastNoiseLite, NoiseType};

/// Per-feature salts. Every logical terrain feature samples the shared noise
/// primitive through its own salted [`NoiseField`], so one world seed yields
/// decorrelated continents, biomes, rivers, and detail layers.
pub mod salt {
    pub const CONTINENT: u32 = 0x1A2B_0001;
    pub const BIOME: u32 = 0x1A2B_0002;
    pub const BIOME_WARP: u32 = 0x1A2B_0003;
    pub const PLAINS: u32 = 0x1A2B_0004;
    pub const HILLS: u32 = 0x1A2B_0005;
    pub const MOUNTAINS: u32 = 0x1A2B_0006;
    pub const MICRO: u32 = 0x1A2B_0007;
    pub const RIVER: u32 = 0x1A2B_0008;
}

/// Maximum magnitude of the hashed per-feature sample offset, in world units.
const OFFSET_BOUND: f32 = 512.0;

#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Two pseudo-random offsets in `[-OFFSET_BOUND, OFFSET_BOUND)` derived from
/// `seed ^ salt`. Applied to sample coordinates before frequency scaling.
fn salted_offset(seed: i32, salt: u32) -> (f32, f32) {
    let h0 = splitmix64((seed as u32 as u64) ^ u64::from(salt));
    let h1 = splitmix64(h0);
    let to_unit = |h: u64| (h >> 11) as f32 / (1u64 << 53) as f32;
    (
        (to_unit(h0) * 2.0 - 1.0) * OFFSET_BOUND,
        (to_unit(h1) * 2.0 - 1.0) * OFFSET_BOUND,
    )
}

/// Standard clamped cubic Hermite smoothstep.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge0 == edge1 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Seeded 2D gradient-noise channel for one terrain feature.
///
/// Pure and deterministic: the same `(seed, salt, frequency)` triple always
/// produces bit-identical samples for identical coordinates.
pub struct NoiseField {
    noise: FastNoiseLite,
    offset_x: f32,
    offset_y: f32,
    amplitude: f32,
}

impl NoiseField {
    pub fn new(seed: i32, salt: u32, frequency: f32, amplitude: f32) -> Self {
        let mut noise = FastNoiseLite::with_seed(seed ^ salt as i32);
        noise.set_noise_type(Some(NoiseType::Perlin));
        noise.set_frequency(Some(frequency));
        let (offset_x, offset_y) = salted_offset(seed, salt);
        Self {
            noise,
            offset_x,
            offset_y,
            amplitude,
        }
    }

    /// Raw gradient noise in `[-1, 1]` at the salted sample position.
    #[inline]
    pub fn sample_raw(&self, x: f32, y: f32) -> f32 {
        self.noise.get_noise_2d(x + self.offset_x, y + self.offset_y)
    }

    /// Amplitude-scaled sample.
    #[inline]
    pub fn sample(&self, x: f32, y: f32) -> f32 {
        self.sample_raw(x, y) * self.amplitude
    }

    #[inline]
    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    /// Weighted octave sum of raw samples; each octave doubles the effective
    /// frequency by scaling the input coordinate.
    pub fn fractal_raw(&self, x: f32, y: f32, weights: &[f32]) -> f32 {
        let mut sum = 0.0;
        let mut scale = 1.0;
        for &w in weights {
            sum += self.sample_raw(x * scale, y * scale) * w;
            scale *= 2.0;
        }
        sum
    }
}
