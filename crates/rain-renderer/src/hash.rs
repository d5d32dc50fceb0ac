// ABOUTME: Deterministic pseudo-random seeds for the field model.
// ABOUTME: Maps small integer tuples to floats in [0, 1) with no hidden state.

/// A stateless hash from three integers to a float in `[0, 1)`.
///
/// Every random quantity in the simulation (stream speed, length, phase,
/// glyph choice, glint timing, dither) is a call to a `Seed`, so the whole
/// frame is reproducible from the configuration and the clock alone.
pub trait Seed: Send + Sync {
    fn seed(&self, x: u32, y: u32, z: u32) -> f32;
}

/// PCG3D integer hash (Jarzynski & Olano, "Hash Functions for GPU Rendering").
///
/// Integer-only, so results are bit-identical on every platform.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pcg3dSeed;

impl Pcg3dSeed {
    pub fn hash(x: u32, y: u32, z: u32) -> [u32; 3] {
        let mut v = [
            x.wrapping_mul(1_664_525).wrapping_add(1_013_904_223),
            y.wrapping_mul(1_664_525).wrapping_add(1_013_904_223),
            z.wrapping_mul(1_664_525).wrapping_add(1_013_904_223),
        ];
        v[0] = v[0].wrapping_add(v[1].wrapping_mul(v[2]));
        v[1] = v[1].wrapping_add(v[2].wrapping_mul(v[0]));
        v[2] = v[2].wrapping_add(v[0].wrapping_mul(v[1]));
        v[0] ^= v[0] >> 16;
        v[1] ^= v[1] >> 16;
        v[2] ^= v[2] >> 16;
        v[0] = v[0].wrapping_add(v[1].wrapping_mul(v[2]));
        v[1] = v[1].wrapping_add(v[2].wrapping_mul(v[0]));
        v[2] = v[2].wrapping_add(v[0].wrapping_mul(v[1]));
        v
    }
}

impl Seed for Pcg3dSeed {
    fn seed(&self, x: u32, y: u32, z: u32) -> f32 {
        // 24 bits fit an f32 mantissa exactly, so the result is < 1.0
        (Self::hash(x, y, z)[0] >> 8) as f32 / (1u32 << 24) as f32
    }
}

/// The classic shader hash `fract(sin(dot(p, k)) * 43758.5453)`.
///
/// Kept for look-alike output; `sin` is not bit-exact across platforms.
#[derive(Debug, Clone, Copy, Default)]
pub struct SineSeed;

impl Seed for SineSeed {
    fn seed(&self, x: u32, y: u32, z: u32) -> f32 {
        // Fold into a small range first: sin loses precision on huge arguments
        let fold = |v: u32| (v % 4096) as f64;
        let dot = fold(x) * 12.9898 + fold(y) * 78.233 + fold(z) * 37.719;
        let v = (dot.sin() * 43_758.545_3).rem_euclid(1.0) as f32;
        // rem_euclid can round up to exactly 1.0 in f32
        if v >= 1.0 {
            0.0
        } else {
            v
        }
    }
}

/// Reinterpret a signed cell coordinate for hashing
#[inline]
pub(crate) fn key(v: i32) -> u32 {
    v as u32
}
