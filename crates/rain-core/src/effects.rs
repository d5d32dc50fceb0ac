// ABOUTME: Post-processing effect parameters.
// ABOUTME: Controls bloom, chromatic aberration, vignette, dither and scanlines.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostSettings {
    /// Bloom recombine strength (0.0 = off)
    pub bloom_strength: f32,

    /// Bloom blur radius in CSS pixels (scaled by the device pixel ratio)
    pub bloom_radius: f32,

    /// Luminance above which pixels feed the bloom (0.0 - 1.0)
    pub bloom_threshold: f32,

    /// Number of blur passes over the half-resolution bright buffer
    pub bloom_passes: u32,

    /// Radial RGB split coefficient (0.0 = off, 0.01 = subtle)
    pub chromatic_aberration: f32,

    /// Vignette darkness - darkening toward screen edges (0.0 = none, 1.0 = strong)
    pub vignette_intensity: f32,

    /// Peak-to-peak magnitude of the dither noise (1/255 is one 8-bit step)
    pub dither_magnitude: f32,

    /// Scanline modulation depth (0.0 = none, 1.0 = strong)
    pub scanline_intensity: f32,

    /// Scanline period in CSS pixels
    pub scanline_period: f32,
}

impl Default for PostSettings {
    fn default() -> Self {
        Self {
            bloom_strength: 0.8,
            bloom_radius: 6.0,
            bloom_threshold: 0.35,
            bloom_passes: 2,
            chromatic_aberration: 0.004,
            vignette_intensity: 0.45,
            dither_magnitude: 2.0 / 255.0,
            scanline_intensity: 0.0,
            scanline_period: 3.0,
        }
    }
}

impl PostSettings {
    /// Everything off - the composited frame passes through untouched
    pub fn disabled() -> Self {
        Self {
            bloom_strength: 0.0,
            chromatic_aberration: 0.0,
            vignette_intensity: 0.0,
            dither_magnitude: 0.0,
            scanline_intensity: 0.0,
            ..Self::default()
        }
    }

    /// Heavier CRT look with scanlines
    pub fn retro() -> Self {
        Self {
            bloom_strength: 1.1,
            bloom_radius: 8.0,
            chromatic_aberration: 0.008,
            vignette_intensity: 0.6,
            scanline_intensity: 0.35,
            ..Self::default()
        }
    }

    /// Preset names accepted by [`PostSettings::preset`]
    pub const PRESETS: [&'static str; 3] = ["default", "retro", "off"];

    /// Look up a preset by name, case-insensitively
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "default" => Some(Self::default()),
            "retro" => Some(Self::retro()),
            "off" => Some(Self::disabled()),
            _ => None,
        }
    }
}
