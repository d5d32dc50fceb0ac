// ABOUTME: Color representation and conversion utilities.
// ABOUTME: Supports RGB(A), hex parsing, blending helpers, and preset phosphor colors.

use serde::{de, Deserialize, Deserializer, Serialize};

/// Serialized as an `{ r, g, b, a }` table; also read from `"#rrggbb[aa]"` strings
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Classic rain green
    pub const MATRIX_GREEN: Self = Self::rgb(0.0, 1.0, 0.255);

    /// Deep green used for the dim end of a trail
    pub const DEEP_GREEN: Self = Self::rgb(0.0, 0.231, 0.0);

    /// Pale mint used for the leading character
    pub const MINT: Self = Self::rgb(0.706, 1.0, 0.784);

    /// Classic amber phosphor color (P3 phosphor)
    pub const AMBER: Self = Self::rgb(1.0, 0.7, 0.0);

    /// White phosphor
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);

    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);

    /// Parse `#rrggbb` or `#rrggbbaa` (the leading `#` is optional)
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if hex.len() != 6 && hex.len() != 8 {
            return None;
        }
        let channel = |i: usize| -> Option<f32> {
            u8::from_str_radix(hex.get(i..i + 2)?, 16)
                .ok()
                .map(|v| v as f32 / 255.0)
        };
        let a = if hex.len() == 8 { channel(6)? } else { 1.0 };
        Some(Self::rgba(channel(0)?, channel(2)?, channel(4)?, a))
    }

    pub fn lerp(self, other: Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }

    /// Premultiplied RGBA
    pub fn premultiplied(self) -> [f32; 4] {
        [self.r * self.a, self.g * self.a, self.b * self.a, self.a]
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Hex(String),
    Channels {
        r: f32,
        g: f32,
        b: f32,
        #[serde(default = "opaque")]
        a: f32,
    },
}

fn opaque() -> f32 {
    1.0
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match ColorRepr::deserialize(deserializer)? {
            ColorRepr::Hex(hex) => Self::from_hex(&hex)
                .ok_or_else(|| de::Error::custom(format!("invalid hex color '{hex}'"))),
            ColorRepr::Channels { r, g, b, a } => Ok(Self::rgba(r, g, b, a)),
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::MATRIX_GREEN
    }
}
