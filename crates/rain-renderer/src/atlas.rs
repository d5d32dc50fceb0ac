// ABOUTME: Glyph atlas for the rain field.
// ABOUTME: Rasterizes a fixed character set once into a grid-indexed coverage texture.

use fontdue::{Font, FontSettings};
use std::collections::HashSet;

use crate::hash::Pcg3dSeed;

/// Single-channel coverage bitmap for one character
#[derive(Debug, Clone)]
pub struct GlyphBitmap {
    pub width: u32,
    pub height: u32,
    pub coverage: Vec<u8>,
}

/// Produces a coverage bitmap for a character that fits in a `size` x `size` box
pub trait GlyphRasterizer {
    fn rasterize(&self, c: char, size: u32) -> GlyphBitmap;
}

#[derive(Debug, thiserror::Error)]
pub enum AtlasError {
    #[error("Character set is empty")]
    EmptyCharacterSet,

    #[error("Failed to load font: {0}")]
    FontLoadError(String),
}

/// fontdue rasterizer; characters missing from the font fall back to procedural glyphs
pub struct FontRasterizer {
    font: Font,
    fallback: ProceduralRasterizer,
}

impl FontRasterizer {
    pub fn from_bytes(font_data: &[u8]) -> Result<Self, AtlasError> {
        let font = Font::from_bytes(font_data, FontSettings::default())
            .map_err(|e| AtlasError::FontLoadError(e.to_string()))?;
        Ok(Self {
            font,
            fallback: ProceduralRasterizer,
        })
    }
}

impl GlyphRasterizer for FontRasterizer {
    fn rasterize(&self, c: char, size: u32) -> GlyphBitmap {
        if self.font.lookup_glyph_index(c) == 0 {
            return self.fallback.rasterize(c, size);
        }

        let (metrics, bitmap) = self.font.rasterize(c, size as f32 * 0.85);
        GlyphBitmap {
            width: metrics.width as u32,
            height: metrics.height as u32,
            coverage: bitmap,
        }
    }
}

/// Font-free glyphs: a mirrored 5x7 block pattern hashed from the character code
#[derive(Debug, Clone, Copy, Default)]
pub struct ProceduralRasterizer;

impl ProceduralRasterizer {
    const COLS: u32 = 5;
    const ROWS: u32 = 7;

    /// Bit `row * 5 + col` set means the block is lit
    fn pattern(c: char) -> u64 {
        let h = Pcg3dSeed::hash(c as u32, 0x676c_7970, 0x7261_696e);
        let bits = (h[0] as u64) | ((h[1] as u64) << 32);
        let mut pattern = 0u64;
        for row in 0..Self::ROWS {
            for col in 0..3 {
                if bits >> (row * 3 + col) & 1 == 1 {
                    // Mirror the left half onto the right
                    pattern |= 1 << (row * Self::COLS + col);
                    pattern |= 1 << (row * Self::COLS + (Self::COLS - 1 - col));
                }
            }
        }
        if pattern == 0 {
            // Never emit an invisible glyph: fall back to a center bar
            for row in 0..Self::ROWS {
                pattern |= 1 << (row * Self::COLS + 2);
            }
        }
        pattern
    }
}

impl GlyphRasterizer for ProceduralRasterizer {
    fn rasterize(&self, c: char, size: u32) -> GlyphBitmap {
        let pattern = Self::pattern(c);
        let height = size.max(Self::ROWS);
        let width = (height * Self::COLS / Self::ROWS).max(Self::COLS);
        let mut coverage = vec![0u8; (width * height) as usize];
        for y in 0..height {
            let row = y * Self::ROWS / height;
            for x in 0..width {
                let col = x * Self::COLS / width;
                if pattern >> (row * Self::COLS + col) & 1 == 1 {
                    coverage[(y * width + x) as usize] = 255;
                }
            }
        }
        GlyphBitmap {
            width,
            height,
            coverage,
        }
    }
}

/// Pixel rectangle and normalized texture coordinates of one glyph cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtlasRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub uv_min: [f32; 2],
    pub uv_max: [f32; 2],
}

pub struct GlyphAtlas {
    characters: Vec<char>,
    cells_per_row: u32,
    cell_px: u32,
    atlas_data: Vec<u8>,
    atlas_width: u32,
    atlas_height: u32,
}

impl GlyphAtlas {
    /// Rasterize `characters` into a square grid of `cells_per_row` x `cells_per_row`
    /// cells, each `cell_px` pixels on a side.
    ///
    /// Duplicate characters keep their first position. Characters beyond the
    /// grid capacity are dropped.
    pub fn build(
        characters: &str,
        cells_per_row: u32,
        cell_px: u32,
        rasterizer: &dyn GlyphRasterizer,
    ) -> Result<Self, AtlasError> {
        let cells_per_row = cells_per_row.max(1);
        let cell_px = cell_px.max(1);
        let capacity = (cells_per_row * cells_per_row) as usize;

        let mut seen = HashSet::new();
        let mut chars: Vec<char> = characters.chars().filter(|c| seen.insert(*c)).collect();
        if chars.is_empty() {
            return Err(AtlasError::EmptyCharacterSet);
        }
        if chars.len() > capacity {
            tracing::warn!(
                "Character set has {} glyphs, atlas holds {}; dropping the rest",
                chars.len(),
                capacity
            );
            chars.truncate(capacity);
        }

        let atlas_width = cells_per_row * cell_px;
        let atlas_height = cells_per_row * cell_px;
        let mut atlas_data = vec![0u8; (atlas_width * atlas_height) as usize];

        // One pixel of padding keeps bilinear lookups from bleeding between cells
        let glyph_box = cell_px.saturating_sub(2).max(1);
        for (index, &c) in chars.iter().enumerate() {
            let bitmap = rasterizer.rasterize(c, glyph_box);
            let cell_x = (index as u32 % cells_per_row) * cell_px;
            let cell_y = (index as u32 / cells_per_row) * cell_px;

            // Center the bitmap in its cell, clipping anything larger than the cell
            let off_x = (cell_px as i32 - bitmap.width as i32) / 2;
            let off_y = (cell_px as i32 - bitmap.height as i32) / 2;
            for y in 0..bitmap.height as i32 {
                let dy = off_y + y;
                if dy < 0 || dy >= cell_px as i32 {
                    continue;
                }
                for x in 0..bitmap.width as i32 {
                    let dx = off_x + x;
                    if dx < 0 || dx >= cell_px as i32 {
                        continue;
                    }
                    let src_idx = (y * bitmap.width as i32 + x) as usize;
                    let dst_idx = ((cell_y + dy as u32) * atlas_width + cell_x + dx as u32) as usize;
                    atlas_data[dst_idx] = bitmap.coverage[src_idx];
                }
            }
        }

        tracing::info!(
            "Glyph atlas built: {} glyphs, {}x{} px",
            chars.len(),
            atlas_width,
            atlas_height
        );

        Ok(Self {
            characters: chars,
            cells_per_row,
            cell_px,
            atlas_data,
            atlas_width,
            atlas_height,
        })
    }

    pub fn glyph_count(&self) -> u32 {
        self.characters.len() as u32
    }

    pub fn capacity(&self) -> u32 {
        self.cells_per_row * self.cells_per_row
    }

    pub fn character(&self, index: u32) -> Option<char> {
        self.characters.get(index as usize).copied()
    }

    pub fn data(&self) -> &[u8] {
        &self.atlas_data
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.atlas_width, self.atlas_height)
    }

    pub fn cell_px(&self) -> u32 {
        self.cell_px
    }

    /// Texture region of a glyph, or `None` past the glyph count
    pub fn region(&self, index: u32) -> Option<AtlasRegion> {
        if index >= self.glyph_count() {
            return None;
        }
        let x = (index % self.cells_per_row) * self.cell_px;
        let y = (index / self.cells_per_row) * self.cell_px;
        let w = self.atlas_width as f32;
        let h = self.atlas_height as f32;
        Some(AtlasRegion {
            x,
            y,
            width: self.cell_px,
            height: self.cell_px,
            uv_min: [x as f32 / w, y as f32 / h],
            uv_max: [(x + self.cell_px) as f32 / w, (y + self.cell_px) as f32 / h],
        })
    }

    /// Glyph index owning an atlas pixel
    pub fn locate(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.atlas_width || y >= self.atlas_height {
            return None;
        }
        let index = (y / self.cell_px) * self.cells_per_row + x / self.cell_px;
        (index < self.glyph_count()).then_some(index)
    }

    /// Nearest-neighbour coverage at fractional position (`fx`, `fy`) in a glyph cell,
    /// `fy` measured from the top
    #[inline]
    pub fn sample(&self, index: u32, fx: f32, fy: f32) -> f32 {
        if index >= self.glyph_count() {
            return 0.0;
        }
        let cell = self.cell_px as f32;
        let px = ((fx.clamp(0.0, 1.0) * cell) as u32).min(self.cell_px - 1);
        let py = ((fy.clamp(0.0, 1.0) * cell) as u32).min(self.cell_px - 1);
        let x = (index % self.cells_per_row) * self.cell_px + px;
        let y = (index / self.cells_per_row) * self.cell_px + py;
        self.atlas_data[(y * self.atlas_width + x) as usize] as f32 / 255.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atlas(chars: &str) -> GlyphAtlas {
        GlyphAtlas::build(chars, 8, 16, &ProceduralRasterizer).unwrap()
    }

    #[test]
    fn empty_character_set_is_rejected() {
        let err = GlyphAtlas::build("", 8, 16, &ProceduralRasterizer).err();
        assert!(matches!(err, Some(AtlasError::EmptyCharacterSet)));
    }

    #[test]
    fn duplicates_are_removed_in_order() {
        let atlas = atlas("abcab");
        assert_eq!(atlas.glyph_count(), 3);
        assert_eq!(atlas.character(0), Some('a'));
        assert_eq!(atlas.character(2), Some('c'));
        assert_eq!(atlas.character(3), None);
    }

    #[test]
    fn oversized_sets_are_truncated_to_capacity() {
        let chars: String = (0..100u32).filter_map(|i| char::from_u32(0x4e00 + i)).collect();
        let atlas = GlyphAtlas::build(&chars, 4, 8, &ProceduralRasterizer).unwrap();
        assert_eq!(atlas.capacity(), 16);
        assert_eq!(atlas.glyph_count(), 16);
    }

    #[test]
    fn regions_round_trip_and_do_not_overlap() {
        let atlas = atlas(rain_core::config::DEFAULT_CHARACTER_SET);
        let (w, h) = atlas.dimensions();
        let mut covered = vec![false; (w * h) as usize];

        for index in 0..atlas.glyph_count() {
            let r = atlas.region(index).unwrap();
            assert!(r.x + r.width <= w && r.y + r.height <= h);
            assert!(r.uv_min[0] >= 0.0 && r.uv_max[0] <= 1.0);
            assert!(r.uv_min[1] >= 0.0 && r.uv_max[1] <= 1.0);

            for y in r.y..r.y + r.height {
                for x in r.x..r.x + r.width {
                    assert_eq!(atlas.locate(x, y), Some(index));
                    let slot = &mut covered[(y * w + x) as usize];
                    assert!(!*slot, "regions overlap at {x},{y}");
                    *slot = true;
                }
            }
        }
        assert!(atlas.region(atlas.glyph_count()).is_none());
    }

    #[test]
    fn every_glyph_has_ink() {
        let atlas = atlas("0123456789ｱｲｳ");
        for index in 0..atlas.glyph_count() {
            let mut ink = 0.0;
            for y in 0..16 {
                for x in 0..16 {
                    ink += atlas.sample(index, x as f32 / 16.0, y as f32 / 16.0);
                }
            }
            assert!(ink > 0.0, "glyph {index} is blank");
        }
    }

    #[test]
    fn build_is_deterministic() {
        let a = atlas("xyz");
        let b = atlas("xyz");
        assert_eq!(a.data(), b.data());
    }

    #[test]
    fn sampling_outside_glyph_count_is_blank() {
        let atlas = atlas("a");
        assert_eq!(atlas.sample(5, 0.5, 0.5), 0.0);
    }
}
