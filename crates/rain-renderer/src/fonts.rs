// ABOUTME: Font selection for the glyph atlas.
// ABOUTME: Loads a configured font file, falling back to procedural glyphs.

use std::path::Path;

use rain_core::RainSettings;

use crate::atlas::{AtlasError, FontRasterizer, GlyphAtlas, GlyphRasterizer, ProceduralRasterizer};

/// Read font bytes from disk
pub fn load_font_data(path: &Path) -> Result<Vec<u8>, AtlasError> {
    std::fs::read(path).map_err(|e| AtlasError::FontLoadError(format!("{}: {}", path.display(), e)))
}

/// Rasterizer for the configured font, or procedural glyphs when none is set or it fails to load
pub fn rasterizer_for(settings: &RainSettings) -> Box<dyn GlyphRasterizer> {
    let Some(path) = &settings.font_path else {
        return Box::new(ProceduralRasterizer);
    };
    match load_font_data(path).and_then(|data| FontRasterizer::from_bytes(&data)) {
        Ok(rasterizer) => {
            tracing::info!("Using font {}", path.display());
            Box::new(rasterizer)
        }
        Err(e) => {
            tracing::warn!("Falling back to procedural glyphs: {}", e);
            Box::new(ProceduralRasterizer)
        }
    }
}

/// Build the atlas described by the rain settings
pub fn build_atlas(settings: &RainSettings) -> Result<GlyphAtlas, AtlasError> {
    let rasterizer = rasterizer_for(settings);
    GlyphAtlas::build(
        &settings.character_set,
        settings.atlas_cells_per_row,
        settings.glyph_cell_px,
        rasterizer.as_ref(),
    )
}

/// Whether two settings produce the same atlas
pub fn same_atlas_inputs(a: &RainSettings, b: &RainSettings) -> bool {
    a.character_set == b.character_set
        && a.atlas_cells_per_row == b.atlas_cells_per_row
        && a.glyph_cell_px == b.glyph_cell_px
        && a.font_path == b.font_path
}
