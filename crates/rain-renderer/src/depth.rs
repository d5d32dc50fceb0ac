// ABOUTME: Depth compositor: stacks scaled, offset copies of the rain field back to front.
// ABOUTME: Evaluates each layer's visible cells into a per-frame arena, then shades pixels in parallel.

use rain_core::{Palette, RainSettings, RippleSettings};
use rayon::prelude::*;

use crate::atlas::GlyphAtlas;
use crate::field::{fract, CellSample, FieldModel};
use crate::frame::{over, Frame, Rgba};
use crate::ripple::Ripple;

/// Base cell grid of a frame. Cells are square, `cell_px` frame pixels on a side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    pub columns: u32,
    pub rows: u32,
    pub cell_px: f32,
    pub width: u32,
    pub height: u32,
}

impl Grid {
    pub fn new(columns: u32, width: u32, height: u32) -> Self {
        let columns = columns.max(1);
        let width = width.max(1);
        let height = height.max(1);
        let rows = ((columns as f32 * height as f32 / width as f32).round() as u32).max(1);
        Self {
            columns,
            rows,
            cell_px: width as f32 / columns as f32,
            width,
            height,
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Base cell coordinates of a pixel center; rows grow upward from the bottom edge
    #[inline]
    pub fn cell_coords(&self, x: u32, y: u32) -> (f32, f32) {
        let cx = (x as f32 + 0.5) / self.cell_px;
        let cy = (self.height as f32 - y as f32 - 0.5) / self.cell_px;
        (cx, cy)
    }
}

/// Placement of one depth layer relative to the base grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerTransform {
    pub layer: u32,
    /// Cell size relative to the base grid, in (0, 1]
    pub scale: f32,
    /// Parallax shift in layer columns
    pub offset: f32,
    /// tan(slant), columns per row
    pub shear: f32,
    pub alpha: f32,
}

impl LayerTransform {
    pub fn for_layer(layer: u32, rain: &RainSettings) -> Self {
        let d = layer as f32;
        Self {
            layer,
            scale: 1.0 - d * rain.depth_scale,
            offset: d * rain.parallax_offset,
            shear: rain.slant_degrees.to_radians().tan(),
            alpha: (1.0 - d * rain.depth_fade).clamp(0.0, 1.0),
        }
    }

    /// Map base cell coordinates to this layer's (column, row) space
    #[inline]
    pub fn to_layer(&self, cx: f32, cy: f32) -> (f32, f32) {
        let u = (cx + cy * self.shear) / self.scale + self.offset;
        let v = cy / self.scale;
        (u, v)
    }
}

/// An evaluated cell with its color resolved
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ShadedCell {
    pub sample: CellSample,
    /// Premultiplied, before glyph coverage
    pub color: Rgba,
}

/// How a layer's arena slots map to the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
    /// One slot per layer cell in view
    Cells,
    /// One slot per frame pixel, holding the cell under the pixel center. Used when the
    /// layer's cells are smaller than pixels.
    Pixels,
}

/// Evaluated cells of one layer covering the visible frame
#[derive(Debug, Clone)]
pub struct LayerCells {
    pub transform: LayerTransform,
    addressing: Addressing,
    column_start: i32,
    columns: u32,
    rows: u32,
    cells: Vec<ShadedCell>,
}

impl LayerCells {
    fn build(
        field: &FieldModel,
        compositor: &DepthCompositor,
        transform: LayerTransform,
        grid: &Grid,
        time: f32,
    ) -> Self {
        let (column_start, columns, rows) = Self::extent(&transform, grid);
        let pixels = grid.width as u64 * grid.height as u64;
        if columns * rows > pixels {
            tracing::debug!(
                "Layer {} has {} cells for {} pixels, evaluating per pixel",
                transform.layer,
                columns * rows,
                pixels
            );
            return Self::build_per_pixel(field, compositor, transform, grid, time);
        }
        Self::build_per_cell(
            field,
            compositor,
            transform,
            (column_start, columns as u32, rows as u32),
            time,
        )
    }

    /// First column, column count and row count of the layer cells in view
    fn extent(transform: &LayerTransform, grid: &Grid) -> (i32, u64, u64) {
        let top = grid.height as f32 / grid.cell_px;
        let right = grid.columns as f32;
        let corners = [(0.0, 0.0), (right, 0.0), (0.0, top), (right, top)];
        let (mut u_min, mut u_max) = (f32::MAX, f32::MIN);
        let mut v_max = 0.0f32;
        for (cx, cy) in corners {
            let (u, v) = transform.to_layer(cx, cy);
            u_min = u_min.min(u);
            u_max = u_max.max(u);
            v_max = v_max.max(v);
        }

        let column_start = u_min.floor() as i32 - 1;
        let columns = (u_max.floor() as i64 + 1 - column_start as i64 + 1).max(1) as u64;
        let rows = v_max.floor() as u64 + 2;
        (column_start, columns, rows)
    }

    fn build_per_cell(
        field: &FieldModel,
        compositor: &DepthCompositor,
        transform: LayerTransform,
        (column_start, columns, rows): (i32, u32, u32),
        time: f32,
    ) -> Self {
        let mut cells = vec![ShadedCell::default(); columns as usize * rows as usize];
        cells
            .par_chunks_mut(columns as usize)
            .enumerate()
            .for_each(|(row, line)| {
                for (i, cell) in line.iter_mut().enumerate() {
                    let column = column_start + i as i32;
                    let sample = field.evaluate(column, row as i32, time, transform.layer);
                    *cell = ShadedCell {
                        sample,
                        color: compositor.shade(&sample, transform.alpha),
                    };
                }
            });

        Self {
            transform,
            addressing: Addressing::Cells,
            column_start,
            columns,
            rows,
            cells,
        }
    }

    fn build_per_pixel(
        field: &FieldModel,
        compositor: &DepthCompositor,
        transform: LayerTransform,
        grid: &Grid,
        time: f32,
    ) -> Self {
        let mut cells = vec![ShadedCell::default(); grid.width as usize * grid.height as usize];
        cells
            .par_chunks_mut(grid.width as usize)
            .enumerate()
            .for_each(|(y, line)| {
                for (x, cell) in line.iter_mut().enumerate() {
                    let (cx, cy) = grid.cell_coords(x as u32, y as u32);
                    let (u, v) = transform.to_layer(cx, cy);
                    let sample =
                        field.evaluate(u.floor() as i32, v.floor() as i32, time, transform.layer);
                    *cell = ShadedCell {
                        sample,
                        color: compositor.shade(&sample, transform.alpha),
                    };
                }
            });

        Self {
            transform,
            addressing: Addressing::Pixels,
            column_start: 0,
            columns: grid.width,
            rows: grid.height,
            cells,
        }
    }

    pub fn addressing(&self) -> Addressing {
        self.addressing
    }

    /// Cell at layer coordinates. Only cell-addressed layers answer.
    #[inline]
    pub fn get(&self, column: i32, row: i32) -> Option<&ShadedCell> {
        if self.addressing != Addressing::Cells {
            return None;
        }
        self.slot(column - self.column_start, row)
    }

    #[inline]
    fn slot(&self, col: i32, row: i32) -> Option<&ShadedCell> {
        if col < 0 || col >= self.columns as i32 || row < 0 || row >= self.rows as i32 {
            return None;
        }
        self.cells.get(row as usize * self.columns as usize + col as usize)
    }

    /// Cell under frame pixel `(x, y)`, whose base cell coordinates are `(cx, cy)`
    #[inline]
    pub fn lookup(&self, x: u32, y: u32, cx: f32, cy: f32) -> Option<&ShadedCell> {
        match self.addressing {
            Addressing::Cells => {
                let (u, v) = self.transform.to_layer(cx, cy);
                self.get(u.floor() as i32, v.floor() as i32)
            }
            Addressing::Pixels => self.slot(x as i32, y as i32),
        }
    }

    /// Premultiplied contribution of this layer at frame pixel `(x, y)`
    #[inline]
    pub fn fragment(&self, x: u32, y: u32, cx: f32, cy: f32, atlas: &GlyphAtlas) -> Option<Rgba> {
        let cell = self.lookup(x, y, cx, cy)?;
        if cell.color[3] <= 0.0 {
            return None;
        }
        let (u, v) = self.transform.to_layer(cx, cy);
        // Glyph rows are stored top-down; layer rows count upward
        let coverage = atlas.sample(cell.sample.glyph, fract(u), 1.0 - fract(v));
        let c = cell.color;
        Some([c[0] * coverage, c[1] * coverage, c[2] * coverage, c[3] * coverage])
    }

    /// Arena extent: layer columns and rows, or frame pixels when pixel-addressed
    pub fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }
}

/// Per-frame buffer of evaluated cells addressed by (layer, column, row)
#[derive(Debug, Clone)]
pub struct CellArena {
    layers: Vec<LayerCells>,
}

impl CellArena {
    pub fn build(field: &FieldModel, compositor: &DepthCompositor, grid: &Grid, time: f32) -> Self {
        let layers = compositor
            .transforms
            .par_iter()
            .map(|t| LayerCells::build(field, compositor, *t, grid, time))
            .collect();
        Self { layers }
    }

    /// Layers, nearest first
    pub fn layers(&self) -> &[LayerCells] {
        &self.layers
    }

    /// Evaluated cells across all layers; at most one per frame pixel per layer
    pub fn cell_count(&self) -> usize {
        self.layers.iter().map(|l| l.cells.len()).sum()
    }
}

/// Fold premultiplied fragments over a background, farthest first
pub fn composite_layers(background: Rgba, fragments: impl IntoIterator<Item = Rgba>) -> Rgba {
    fragments.into_iter().fold(background, over)
}

#[derive(Debug, Clone)]
pub struct DepthCompositor {
    transforms: Vec<LayerTransform>,
    palette: Palette,
    background: Rgba,
    ripple: RippleSettings,
}

impl DepthCompositor {
    pub fn new(rain: &RainSettings, palette: &Palette, ripple: &RippleSettings) -> Self {
        let transforms = (0..rain.depth_layers.max(1))
            .map(|d| LayerTransform::for_layer(d, rain))
            .collect();
        Self {
            transforms,
            palette: palette.clone(),
            background: palette.background.premultiplied(),
            ripple: ripple.clone(),
        }
    }

    /// Layer placements, nearest first
    pub fn layers(&self) -> &[LayerTransform] {
        &self.transforms
    }

    /// Premultiplied cell color before glyph coverage. The layer alpha dims brightness,
    /// cursor and glint before coloring, so faded layers also drift toward the secondary color.
    pub fn shade(&self, sample: &CellSample, layer_alpha: f32) -> Rgba {
        let p = &self.palette;
        let brightness = sample.brightness * layer_alpha;
        let cursor = sample.cursor * layer_alpha;
        let glint = sample.glint * layer_alpha;
        let base = p.secondary.lerp(p.primary, brightness);
        let lit = base.lerp(p.cursor, cursor);
        let r = (lit.r + p.glint.r * glint).min(1.0);
        let g = (lit.g + p.glint.g * glint).min(1.0);
        let b = (lit.b + p.glint.b * glint).min(1.0);
        let a = brightness.max(cursor).max(glint);
        [r * a, g * a, b * a, a]
    }

    pub fn build_arena(&self, field: &FieldModel, grid: &Grid, time: f32) -> CellArena {
        CellArena::build(field, self, grid, time)
    }

    /// Shade every pixel of the grid from an evaluated arena
    pub fn composite(
        &self,
        arena: &CellArena,
        atlas: &GlyphAtlas,
        grid: &Grid,
        ripple: &Ripple,
    ) -> Frame {
        let mut frame = Frame::new(grid.width, grid.height);
        let width = frame.width();
        let height = frame.height();
        let aspect = grid.aspect();
        let primary = self.palette.primary;

        frame
            .pixels_mut()
            .par_chunks_mut(width as usize)
            .enumerate()
            .for_each(|(y, line)| {
                let y = y as u32;
                for (x, pixel) in line.iter_mut().enumerate() {
                    let x = x as u32;
                    let (cx, cy) = grid.cell_coords(x, y);
                    let fragments = arena
                        .layers
                        .iter()
                        .rev()
                        .filter_map(|layer| layer.fragment(x, y, cx, cy, atlas));
                    let mut out = composite_layers(self.background, fragments);

                    if ripple.is_active() {
                        let nx = (x as f32 + 0.5) / width as f32;
                        let ny = (y as f32 + 0.5) / height as f32;
                        let ring = ripple.intensity_at(nx, ny, aspect, &self.ripple);
                        out[0] += primary.r * ring;
                        out[1] += primary.g * ring;
                        out[2] += primary.b * ring;
                        out[3] = (out[3] + ring).min(1.0);
                    }
                    *pixel = out;
                }
            });
        frame
    }

    pub fn render(
        &self,
        field: &FieldModel,
        atlas: &GlyphAtlas,
        grid: &Grid,
        time: f32,
        ripple: &Ripple,
    ) -> Frame {
        let arena = self.build_arena(field, grid, time);
        self.composite(&arena, atlas, grid, ripple)
    }
}
