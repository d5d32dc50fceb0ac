// ABOUTME: Post-process stack applied to the composited frame.
// ABOUTME: Bloom, chromatic aberration, vignette, dither and scanlines in a fixed order.

use rain_core::PostSettings;
use rayon::prelude::*;

use crate::blur::blur;
use crate::frame::{luminance, Frame, Rgba};
use crate::hash::{Pcg3dSeed, Seed};

/// Per-frame inputs shared by all stages
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageContext {
    pub time: f32,
    pub device_pixel_ratio: f32,
    pub frame_index: u64,
}

impl Default for StageContext {
    fn default() -> Self {
        Self {
            time: 0.0,
            device_pixel_ratio: 1.0,
            frame_index: 0,
        }
    }
}

/// One full-frame image operation. Reads the previous stage's output.
pub trait PostStage: Send + Sync {
    fn name(&self) -> &'static str;
    fn apply(&self, input: &Frame, ctx: &StageContext) -> Frame;
}

/// Build a frame of the same size from a per-pixel function
fn map_pixels(input: &Frame, f: impl Fn(u32, u32, Rgba) -> Rgba + Sync) -> Frame {
    let mut out = input.clone();
    let width = out.width() as usize;
    out.pixels_mut()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, line)| {
            for (x, pixel) in line.iter_mut().enumerate() {
                *pixel = f(x as u32, y as u32, *pixel);
            }
        });
    out
}

pub struct Bloom {
    pub strength: f32,
    pub threshold: f32,
    /// CSS pixels
    pub radius: f32,
    pub passes: u32,
}

impl Bloom {
    /// Half-resolution copy keeping only light above the threshold
    fn extract(&self, input: &Frame) -> Frame {
        let (w, h) = (input.width(), input.height());
        let mut half = Frame::new(w.div_ceil(2), h.div_ceil(2));
        let half_width = half.width() as usize;
        half.pixels_mut()
            .par_chunks_mut(half_width)
            .enumerate()
            .for_each(|(hy, line)| {
                for (hx, pixel) in line.iter_mut().enumerate() {
                    let mut sum = [0.0f32; 4];
                    for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                        let x = (hx as u32 * 2 + dx).min(w - 1);
                        let y = (hy as u32 * 2 + dy).min(h - 1);
                        let p = input.get(x, y);
                        for c in 0..4 {
                            sum[c] += p[c] * 0.25;
                        }
                    }
                    let lum = luminance(sum);
                    if lum > self.threshold {
                        let k = (lum - self.threshold) / lum;
                        *pixel = [sum[0] * k, sum[1] * k, sum[2] * k, 0.0];
                    }
                }
            });
        half
    }
}

impl PostStage for Bloom {
    fn name(&self) -> &'static str {
        "bloom"
    }

    fn apply(&self, input: &Frame, ctx: &StageContext) -> Frame {
        let mut glow = self.extract(input);
        let radius = ((self.radius * ctx.device_pixel_ratio * 0.5).round() as u32).max(1);
        for _ in 0..self.passes {
            glow = blur(&glow, radius);
        }
        map_pixels(input, |x, y, p| {
            let g = glow.sample((x as f32 + 0.5) * 0.5, (y as f32 + 0.5) * 0.5);
            let add = [g[0] * self.strength, g[1] * self.strength, g[2] * self.strength];
            let rgb = [p[0] + add[0], p[1] + add[1], p[2] + add[2]];
            // Glow over a translucent background must stay premultiplied
            let alpha = (p[3] + luminance([add[0], add[1], add[2], 0.0]))
                .max(rgb[0])
                .max(rgb[1])
                .max(rgb[2])
                .min(1.0);
            [rgb[0], rgb[1], rgb[2], alpha]
        })
    }
}

pub struct ChromaticAberration {
    pub coefficient: f32,
}

impl PostStage for ChromaticAberration {
    fn name(&self) -> &'static str {
        "chromatic_aberration"
    }

    fn apply(&self, input: &Frame, _ctx: &StageContext) -> Frame {
        let cx = input.width() as f32 * 0.5;
        let cy = input.height() as f32 * 0.5;
        map_pixels(input, |x, y, p| {
            let px = x as f32 + 0.5;
            let py = y as f32 + 0.5;
            let dx = (px - cx) * self.coefficient;
            let dy = (py - cy) * self.coefficient;
            let red = input.sample(px + dx, py + dy);
            let blue = input.sample(px - dx, py - dy);
            // A fringe keeps the coverage it was sampled with
            [red[0], p[1], blue[2], p[3].max(red[3]).max(blue[3])]
        })
    }
}

pub struct Vignette {
    pub intensity: f32,
}

impl PostStage for Vignette {
    fn name(&self) -> &'static str {
        "vignette"
    }

    fn apply(&self, input: &Frame, _ctx: &StageContext) -> Frame {
        let w = input.width() as f32;
        let h = input.height() as f32;
        map_pixels(input, |x, y, p| {
            let nx = (x as f32 + 0.5) / w - 0.5;
            let ny = (y as f32 + 0.5) / h - 0.5;
            let r2 = nx * nx + ny * ny;
            let k = (1.0 - self.intensity * r2 / 0.5).clamp(0.0, 1.0);
            [p[0] * k, p[1] * k, p[2] * k, p[3]]
        })
    }
}

pub struct Dither {
    pub magnitude: f32,
}

impl PostStage for Dither {
    fn name(&self) -> &'static str {
        "dither"
    }

    fn apply(&self, input: &Frame, ctx: &StageContext) -> Frame {
        let bucket = (ctx.time * 60.0).floor() as i64 as u32;
        map_pixels(input, |x, y, p| {
            let noise = (Pcg3dSeed.seed(x, y, bucket) - 0.5) * self.magnitude;
            let alpha = p[3].clamp(0.0, 1.0);
            [
                (p[0] + noise).clamp(0.0, alpha),
                (p[1] + noise).clamp(0.0, alpha),
                (p[2] + noise).clamp(0.0, alpha),
                p[3],
            ]
        })
    }
}

pub struct Scanlines {
    pub intensity: f32,
    /// CSS pixels between dark bands
    pub period: f32,
}

impl PostStage for Scanlines {
    fn name(&self) -> &'static str {
        "scanline"
    }

    fn apply(&self, input: &Frame, ctx: &StageContext) -> Frame {
        let period = (self.period * ctx.device_pixel_ratio).max(1.0);
        map_pixels(input, |_x, y, p| {
            let phase = std::f32::consts::TAU * y as f32 / period;
            let k = 1.0 - self.intensity * 0.5 * (1.0 - phase.cos());
            [p[0] * k, p[1] * k, p[2] * k, p[3]]
        })
    }
}

pub struct PostProcessStack {
    stages: Vec<Box<dyn PostStage>>,
}

impl PostProcessStack {
    /// Stages in their fixed order; zeroed effects are left out
    pub fn from_settings(settings: &PostSettings) -> Self {
        let mut stages: Vec<Box<dyn PostStage>> = Vec::new();
        if settings.bloom_strength > 0.0 && settings.bloom_passes > 0 {
            stages.push(Box::new(Bloom {
                strength: settings.bloom_strength,
                threshold: settings.bloom_threshold,
                radius: settings.bloom_radius,
                passes: settings.bloom_passes,
            }));
        }
        if settings.chromatic_aberration > 0.0 {
            stages.push(Box::new(ChromaticAberration {
                coefficient: settings.chromatic_aberration,
            }));
        }
        if settings.vignette_intensity > 0.0 {
            stages.push(Box::new(Vignette {
                intensity: settings.vignette_intensity,
            }));
        }
        if settings.dither_magnitude > 0.0 {
            stages.push(Box::new(Dither {
                magnitude: settings.dither_magnitude,
            }));
        }
        if settings.scanline_intensity > 0.0 {
            stages.push(Box::new(Scanlines {
                intensity: settings.scanline_intensity,
                period: settings.scanline_period,
            }));
        }
        let stack = Self { stages };
        tracing::info!("Post-process stack: [{}]", stack.stage_names().join(", "));
        stack
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn run(&self, frame: Frame, ctx: &StageContext) -> Frame {
        self.stages
            .iter()
            .fold(frame, |frame, stage| stage.apply(&frame, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GREY: Rgba = [0.5, 0.5, 0.5, 1.0];

    fn gradient(w: u32, h: u32) -> Frame {
        let mut frame = Frame::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let v = (x * 7 + y * 13) as f32 % 17.0 / 17.0;
                frame.set(x, y, [v, 1.0 - v, v * 0.5, 1.0]);
            }
        }
        frame
    }

    #[test]
    fn stage_order_is_fixed() {
        let settings = PostSettings {
            scanline_intensity: 0.3,
            ..PostSettings::default()
        };
        let stack = PostProcessStack::from_settings(&settings);
        assert_eq!(
            stack.stage_names(),
            vec!["bloom", "chromatic_aberration", "vignette", "dither", "scanline"]
        );
    }

    #[test]
    fn zeroed_stages_are_skipped() {
        assert!(PostProcessStack::from_settings(&PostSettings::disabled()).is_empty());

        let settings = PostSettings {
            vignette_intensity: 0.5,
            ..PostSettings::disabled()
        };
        let stack = PostProcessStack::from_settings(&settings);
        assert_eq!(stack.stage_names(), vec!["vignette"]);

        let frame = gradient(8, 8);
        let empty = PostProcessStack::from_settings(&PostSettings::disabled());
        assert_eq!(empty.run(frame.clone(), &StageContext::default()), frame);
    }

    #[test]
    fn vignette_keeps_center_and_darkens_corners() {
        let frame = Frame::filled(101, 101, GREY);
        let out = Vignette { intensity: 0.8 }.apply(&frame, &StageContext::default());
        assert_eq!(out.get(50, 50), GREY);
        let corner = out.get(0, 0);
        assert!(corner[0] < 0.5 * 0.3);
        assert_eq!(corner[3], 1.0);
        assert!(out.get(25, 25)[0] < 0.5 && out.get(25, 25)[0] > corner[0]);
    }

    #[test]
    fn aberration_keeps_green_channel() {
        let frame = gradient(32, 24);
        let out = ChromaticAberration { coefficient: 0.05 }.apply(&frame, &StageContext::default());
        for (a, b) in frame.pixels().iter().zip(out.pixels()) {
            assert_eq!(a[1], b[1]);
        }
        assert_ne!(frame, out);
    }

    #[test]
    fn aberration_leaves_uniform_frame_unchanged() {
        let frame = Frame::filled(20, 10, [0.3, 0.6, 0.9, 1.0]);
        let out = ChromaticAberration { coefficient: 0.05 }.apply(&frame, &StageContext::default());
        for p in out.pixels() {
            assert!((p[0] - 0.3).abs() < 1e-6 && (p[2] - 0.9).abs() < 1e-6);
        }
    }

    #[test]
    fn bloom_never_darkens_and_spreads_light() {
        let mut frame = Frame::filled(32, 32, [0.0, 0.0, 0.0, 1.0]);
        for y in 15..17 {
            for x in 15..17 {
                frame.set(x, y, [1.0, 1.0, 1.0, 1.0]);
            }
        }
        let bloom = Bloom {
            strength: 1.0,
            threshold: 0.2,
            radius: 6.0,
            passes: 2,
        };
        let out = bloom.apply(&frame, &StageContext::default());
        for (a, b) in frame.pixels().iter().zip(out.pixels()) {
            for c in 0..4 {
                assert!(b[c] >= a[c]);
            }
        }
        assert!(out.get(20, 16)[1] > 0.0);
        assert!(out.get(16, 11)[1] > 0.0);
    }

    #[test]
    fn bloom_ignores_light_below_threshold() {
        let frame = Frame::filled(16, 16, [0.1, 0.1, 0.1, 1.0]);
        let bloom = Bloom {
            strength: 1.0,
            threshold: 0.5,
            radius: 4.0,
            passes: 1,
        };
        assert_eq!(bloom.apply(&frame, &StageContext::default()), frame);
    }

    #[test]
    fn dither_is_bounded_by_magnitude() {
        let frame = Frame::filled(64, 64, GREY);
        let magnitude = 4.0 / 255.0;
        let ctx = StageContext {
            time: 1.5,
            ..StageContext::default()
        };
        let out = Dither { magnitude }.apply(&frame, &ctx);
        let mut changed = 0;
        for p in out.pixels() {
            for c in 0..3 {
                assert!((p[c] - 0.5).abs() <= magnitude * 0.5 + 1e-6);
            }
            if p[0] != 0.5 {
                changed += 1;
            }
        }
        assert!(changed > 64 * 64 / 2);
    }

    fn assert_premultiplied(frame: &Frame) {
        // Opaque pixels may carry glow above 1.0
        for (i, p) in frame.pixels().iter().enumerate().filter(|(_, p)| p[3] < 1.0) {
            for c in 0..3 {
                assert!(p[c] <= p[3] + 1e-6, "pixel {i}: {p:?}");
            }
        }
    }

    /// Lit stripe over a half transparent background
    fn translucent_stripe() -> Frame {
        let mut frame = Frame::filled(32, 16, [0.0, 0.05, 0.0, 0.5]);
        for y in 0..16 {
            for x in 12..16 {
                frame.set(x, y, [0.9, 1.0, 0.8, 1.0]);
            }
        }
        frame
    }

    #[test]
    fn stages_keep_translucent_frames_premultiplied() {
        let frame = translucent_stripe();
        let ctx = StageContext {
            time: 0.7,
            ..StageContext::default()
        };
        let stages: Vec<Box<dyn PostStage>> = vec![
            Box::new(Bloom {
                strength: 1.0,
                threshold: 0.2,
                radius: 4.0,
                passes: 1,
            }),
            Box::new(ChromaticAberration { coefficient: 0.2 }),
            Box::new(Dither { magnitude: 0.2 }),
        ];
        for stage in &stages {
            let out = stage.apply(&frame, &ctx);
            assert_premultiplied(&out);
        }
    }

    #[test]
    fn aberration_fringe_carries_its_coverage() {
        let frame = translucent_stripe();
        let out = ChromaticAberration { coefficient: 0.2 }.apply(&frame, &StageContext::default());
        // Blue sampled toward the center spreads past the stripe's edge with its alpha
        let fringe = (0..12)
            .chain(16..32)
            .map(|x| out.get(x, 8))
            .find(|p| p[2] > 0.1)
            .unwrap();
        assert!(fringe[3] > 0.5);
    }

    #[test]
    fn scanlines_darken_between_bands() {
        let frame = Frame::filled(4, 8, GREY);
        let ctx = StageContext::default();
        let out = Scanlines {
            intensity: 0.5,
            period: 4.0,
        }
        .apply(&frame, &ctx);
        assert!((out.get(0, 0)[0] - 0.5).abs() < 1e-6);
        assert!((out.get(0, 2)[0] - 0.25).abs() < 1e-6);
        assert!((out.get(0, 4)[0] - 0.5).abs() < 1e-6);

        let hidpi = StageContext {
            device_pixel_ratio: 2.0,
            ..ctx
        };
        let out = Scanlines {
            intensity: 0.5,
            period: 4.0,
        }
        .apply(&frame, &hidpi);
        assert!((out.get(0, 4)[0] - 0.25).abs() < 1e-6);
    }
}
