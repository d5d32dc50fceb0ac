// ABOUTME: Separable gaussian blur over premultiplied frames.
// ABOUTME: Horizontal then vertical pass with clamped edges, rows processed in parallel.

use rayon::prelude::*;

use crate::frame::{Frame, Rgba};

/// Normalized weights for offsets `-radius..=radius`
pub fn gaussian_kernel(radius: u32, sigma: f32) -> Vec<f32> {
    if radius == 0 {
        return vec![1.0];
    }
    let sigma = sigma.max(1e-3);
    let denom = 2.0 * sigma * sigma;
    let r = radius as i32;
    let mut weights: Vec<f32> = (-r..=r)
        .map(|i| {
            let x = i as f32;
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f32 = weights.iter().sum();
    for w in &mut weights {
        *w /= sum;
    }
    weights
}

/// Blur with a kernel of `radius` pixels; sigma is half the radius
pub fn blur(frame: &Frame, radius: u32) -> Frame {
    if radius == 0 {
        return frame.clone();
    }
    let kernel = gaussian_kernel(radius, radius as f32 * 0.5);
    let mut tmp = Frame::new(frame.width(), frame.height());
    horizontal_pass(frame, &mut tmp, &kernel);
    let mut out = Frame::new(frame.width(), frame.height());
    vertical_pass(&tmp, &mut out, &kernel);
    out
}

fn horizontal_pass(src: &Frame, dst: &mut Frame, k: &[f32]) {
    let radius = (k.len() / 2) as i32;
    let w = src.width() as i32;
    let src_px = src.pixels();
    dst.pixels_mut()
        .par_chunks_mut(w as usize)
        .enumerate()
        .for_each(|(y, line)| {
            let row = &src_px[y * w as usize..(y + 1) * w as usize];
            for (x, out) in line.iter_mut().enumerate() {
                let mut acc: Rgba = [0.0; 4];
                for (ki, &kw) in k.iter().enumerate() {
                    let sx = (x as i32 + ki as i32 - radius).clamp(0, w - 1);
                    let p = row[sx as usize];
                    for c in 0..4 {
                        acc[c] += kw * p[c];
                    }
                }
                *out = acc;
            }
        });
}

fn vertical_pass(src: &Frame, dst: &mut Frame, k: &[f32]) {
    let radius = (k.len() / 2) as i32;
    let w = src.width() as usize;
    let h = src.height() as i32;
    let src_px = src.pixels();
    dst.pixels_mut()
        .par_chunks_mut(w)
        .enumerate()
        .for_each(|(y, line)| {
            for (x, out) in line.iter_mut().enumerate() {
                let mut acc: Rgba = [0.0; 4];
                for (ki, &kw) in k.iter().enumerate() {
                    let sy = (y as i32 + ki as i32 - radius).clamp(0, h - 1);
                    let p = src_px[sy as usize * w + x];
                    for c in 0..4 {
                        acc[c] += kw * p[c];
                    }
                }
                *out = acc;
            }
        });
}
