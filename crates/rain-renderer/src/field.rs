// ABOUTME: Deterministic rain field model.
// ABOUTME: Computes per-cell brightness, cursor, glint and glyph from a traveling sawtooth wave.

use std::sync::Arc;

use rain_core::{RainSettings, Tuning};

use crate::hash::{key, Seed};

/// Hash inputs reserved per stream (speed, length, phase, spare)
const STREAM_STRIDE: u32 = 4;
const Q_SPEED: u32 = 0;
const Q_LENGTH: u32 = 1;
const Q_PHASE: u32 = 2;

const SALT_STREAM_COUNT: u32 = 0x5354_524d;
const SALT_GLYPH: u32 = 0x474c_5950;
const SALT_CYCLE: u32 = 0x4359_434c;
const SALT_GLINT: u32 = 0x474c_4e54;

/// One raindrop sequence of a column
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stream {
    /// Rows per second
    pub speed: f32,
    /// Lit span in rows
    pub length: f32,
    /// Offset in rows
    pub phase: f32,
    /// Rows between consecutive drops of this stream
    pub period: f32,
    /// Weight applied when streams are combined
    pub intensity: f32,
}

impl Stream {
    /// Position of `row` on the traveling sawtooth, in `[0, 1)`
    #[inline]
    pub fn saw(&self, row: f32, time: f32) -> f32 {
        fract((row + time * self.speed + self.phase) / self.period)
    }

    /// Fraction of the period covered by the drop
    #[inline]
    pub fn drop_end(&self) -> f32 {
        (self.length / self.period).min(1.0)
    }

    /// Seconds until the wave repeats
    pub fn time_period(&self) -> f32 {
        self.period / self.speed
    }
}

/// Raw contribution of a single stream, before intensity weighting
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StreamSample {
    pub brightness: f32,
    pub cursor: f32,
    pub glint: f32,
}

/// Result of evaluating one cell
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CellSample {
    /// Trail brightness in [0, 1]
    pub brightness: f32,
    /// Head highlight in [0, 1]
    pub cursor: f32,
    /// Sparkle flash in [0, 1]
    pub glint: f32,
    /// Atlas glyph index, always < glyph count
    pub glyph: u32,
}

/// The simulation. Holds only immutable parameters: every query is a pure
/// function of (column, row, time, layer).
///
/// Rows are counted from the bottom of the grid. The wave front moves toward
/// row 0, so drops fall down the screen with their trail above the head.
#[derive(Clone)]
pub struct FieldModel {
    fall_speed: f32,
    trail_length: f32,
    cycle_speed: f32,
    min_streams: u32,
    max_streams: u32,
    tuning: Tuning,
    glyph_count: u32,
    seed: Arc<dyn Seed>,
}

impl FieldModel {
    pub fn new(rain: &RainSettings, tuning: &Tuning, glyph_count: u32, seed: Arc<dyn Seed>) -> Self {
        Self {
            fall_speed: rain.fall_speed,
            trail_length: rain.trail_length,
            cycle_speed: rain.cycle_speed,
            min_streams: rain.min_streams.max(1),
            max_streams: rain.max_streams.max(rain.min_streams.max(1)),
            tuning: tuning.clone(),
            glyph_count: glyph_count.max(1),
            seed,
        }
    }

    pub fn glyph_count(&self) -> u32 {
        self.glyph_count
    }

    #[inline]
    fn layer_key(layer: u32) -> u32 {
        layer.wrapping_mul(0x9e37_79b9)
    }

    /// Number of streams owned by a column on a layer
    pub fn stream_count(&self, column: i32, layer: u32) -> u32 {
        let spread = self.max_streams - self.min_streams;
        if spread == 0 {
            return self.min_streams;
        }
        let s = self
            .seed
            .seed(key(column), SALT_STREAM_COUNT, Self::layer_key(layer));
        (self.min_streams + (s * (spread + 1) as f32) as u32).min(self.max_streams)
    }

    /// Parameters of stream `index` of a column. Each quantity draws from its
    /// own hash input so speed, length and phase are uncorrelated, and
    /// distinct stream indices never share a phase seed.
    pub fn stream(&self, column: i32, index: u32, layer: u32) -> Stream {
        let lk = Self::layer_key(layer);
        let s = |q: u32| self.seed.seed(key(column), index * STREAM_STRIDE + q, lk);

        let t = &self.tuning;
        let speed = self.fall_speed * (1.0 + t.speed_jitter * (s(Q_SPEED) - 0.5));
        let length = self.trail_length * (1.0 + t.length_jitter * (s(Q_LENGTH) - 0.5));
        let period = length * t.period_scale + t.period_offset;
        Stream {
            speed,
            length,
            phase: s(Q_PHASE) * period,
            period,
            intensity: t.stream_falloff.powi(index as i32),
        }
    }

    pub fn streams(&self, column: i32, layer: u32) -> impl Iterator<Item = Stream> + '_ {
        (0..self.stream_count(column, layer)).map(move |i| self.stream(column, i, layer))
    }

    /// Unweighted contribution of one stream to a cell
    pub fn sample_stream(
        &self,
        stream: &Stream,
        column: i32,
        row: i32,
        time: f32,
        layer: u32,
    ) -> StreamSample {
        let t = &self.tuning;
        let saw = stream.saw(row as f32, time);
        let drop_end = stream.drop_end();
        if saw >= drop_end {
            return StreamSample::default();
        }

        let along = saw / drop_end;
        let brightness = (-t.falloff * along).exp().max(t.brightness_floor);
        let cursor = 1.0 - smoothstep(t.cursor_window * t.cursor_sharpness, t.cursor_window, saw);

        let glint = if along >= t.glint_start && along <= t.glint_end {
            let bucket_time = time * t.glint_rate;
            let bucket = bucket_time.floor() as i64 as u32;
            let roll = self.seed.seed(
                key(column),
                key(row),
                bucket ^ SALT_GLINT ^ Self::layer_key(layer),
            );
            if roll < t.glint_probability {
                // Flash at the start of the bucket and fade out across it
                1.0 - fract(bucket_time)
            } else {
                0.0
            }
        } else {
            0.0
        };

        StreamSample {
            brightness: brightness.clamp(0.0, 1.0),
            cursor: cursor.clamp(0.0, 1.0),
            glint: glint.clamp(0.0, 1.0),
        }
    }

    /// Per-stream samples of a cell, in stream order
    pub fn stream_samples(
        &self,
        column: i32,
        row: i32,
        time: f32,
        layer: u32,
    ) -> impl Iterator<Item = StreamSample> + '_ {
        self.streams(column, layer)
            .map(move |s| self.sample_stream(&s, column, row, time, layer))
    }

    /// Evaluate a cell with the column's derived streams
    pub fn evaluate(&self, column: i32, row: i32, time: f32, layer: u32) -> CellSample {
        self.evaluate_streams(self.streams(column, layer), column, row, time, layer)
    }

    /// Evaluate a cell against explicit streams. Streams overlay with `max`
    /// so coinciding drops never saturate.
    pub fn evaluate_streams(
        &self,
        streams: impl IntoIterator<Item = Stream>,
        column: i32,
        row: i32,
        time: f32,
        layer: u32,
    ) -> CellSample {
        let mut brightness = 0.0f32;
        let mut cursor = 0.0f32;
        let mut glint = 0.0f32;
        for stream in streams {
            let s = self.sample_stream(&stream, column, row, time, layer);
            brightness = brightness.max(s.brightness * stream.intensity);
            cursor = cursor.max(s.cursor * stream.intensity);
            glint = glint.max(s.glint * stream.intensity);
        }
        let brightness = brightness.clamp(0.0, 1.0);

        CellSample {
            brightness,
            cursor: cursor.clamp(0.0, 1.0),
            glint: glint.clamp(0.0, 1.0),
            glyph: self.glyph(column, row, time, layer, brightness),
        }
    }

    /// Glyph churn scales with brightness and is staggered per cell
    fn glyph(&self, column: i32, row: i32, time: f32, layer: u32, brightness: f32) -> u32 {
        let lk = Self::layer_key(layer);
        let count = self.glyph_count as f32;
        let base = self.seed.seed(key(column), key(row), SALT_GLYPH ^ lk);
        let offset = self.seed.seed(key(column), key(row), SALT_CYCLE ^ lk) * count;
        let churn = time * self.cycle_speed * (0.3 + 0.7 * brightness);
        let index = (base * count + churn + offset).rem_euclid(count);
        if index.is_finite() {
            (index as u32).min(self.glyph_count - 1)
        } else {
            0
        }
    }
}

/// GLSL-style fract, never returning 1.0
#[inline]
pub(crate) fn fract(x: f32) -> f32 {
    let f = x - x.floor();
    if f >= 1.0 {
        0.0
    } else {
        f
    }
}

#[inline]
pub(crate) fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
