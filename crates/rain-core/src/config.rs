// ABOUTME: Application configuration handling.
// ABOUTME: Rain, palette, tuning and ripple settings, validation, and TOML load/save.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{Color, PostSettings};

/// Upper bound on depth layers the compositor will evaluate
pub const MAX_DEPTH_LAYERS: u32 = 8;

/// Upper bound on raindrop streams per column
pub const MAX_STREAMS: u32 = 4;

/// Upper bound on the column count
pub const MAX_COLUMNS: u32 = 1024;

/// Smallest layer scale (`1 - d * depth_scale`) the farthest layer may reach
pub const MIN_LAYER_SCALE: f32 = 0.1;

/// Half-width katakana, digits and a few symbols
pub const DEFAULT_CHARACTER_SET: &str =
    "ｦｱｳｴｵｶｷｹｺｻｼｽｾｿﾀﾂﾃﾅﾆﾇﾈﾊﾋﾎﾏﾐﾑﾒﾓﾔﾕﾗﾘﾜ0123456789Z:.\"=*+-<>¦ç";

/// Simulation and grid settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RainSettings {
    /// Number of glyph columns across the viewport
    pub columns: u32,

    /// Rows per second a stream travels (before per-stream jitter)
    pub fall_speed: f32,

    /// Glyph changes per second for a fully bright cell
    pub cycle_speed: f32,

    /// Mean raindrop length in rows
    pub trail_length: f32,

    /// Lean of the columns in degrees (0 = vertical)
    pub slant_degrees: f32,

    /// Number of depth layers (1 = flat)
    pub depth_layers: u32,

    /// Alpha lost per layer of depth (0.0 - 1.0)
    pub depth_fade: f32,

    /// Glyph scale lost per layer of depth
    pub depth_scale: f32,

    /// Column offset added per layer of depth, in layer cells
    pub parallax_offset: f32,

    /// Fewest streams a column may own
    pub min_streams: u32,

    /// Most streams a column may own
    pub max_streams: u32,

    /// Characters rasterized into the glyph atlas
    pub character_set: String,

    /// Atlas cell edge in pixels
    pub glyph_cell_px: u32,

    /// Atlas cells per row; capacity is the square of this
    pub atlas_cells_per_row: u32,

    /// Optional TTF/OTF font; procedural glyphs are used when unset
    pub font_path: Option<PathBuf>,
}

impl Default for RainSettings {
    fn default() -> Self {
        Self {
            columns: 64,
            fall_speed: 6.0,
            cycle_speed: 2.5,
            trail_length: 14.0,
            slant_degrees: 0.0,
            depth_layers: 3,
            depth_fade: 0.3,
            depth_scale: 0.25,
            parallax_offset: 0.5,
            min_streams: 2,
            max_streams: 3,
            character_set: DEFAULT_CHARACTER_SET.to_string(),
            glyph_cell_px: 32,
            atlas_cells_per_row: 8,
            font_path: None,
        }
    }
}

/// Colors for the rain and its background
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub name: String,
    /// Bright end of a trail
    pub primary: Color,
    /// Dim end of a trail
    pub secondary: Color,
    /// Leading character of a drop
    pub cursor: Color,
    /// Rare sparkle flash
    pub glint: Color,
    /// Clear color behind every layer; alpha < 1 leaves the frame translucent
    pub background: Color,
}

impl Palette {
    pub fn classic() -> Self {
        Self {
            name: "Classic".to_string(),
            primary: Color::MATRIX_GREEN,
            secondary: Color::DEEP_GREEN,
            cursor: Color::MINT,
            glint: Color::WHITE,
            background: Color::rgb(0.0, 0.02, 0.0),
        }
    }

    pub fn amber() -> Self {
        Self {
            name: "Amber".to_string(),
            primary: Color::AMBER,
            secondary: Color::rgb(0.3, 0.12, 0.0),
            cursor: Color::rgb(1.0, 0.92, 0.7),
            glint: Color::WHITE,
            background: Color::rgb(0.03, 0.01, 0.0),
        }
    }

    pub fn ice() -> Self {
        Self {
            name: "Ice".to_string(),
            primary: Color::rgb(0.35, 0.8, 1.0),
            secondary: Color::rgb(0.02, 0.1, 0.25),
            cursor: Color::rgb(0.9, 0.97, 1.0),
            glint: Color::WHITE,
            background: Color::rgb(0.0, 0.01, 0.03),
        }
    }

    pub fn presets() -> Vec<Palette> {
        vec![Self::classic(), Self::amber(), Self::ice()]
    }

    /// Look up a preset by case-insensitive name
    pub fn preset(name: &str) -> Option<Palette> {
        Self::presets()
            .into_iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::classic()
    }
}

/// Cosmetic constants of the field model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Exponential trail falloff coefficient
    pub falloff: f32,

    /// Fraction of a stream's period lit as the cursor
    pub cursor_window: f32,

    /// Where inside the cursor window the smoothstep starts (0 = soft, close to 1 = hard)
    pub cursor_sharpness: f32,

    /// Chance a cell inside the glint window flashes during one time bucket
    pub glint_probability: f32,

    /// Glint time buckets per second
    pub glint_rate: f32,

    /// Start of the glint window, as a fraction of the drop
    pub glint_start: f32,

    /// End of the glint window, as a fraction of the drop
    pub glint_end: f32,

    /// Minimum brightness a lit drop cell never falls below
    pub brightness_floor: f32,

    /// Stream period = length * period_scale + period_offset
    pub period_scale: f32,

    pub period_offset: f32,

    /// Intensity multiplier between consecutive streams of a column
    pub stream_falloff: f32,

    /// Relative spread of stream speeds around the fall speed (< 2)
    pub speed_jitter: f32,

    /// Relative spread of stream lengths around the trail length (< 2)
    pub length_jitter: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            falloff: 4.0,
            cursor_window: 0.04,
            cursor_sharpness: 0.6,
            glint_probability: 0.03,
            glint_rate: 8.0,
            glint_start: 0.08,
            glint_end: 0.35,
            brightness_floor: 0.0,
            period_scale: 2.5,
            period_offset: 5.0,
            stream_falloff: 0.7,
            speed_jitter: 0.6,
            length_jitter: 0.5,
        }
    }
}

/// Pointer ripple behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RippleSettings {
    /// Strength of a freshly spawned ripple (0.0 - 1.0)
    pub strength: f32,

    /// Per-frame strength multiplier (0.0 - 1.0, exclusive)
    pub decay: f32,

    /// Strength below which the ripple is dropped
    pub epsilon: f32,

    /// Ring expansion in normalized units per second
    pub speed: f32,

    /// Ring thickness in normalized units
    pub width: f32,
}

impl Default for RippleSettings {
    fn default() -> Self {
        Self {
            strength: 1.0,
            decay: 0.96,
            epsilon: 0.01,
            speed: 0.6,
            width: 0.025,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Simulation and grid settings
    pub rain: RainSettings,

    /// Colors
    pub palette: Palette,

    /// Field model constants
    pub tuning: Tuning,

    /// Pointer ripple
    pub ripple: RippleSettings,

    /// Post-processing stack
    pub post: PostSettings,

    /// Fraction of the device resolution the frame is rendered at
    pub render_scale: f32,

    /// Frame time above which a warning is logged
    pub frame_budget_ms: f32,

    /// Window dimensions
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rain: RainSettings::default(),
            palette: Palette::default(),
            tuning: Tuning::default(),
            ripple: RippleSettings::default(),
            post: PostSettings::default(),
            render_scale: 0.5,
            frame_budget_ms: 16.0,
            window_width: 1280,
            window_height: 720,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn ensure(ok: bool, field: &'static str, reason: impl Into<String>) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: reason.into(),
        })
    }
}

fn positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

fn unit(value: f32) -> bool {
    (0.0..=1.0).contains(&value)
}

impl Config {
    /// Get the default config file path (~/.config/digital-rain/config.toml)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("digital-rain").join("config.toml"))
    }

    /// Load and validate config from a path
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate config from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load config from default path, or return default config if not found
    pub fn load_or_default() -> Self {
        Self::default_path()
            .and_then(|path| Self::load(&path).ok())
            .unwrap_or_default()
    }

    /// Save config to a path
    pub fn save(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Save config to default path
    pub fn save_to_default(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::default_path().ok_or_else(|| {
            ConfigError::ReadError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config directory",
            ))
        })?;
        self.save(&path)?;
        Ok(path)
    }

    /// Reject every bound the renderer relies on. Nothing past this point
    /// divides by a value that is not checked here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rain = &self.rain;
        ensure(
            (1..=MAX_COLUMNS).contains(&rain.columns),
            "rain.columns",
            format!("must be between 1 and {MAX_COLUMNS}"),
        )?;
        ensure(positive(rain.fall_speed), "rain.fall_speed", "must be > 0")?;
        ensure(
            rain.cycle_speed.is_finite() && rain.cycle_speed >= 0.0,
            "rain.cycle_speed",
            "must be >= 0",
        )?;
        ensure(positive(rain.trail_length), "rain.trail_length", "must be > 0")?;
        ensure(
            rain.slant_degrees.abs() < 60.0,
            "rain.slant_degrees",
            "must be within (-60, 60)",
        )?;
        ensure(
            (1..=MAX_DEPTH_LAYERS).contains(&rain.depth_layers),
            "rain.depth_layers",
            format!("must be between 1 and {MAX_DEPTH_LAYERS}"),
        )?;
        ensure(unit(rain.depth_fade), "rain.depth_fade", "must be within [0, 1]")?;
        ensure(
            rain.depth_scale.is_finite() && rain.depth_scale >= 0.0,
            "rain.depth_scale",
            "must be >= 0",
        )?;
        let farthest = 1.0 - (rain.depth_layers - 1) as f32 * rain.depth_scale;
        ensure(
            farthest >= MIN_LAYER_SCALE,
            "rain.depth_scale",
            format!("farthest layer scale {farthest:.3} is below {MIN_LAYER_SCALE}"),
        )?;
        ensure(
            rain.parallax_offset.is_finite(),
            "rain.parallax_offset",
            "must be finite",
        )?;
        ensure(
            rain.min_streams >= 1 && rain.min_streams <= rain.max_streams,
            "rain.min_streams",
            "must be >= 1 and <= max_streams",
        )?;
        ensure(
            rain.max_streams <= MAX_STREAMS,
            "rain.max_streams",
            format!("must be <= {MAX_STREAMS}"),
        )?;
        ensure(
            !rain.character_set.is_empty(),
            "rain.character_set",
            "must contain at least one character",
        )?;
        ensure(
            (4..=256).contains(&rain.glyph_cell_px),
            "rain.glyph_cell_px",
            "must be between 4 and 256",
        )?;
        ensure(
            (1..=32).contains(&rain.atlas_cells_per_row),
            "rain.atlas_cells_per_row",
            "must be between 1 and 32",
        )?;

        let t = &self.tuning;
        ensure(positive(t.falloff), "tuning.falloff", "must be > 0")?;
        ensure(
            t.cursor_window > 0.0 && t.cursor_window < 1.0,
            "tuning.cursor_window",
            "must be within (0, 1)",
        )?;
        ensure(
            (0.0..1.0).contains(&t.cursor_sharpness),
            "tuning.cursor_sharpness",
            "must be within [0, 1)",
        )?;
        ensure(
            unit(t.glint_probability),
            "tuning.glint_probability",
            "must be within [0, 1]",
        )?;
        ensure(positive(t.glint_rate), "tuning.glint_rate", "must be > 0")?;
        ensure(
            t.glint_start >= 0.0 && t.glint_start < t.glint_end && t.glint_end <= 1.0,
            "tuning.glint_start",
            "glint window must satisfy 0 <= start < end <= 1",
        )?;
        ensure(
            unit(t.brightness_floor),
            "tuning.brightness_floor",
            "must be within [0, 1]",
        )?;
        ensure(positive(t.period_scale), "tuning.period_scale", "must be > 0")?;
        ensure(
            t.period_offset.is_finite() && t.period_offset >= 0.0,
            "tuning.period_offset",
            "must be >= 0",
        )?;
        ensure(
            t.stream_falloff > 0.0 && t.stream_falloff <= 1.0,
            "tuning.stream_falloff",
            "must be within (0, 1]",
        )?;
        ensure(
            (0.0..2.0).contains(&t.speed_jitter),
            "tuning.speed_jitter",
            "must be within [0, 2)",
        )?;
        ensure(
            (0.0..2.0).contains(&t.length_jitter),
            "tuning.length_jitter",
            "must be within [0, 2)",
        )?;

        let r = &self.ripple;
        ensure(unit(r.strength), "ripple.strength", "must be within [0, 1]")?;
        ensure(
            r.decay > 0.0 && r.decay < 1.0,
            "ripple.decay",
            "must be within (0, 1)",
        )?;
        ensure(positive(r.epsilon), "ripple.epsilon", "must be > 0")?;
        ensure(
            r.speed.is_finite() && r.speed >= 0.0,
            "ripple.speed",
            "must be >= 0",
        )?;
        ensure(positive(r.width), "ripple.width", "must be > 0")?;

        let p = &self.post;
        ensure(
            p.bloom_strength.is_finite() && p.bloom_strength >= 0.0,
            "post.bloom_strength",
            "must be >= 0",
        )?;
        ensure(
            p.bloom_radius.is_finite() && (0.0..=64.0).contains(&p.bloom_radius),
            "post.bloom_radius",
            "must be within [0, 64]",
        )?;
        ensure(
            (0.0..1.0).contains(&p.bloom_threshold),
            "post.bloom_threshold",
            "must be within [0, 1)",
        )?;
        ensure(
            p.bloom_passes <= 8,
            "post.bloom_passes",
            "must be <= 8",
        )?;
        ensure(
            (0.0..0.1).contains(&p.chromatic_aberration),
            "post.chromatic_aberration",
            "must be within [0, 0.1)",
        )?;
        ensure(
            unit(p.vignette_intensity),
            "post.vignette_intensity",
            "must be within [0, 1]",
        )?;
        ensure(
            unit(p.dither_magnitude),
            "post.dither_magnitude",
            "must be within [0, 1]",
        )?;
        ensure(
            unit(p.scanline_intensity),
            "post.scanline_intensity",
            "must be within [0, 1]",
        )?;
        ensure(
            positive(p.scanline_period),
            "post.scanline_period",
            "must be > 0",
        )?;

        ensure(
            self.render_scale >= 0.1 && self.render_scale <= 1.0,
            "render_scale",
            "must be within [0.1, 1]",
        )?;
        ensure(
            positive(self.frame_budget_ms),
            "frame_budget_ms",
            "must be > 0",
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid_field(config: &Config) -> &'static str {
        match config.validate() {
            Err(ConfigError::Invalid { field, .. }) => field,
            other => panic!("expected invalid config, got {other:?}"),
        }
    }

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().unwrap();
        for palette in Palette::presets() {
            let config = Config {
                palette,
                ..Config::default()
            };
            config.validate().unwrap();
        }
    }

    #[test]
    fn rejects_non_positive_speeds() {
        let mut config = Config::default();
        config.rain.fall_speed = 0.0;
        assert_eq!(invalid_field(&config), "rain.fall_speed");

        let mut config = Config::default();
        config.rain.trail_length = -1.0;
        assert_eq!(invalid_field(&config), "rain.trail_length");

        let mut config = Config::default();
        config.rain.fall_speed = f32::NAN;
        assert_eq!(invalid_field(&config), "rain.fall_speed");
    }

    #[test]
    fn rejects_empty_character_set() {
        let mut config = Config::default();
        config.rain.character_set.clear();
        assert_eq!(invalid_field(&config), "rain.character_set");
    }

    #[test]
    fn rejects_zero_depth_layers() {
        let mut config = Config::default();
        config.rain.depth_layers = 0;
        assert_eq!(invalid_field(&config), "rain.depth_layers");
    }

    #[test]
    fn rejects_collapsing_layer_scale() {
        let mut config = Config::default();
        config.rain.depth_layers = 5;
        config.rain.depth_scale = 0.3;
        assert_eq!(invalid_field(&config), "rain.depth_scale");
    }

    #[test]
    fn rejects_bad_stream_bounds() {
        let mut config = Config::default();
        config.rain.min_streams = 3;
        config.rain.max_streams = 2;
        assert_eq!(invalid_field(&config), "rain.min_streams");

        let mut config = Config::default();
        config.rain.max_streams = MAX_STREAMS + 1;
        assert_eq!(invalid_field(&config), "rain.max_streams");
    }

    #[test]
    fn rejects_fade_outside_unit_range() {
        let mut config = Config::default();
        config.rain.depth_fade = 1.5;
        assert_eq!(invalid_field(&config), "rain.depth_fade");
    }

    #[test]
    fn toml_round_trip_preserves_settings() {
        let mut config = Config::default();
        config.rain.columns = 90;
        config.palette = Palette::amber();
        config.post.scanline_intensity = 0.3;

        let text = config.to_toml().unwrap();
        let parsed = Config::from_toml(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let parsed = Config::from_toml("[rain]\ncolumns = 20\n").unwrap();
        assert_eq!(parsed.rain.columns, 20);
        assert_eq!(parsed.rain.fall_speed, RainSettings::default().fall_speed);
        assert_eq!(parsed.post, PostSettings::default());
    }

    #[test]
    fn invalid_toml_values_are_rejected_on_load() {
        let err = Config::from_toml("[rain]\ndepth_layers = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "rain.depth_layers", .. }));
    }

    #[test]
    fn palette_lookup_ignores_case() {
        assert_eq!(Palette::preset("AMBER").unwrap().name, "Amber");
        assert!(Palette::preset("plaid").is_none());
    }

    #[test]
    fn palette_colors_accept_hex_strings() {
        let text = "[palette]\nprimary = \"#ff8000\"\nbackground = { r = 0.0, g = 0.0, b = 0.1 }\n";
        let parsed = Config::from_toml(text).unwrap();
        assert_eq!(parsed.palette.primary, Color::rgb(1.0, 128.0 / 255.0, 0.0));
        assert_eq!(parsed.palette.background, Color::rgb(0.0, 0.0, 0.1));
        assert_eq!(parsed.palette.secondary, Palette::default().secondary);
    }

    #[test]
    fn malformed_hex_color_is_a_parse_error() {
        let err = Config::from_toml("[palette]\nprimary = \"#12345\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
        assert!(err.to_string().contains("#12345"));
    }
}
