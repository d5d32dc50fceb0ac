// ABOUTME: Shared types and configuration for digital-rain.
// ABOUTME: Defines colors, rain and post-process settings, and config file handling.

pub mod color;
pub mod config;
pub mod effects;

pub use color::Color;
pub use config::{Config, ConfigError, Palette, RainSettings, RippleSettings, Tuning};
pub use effects::PostSettings;
