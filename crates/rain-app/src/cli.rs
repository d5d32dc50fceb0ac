// ABOUTME: Command line options and configuration assembly.
// ABOUTME: Merges the config file with palette and column overrides from the command line.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use rain_core::{Config, Palette, PostSettings};

#[derive(Debug, Clone, Parser)]
#[command(name = "digital-rain", version, about = "Procedural digital rain")]
pub struct Args {
    /// Config file (defaults to ~/.config/digital-rain/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Color preset: classic, amber or ice
    #[arg(long, value_name = "NAME")]
    pub palette: Option<String>,

    /// Post-processing preset: default, retro or off
    #[arg(long, value_name = "NAME")]
    pub post: Option<String>,

    /// Number of rain columns across the window
    #[arg(long, value_name = "N")]
    pub columns: Option<u32>,

    /// Render one frame to a PNG instead of opening a window
    #[arg(long, value_name = "PNG")]
    pub snapshot: Option<PathBuf>,

    /// Animation time of the snapshot, in seconds
    #[arg(long, default_value_t = 10.0)]
    pub time: f64,

    /// Snapshot width in pixels (defaults to the configured window width)
    #[arg(long)]
    pub width: Option<u32>,

    /// Snapshot height in pixels (defaults to the configured window height)
    #[arg(long)]
    pub height: Option<u32>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,

    /// Write the effective configuration to the default path and exit
    #[arg(long)]
    pub save_config: bool,
}

impl Args {
    /// Load the config file, then apply command line overrides
    pub fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => Config::load_or_default(),
        };
        self.apply_overrides(&mut config)?;
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut Config) -> Result<()> {
        if let Some(name) = &self.palette {
            config.palette = Palette::preset(name).ok_or_else(|| {
                let known: Vec<String> = Palette::presets().into_iter().map(|p| p.name).collect();
                anyhow!("Unknown palette '{}', expected one of: {}", name, known.join(", "))
            })?;
        }
        if let Some(name) = &self.post {
            config.post = PostSettings::preset(name).ok_or_else(|| {
                anyhow!(
                    "Unknown post preset '{}', expected one of: {}",
                    name,
                    PostSettings::PRESETS.join(", ")
                )
            })?;
        }
        if let Some(columns) = self.columns {
            config.rain.columns = columns;
        }
        config.validate().context("Invalid configuration")?;
        Ok(())
    }

    /// Snapshot size, falling back to the configured window size
    pub fn snapshot_size(&self, config: &Config) -> (u32, u32) {
        (
            self.width.unwrap_or(config.window_width),
            self.height.unwrap_or(config.window_height),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::parse_from(std::iter::once("digital-rain").chain(args.iter().copied()))
    }

    #[test]
    fn defaults() {
        let args = parse(&[]);
        assert!(args.config.is_none());
        assert!(args.snapshot.is_none());
        assert_eq!(args.time, 10.0);
        assert!(!args.print_config);
    }

    #[test]
    fn overrides_replace_palette_and_columns() {
        let args = parse(&["--palette", "AMBER", "--columns", "120"]);
        let mut config = Config::default();
        args.apply_overrides(&mut config).unwrap();
        assert_eq!(config.palette.name, "Amber");
        assert_eq!(config.rain.columns, 120);
    }

    #[test]
    fn post_preset_override() {
        let args = parse(&["--post", "retro"]);
        let mut config = Config::default();
        args.apply_overrides(&mut config).unwrap();
        assert_eq!(config.post, PostSettings::retro());

        let args = parse(&["--post", "glow"]);
        let err = args.apply_overrides(&mut Config::default()).unwrap_err();
        assert!(err.to_string().contains("glow"));
    }

    #[test]
    fn unknown_palette_is_rejected() {
        let args = parse(&["--palette", "purple"]);
        let err = args.apply_overrides(&mut Config::default()).unwrap_err();
        assert!(err.to_string().contains("purple"));
    }

    #[test]
    fn invalid_column_override_is_rejected() {
        let args = parse(&["--columns", "0"]);
        assert!(args.apply_overrides(&mut Config::default()).is_err());
    }

    #[test]
    fn snapshot_size_falls_back_to_window() {
        let config = Config::default();
        let args = parse(&["--snapshot", "out.png", "--width", "320"]);
        assert_eq!(args.snapshot_size(&config), (320, config.window_height));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let args = parse(&["--config", "/nonexistent/digital-rain.toml"]);
        assert!(args.load_config().is_err());
    }
}
