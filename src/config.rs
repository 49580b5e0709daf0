//! Effect and window configuration.
//!
//! Configuration is read from a TOML file with a `[spark]` and a `[window]`
//! table. Every field is optional. Out of range values are never rejected,
//! [`SparkConfig::settings`] clamps them into something drawable.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::graphics::easing::Easing;

/// Color #1E6BFF
pub const DEFAULT_SPARK_COLOR: SparkColor = SparkColor {
    r: 0x1E,
    g: 0x6B,
    b: 0xFF,
    a: 0xFF,
};

pub const MIN_SPARKS_PER_TRIGGER: i64 = 3;
pub const MAX_SPARKS_PER_TRIGGER: i64 = 20;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Straight (non premultiplied) RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SparkColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SparkColor {
    /// Parses `#RGB`, `#RRGGBB` or `#RRGGBBAA`. The leading `#` is optional.
    pub fn parse_hex(value: &str) -> Option<Self> {
        let hex = value.trim().trim_start_matches('#');
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        match hex.len() {
            3 => {
                let short = |i: usize| channel(i..i + 1).map(|v| v * 17);
                Some(Self {
                    r: short(0)?,
                    g: short(1)?,
                    b: short(2)?,
                    a: 0xFF,
                })
            }
            6 => Some(Self {
                r: channel(0..2)?,
                g: channel(2..4)?,
                b: channel(4..6)?,
                a: 0xFF,
            }),
            8 => Some(Self {
                r: channel(0..2)?,
                g: channel(2..4)?,
                b: channel(4..6)?,
                a: channel(6..8)?,
            }),
            _ => None,
        }
    }

    pub fn to_f64_array(self) -> [f64; 4] {
        [
            self.r as f64 / 255.0,
            self.g as f64 / 255.0,
            self.b as f64 / 255.0,
            self.a as f64 / 255.0,
        ]
    }
}

/// Raw spark options as they appear in the config file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SparkConfig {
    pub spark_color: String,
    pub spark_size: f32,
    pub spark_radius: f32,
    pub spark_count: i64,
    /// Lifetime of a spark in milliseconds.
    pub duration: f32,
    pub easing: Easing,
    pub max_sparks: i64,
    /// Use each spark's own randomized size for its line length.
    pub size_jitter: bool,
}

impl Default for SparkConfig {
    fn default() -> Self {
        Self {
            spark_color: "#1E6BFF".to_string(),
            spark_size: 8.0,
            spark_radius: 28.0,
            spark_count: 10,
            duration: 500.0,
            easing: Easing::EaseOut,
            max_sparks: 300,
            size_jitter: false,
        }
    }
}

/// Sanitized spark options consumed by the pool and the render loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SparkSettings {
    pub color: SparkColor,
    pub size: f32,
    pub radius: f32,
    pub count: usize,
    pub duration_ms: f32,
    pub easing: Easing,
    pub max_sparks: usize,
    pub size_jitter: bool,
}

impl Default for SparkSettings {
    fn default() -> Self {
        SparkConfig::default().settings()
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

impl SparkConfig {
    pub fn settings(&self) -> SparkSettings {
        let color = SparkColor::parse_hex(&self.spark_color).unwrap_or_else(|| {
            log::warn!(
                "SparkConfig::settings: invalid spark_color {:?}, using default",
                self.spark_color
            );
            DEFAULT_SPARK_COLOR
        });

        SparkSettings {
            color,
            size: finite_or(self.spark_size, 8.0).max(0.0),
            radius: finite_or(self.spark_radius, 28.0).max(0.0),
            count: self
                .spark_count
                .clamp(MIN_SPARKS_PER_TRIGGER, MAX_SPARKS_PER_TRIGGER) as usize,
            duration_ms: finite_or(self.duration, 500.0).max(0.0),
            easing: self.easing,
            max_sparks: self.max_sparks.max(1) as usize,
            size_jitter: self.size_jitter,
        }
    }
}

/// Host window options for the demo binary.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: f64,
    pub height: f64,
    /// Backdrop drawn underneath the sparks.
    pub background: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Click Spark".to_string(),
            width: 1024.0,
            height: 768.0,
            background: "#000000".to_string(),
        }
    }
}

impl WindowConfig {
    pub fn background_color(&self) -> SparkColor {
        SparkColor::parse_hex(&self.background).unwrap_or_else(|| {
            log::warn!(
                "WindowConfig::background_color: invalid background {:?}, using black",
                self.background
            );
            SparkColor {
                r: 0,
                g: 0,
                b: 0,
                a: 0xFF,
            }
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub spark: SparkConfig,
    pub window: WindowConfig,
}

impl AppConfig {
    pub fn from_toml_str(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents, path)
    }

    /// Loads `path` if it exists, otherwise falls back to the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!(
                "AppConfig::load_or_default: {} not found, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }
        Self::load(path)
    }
}

/// `<config dir>/click_spark/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|mut path| {
        path.push("click_spark/config.toml");
        path
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_hex_colors() {
        assert_eq!(SparkColor::parse_hex("#1E6BFF"), Some(DEFAULT_SPARK_COLOR));
        assert_eq!(
            SparkColor::parse_hex("#fff"),
            Some(SparkColor {
                r: 255,
                g: 255,
                b: 255,
                a: 255
            })
        );
        assert_eq!(
            SparkColor::parse_hex("10203040"),
            Some(SparkColor {
                r: 0x10,
                g: 0x20,
                b: 0x30,
                a: 0x40
            })
        );
        assert_eq!(SparkColor::parse_hex("#12345"), None);
        assert_eq!(SparkColor::parse_hex("#zzzzzz"), None);
        assert_eq!(SparkColor::parse_hex("#ééé"), None);
        assert_eq!(SparkColor::parse_hex("#+12345"), None);
    }

    #[test]
    fn spark_count_is_clamped() {
        let low = SparkConfig {
            spark_count: 1,
            ..Default::default()
        };
        assert_eq!(low.settings().count, 3);

        let high = SparkConfig {
            spark_count: 50,
            ..Default::default()
        };
        assert_eq!(high.settings().count, 20);

        let negative = SparkConfig {
            spark_count: -7,
            ..Default::default()
        };
        assert_eq!(negative.settings().count, 3);
    }

    #[test]
    fn invalid_values_are_guarded() {
        let config = SparkConfig {
            spark_color: "blue-ish".to_string(),
            spark_size: f32::NAN,
            spark_radius: -4.0,
            duration: -100.0,
            max_sparks: 0,
            ..Default::default()
        };
        let settings = config.settings();
        assert_eq!(settings.color, DEFAULT_SPARK_COLOR);
        assert_eq!(settings.size, 8.0);
        assert_eq!(settings.radius, 0.0);
        assert_eq!(settings.duration_ms, 0.0);
        assert_eq!(settings.max_sparks, 1);
    }

    #[test]
    fn non_finite_duration_uses_default_lifetime() {
        for duration in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let config = SparkConfig {
                duration,
                ..Default::default()
            };
            assert_eq!(config.settings().duration_ms, 500.0, "duration {duration}");
        }
    }

    #[test]
    fn parse_partial_toml() {
        let toml_str = r##"
[spark]
spark_color = "#ff0000"
spark_count = 12
duration = 520
easing = "ease-in-out"
max_sparks = 400

[window]
width = 640
"##;
        let config = AppConfig::from_toml_str(toml_str, Path::new("inline.toml")).unwrap();
        assert_eq!(config.spark.spark_count, 12);
        assert_eq!(config.spark.duration, 520.0);
        assert_eq!(config.spark.easing, Easing::EaseInOut);
        assert_eq!(config.spark.max_sparks, 400);
        // untouched fields keep their defaults
        assert_eq!(config.spark.spark_size, 8.0);
        assert_eq!(config.window.width, 640.0);
        assert_eq!(config.window.title, "Click Spark");
    }

    #[test]
    fn unknown_easing_is_a_parse_error() {
        let result = AppConfig::from_toml_str(
            "[spark]\neasing = \"bounce\"\n",
            Path::new("bad.toml"),
        );
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn load_or_default_reads_file_and_tolerates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert_eq!(AppConfig::load_or_default(&missing).unwrap(), AppConfig::default());

        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[spark]\nspark_radius = 40.0").unwrap();
        let config = AppConfig::load_or_default(&path).unwrap();
        assert_eq!(config.spark.spark_radius, 40.0);
    }
}
