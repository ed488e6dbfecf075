//! TOML configuration for the CLI.
//!
//! ```toml
//! [grid]
//! size = 0.01
//! min_count = 5
//! min_weighted_severity = 10
//!
//! [location]
//! provider = "offline"
//! ```
//!
//! Every key is optional. Without a config file the defaults above apply,
//! except that the provider is chosen automatically.

use std::path::{Path, PathBuf};

use safety_map_spatial::{GridSize, RiskGridAggregator, RiskThresholds, SpatialError};
use serde::Deserialize;
use thiserror::Error;

/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "safety_map.toml";

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not valid TOML or has invalid values.
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Grid settings are out of range.
    #[error(transparent)]
    Spatial(#[from] SpatialError),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub grid: GridConfig,
    pub location: LocationConfig,
}

/// Risk grid settings shared by the overlay and the route planner.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub size: GridSize,
    pub min_count: u32,
    pub min_weighted_severity: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        let thresholds = RiskThresholds::default();
        Self {
            size: GridSize::DEFAULT,
            min_count: thresholds.min_count(),
            min_weighted_severity: thresholds.min_weighted_severity(),
        }
    }
}

impl GridConfig {
    #[must_use]
    pub const fn aggregator(&self) -> RiskGridAggregator {
        RiskGridAggregator::new(self.size)
    }

    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidArgument`] if either threshold is zero.
    pub fn thresholds(&self) -> Result<RiskThresholds, SpatialError> {
        RiskThresholds::new(self.min_count, self.min_weighted_severity)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Service ID from the provider registry. Chosen automatically if unset.
    pub provider: Option<String>,
}

impl AppConfig {
    /// Parses a config document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the TOML is malformed or a value is
    /// out of range.
    pub fn from_toml(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::de::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.grid.thresholds()?;
        Ok(config)
    }

    /// Loads `path`, or [`DEFAULT_CONFIG_PATH`] if it exists.
    ///
    /// An explicitly given path must exist; a missing default file yields
    /// the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = path.map_or_else(
            || (PathBuf::from(DEFAULT_CONFIG_PATH), false),
            |p| (p.to_path_buf(), true),
        );

        if !required && !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_toml(&path, &contents)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(contents: &str) -> Result<AppConfig, ConfigError> {
        AppConfig::from_toml(Path::new("test.toml"), contents)
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.grid.size, GridSize::DEFAULT);
        assert_eq!(config.grid.thresholds().unwrap(), RiskThresholds::default());
        assert!(config.location.provider.is_none());
    }

    #[test]
    fn partial_grid_section() {
        let config = parse(
            r#"
            [grid]
            min_count = 3

            [location]
            provider = "offline"
            "#,
        )
        .unwrap();

        assert_eq!(config.grid.min_count, 3);
        assert_eq!(config.grid.min_weighted_severity, 10);
        assert_eq!(config.location.provider.as_deref(), Some("offline"));
    }

    #[test]
    fn rejects_non_positive_grid_size() {
        assert!(matches!(
            parse("[grid]\nsize = 0.0\n"),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            parse("[grid]\nsize = -0.5\n"),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn rejects_zero_thresholds() {
        assert!(matches!(
            parse("[grid]\nmin_weighted_severity = 0\n"),
            Err(ConfigError::Spatial(_))
        ));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = AppConfig::load(Some(Path::new("/nonexistent/safety_map.toml")));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
