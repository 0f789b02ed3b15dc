use crate::columns::UnitStyle;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path, time::Duration};
use thiserror::Error;

pub const DEFAULT_HISTORY_SIZE: u64 = 8;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 3600;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub shape: ShapeConfig,
    pub live: LiveConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeConfig {
    // Quantiles requested on top of min/mean/max, e.g. ["25", "99.9"].
    pub percentiles: Vec<String>,
    pub unit_style: UnitStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    // Seconds between polls.
    pub update_period: u64,
    // Buckets of history the appliance keeps per live response.
    pub history_size: u64,
    // Rows to write before stopping. None polls until interrupted.
    pub iterations: Option<u64>,
    // Passed through to the transport, in seconds.
    pub request_timeout: u64,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            update_period: 1,
            history_size: DEFAULT_HISTORY_SIZE,
            iterations: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("update_period must be greater than zero")]
    UpdatePeriodError,
    #[error("history_size must be greater than zero")]
    HistorySizeError,
    #[error("request_timeout must be greater than zero")]
    RequestTimeoutError,
    #[error("invalid percentile {0:?}")]
    PercentileError(String),
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shape.validate()?;
        self.live.validate()
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("error opening config file {}", path.display()))?;
        let config: Config = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("error parsing config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }
}

impl ShapeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for percentile in &self.percentiles {
            match percentile.parse::<f64>() {
                Ok(p) if (0.0..=100.0).contains(&p) => {}
                _ => return Err(ConfigError::PercentileError(percentile.clone())),
            }
        }
        Ok(())
    }

    /// Splits a comma separated list such as `"25,50"`.
    pub fn parse_percentiles(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl LiveConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.update_period == 0 {
            return Err(ConfigError::UpdatePeriodError);
        }
        if self.history_size == 0 {
            return Err(ConfigError::HistorySizeError);
        }
        if self.request_timeout == 0 {
            return Err(ConfigError::RequestTimeoutError);
        }
        Ok(())
    }

    pub fn update_period(&self) -> Duration {
        Duration::from_secs(self.update_period)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

#[cfg(test)]
pub mod tests {
    use std::io::Write;

    use super::{Config, ConfigError, LiveConfig, ShapeConfig};
    use crate::columns::UnitStyle;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.live.history_size, 8);
        assert_eq!(config.live.request_timeout().as_secs(), 3600);
    }

    #[test]
    fn test_live_config_validation() {
        let live = LiveConfig {
            update_period: 0,
            ..Default::default()
        };
        assert_eq!(live.validate(), Err(ConfigError::UpdatePeriodError));

        let live = LiveConfig {
            history_size: 0,
            ..Default::default()
        };
        assert_eq!(live.validate(), Err(ConfigError::HistorySizeError));

        let live = LiveConfig {
            request_timeout: 0,
            ..Default::default()
        };
        assert_eq!(live.validate(), Err(ConfigError::RequestTimeoutError));
    }

    #[test]
    fn test_percentile_validation() {
        let shape = ShapeConfig {
            percentiles: ShapeConfig::parse_percentiles("25, 99.9,,"),
            ..Default::default()
        };
        assert_eq!(shape.percentiles, vec!["25", "99.9"]);
        assert_eq!(shape.validate(), Ok(()));

        let shape = ShapeConfig {
            percentiles: vec!["p50".to_string()],
            ..Default::default()
        };
        assert_eq!(
            shape.validate(),
            Err(ConfigError::PercentileError("p50".to_string()))
        );
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"shape": {{"percentiles": ["50"], "unit_style": "friendly"}},
                "live": {{"update_period": 5, "iterations": 10}}}}"#
        )
        .unwrap();

        let config = Config::from_json_file(file.path()).unwrap();
        assert_eq!(config.shape.percentiles, vec!["50"]);
        assert_eq!(config.shape.unit_style, UnitStyle::Friendly);
        assert_eq!(config.live.update_period, 5);
        assert_eq!(config.live.iterations, Some(10));
        assert_eq!(config.live.history_size, 8);
    }

    #[test]
    fn test_from_json_file_rejects_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"live": {{"history_size": 0}}}}"#).unwrap();
        assert!(Config::from_json_file(file.path()).is_err());
    }
}
