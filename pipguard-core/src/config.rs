//! Engine configuration, loaded from TOML.
//!
//! Every section has defaults, so an empty file is a valid configuration.
//! Durations are stored in whole seconds to keep the TOML readable.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::recovery::profit::ProfitTargetConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Complete engine configuration: analyzer windows, lot sizing, recovery target.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub analyzer: AnalyzerConfig,
    pub lots: LotConfig,
    pub recovery: RecoveryConfig,
}

impl EngineConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.analyzer.validate()?;
        self.lots.validate()?;
        Ok(())
    }

    /// Content hash of the configuration, used to tie persisted engine state
    /// to the configuration that produced it.
    ///
    /// Canonical serialization: struct fields serialize in declaration order.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).expect("EngineConfig must serialize");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

/// One step of adaptive window narrowing: once the threshold band is at least
/// `min_band` wide, thresholds are taken over the last `lookback_secs`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct NarrowingStep {
    pub min_band: i64,
    pub lookback_secs: u64,
}

impl NarrowingStep {
    pub fn lookback(&self) -> Duration {
        Duration::seconds(self.lookback_secs as i64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// How long a quote stays in the window, measured from the newest quote.
    pub retention_secs: u64,
    /// Lookback used for thresholds while the market is calm.
    pub threshold_lookback_secs: u64,
    /// Widest spread still considered a tradeable quote.
    pub max_spread: i64,
    pub calm_window_secs: u64,
    /// `is_calm` holds while the range over the calm window stays below this.
    pub calm_floor: i64,
    /// Ordered by ascending `min_band`; lookbacks must shrink as bands grow.
    pub narrowing: Vec<NarrowingStep>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            retention_secs: 15 * 60,
            threshold_lookback_secs: 10 * 60,
            max_spread: 200,
            calm_window_secs: 60,
            calm_floor: 5,
            narrowing: vec![
                NarrowingStep { min_band: 40, lookback_secs: 5 * 60 },
                NarrowingStep { min_band: 55, lookback_secs: 4 * 60 },
                NarrowingStep { min_band: 70, lookback_secs: 3 * 60 },
                NarrowingStep { min_band: 85, lookback_secs: 2 * 60 },
                NarrowingStep { min_band: 100, lookback_secs: 60 },
            ],
        }
    }
}

impl AnalyzerConfig {
    pub fn retention(&self) -> Duration {
        Duration::seconds(self.retention_secs as i64)
    }

    pub fn threshold_lookback(&self) -> Duration {
        Duration::seconds(self.threshold_lookback_secs as i64)
    }

    pub fn calm_window(&self) -> Duration {
        Duration::seconds(self.calm_window_secs as i64)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.retention_secs == 0 || self.threshold_lookback_secs == 0 || self.calm_window_secs == 0 {
            return Err(ConfigError::Invalid("analyzer durations must be > 0".into()));
        }
        if self.threshold_lookback_secs > self.retention_secs {
            return Err(ConfigError::Invalid(format!(
                "threshold lookback ({}s) exceeds retention ({}s)",
                self.threshold_lookback_secs, self.retention_secs
            )));
        }
        if self.max_spread <= 0 {
            return Err(ConfigError::Invalid("max_spread must be > 0".into()));
        }

        let mut prev: Option<&NarrowingStep> = None;
        for step in &self.narrowing {
            if step.lookback_secs == 0 || step.lookback_secs > self.threshold_lookback_secs {
                return Err(ConfigError::Invalid(format!(
                    "narrowing lookback {}s must be in 1..={}s",
                    step.lookback_secs, self.threshold_lookback_secs
                )));
            }
            if let Some(p) = prev {
                if step.min_band <= p.min_band || step.lookback_secs >= p.lookback_secs {
                    return Err(ConfigError::Invalid(
                        "narrowing steps must have increasing bands and shrinking lookbacks".into(),
                    ));
                }
            }
            prev = Some(step);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LotConfig {
    /// Initial lot while the lot manager is in positive mode.
    pub initial_positive: u64,
    /// Initial lot while the lot manager is in negative mode.
    pub initial_negative: u64,
    pub magnification: u64,
    /// Escalation steps allowed above the initial lot when the engine starts.
    pub escalation_count: u32,
}

impl Default for LotConfig {
    fn default() -> Self {
        Self {
            initial_positive: 1,
            initial_negative: 1,
            magnification: 3,
            escalation_count: 2,
        }
    }
}

impl LotConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_positive == 0 || self.initial_negative == 0 {
            return Err(ConfigError::Invalid("initial lots must be > 0".into()));
        }
        if self.magnification == 0 {
            return Err(ConfigError::Invalid("magnification must be > 0".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecoveryConfig {
    pub profit_target: ProfitTargetConfig,
}
