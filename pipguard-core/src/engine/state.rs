//! Persisted engine state.
//!
//! Everything the engine learns at runtime lives in the four managers; the
//! profit target is rebuilt from configuration. State carries the fingerprint
//! of the configuration it was produced under so it cannot be restored into
//! an engine with different windows or lot rules.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analyzer::RateAnalyzer;
use crate::config::ConfigError;
use crate::lot::LotManager;
use crate::range::RangeManager;
use crate::recovery::RecoveryManager;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("state (de)serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("state was saved under config {saved}, current config is {current}")]
    ConfigMismatch { saved: String, current: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Plain-data image of an engine's managers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    pub config_fingerprint: String,
    pub analyzer: RateAnalyzer,
    pub recovery: RecoveryManager,
    pub range: RangeManager,
    pub lots: LotManager,
}

impl EngineState {
    pub fn to_json(&self) -> Result<String, StateError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, StateError> {
        Ok(serde_json::from_str(json)?)
    }
}
