//! Engine — one instance of every manager, driven one snapshot at a time.
//!
//! Each control-loop iteration the policy builds a fresh [`PositionSnapshot`]
//! and calls [`Engine::observe`], which feeds the quote to the rate analyzer
//! and reads every manager into an [`Observation`]. Lifecycle decisions
//! (opening/closing a recovery episode, committing ranges, switching lot
//! modes) stay with the policy through the `_mut` accessors. The engine never
//! issues orders.

pub mod state;

pub use state::{EngineState, StateError};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analyzer::{Admission, RateAnalyzer};
use crate::config::{ConfigError, EngineConfig};
use crate::domain::PositionSnapshot;
use crate::lot::LotManager;
use crate::range::RangeManager;
use crate::recovery::{ProfitTarget, RecoveryError, RecoveryManager};

/// Recovery figures, present only while an episode is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryReading {
    pub recovered: bool,
    pub recovered_with_profit: bool,
    pub reached_recover: bool,
    pub progress: i64,
}

/// Everything a policy consults for one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub admission: Admission,
    pub ask_threshold: Option<i64>,
    pub bid_threshold: Option<i64>,
    pub ask_reached: bool,
    pub bid_reached: bool,
    pub moved: bool,
    pub calm: bool,
    pub ask_up: bool,
    pub bid_down: bool,
    pub next_lot: u64,
    pub at_limit: bool,
    pub within_range: bool,
    pub recovery: Option<RecoveryReading>,
}

pub struct Engine {
    config: EngineConfig,
    analyzer: RateAnalyzer,
    recovery: RecoveryManager,
    range: RangeManager,
    lots: LotManager,
    profit_target: Box<dyn ProfitTarget>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            analyzer: RateAnalyzer::new(config.analyzer.clone()),
            recovery: RecoveryManager::new(),
            range: RangeManager::new(),
            lots: LotManager::new(&config.lots),
            profit_target: config.recovery.profit_target.build(),
            config,
        })
    }

    /// Rebuild an engine from saved state. Fails if the state was saved under
    /// a different configuration.
    pub fn restore(config: EngineConfig, state: EngineState) -> Result<Self, StateError> {
        config.validate()?;
        let current = config.fingerprint();
        if state.config_fingerprint != current {
            return Err(StateError::ConfigMismatch {
                saved: state.config_fingerprint,
                current,
            });
        }
        debug!(quotes = state.analyzer.len(), "engine state restored");
        Ok(Self {
            analyzer: state.analyzer,
            recovery: state.recovery,
            range: state.range,
            lots: state.lots,
            profit_target: config.recovery.profit_target.build(),
            config,
        })
    }

    pub fn from_json(config: EngineConfig, json: &str) -> Result<Self, StateError> {
        Self::restore(config, EngineState::from_json(json)?)
    }

    pub fn save_state(&self) -> EngineState {
        EngineState {
            config_fingerprint: self.config.fingerprint(),
            analyzer: self.analyzer.clone(),
            recovery: self.recovery.clone(),
            range: self.range.clone(),
            lots: self.lots.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String, StateError> {
        self.save_state().to_json()
    }

    /// Feed the snapshot's quote to the analyzer and read every manager.
    pub fn observe(&mut self, snapshot: &PositionSnapshot) -> Observation {
        let quote = *snapshot.quote();
        let admission = self.analyzer.add(quote);
        let accepted = admission == Admission::Accepted;
        let recovery = self.read_recovery(snapshot).ok();

        Observation {
            admission,
            ask_threshold: self.analyzer.ask_threshold(),
            bid_threshold: self.analyzer.bid_threshold(),
            // rejected quotes never count as breakouts
            ask_reached: accepted && self.analyzer.is_reached_ask_threshold(&quote),
            bid_reached: accepted && self.analyzer.is_reached_bid_threshold(&quote),
            moved: self.analyzer.is_moved(),
            calm: self.analyzer.is_calm(),
            ask_up: self.analyzer.is_ask_up(),
            bid_down: self.analyzer.is_bid_down(),
            next_lot: self.lots.next_lot(snapshot),
            at_limit: self.lots.is_limit(snapshot),
            within_range: self.range.is_within_range(snapshot),
            recovery,
        }
    }

    fn read_recovery(&mut self, snapshot: &PositionSnapshot) -> Result<RecoveryReading, RecoveryError> {
        let recovered = self.recovery.is_recovered(snapshot)?;
        let recovered_with_profit = self
            .recovery
            .is_recovered_with_profit(snapshot, self.profit_target.as_ref())?;
        let progress = self.recovery.recovery_progress(snapshot)?;
        Ok(RecoveryReading {
            recovered,
            recovered_with_profit,
            reached_recover: self.recovery.is_reached_recover(),
            progress,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn profit_target(&self) -> &dyn ProfitTarget {
        self.profit_target.as_ref()
    }

    pub fn analyzer(&self) -> &RateAnalyzer {
        &self.analyzer
    }

    pub fn analyzer_mut(&mut self) -> &mut RateAnalyzer {
        &mut self.analyzer
    }

    pub fn recovery(&self) -> &RecoveryManager {
        &self.recovery
    }

    pub fn recovery_mut(&mut self) -> &mut RecoveryManager {
        &mut self.recovery
    }

    pub fn range(&self) -> &RangeManager {
        &self.range
    }

    pub fn range_mut(&mut self) -> &mut RangeManager {
        &mut self.range
    }

    pub fn lots(&self) -> &LotManager {
        &self.lots
    }

    pub fn lots_mut(&mut self) -> &mut LotManager {
        &mut self.lots
    }
}
