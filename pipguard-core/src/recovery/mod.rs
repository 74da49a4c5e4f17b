//! Recovery manager — tracks whether an open position has won back its drawdown.
//!
//! An episode opens with the snapshot at first entry; its margin is the
//! baseline equity. Each escalation (adding lots to the losing side) moves the
//! counter-trading reference used to measure progress. Once equity returns to
//! the baseline the episode is marked recovered and stays so until it closes.

pub mod profit;

pub use profit::{Capped, FixedProfit, MarginPercent, PerLot, ProfitTarget, ProfitTargetConfig};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::domain::PositionSnapshot;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecoveryError {
    #[error("no recovery episode is open (called {operation})")]
    NotOpen { operation: &'static str },
}

/// Lifecycle of one recovery episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoveryEpisode {
    Closed {
        /// Start snapshot of the previous episode, kept for reporting.
        last_start: Option<PositionSnapshot>,
    },
    Open {
        snapshot_when_start: PositionSnapshot,
        /// `None` until the first escalation; the start snapshot stands in.
        counter_trading_snapshot: Option<PositionSnapshot>,
        /// Sticky: set on the first recovered check, cleared only by close.
        reached_recover: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryManager {
    episode: RecoveryEpisode,
}

impl Default for RecoveryManager {
    fn default() -> Self {
        Self::new()
    }
}

impl RecoveryManager {
    pub fn new() -> Self {
        Self {
            episode: RecoveryEpisode::Closed { last_start: None },
        }
    }

    /// Start an episode. No-op while one is already open.
    pub fn open(&mut self, snapshot: &PositionSnapshot) {
        if self.is_open() {
            return;
        }
        info!(
            margin = snapshot.margin(),
            ask_lot = snapshot.ask_lot(),
            bid_lot = snapshot.bid_lot(),
            "recovery episode opened"
        );
        self.episode = RecoveryEpisode::Open {
            snapshot_when_start: snapshot.clone(),
            counter_trading_snapshot: None,
            reached_recover: false,
        };
    }

    pub fn close(&mut self) {
        let episode = std::mem::replace(
            &mut self.episode,
            RecoveryEpisode::Closed { last_start: None },
        );
        self.episode = match episode {
            RecoveryEpisode::Open {
                snapshot_when_start,
                reached_recover,
                ..
            } => {
                info!(reached_recover, "recovery episode closed");
                RecoveryEpisode::Closed {
                    last_start: Some(snapshot_when_start),
                }
            }
            closed => closed,
        };
    }

    /// Record the snapshot taken when exposure was last escalated.
    pub fn set_counter_trading_snapshot(
        &mut self,
        snapshot: &PositionSnapshot,
    ) -> Result<(), RecoveryError> {
        match &mut self.episode {
            RecoveryEpisode::Open {
                counter_trading_snapshot,
                ..
            } => {
                *counter_trading_snapshot = Some(snapshot.clone());
                Ok(())
            }
            RecoveryEpisode::Closed { .. } => Err(RecoveryError::NotOpen {
                operation: "set_counter_trading_snapshot",
            }),
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.episode, RecoveryEpisode::Open { .. })
    }

    pub fn is_close(&self) -> bool {
        !self.is_open()
    }

    /// Equity is back at (or above) the episode's starting margin.
    ///
    /// The first `true` result latches [`Self::is_reached_recover`].
    pub fn is_recovered(&mut self, snapshot: &PositionSnapshot) -> Result<bool, RecoveryError> {
        let start_margin = self.check_recovered(snapshot, "is_recovered")?;
        Ok(start_margin <= snapshot.effective_margin())
    }

    /// Equity exceeds the starting margin by at least `target`'s profit.
    ///
    /// Latches [`Self::is_reached_recover`] exactly as [`Self::is_recovered`]
    /// would, whether or not the target is met.
    pub fn is_recovered_with_profit(
        &mut self,
        snapshot: &PositionSnapshot,
        target: &dyn ProfitTarget,
    ) -> Result<bool, RecoveryError> {
        let start_margin = self.check_recovered(snapshot, "is_recovered_with_profit")?;
        Ok(start_margin + target.profit(snapshot) <= snapshot.effective_margin())
    }

    /// Latch the recovered flag if equity is back at the start margin.
    /// Returns the start margin.
    fn check_recovered(
        &mut self,
        snapshot: &PositionSnapshot,
        operation: &'static str,
    ) -> Result<i64, RecoveryError> {
        match &mut self.episode {
            RecoveryEpisode::Open {
                snapshot_when_start,
                reached_recover,
                ..
            } => {
                let start_margin = snapshot_when_start.margin();
                if start_margin <= snapshot.effective_margin() && !*reached_recover {
                    info!(
                        start_margin,
                        effective_margin = snapshot.effective_margin(),
                        "position recovered"
                    );
                    *reached_recover = true;
                }
                Ok(start_margin)
            }
            RecoveryEpisode::Closed { .. } => Err(RecoveryError::NotOpen { operation }),
        }
    }

    /// Percent of the loss at the last escalation that has been won back.
    ///
    /// Not clamped: exceeds 100 once equity is above the starting margin, and
    /// goes negative if the loss deepened. `0` when no loss was recorded.
    /// Halves round toward positive infinity (`-50.5` reads `-50`).
    pub fn recovery_progress(&self, snapshot: &PositionSnapshot) -> Result<i64, RecoveryError> {
        let RecoveryEpisode::Open {
            snapshot_when_start: start,
            counter_trading_snapshot,
            ..
        } = &self.episode
        else {
            return Err(RecoveryError::NotOpen {
                operation: "recovery_progress",
            });
        };

        let reference = counter_trading_snapshot.as_ref().unwrap_or(start);
        let loss_at_escalation = reference.margin() + reference.position_profit() - start.margin();
        if loss_at_escalation == 0 {
            return Ok(0);
        }

        let current_loss = snapshot.effective_margin() - start.margin();
        // 100 * (1 - current / loss), exact, halves rounded up
        let mut num = 100 * (loss_at_escalation as i128 - current_loss as i128);
        let mut den = loss_at_escalation as i128;
        if den < 0 {
            num = -num;
            den = -den;
        }
        Ok((2 * num + den).div_euclid(2 * den) as i64)
    }

    pub fn is_reached_recover(&self) -> bool {
        matches!(
            self.episode,
            RecoveryEpisode::Open {
                reached_recover: true,
                ..
            }
        )
    }

    /// Open and not yet escalated. False while closed.
    pub fn is_before_counter_trading(&self) -> bool {
        matches!(
            self.episode,
            RecoveryEpisode::Open {
                counter_trading_snapshot: None,
                ..
            }
        )
    }

    /// Open and escalated at least once. False while closed.
    pub fn is_after_counter_trading(&self) -> bool {
        matches!(
            self.episode,
            RecoveryEpisode::Open {
                counter_trading_snapshot: Some(_),
                ..
            }
        )
    }

    pub fn snapshot_when_start(&self) -> Option<&PositionSnapshot> {
        match &self.episode {
            RecoveryEpisode::Open {
                snapshot_when_start,
                ..
            } => Some(snapshot_when_start),
            RecoveryEpisode::Closed { last_start } => last_start.as_ref(),
        }
    }

    /// Start snapshot of the most recently closed episode.
    pub fn last_start(&self) -> Option<&PositionSnapshot> {
        match &self.episode {
            RecoveryEpisode::Closed { last_start } => last_start.as_ref(),
            RecoveryEpisode::Open { .. } => None,
        }
    }

    /// Escalation reference; the start snapshot until the first escalation.
    pub fn counter_trading_snapshot(&self) -> Option<&PositionSnapshot> {
        match &self.episode {
            RecoveryEpisode::Open {
                snapshot_when_start,
                counter_trading_snapshot,
                ..
            } => Some(counter_trading_snapshot.as_ref().unwrap_or(snapshot_when_start)),
            RecoveryEpisode::Closed { .. } => None,
        }
    }

    pub fn episode(&self) -> &RecoveryEpisode {
        &self.episode
    }
}
