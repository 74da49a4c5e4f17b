//! PipGuard Core — decision-support engine for directional FX trading.
//!
//! This crate contains the pieces every trading policy consults:
//! - Domain types (quotes, position snapshots and their status)
//! - Rate analyzer: trailing quote window with adaptive breakout thresholds
//! - Recovery manager: drawdown recovery tracking per episode
//! - Range manager: two-phase (save → apply) high/low bounds
//! - Lot manager: next order size with bounded geometric escalation
//! - Engine facade, TOML configuration, and persisted state
//!
//! Nothing here performs I/O or reads the wall clock: all time comes from
//! quote timestamps, so replaying a recorded session is deterministic.

pub mod analyzer;
pub mod config;
pub mod domain;
pub mod engine;
pub mod lot;
pub mod range;
pub mod recovery;

pub use analyzer::{Admission, RateAnalyzer};
pub use config::{ConfigError, EngineConfig};
pub use domain::{PositionSnapshot, PositionStatus, Quote};
pub use engine::{Engine, EngineState, Observation, StateError};
pub use lot::{LotManager, LotMode};
pub use range::{RangeManager, RangePhase};
pub use recovery::{ProfitTarget, RecoveryError, RecoveryManager};
