//! Domain types for PipGuard

pub mod quote;
pub mod snapshot;

pub use quote::Quote;
pub use snapshot::{PositionSnapshot, PositionStatus};
