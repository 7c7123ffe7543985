//! Result ledger: race and qualifying rows with penalty re-ranking

pub mod ledger;

pub use ledger::{NewResult, PenaltyDelta, ResultLedger, ResultRow};
