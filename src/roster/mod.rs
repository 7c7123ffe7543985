//! Roster ledger: assignments, enrollments, licence and warning counters

pub mod ledger;

pub use ledger::{DriverAssignment, Enrollment, LicenceAdjustment, LicenceLogEntry, RosterLedger};
