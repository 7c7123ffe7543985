//! Incident reports and their review state machine

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::types::{CategoryId, DriverId, ReportId, RoundId, SessionId, TeamId};

/// Review lifecycle of a report
///
/// Filed -> Queued -> Reviewed. Reviewed is terminal: a reviewed report is
/// never mutated again; re-review means filing a new report for the same
/// incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportState {
    Filed,
    Queued,
    Reviewed(ReviewOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewOutcome {
    Accepted,
    Rejected,
}

/// The stewards' decision attached to an accepted report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PenaltyDecision {
    /// Seconds added to the driver's recorded time
    pub time_penalty_secs: u32,
    /// Championship points subtracted from the result
    pub points: f64,
    /// Licence points removed from the driver's balance
    pub licence_points: u8,
    /// Warnings issued alongside the penalty
    pub warnings: u8,
    /// Narrative of the decision, as published to the drivers
    pub decision: String,
}

/// Input for filing a report
#[derive(Debug, Clone)]
pub struct NewReport {
    pub category_id: CategoryId,
    pub round_id: RoundId,
    pub session_id: SessionId,
    pub reported_driver_id: DriverId,
    pub reported_team_id: TeamId,
    /// Absent when stewards self-initiate
    pub reporting_driver_id: Option<DriverId>,
    pub reporting_team_id: Option<TeamId>,
    /// In-game time of the incident, as written by the reporter
    pub incident_time: String,
    pub reason: String,
    pub filed_on: NaiveDate,
}

/// A filed incident report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    /// Sequential within (category, round, session), starting at 1,
    /// assigned at filing and never reused
    pub number: u16,
    pub category_id: CategoryId,
    pub round_id: RoundId,
    pub session_id: SessionId,
    pub reported_driver_id: DriverId,
    pub reported_team_id: TeamId,
    pub reporting_driver_id: Option<DriverId>,
    pub reporting_team_id: Option<TeamId>,
    pub incident_time: String,
    pub reason: String,
    pub filed_on: NaiveDate,
    pub state: ReportState,
    /// Populated exactly when the report was accepted
    pub penalty: Option<PenaltyDecision>,
}

impl Report {
    pub fn is_reviewed(&self) -> bool {
        matches!(self.state, ReportState::Reviewed(_))
    }

    pub fn is_queued(&self) -> bool {
        self.state == ReportState::Queued
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_flags() {
        let mut report = Report {
            id: ReportId(1),
            number: 1,
            category_id: CategoryId(1),
            round_id: RoundId(1),
            session_id: SessionId(1),
            reported_driver_id: DriverId(1),
            reported_team_id: TeamId(1),
            reporting_driver_id: None,
            reporting_team_id: None,
            incident_time: "Lap 4, turn 1".into(),
            reason: "Contact under braking".into(),
            filed_on: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            state: ReportState::Filed,
            penalty: None,
        };
        assert!(!report.is_reviewed());
        assert!(!report.is_queued());

        report.state = ReportState::Queued;
        assert!(report.is_queued());

        report.state = ReportState::Reviewed(ReviewOutcome::Rejected);
        assert!(report.is_reviewed());
        assert!(!report.is_queued());
    }
}
