//! Report storage, scoped numbering and state transitions
//!
//! The log owns every report and the per-(category, round, session)
//! number counters. Transitions only move forward; a reviewed report is
//! terminal and any further transition is a `StateError`. Cross-ledger
//! penalty application lives on the [`Engine`](crate::engine::Engine),
//! which validates everything before the first write.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{EngineError, Result};
use crate::core::types::{CategoryId, DriverId, ReportId, RoundId, SessionId};
use crate::stewarding::report::{
    NewReport, PenaltyDecision, Report, ReportState, ReviewOutcome,
};

/// A time penalty parked until the driver's next classified race result
///
/// Issued when a report is accepted against a driver who did not finish
/// the session: seconds cannot re-rank a result that has no time, so the
/// penalty follows the driver to the next race instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeferredPenalty {
    pub id: u32,
    pub report_id: ReportId,
    pub driver_id: DriverId,
    pub category_id: CategoryId,
    pub time_penalty_secs: u32,
    pub is_applied: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportLog {
    reports: AHashMap<ReportId, Report>,
    numbering: AHashMap<(CategoryId, RoundId, SessionId), u16>,
    deferred: Vec<DeferredPenalty>,
    next_report_id: u32,
    next_deferred_id: u32,
}

impl ReportLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// File a report, assigning the next number in its scope
    ///
    /// Numbers start at 1 per (category, round, session) and are never
    /// reused, regardless of later outcomes. Reference validation against
    /// the catalog is the engine's job and happens before this call.
    pub fn file(&mut self, new: NewReport) -> (ReportId, u16) {
        let scope = (new.category_id, new.round_id, new.session_id);
        let counter = self.numbering.entry(scope).or_insert(0);
        *counter += 1;
        let number = *counter;

        let id = ReportId(self.next_report_id);
        self.next_report_id += 1;
        self.reports.insert(
            id,
            Report {
                id,
                number,
                category_id: new.category_id,
                round_id: new.round_id,
                session_id: new.session_id,
                reported_driver_id: new.reported_driver_id,
                reported_team_id: new.reported_team_id,
                reporting_driver_id: new.reporting_driver_id,
                reporting_team_id: new.reporting_team_id,
                incident_time: new.incident_time,
                reason: new.reason,
                filed_on: new.filed_on,
                state: ReportState::Filed,
                penalty: None,
            },
        );
        (id, number)
    }

    /// Accept a filed report for steward review
    pub fn queue(&mut self, id: ReportId) -> Result<()> {
        let report = self.report_mut(id)?;
        match report.state {
            ReportState::Filed => {
                report.state = ReportState::Queued;
                Ok(())
            }
            ReportState::Queued => Err(EngineError::State(format!(
                "report {} is already queued",
                id.0
            ))),
            ReportState::Reviewed(_) => Err(EngineError::State(format!(
                "report {} is reviewed and terminal",
                id.0
            ))),
        }
    }

    /// Move a report to its terminal reviewed state
    ///
    /// An accepted report stores its penalty decision; a rejected one
    /// stores nothing.
    pub fn mark_reviewed(
        &mut self,
        id: ReportId,
        outcome: ReviewOutcome,
        penalty: Option<PenaltyDecision>,
    ) -> Result<()> {
        let report = self.report_mut(id)?;
        if report.is_reviewed() {
            return Err(EngineError::State(format!(
                "report {} is reviewed and terminal",
                id.0
            )));
        }
        debug_assert!(matches!(outcome, ReviewOutcome::Accepted) == penalty.is_some());
        report.state = ReportState::Reviewed(outcome);
        report.penalty = penalty;
        Ok(())
    }

    pub fn report(&self, id: ReportId) -> Result<&Report> {
        self.reports
            .get(&id)
            .ok_or_else(|| EngineError::Reference(format!("report {}", id.0)))
    }

    fn report_mut(&mut self, id: ReportId) -> Result<&mut Report> {
        self.reports
            .get_mut(&id)
            .ok_or_else(|| EngineError::Reference(format!("report {}", id.0)))
    }

    /// Reports of one scope in filing order
    pub fn reports_for(
        &self,
        category_id: CategoryId,
        round_id: RoundId,
        session_id: SessionId,
    ) -> Vec<&Report> {
        let mut reports: Vec<&Report> = self
            .reports
            .values()
            .filter(|r| {
                r.category_id == category_id
                    && r.round_id == round_id
                    && r.session_id == session_id
            })
            .collect();
        reports.sort_by_key(|r| r.number);
        reports
    }

    pub fn reports(&self) -> impl Iterator<Item = &Report> {
        self.reports.values()
    }

    // === Deferred penalties ===

    pub fn add_deferred(
        &mut self,
        report_id: ReportId,
        driver_id: DriverId,
        category_id: CategoryId,
        time_penalty_secs: u32,
    ) -> u32 {
        let id = self.next_deferred_id;
        self.next_deferred_id += 1;
        self.deferred.push(DeferredPenalty {
            id,
            report_id,
            driver_id,
            category_id,
            time_penalty_secs,
            is_applied: false,
        });
        id
    }

    /// Unapplied deferred penalties for a driver in a category
    pub fn pending_deferred(
        &self,
        driver_id: DriverId,
        category_id: CategoryId,
    ) -> Vec<&DeferredPenalty> {
        self.deferred
            .iter()
            .filter(|d| !d.is_applied && d.driver_id == driver_id && d.category_id == category_id)
            .collect()
    }

    pub fn mark_deferred_applied(&mut self, id: u32) {
        if let Some(deferred) = self.deferred.iter_mut().find(|d| d.id == id) {
            deferred.is_applied = true;
        }
    }
}
