//! Engine events
//!
//! Append-only record of notable transitions. The engine never acts on
//! its own events; external policy (escalation bots, notification tools)
//! consumes them.

use serde::{Deserialize, Serialize};

use crate::core::types::{
    AssignmentId, CategoryId, DriverId, ReportId, ResultId, RoundId, SessionId, TeamId,
};

/// A recorded engine event
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineEvent {
    pub id: u32,
    pub kind: EventKind,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum EventKind {
    // Results
    ResultRecorded { result: ResultId, driver: DriverId, round: RoundId, session: SessionId },
    ResultSuperseded { result: ResultId, driver: DriverId, round: RoundId, session: SessionId },
    PenaltyApplied { result: ResultId, driver: DriverId, report: ReportId },
    DeferredPenaltyApplied { result: ResultId, driver: DriverId, report: ReportId },

    // Roster
    AssignmentOpened { assignment: AssignmentId, driver: DriverId, team: TeamId },
    AssignmentClosed { assignment: AssignmentId, driver: DriverId, team: TeamId },
    DriverEnrolled { driver: DriverId, category: CategoryId },
    DriverWithdrew { driver: DriverId, category: CategoryId },
    LicenceAdjusted { driver: DriverId, category: CategoryId, balance: u8 },
    DriverSuspended { driver: DriverId, category: CategoryId },
    WarningIssued { driver: DriverId, category: CategoryId, total: u8 },
    WarningThresholdReached { driver: DriverId, category: CategoryId, total: u8 },

    // Stewarding
    ReportFiled { report: ReportId, number: u16, category: CategoryId, round: RoundId, session: SessionId },
    ReportQueued { report: ReportId },
    ReportAccepted { report: ReportId, driver: DriverId },
    ReportRejected { report: ReportId },
}

impl EventKind {
    /// The driver an event concerns, when it concerns one
    pub fn driver(&self) -> Option<DriverId> {
        match self {
            EventKind::ResultRecorded { driver, .. }
            | EventKind::ResultSuperseded { driver, .. }
            | EventKind::PenaltyApplied { driver, .. }
            | EventKind::DeferredPenaltyApplied { driver, .. }
            | EventKind::AssignmentOpened { driver, .. }
            | EventKind::AssignmentClosed { driver, .. }
            | EventKind::DriverEnrolled { driver, .. }
            | EventKind::DriverWithdrew { driver, .. }
            | EventKind::LicenceAdjusted { driver, .. }
            | EventKind::DriverSuspended { driver, .. }
            | EventKind::WarningIssued { driver, .. }
            | EventKind::WarningThresholdReached { driver, .. }
            | EventKind::ReportAccepted { driver, .. } => Some(*driver),
            EventKind::ReportFiled { .. }
            | EventKind::ReportQueued { .. }
            | EventKind::ReportRejected { .. } => None,
        }
    }
}

/// The complete event log
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventLog {
    pub events: Vec<EngineEvent>,
    next_event_id: u32,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_event(&mut self, kind: EventKind) -> u32 {
        let id = self.next_event_id;
        self.next_event_id += 1;
        self.events.push(EngineEvent { id, kind });
        id
    }

    pub fn events_for_driver(&self, driver_id: DriverId) -> impl Iterator<Item = &EngineEvent> {
        self.events
            .iter()
            .filter(move |e| e.kind.driver() == Some(driver_id))
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_ids_monotonic() {
        let mut log = EventLog::new();
        let a = log.add_event(EventKind::ReportQueued { report: ReportId(1) });
        let b = log.add_event(EventKind::ReportRejected { report: ReportId(1) });
        assert!(b > a);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_events_for_driver_filters() {
        let mut log = EventLog::new();
        log.add_event(EventKind::DriverSuspended {
            driver: DriverId(1),
            category: CategoryId(1),
        });
        log.add_event(EventKind::DriverSuspended {
            driver: DriverId(2),
            category: CategoryId(1),
        });
        assert_eq!(log.events_for_driver(DriverId(1)).count(), 1);
    }
}
