//! ResultLedger - the authoritative store of race and qualifying results
//!
//! One row per (driver, round, session). Rows are written once through
//! [`ResultLedger::record`] and mutated afterwards only through
//! [`ResultLedger::apply_penalty`], which re-ranks the whole session by
//! corrected time. The raw finishing order captured at record time is the
//! tie-break anchor for every later re-rank.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{EngineError, Result};
use crate::core::types::{
    CarClassId, CategoryId, DriverId, Millis, Position, ResultId, RoundId, SessionId, SessionKind,
};

/// A single race or qualifying result
///
/// `position = None` means the driver did not finish (race) or did not set
/// a time (qualifying); such rows carry no time or gap and always rank
/// after every classified row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRow {
    pub id: ResultId,
    pub driver_id: DriverId,
    pub round_id: RoundId,
    pub session_id: SessionId,
    pub category_id: CategoryId,
    pub car_class_id: CarClassId,
    pub kind: SessionKind,
    /// Current absolute position, penalty-adjusted
    pub position: Option<Position>,
    /// Current rank within the driver's car class, penalty-adjusted
    pub relative_position: Option<Position>,
    /// Best lap (qualifying) or total race time (race)
    pub time: Option<Millis>,
    pub gap_to_first: Option<Millis>,
    pub penalty_seconds: u32,
    pub penalty_points: f64,
    pub fastest_lap: bool,
    pub licence_points_removed: u8,
    pub warnings_added: u8,
    /// Finishing order at record time; tie-break anchor, never rewritten
    raw_order: Option<Position>,
}

impl ResultRow {
    /// Recorded time plus accumulated time penalties
    pub fn corrected_time(&self) -> Option<Millis> {
        self.time.map(|t| t + self.penalty_seconds * 1000)
    }

    pub fn is_classified(&self) -> bool {
        self.position.is_some()
    }

    pub fn raw_order(&self) -> Option<Position> {
        self.raw_order
    }
}

/// Input for recording one result row
#[derive(Debug, Clone)]
pub struct NewResult {
    pub driver_id: DriverId,
    pub round_id: RoundId,
    pub session_id: SessionId,
    pub category_id: CategoryId,
    pub car_class_id: CarClassId,
    pub kind: SessionKind,
    pub position: Option<Position>,
    pub time: Option<Millis>,
    pub fastest_lap: bool,
    /// Explicit correction: replace an existing row for the same key
    pub supersede: bool,
}

/// Penalty fields applied to a result in one stewarding decision
#[derive(Debug, Clone, Default)]
pub struct PenaltyDelta {
    pub time_penalty_secs: u32,
    pub points: f64,
    pub licence_points: u8,
    pub warnings: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultLedger {
    rows: AHashMap<ResultId, ResultRow>,
    by_key: AHashMap<(DriverId, RoundId, SessionId), ResultId>,
    by_session: AHashMap<(RoundId, SessionId), Vec<ResultId>>,
    next_result_id: u32,
}

impl ResultLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or, with the supersede flag, replace) the unique row for
    /// the result's (driver, round, session) key
    pub fn record(&mut self, new: NewResult) -> Result<ResultId> {
        match new.position {
            Some(0) => {
                return Err(EngineError::Range("positions are 1-based".into()));
            }
            Some(_) if new.time.is_none() => {
                return Err(EngineError::Range(
                    "a classified result must carry a time".into(),
                ));
            }
            None if new.time.is_some() => {
                return Err(EngineError::Range(
                    "an unclassified result cannot carry a time".into(),
                ));
            }
            _ => {}
        }

        let key = (new.driver_id, new.round_id, new.session_id);
        let id = match self.by_key.get(&key) {
            Some(existing) if !new.supersede => {
                return Err(EngineError::Overlap(format!(
                    "result for driver {} in round {} session {} already recorded (id {})",
                    new.driver_id.0, new.round_id.0, new.session_id.0, existing.0
                )));
            }
            Some(existing) => *existing,
            None => {
                let id = ResultId(self.next_result_id);
                self.next_result_id += 1;
                self.by_key.insert(key, id);
                self.by_session
                    .entry((new.round_id, new.session_id))
                    .or_default()
                    .push(id);
                id
            }
        };

        self.rows.insert(
            id,
            ResultRow {
                id,
                driver_id: new.driver_id,
                round_id: new.round_id,
                session_id: new.session_id,
                category_id: new.category_id,
                car_class_id: new.car_class_id,
                kind: new.kind,
                position: new.position,
                relative_position: None,
                time: new.time,
                gap_to_first: None,
                penalty_seconds: 0,
                penalty_points: 0.0,
                fastest_lap: new.fastest_lap,
                licence_points_removed: 0,
                warnings_added: 0,
                raw_order: new.position,
            },
        );

        self.rerank(new.round_id, new.session_id);
        Ok(id)
    }

    /// The only mutation path after recording
    ///
    /// Accumulates the delta on the row, then re-ranks the session when a
    /// time penalty landed on a classified row. Unclassified rows accept
    /// points/licence bookkeeping but cannot absorb seconds; the caller is
    /// expected to defer the time component instead.
    pub fn apply_penalty(&mut self, result_id: ResultId, delta: &PenaltyDelta) -> Result<()> {
        let row = self.rows.get_mut(&result_id).ok_or_else(|| {
            EngineError::State(format!("result {} does not exist", result_id.0))
        })?;

        if delta.time_penalty_secs > 0 && !row.is_classified() {
            return Err(EngineError::State(format!(
                "result {} is unclassified and cannot absorb a time penalty",
                result_id.0
            )));
        }

        row.penalty_seconds += delta.time_penalty_secs;
        row.penalty_points += delta.points;
        row.licence_points_removed += delta.licence_points;
        row.warnings_added += delta.warnings;
        let (round_id, session_id) = (row.round_id, row.session_id);

        if delta.time_penalty_secs > 0 {
            tracing::debug!(
                "Re-ranking round {} session {} after {}s penalty on result {}",
                round_id.0,
                session_id.0,
                delta.time_penalty_secs,
                result_id.0
            );
            self.rerank(round_id, session_id);
        }
        Ok(())
    }

    /// Re-rank every classified row of a session by corrected time
    ///
    /// Ties break by earlier raw finishing order. Absolute positions are
    /// reassigned 1..n, the gap to the (new) leader recomputed, and each
    /// car class re-ranked for relative positions. DNF rows keep
    /// `position = None`.
    fn rerank(&mut self, round_id: RoundId, session_id: SessionId) {
        let Some(ids) = self.by_session.get(&(round_id, session_id)) else {
            return;
        };

        let mut classified: Vec<ResultId> = ids
            .iter()
            .copied()
            .filter(|id| self.rows[id].is_classified())
            .collect();
        classified.sort_by_key(|id| {
            let row = &self.rows[id];
            (
                row.corrected_time().unwrap_or(Millis::MAX),
                row.raw_order.unwrap_or(Position::MAX),
            )
        });

        let leader_time = classified
            .first()
            .and_then(|id| self.rows[id].corrected_time());

        let mut class_rank: AHashMap<CarClassId, Position> = AHashMap::new();
        for (index, id) in classified.iter().enumerate() {
            let Some(row) = self.rows.get_mut(id) else {
                continue;
            };
            row.position = Some(index as Position + 1);
            row.gap_to_first = match (row.corrected_time(), leader_time) {
                (Some(t), Some(leader)) => Some(t - leader),
                _ => None,
            };
            let rank = class_rank.entry(row.car_class_id).or_insert(0);
            *rank += 1;
            row.relative_position = Some(*rank);
        }
    }

    // === Queries ===

    pub fn result(&self, id: ResultId) -> Result<&ResultRow> {
        self.rows
            .get(&id)
            .ok_or_else(|| EngineError::State(format!("result {} does not exist", id.0)))
    }

    pub fn result_for(
        &self,
        driver_id: DriverId,
        round_id: RoundId,
        session_id: SessionId,
    ) -> Option<&ResultRow> {
        self.by_key
            .get(&(driver_id, round_id, session_id))
            .map(|id| &self.rows[id])
    }

    /// Rows of a session, classified first in position order, DNFs last
    pub fn session_results(&self, round_id: RoundId, session_id: SessionId) -> Vec<&ResultRow> {
        let mut rows: Vec<&ResultRow> = self
            .by_session
            .get(&(round_id, session_id))
            .map(|ids| ids.iter().map(|id| &self.rows[id]).collect())
            .unwrap_or_default();
        rows.sort_by_key(|r| (r.position.unwrap_or(Position::MAX), r.driver_id.0));
        rows
    }

    pub fn rows(&self) -> impl Iterator<Item = &ResultRow> {
        self.rows.values()
    }

    /// Whether any session of the round has recorded rows
    pub fn round_has_results(&self, round_id: RoundId) -> bool {
        self.by_session
            .iter()
            .any(|((round, _), ids)| *round == round_id && !ids.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(driver: u32, position: Option<u16>, time: Option<Millis>) -> NewResult {
        NewResult {
            driver_id: DriverId(driver),
            round_id: RoundId(1),
            session_id: SessionId(1),
            category_id: CategoryId(1),
            car_class_id: CarClassId(1),
            kind: SessionKind::Race,
            position,
            time,
            fastest_lap: false,
            supersede: false,
        }
    }

    #[test]
    fn test_duplicate_without_supersede_rejected() {
        let mut ledger = ResultLedger::new();
        ledger.record(row(1, Some(1), Some(3_600_000))).unwrap();
        assert!(matches!(
            ledger.record(row(1, Some(2), Some(3_601_000))),
            Err(EngineError::Overlap(_))
        ));
    }

    #[test]
    fn test_supersede_replaces_row() {
        let mut ledger = ResultLedger::new();
        let first = ledger.record(row(1, Some(1), Some(3_600_000))).unwrap();
        let corrected = NewResult {
            supersede: true,
            ..row(1, Some(2), Some(3_605_000))
        };
        let second = ledger.record(corrected).unwrap();
        assert_eq!(first, second);
        assert_eq!(ledger.result(first).unwrap().time, Some(3_605_000));
    }

    #[test]
    fn test_classified_requires_time_and_vice_versa() {
        let mut ledger = ResultLedger::new();
        assert!(matches!(
            ledger.record(row(1, Some(3), None)),
            Err(EngineError::Range(_))
        ));
        assert!(matches!(
            ledger.record(row(1, None, Some(90_000))),
            Err(EngineError::Range(_))
        ));
        assert!(matches!(
            ledger.record(row(1, Some(0), Some(90_000))),
            Err(EngineError::Range(_))
        ));
        assert!(ledger.record(row(1, None, None)).is_ok());
    }

    #[test]
    fn test_time_penalty_reranks_session() {
        let mut ledger = ResultLedger::new();
        let p1 = ledger.record(row(1, Some(1), Some(3_600_000))).unwrap();
        ledger.record(row(2, Some(2), Some(3_602_000))).unwrap();
        ledger.record(row(3, Some(3), Some(3_609_000))).unwrap();

        // 5s penalty drops the winner to second
        ledger
            .apply_penalty(
                p1,
                &PenaltyDelta {
                    time_penalty_secs: 5,
                    ..PenaltyDelta::default()
                },
            )
            .unwrap();

        let results = ledger.session_results(RoundId(1), SessionId(1));
        let order: Vec<u32> = results.iter().map(|r| r.driver_id.0).collect();
        assert_eq!(order, vec![2, 1, 3]);
        assert_eq!(results[0].gap_to_first, Some(0));
        assert_eq!(results[1].gap_to_first, Some(3_000));
        assert_eq!(results[1].position, Some(2));
    }

    #[test]
    fn test_rerank_tie_breaks_by_raw_order() {
        let mut ledger = ResultLedger::new();
        ledger.record(row(1, Some(1), Some(3_600_000))).unwrap();
        let p2 = ledger.record(row(2, Some(2), Some(3_595_000))).unwrap();

        // 5s penalty makes the times equal; the original winner keeps P1
        ledger
            .apply_penalty(
                p2,
                &PenaltyDelta {
                    time_penalty_secs: 5,
                    ..PenaltyDelta::default()
                },
            )
            .unwrap();

        let results = ledger.session_results(RoundId(1), SessionId(1));
        assert_eq!(results[0].driver_id, DriverId(1));
        assert_eq!(results[1].driver_id, DriverId(2));
    }

    #[test]
    fn test_dnf_ranked_after_classified() {
        let mut ledger = ResultLedger::new();
        ledger.record(row(1, None, None)).unwrap();
        ledger.record(row(2, Some(1), Some(3_600_000))).unwrap();

        let results = ledger.session_results(RoundId(1), SessionId(1));
        assert_eq!(results[0].driver_id, DriverId(2));
        assert_eq!(results[1].position, None);
        assert_eq!(results[1].relative_position, None);
    }

    #[test]
    fn test_time_penalty_on_dnf_rejected() {
        let mut ledger = ResultLedger::new();
        let dnf = ledger.record(row(1, None, None)).unwrap();
        assert!(matches!(
            ledger.apply_penalty(
                dnf,
                &PenaltyDelta {
                    time_penalty_secs: 10,
                    ..PenaltyDelta::default()
                }
            ),
            Err(EngineError::State(_))
        ));
        // Points and licence bookkeeping still land on unclassified rows
        assert!(ledger
            .apply_penalty(
                dnf,
                &PenaltyDelta {
                    points: 2.0,
                    licence_points: 1,
                    ..PenaltyDelta::default()
                }
            )
            .is_ok());
    }

    #[test]
    fn test_relative_positions_per_class() {
        let mut ledger = ResultLedger::new();
        let gt3 = CarClassId(1);
        let gt4 = CarClassId(2);
        for (driver, class, time) in [
            (1, gt3, 3_600_000),
            (2, gt4, 3_601_000),
            (3, gt3, 3_602_000),
            (4, gt4, 3_603_000),
        ] {
            ledger
                .record(NewResult {
                    car_class_id: class,
                    ..row(driver, Some(driver as u16), Some(time))
                })
                .unwrap();
        }

        let results = ledger.session_results(RoundId(1), SessionId(1));
        let rel: Vec<(u32, u16)> = results
            .iter()
            .map(|r| (r.driver_id.0, r.relative_position.unwrap()))
            .collect();
        assert_eq!(rel, vec![(1, 1), (2, 1), (3, 2), (4, 2)]);
    }

    #[test]
    fn test_penalty_on_missing_result_is_state_error() {
        let mut ledger = ResultLedger::new();
        assert!(matches!(
            ledger.apply_penalty(ResultId(99), &PenaltyDelta::default()),
            Err(EngineError::State(_))
        ));
    }
}
