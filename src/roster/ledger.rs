//! RosterLedger - team membership and per-category enrollment
//!
//! Owns the mutable disciplinary counters (licence points, warnings) and
//! the time-bounded driver/team assignments. The stewarding workflow is
//! the only caller that mutates counters outside ordinary roster
//! administration. Suspension is derived at read time from a zero licence
//! balance, never stored.

use ahash::AHashMap;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::config::EngineConfig;
use crate::core::error::{EngineError, Result};
use crate::core::types::{AssignmentId, CarClassId, CategoryId, DriverId, Position, TeamId};

/// A time-bounded membership of a driver in a team
///
/// An open assignment (`left_on = None`) is the driver's current team;
/// intervals for one driver never overlap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverAssignment {
    pub id: AssignmentId,
    pub driver_id: DriverId,
    pub team_id: TeamId,
    pub joined_on: NaiveDate,
    pub left_on: Option<NaiveDate>,
    /// Credits the team paid to acquire the driver
    pub fee: Option<u32>,
    pub is_leader: bool,
}

impl DriverAssignment {
    pub fn is_open(&self) -> bool {
        self.left_on.is_none()
    }

    fn covers(&self, date: NaiveDate) -> bool {
        date >= self.joined_on && self.left_on.map_or(true, |left| date <= left)
    }
}

/// A driver's participation in one category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub driver_id: DriverId,
    pub category_id: CategoryId,
    pub car_class_id: CarClassId,
    pub joined_on: NaiveDate,
    pub left_on: Option<NaiveDate>,
    pub race_number: u16,
    pub licence_points: u8,
    pub warnings: u8,
}

impl Enrollment {
    pub fn is_active(&self) -> bool {
        self.left_on.is_none()
    }

    /// A driver with no licence points left is suspended from scoring
    pub fn is_suspended(&self) -> bool {
        self.licence_points == 0
    }
}

/// Outcome of a licence-point adjustment
#[derive(Debug, Clone, Copy)]
pub struct LicenceAdjustment {
    pub balance: u8,
    pub suspended: bool,
}

/// A round-anchored licence adjustment made outside the stewarding workflow
///
/// Stewarding deductions live on the penalized result rows; administrative
/// restorations have no result to live on, so they are logged here with
/// the round they take effect after. The standings aggregator replays both
/// streams when deriving per-round suspension.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LicenceLogEntry {
    pub driver_id: DriverId,
    pub category_id: CategoryId,
    /// Takes effect for rounds with a higher number; 0 = before round 1
    pub after_round: u16,
    pub delta: i16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterLedger {
    assignments: AHashMap<AssignmentId, DriverAssignment>,
    enrollments: AHashMap<(DriverId, CategoryId), Enrollment>,
    licence_log: Vec<LicenceLogEntry>,
    next_assignment_id: u32,
}

impl RosterLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an assignment; the driver must not hold a conflicting one
    pub fn assign_driver(
        &mut self,
        driver_id: DriverId,
        team_id: TeamId,
        joined_on: NaiveDate,
        fee: Option<u32>,
        is_leader: bool,
    ) -> Result<AssignmentId> {
        for assignment in self.assignments.values() {
            if assignment.driver_id != driver_id {
                continue;
            }
            if assignment.is_open() {
                return Err(EngineError::Overlap(format!(
                    "driver {} already holds an open assignment with team {}",
                    driver_id.0, assignment.team_id.0
                )));
            }
            if assignment.covers(joined_on) {
                return Err(EngineError::Overlap(format!(
                    "driver {} was assigned to team {} on {}",
                    driver_id.0, assignment.team_id.0, joined_on
                )));
            }
        }

        let id = AssignmentId(self.next_assignment_id);
        self.next_assignment_id += 1;
        self.assignments.insert(
            id,
            DriverAssignment {
                id,
                driver_id,
                team_id,
                joined_on,
                left_on: None,
                fee,
                is_leader,
            },
        );
        Ok(id)
    }

    pub fn end_assignment(&mut self, id: AssignmentId, left_on: NaiveDate) -> Result<()> {
        let assignment = self
            .assignments
            .get_mut(&id)
            .ok_or_else(|| EngineError::Reference(format!("assignment {}", id.0)))?;
        if !assignment.is_open() {
            return Err(EngineError::State(format!(
                "assignment {} is already closed",
                id.0
            )));
        }
        if left_on < assignment.joined_on {
            return Err(EngineError::Range(format!(
                "left_on {} precedes joined_on {}",
                left_on, assignment.joined_on
            )));
        }
        assignment.left_on = Some(left_on);
        Ok(())
    }

    /// Enroll a driver into a category
    ///
    /// Race numbers must sit in the configured domain and be unique among
    /// the category's active enrollments. The licence starts at the
    /// configured ceiling.
    pub fn enroll(
        &mut self,
        driver_id: DriverId,
        category_id: CategoryId,
        car_class_id: CarClassId,
        race_number: u16,
        joined_on: NaiveDate,
        config: &EngineConfig,
    ) -> Result<()> {
        if race_number < config.race_number_min || race_number > config.race_number_max {
            return Err(EngineError::Range(format!(
                "race number {} outside {}..={}",
                race_number, config.race_number_min, config.race_number_max
            )));
        }
        if self.enrollments.contains_key(&(driver_id, category_id)) {
            return Err(EngineError::Overlap(format!(
                "driver {} already enrolled in category {}",
                driver_id.0, category_id.0
            )));
        }
        if self.enrollments.values().any(|e| {
            e.category_id == category_id && e.is_active() && e.race_number == race_number
        }) {
            return Err(EngineError::Overlap(format!(
                "race number {} already carried in category {}",
                race_number, category_id.0
            )));
        }

        self.enrollments.insert(
            (driver_id, category_id),
            Enrollment {
                driver_id,
                category_id,
                car_class_id,
                joined_on,
                left_on: None,
                race_number,
                licence_points: config.licence_points_ceiling,
                warnings: 0,
            },
        );
        Ok(())
    }

    pub fn withdraw(
        &mut self,
        driver_id: DriverId,
        category_id: CategoryId,
        left_on: NaiveDate,
    ) -> Result<()> {
        let enrollment = self.enrollment_mut(driver_id, category_id)?;
        if !enrollment.is_active() {
            return Err(EngineError::State(format!(
                "driver {} already left category {}",
                driver_id.0, category_id.0
            )));
        }
        if left_on < enrollment.joined_on {
            return Err(EngineError::Range(format!(
                "left_on {} precedes joined_on {}",
                left_on, enrollment.joined_on
            )));
        }
        enrollment.left_on = Some(left_on);
        Ok(())
    }

    /// Adjust a driver's licence balance, clamped into [0, ceiling]
    ///
    /// `anchor_round` is set for administrative adjustments so the
    /// standings aggregator can place them on the round timeline;
    /// stewarding deductions pass `None` because their deltas are already
    /// carried by the penalized result rows.
    pub fn adjust_licence_points(
        &mut self,
        driver_id: DriverId,
        category_id: CategoryId,
        delta: i16,
        anchor_round: Option<u16>,
        config: &EngineConfig,
    ) -> Result<LicenceAdjustment> {
        let ceiling = config.licence_points_ceiling;
        let enrollment = self.enrollment_mut(driver_id, category_id)?;
        let balance = (enrollment.licence_points as i16 + delta).clamp(0, ceiling as i16) as u8;
        enrollment.licence_points = balance;
        if let Some(after_round) = anchor_round {
            self.licence_log.push(LicenceLogEntry {
                driver_id,
                category_id,
                after_round,
                delta,
            });
        }
        Ok(LicenceAdjustment {
            balance,
            suspended: balance == 0,
        })
    }

    /// Administrative licence adjustments of a category, in log order
    pub fn licence_adjustments(
        &self,
        category_id: CategoryId,
    ) -> impl Iterator<Item = &LicenceLogEntry> {
        self.licence_log
            .iter()
            .filter(move |e| e.category_id == category_id)
    }

    /// Add warnings; the counter has no upper bound
    ///
    /// Returns the new total. Threshold policy belongs to the caller.
    pub fn add_warnings(
        &mut self,
        driver_id: DriverId,
        category_id: CategoryId,
        count: u8,
    ) -> Result<u8> {
        let enrollment = self.enrollment_mut(driver_id, category_id)?;
        enrollment.warnings = enrollment.warnings.saturating_add(count);
        Ok(enrollment.warnings)
    }

    // === Queries ===

    pub fn enrollment(&self, driver_id: DriverId, category_id: CategoryId) -> Result<&Enrollment> {
        self.enrollments
            .get(&(driver_id, category_id))
            .ok_or_else(|| {
                EngineError::Reference(format!(
                    "driver {} is not enrolled in category {}",
                    driver_id.0, category_id.0
                ))
            })
    }

    fn enrollment_mut(
        &mut self,
        driver_id: DriverId,
        category_id: CategoryId,
    ) -> Result<&mut Enrollment> {
        self.enrollments
            .get_mut(&(driver_id, category_id))
            .ok_or_else(|| {
                EngineError::Reference(format!(
                    "driver {} is not enrolled in category {}",
                    driver_id.0, category_id.0
                ))
            })
    }

    /// Active enrollments of a category, ordered by race number
    pub fn active_enrollments(&self, category_id: CategoryId) -> Vec<&Enrollment> {
        let mut enrollments: Vec<&Enrollment> = self
            .enrollments
            .values()
            .filter(|e| e.category_id == category_id && e.is_active())
            .collect();
        enrollments.sort_by_key(|e| e.race_number);
        enrollments
    }

    /// The team the driver currently races for
    pub fn current_team(&self, driver_id: DriverId) -> Option<TeamId> {
        self.assignments
            .values()
            .find(|a| a.driver_id == driver_id && a.is_open())
            .map(|a| a.team_id)
    }

    /// The current leader of a team, when one is flagged
    pub fn team_leader(&self, team_id: TeamId) -> Option<DriverId> {
        self.assignments
            .values()
            .find(|a| a.team_id == team_id && a.is_open() && a.is_leader)
            .map(|a| a.driver_id)
    }

    pub fn assignment(&self, id: AssignmentId) -> Result<&DriverAssignment> {
        self.assignments
            .get(&id)
            .ok_or_else(|| EngineError::Reference(format!("assignment {}", id.0)))
    }

    pub fn assignments_of(&self, driver_id: DriverId) -> Vec<&DriverAssignment> {
        let mut assignments: Vec<&DriverAssignment> = self
            .assignments
            .values()
            .filter(|a| a.driver_id == driver_id)
            .collect();
        assignments.sort_by_key(|a| a.joined_on);
        assignments
    }

    /// Largest race number currently carried in a category, for admission UIs
    pub fn highest_race_number(&self, category_id: CategoryId) -> Option<Position> {
        self.enrollments
            .values()
            .filter(|e| e.category_id == category_id && e.is_active())
            .map(|e| e.race_number)
            .max()
    }
}
