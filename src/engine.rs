//! Engine - the single owner of league state
//!
//! Every mutating operation is a `&mut self` method and every query a
//! `&self` method, so read-then-write sequences (penalty re-ranking,
//! report numbering) are serialized by ownership rather than by locks.
//! Standings are served from a read cache that is cleared on every
//! mutation touching results, rosters, reports or the calendar.

use ahash::AHashMap;
use chrono::{NaiveDate, Weekday};

use crate::core::config::EngineConfig;
use crate::core::error::{EngineError, Result};
use crate::core::types::{
    AssignmentId, CarClassId, CategoryId, ChampionshipId, DriverId, GameId, Millis, PointSystemId,
    Position, ReportId, ResultId, RoundId, SessionId, SessionKind, TeamId,
};
use crate::events::{EventKind, EventLog};
use crate::league::LeagueRegistry;
use crate::points::{FastestLapRule, PointsCatalog};
use crate::results::{NewResult, PenaltyDelta, ResultLedger};
use crate::roster::{LicenceAdjustment, RosterLedger};
use crate::standings::{self, RoundTally, StandingsRow, TeamStandingsRow};
use crate::stewarding::{NewReport, PenaltyDecision, ReportLog, ReviewOutcome};

/// Raw timing input for one driver in one session
///
/// The engine derives the session kind, category and car class from the
/// catalog and the driver's enrollment.
#[derive(Debug, Clone)]
pub struct ResultSubmission {
    pub driver_id: DriverId,
    pub round_id: RoundId,
    pub session_id: SessionId,
    pub position: Option<Position>,
    pub time: Option<Millis>,
    pub fastest_lap: bool,
    /// Explicit correction of an already-recorded row
    pub supersede: bool,
}

pub struct Engine {
    config: EngineConfig,
    registry: LeagueRegistry,
    points: PointsCatalog,
    results: ResultLedger,
    roster: RosterLedger,
    reports: ReportLog,
    events: EventLog,
    standings_cache: AHashMap<(CategoryId, Option<u16>), Vec<StandingsRow>>,
}

impl Engine {
    /// Build an engine over a validated config and an immutable point catalog
    pub fn new(config: EngineConfig, points: PointsCatalog) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            registry: LeagueRegistry::new(),
            points,
            results: ResultLedger::new(),
            roster: RosterLedger::new(),
            reports: ReportLog::new(),
            events: EventLog::new(),
            standings_cache: AHashMap::new(),
        })
    }

    fn invalidate_standings(&mut self) {
        self.standings_cache.clear();
    }

    // === Catalog administration ===

    pub fn add_championship(
        &mut self,
        name: &str,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> Result<ChampionshipId> {
        self.registry.add_championship(name, start, end)
    }

    pub fn add_game(&mut self, name: &str) -> Result<GameId> {
        self.registry.add_game(name)
    }

    pub fn add_car_class(&mut self, name: &str, game_id: GameId) -> Result<CarClassId> {
        self.registry.add_car_class(name, game_id)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_category(
        &mut self,
        name: &str,
        game_id: GameId,
        championship_id: ChampionshipId,
        round_weekday: Option<Weekday>,
        car_classes: Vec<CarClassId>,
        sessions: Vec<SessionId>,
        fastest_lap: Option<FastestLapRule>,
    ) -> Result<CategoryId> {
        self.registry.add_category(
            name,
            game_id,
            championship_id,
            round_weekday,
            car_classes,
            sessions,
            fastest_lap,
        )
    }

    /// Define a session; its point system must exist in the catalog
    pub fn add_session(
        &mut self,
        name: &str,
        kind: SessionKind,
        point_system_id: PointSystemId,
    ) -> Result<SessionId> {
        if !self.points.contains(point_system_id) {
            return Err(EngineError::Config(format!(
                "point system {} is not defined",
                point_system_id.0
            )));
        }
        self.registry.add_session(name, kind, point_system_id)
    }

    pub fn add_round(
        &mut self,
        category_id: CategoryId,
        number: u16,
        date: NaiveDate,
        circuit: &str,
    ) -> Result<RoundId> {
        self.invalidate_standings();
        self.registry.add_round(category_id, number, date, circuit)
    }

    pub fn complete_round(&mut self, round_id: RoundId) -> Result<()> {
        self.invalidate_standings();
        self.registry.complete_round(round_id)
    }

    pub fn add_driver(&mut self, psn_id: &str, messaging_id: Option<&str>) -> Result<DriverId> {
        self.registry.add_driver(psn_id, messaging_id)
    }

    pub fn add_team(&mut self, name: &str, credits: i32) -> Result<TeamId> {
        self.registry.add_team(name, credits)
    }

    pub fn enter_team(
        &mut self,
        team_id: TeamId,
        championship_id: ChampionshipId,
        joined_on: NaiveDate,
    ) -> Result<()> {
        self.registry.enter_team(team_id, championship_id, joined_on)
    }

    pub fn add_team_penalty_points(
        &mut self,
        team_id: TeamId,
        championship_id: ChampionshipId,
        points: f64,
    ) -> Result<()> {
        self.invalidate_standings();
        self.registry
            .add_team_penalty_points(team_id, championship_id, points)
    }

    // === Result submission ===

    /// Record (or correct, with the supersede flag) one result row
    ///
    /// Classified race rows also absorb any deferred time penalties the
    /// driver carried into this event.
    pub fn record_result(&mut self, submission: ResultSubmission) -> Result<ResultId> {
        let round = self.registry.round(submission.round_id)?;
        let category_id = round.category_id;
        let session = self.registry.session(submission.session_id)?;
        let session_kind = session.kind;
        self.registry.driver(submission.driver_id)?;

        let category = self.registry.category(category_id)?;
        if !category.sessions.contains(&submission.session_id) {
            return Err(EngineError::Reference(format!(
                "session {} is not run by category {}",
                submission.session_id.0, category_id.0
            )));
        }
        let enrollment = self
            .roster
            .enrollment(submission.driver_id, category_id)?;
        let car_class_id = enrollment.car_class_id;

        let superseding = self
            .results
            .result_for(submission.driver_id, submission.round_id, submission.session_id)
            .is_some();

        let result_id = self.results.record(NewResult {
            driver_id: submission.driver_id,
            round_id: submission.round_id,
            session_id: submission.session_id,
            category_id,
            car_class_id,
            kind: session_kind,
            position: submission.position,
            time: submission.time,
            fastest_lap: submission.fastest_lap,
            supersede: submission.supersede,
        })?;

        self.events.add_event(if superseding {
            EventKind::ResultSuperseded {
                result: result_id,
                driver: submission.driver_id,
                round: submission.round_id,
                session: submission.session_id,
            }
        } else {
            EventKind::ResultRecorded {
                result: result_id,
                driver: submission.driver_id,
                round: submission.round_id,
                session: submission.session_id,
            }
        });

        if session_kind == SessionKind::Race && submission.position.is_some() {
            self.apply_deferred_penalties(submission.driver_id, category_id, result_id)?;
        }

        self.invalidate_standings();
        Ok(result_id)
    }

    /// Land every pending deferred penalty on a freshly classified result
    fn apply_deferred_penalties(
        &mut self,
        driver_id: DriverId,
        category_id: CategoryId,
        result_id: ResultId,
    ) -> Result<()> {
        let pending: Vec<(u32, ReportId, u32)> = self
            .reports
            .pending_deferred(driver_id, category_id)
            .iter()
            .map(|d| (d.id, d.report_id, d.time_penalty_secs))
            .collect();

        for (deferred_id, report_id, seconds) in pending {
            self.results.apply_penalty(
                result_id,
                &PenaltyDelta {
                    time_penalty_secs: seconds,
                    ..PenaltyDelta::default()
                },
            )?;
            self.reports.mark_deferred_applied(deferred_id);
            self.events.add_event(EventKind::DeferredPenaltyApplied {
                result: result_id,
                driver: driver_id,
                report: report_id,
            });
            tracing::info!(
                "Applied deferred {}s penalty from report {} to driver {}",
                seconds,
                report_id.0,
                driver_id.0
            );
        }
        Ok(())
    }

    // === Roster administration ===

    pub fn assign_driver(
        &mut self,
        driver_id: DriverId,
        team_id: TeamId,
        joined_on: NaiveDate,
        fee: Option<u32>,
        is_leader: bool,
    ) -> Result<AssignmentId> {
        self.registry.driver(driver_id)?;
        self.registry.team(team_id)?;
        let assignment =
            self.roster
                .assign_driver(driver_id, team_id, joined_on, fee, is_leader)?;
        self.events.add_event(EventKind::AssignmentOpened {
            assignment,
            driver: driver_id,
            team: team_id,
        });
        self.invalidate_standings();
        Ok(assignment)
    }

    pub fn end_assignment(&mut self, id: AssignmentId, left_on: NaiveDate) -> Result<()> {
        let (driver_id, team_id) = {
            let assignment = self.roster.assignment(id)?;
            (assignment.driver_id, assignment.team_id)
        };
        self.roster.end_assignment(id, left_on)?;
        self.events.add_event(EventKind::AssignmentClosed {
            assignment: id,
            driver: driver_id,
            team: team_id,
        });
        self.invalidate_standings();
        Ok(())
    }

    /// Enroll a driver into a category with one of its permitted car classes
    pub fn enroll_driver(
        &mut self,
        driver_id: DriverId,
        category_id: CategoryId,
        car_class_id: CarClassId,
        race_number: u16,
        joined_on: NaiveDate,
    ) -> Result<()> {
        self.registry.driver(driver_id)?;
        let category = self.registry.category(category_id)?;
        if !category.car_classes.contains(&car_class_id) {
            return Err(EngineError::Reference(format!(
                "car class {} is not permitted in category {}",
                car_class_id.0, category_id.0
            )));
        }
        self.roster.enroll(
            driver_id,
            category_id,
            car_class_id,
            race_number,
            joined_on,
            &self.config,
        )?;
        self.events.add_event(EventKind::DriverEnrolled {
            driver: driver_id,
            category: category_id,
        });
        Ok(())
    }

    pub fn withdraw_driver(
        &mut self,
        driver_id: DriverId,
        category_id: CategoryId,
        left_on: NaiveDate,
    ) -> Result<()> {
        self.roster.withdraw(driver_id, category_id, left_on)?;
        self.events.add_event(EventKind::DriverWithdrew {
            driver: driver_id,
            category: category_id,
        });
        self.invalidate_standings();
        Ok(())
    }

    /// Adjust a licence balance directly (administrative restorations)
    ///
    /// The adjustment is anchored after the category's latest disputed
    /// round, so standings for rounds already raced are not rewritten.
    pub fn adjust_licence_points(
        &mut self,
        driver_id: DriverId,
        category_id: CategoryId,
        delta: i16,
    ) -> Result<LicenceAdjustment> {
        let was_suspended = self
            .roster
            .enrollment(driver_id, category_id)?
            .is_suspended();
        let anchor = self.latest_disputed_round(category_id);
        let adjustment = self.roster.adjust_licence_points(
            driver_id,
            category_id,
            delta,
            Some(anchor),
            &self.config,
        )?;
        self.record_licence_events(driver_id, category_id, was_suspended, adjustment);
        self.invalidate_standings();
        Ok(adjustment)
    }

    /// Highest round number of a category with recorded results, 0 if none
    fn latest_disputed_round(&self, category_id: CategoryId) -> u16 {
        self.registry
            .rounds_of_category(category_id)
            .iter()
            .filter(|round| self.results.round_has_results(round.id))
            .map(|round| round.number)
            .max()
            .unwrap_or(0)
    }

    /// Issue warnings directly (administrative decisions)
    pub fn add_warnings(
        &mut self,
        driver_id: DriverId,
        category_id: CategoryId,
        count: u8,
    ) -> Result<u8> {
        let before = self.roster.enrollment(driver_id, category_id)?.warnings;
        let total = self.roster.add_warnings(driver_id, category_id, count)?;
        self.record_warning_events(driver_id, category_id, before, total);
        Ok(total)
    }

    fn record_licence_events(
        &mut self,
        driver_id: DriverId,
        category_id: CategoryId,
        was_suspended: bool,
        adjustment: LicenceAdjustment,
    ) {
        self.events.add_event(EventKind::LicenceAdjusted {
            driver: driver_id,
            category: category_id,
            balance: adjustment.balance,
        });
        if adjustment.suspended && !was_suspended {
            tracing::info!(
                "Driver {} suspended in category {} (licence empty)",
                driver_id.0,
                category_id.0
            );
            self.events.add_event(EventKind::DriverSuspended {
                driver: driver_id,
                category: category_id,
            });
        }
    }

    fn record_warning_events(
        &mut self,
        driver_id: DriverId,
        category_id: CategoryId,
        before: u8,
        total: u8,
    ) {
        self.events.add_event(EventKind::WarningIssued {
            driver: driver_id,
            category: category_id,
            total,
        });
        let threshold = self.config.warning_threshold;
        if before < threshold && total >= threshold {
            self.events.add_event(EventKind::WarningThresholdReached {
                driver: driver_id,
                category: category_id,
                total,
            });
        }
    }

    // === Stewarding ===

    /// File an incident report; every reference must resolve
    pub fn file_report(&mut self, new: NewReport) -> Result<ReportId> {
        let round = self.registry.round(new.round_id)?;
        if round.category_id != new.category_id {
            return Err(EngineError::Reference(format!(
                "round {} does not belong to category {}",
                new.round_id.0, new.category_id.0
            )));
        }
        let category = self.registry.category(new.category_id)?;
        if !category.sessions.contains(&new.session_id) {
            return Err(EngineError::Reference(format!(
                "session {} is not run by category {}",
                new.session_id.0, new.category_id.0
            )));
        }
        self.registry.session(new.session_id)?;
        self.registry.driver(new.reported_driver_id)?;
        self.registry.team(new.reported_team_id)?;
        if let Some(driver_id) = new.reporting_driver_id {
            self.registry.driver(driver_id)?;
        }
        if let Some(team_id) = new.reporting_team_id {
            self.registry.team(team_id)?;
        }
        self.roster
            .enrollment(new.reported_driver_id, new.category_id)?;

        let scope = (new.category_id, new.round_id, new.session_id);
        let (id, number) = self.reports.file(new);
        tracing::info!(
            "Report {} filed as number {} in category {} round {} session {}",
            id.0,
            number,
            scope.0 .0,
            scope.1 .0,
            scope.2 .0
        );
        self.events.add_event(EventKind::ReportFiled {
            report: id,
            number,
            category: scope.0,
            round: scope.1,
            session: scope.2,
        });
        Ok(id)
    }

    /// Accept a filed report for steward review, outcome pending
    pub fn queue_report(&mut self, id: ReportId) -> Result<()> {
        self.reports.queue(id)?;
        self.events.add_event(EventKind::ReportQueued { report: id });
        Ok(())
    }

    /// Review a report and reject it; no ledger is touched
    pub fn reject_report(&mut self, id: ReportId) -> Result<()> {
        self.reports
            .mark_reviewed(id, ReviewOutcome::Rejected, None)?;
        tracing::info!("Report {} rejected", id.0);
        self.events.add_event(EventKind::ReportRejected { report: id });
        Ok(())
    }

    /// Review a report and accept it, applying the penalty decision
    ///
    /// The result penalty, the licence deduction and the warnings commit
    /// as one unit: every lookup that could fail runs before the first
    /// write. A time penalty against an unclassified result is parked as
    /// a deferred penalty instead of mutating the row.
    pub fn accept_report(&mut self, id: ReportId, decision: PenaltyDecision) -> Result<()> {
        // Validation phase: no writes until everything resolves.
        let (driver_id, category_id, round_id, session_id) = {
            let report = self.reports.report(id)?;
            if report.is_reviewed() {
                return Err(EngineError::State(format!(
                    "report {} is reviewed and terminal",
                    id.0
                )));
            }
            (
                report.reported_driver_id,
                report.category_id,
                report.round_id,
                report.session_id,
            )
        };
        let was_suspended = self
            .roster
            .enrollment(driver_id, category_id)?
            .is_suspended();
        let warnings_before = self.roster.enrollment(driver_id, category_id)?.warnings;
        let (result_id, classified) = {
            let row = self
                .results
                .result_for(driver_id, round_id, session_id)
                .ok_or_else(|| {
                    EngineError::State(format!(
                        "driver {} has no result in round {} session {} to penalize",
                        driver_id.0, round_id.0, session_id.0
                    ))
                })?;
            (row.id, row.is_classified())
        };

        // Commit phase.
        let defer_seconds = if classified { 0 } else { decision.time_penalty_secs };
        self.results.apply_penalty(
            result_id,
            &PenaltyDelta {
                time_penalty_secs: decision.time_penalty_secs - defer_seconds,
                points: decision.points,
                licence_points: decision.licence_points,
                warnings: decision.warnings,
            },
        )?;
        if defer_seconds > 0 {
            self.reports
                .add_deferred(id, driver_id, category_id, defer_seconds);
            tracing::info!(
                "Deferred {}s penalty from report {}: driver {} unclassified",
                defer_seconds,
                id.0,
                driver_id.0
            );
        }

        let adjustment = self.roster.adjust_licence_points(
            driver_id,
            category_id,
            -(decision.licence_points as i16),
            None,
            &self.config,
        )?;
        let warnings_total = self
            .roster
            .add_warnings(driver_id, category_id, decision.warnings)?;

        self.reports
            .mark_reviewed(id, ReviewOutcome::Accepted, Some(decision))?;

        tracing::info!("Report {} accepted against driver {}", id.0, driver_id.0);
        self.events.add_event(EventKind::ReportAccepted {
            report: id,
            driver: driver_id,
        });
        self.events.add_event(EventKind::PenaltyApplied {
            result: result_id,
            driver: driver_id,
            report: id,
        });
        self.record_licence_events(driver_id, category_id, was_suspended, adjustment);
        self.record_warning_events(driver_id, category_id, warnings_before, warnings_total);

        self.invalidate_standings();
        Ok(())
    }

    // === Standings ===

    /// Category standings, served from the read cache
    pub fn standings(
        &mut self,
        category_id: CategoryId,
        through_round: Option<u16>,
    ) -> Vec<StandingsRow> {
        let key = (category_id, through_round);
        if let Some(rows) = self.standings_cache.get(&key) {
            return rows.clone();
        }
        let rows = self.compute_standings(category_id, through_round);
        self.standings_cache.insert(key, rows.clone());
        rows
    }

    /// Category standings computed directly over the current snapshot
    pub fn compute_standings(
        &self,
        category_id: CategoryId,
        through_round: Option<u16>,
    ) -> Vec<StandingsRow> {
        standings::category_standings(
            &self.registry,
            &self.results,
            &self.roster,
            &self.points,
            &self.config,
            category_id,
            through_round,
        )
    }

    pub fn team_standings(&self, championship_id: ChampionshipId) -> Vec<TeamStandingsRow> {
        standings::team_standings(
            &self.registry,
            &self.results,
            &self.roster,
            &self.points,
            &self.config,
            championship_id,
        )
    }

    pub fn points_per_round(&self, category_id: CategoryId) -> Vec<RoundTally> {
        standings::points_per_round(
            &self.registry,
            &self.results,
            &self.roster,
            &self.points,
            &self.config,
            category_id,
        )
    }

    /// Standings of every category of a championship, computed in parallel
    pub fn championship_standings(
        &self,
        championship_id: ChampionshipId,
    ) -> Vec<(CategoryId, Vec<StandingsRow>)> {
        standings::championship_standings(
            &self.registry,
            &self.results,
            &self.roster,
            &self.points,
            &self.config,
            championship_id,
        )
    }

    // === Read access ===

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &LeagueRegistry {
        &self.registry
    }

    pub fn points(&self) -> &PointsCatalog {
        &self.points
    }

    pub fn results(&self) -> &ResultLedger {
        &self.results
    }

    pub fn roster(&self) -> &RosterLedger {
        &self.roster
    }

    pub fn reports(&self) -> &ReportLog {
        &self.reports
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Derived suspension status of an enrolled driver
    pub fn is_suspended(&self, driver_id: DriverId, category_id: CategoryId) -> Result<bool> {
        Ok(self.roster.enrollment(driver_id, category_id)?.is_suspended())
    }
}
