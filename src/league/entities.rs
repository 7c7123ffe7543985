//! League catalog entities
//!
//! The persisted shape of the league: championships own categories and
//! rounds, games scope car classes, sessions are shared definitions reused
//! across categories. Mutable disciplinary counters live in the roster
//! ledger, not here.

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::core::types::{
    CarClassId, CategoryId, ChampionshipId, DriverId, GameId, PointSystemId, RoundId, SessionId,
    SessionKind, TeamId,
};
use crate::points::FastestLapRule;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Championship {
    pub id: ChampionshipId,
    pub name: String,
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub name: String,
}

/// An in-game car class, reused across categories of the same game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarClass {
    pub id: CarClassId,
    pub name: String,
    pub game_id: GameId,
}

/// A skill-level class within a championship
///
/// Carries the set of car classes its drivers may race and the ordered
/// session definitions each of its rounds runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub game_id: GameId,
    pub championship_id: ChampionshipId,
    /// Weekday the category usually races on
    pub round_weekday: Option<Weekday>,
    pub car_classes: Vec<CarClassId>,
    pub sessions: Vec<SessionId>,
    pub fastest_lap: Option<FastestLapRule>,
}

/// A named segment of a round with its own point system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDef {
    pub id: SessionId,
    pub name: String,
    pub kind: SessionKind,
    pub point_system_id: PointSystemId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    /// Position in the calendar order, 1-based
    pub number: u16,
    pub date: NaiveDate,
    pub circuit: String,
    pub is_completed: bool,
    pub category_id: CategoryId,
    pub championship_id: ChampionshipId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub id: DriverId,
    /// Platform identity, unique across the league
    pub psn_id: String,
    /// External messaging identity, when the driver linked one
    pub messaging_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    /// Credits available for roster-transfer bookkeeping
    pub credits: i32,
}

/// A team's participation in one championship
///
/// Team penalty points are subtracted from the team's tally when team
/// standings are computed; they never touch driver totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamEntry {
    pub team_id: TeamId,
    pub championship_id: ChampionshipId,
    pub joined_on: NaiveDate,
    pub penalty_points: f64,
}
