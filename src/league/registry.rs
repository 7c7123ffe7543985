//! LeagueRegistry - the catalog owner
//!
//! Owns every catalog entity and allocates their ids from per-kind
//! monotonic counters. Insertions validate references and uniqueness up
//! front; lookups return `EngineError::Reference` for dangling ids so
//! callers never chase a missing row.

use ahash::AHashMap;
use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::core::error::{EngineError, Result};
use crate::core::types::{
    CarClassId, CategoryId, ChampionshipId, DriverId, GameId, PointSystemId, RoundId, SessionId,
    SessionKind, TeamId,
};
use crate::league::entities::{
    CarClass, Category, Championship, Driver, Game, Round, SessionDef, Team, TeamEntry,
};
use crate::points::FastestLapRule;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeagueRegistry {
    championships: AHashMap<ChampionshipId, Championship>,
    games: AHashMap<GameId, Game>,
    car_classes: AHashMap<CarClassId, CarClass>,
    categories: AHashMap<CategoryId, Category>,
    sessions: AHashMap<SessionId, SessionDef>,
    rounds: AHashMap<RoundId, Round>,
    drivers: AHashMap<DriverId, Driver>,
    teams: AHashMap<TeamId, Team>,
    team_entries: Vec<TeamEntry>,

    next_championship_id: u16,
    next_game_id: u16,
    next_car_class_id: u16,
    next_category_id: u16,
    next_session_id: u16,
    next_round_id: u32,
    next_driver_id: u32,
    next_team_id: u16,
}

impl LeagueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_championship(
        &mut self,
        name: &str,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> Result<ChampionshipId> {
        if self.championships.values().any(|c| c.name == name) {
            return Err(EngineError::Overlap(format!(
                "championship name '{}' is taken",
                name
            )));
        }
        let id = ChampionshipId(self.next_championship_id);
        self.next_championship_id += 1;
        self.championships.insert(
            id,
            Championship {
                id,
                name: name.to_string(),
                start,
                end,
            },
        );
        Ok(id)
    }

    pub fn add_game(&mut self, name: &str) -> Result<GameId> {
        if self.games.values().any(|g| g.name == name) {
            return Err(EngineError::Overlap(format!("game '{}' is taken", name)));
        }
        let id = GameId(self.next_game_id);
        self.next_game_id += 1;
        self.games.insert(
            id,
            Game {
                id,
                name: name.to_string(),
            },
        );
        Ok(id)
    }

    pub fn add_car_class(&mut self, name: &str, game_id: GameId) -> Result<CarClassId> {
        self.game(game_id)?;
        let id = CarClassId(self.next_car_class_id);
        self.next_car_class_id += 1;
        self.car_classes.insert(
            id,
            CarClass {
                id,
                name: name.to_string(),
                game_id,
            },
        );
        Ok(id)
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
        self.game(game_id)?;
        self.championship(championship_id)?;
        for class_id in &car_classes {
            let class = self.car_class(*class_id)?;
            if class.game_id != game_id {
                return Err(EngineError::Reference(format!(
                    "car class {} belongs to another game",
                    class_id.0
                )));
            }
        }
        for session_id in &sessions {
            self.session(*session_id)?;
        }

        let id = CategoryId(self.next_category_id);
        self.next_category_id += 1;
        self.categories.insert(
            id,
            Category {
                id,
                name: name.to_string(),
                game_id,
                championship_id,
                round_weekday,
                car_classes,
                sessions,
                fastest_lap,
            },
        );
        Ok(id)
    }

    pub fn add_session(
        &mut self,
        name: &str,
        kind: SessionKind,
        point_system_id: PointSystemId,
    ) -> Result<SessionId> {
        let id = SessionId(self.next_session_id);
        self.next_session_id += 1;
        self.sessions.insert(
            id,
            SessionDef {
                id,
                name: name.to_string(),
                kind,
                point_system_id,
            },
        );
        Ok(id)
    }

    pub fn add_round(
        &mut self,
        category_id: CategoryId,
        number: u16,
        date: NaiveDate,
        circuit: &str,
    ) -> Result<RoundId> {
        let category = self.category(category_id)?;
        let championship_id = category.championship_id;
        if self
            .rounds
            .values()
            .any(|r| r.category_id == category_id && r.number == number)
        {
            return Err(EngineError::Overlap(format!(
                "round {} already exists in category {}",
                number, category_id.0
            )));
        }

        let id = RoundId(self.next_round_id);
        self.next_round_id += 1;
        self.rounds.insert(
            id,
            Round {
                id,
                number,
                date,
                circuit: circuit.to_string(),
                is_completed: false,
                category_id,
                championship_id,
            },
        );
        Ok(id)
    }

    pub fn complete_round(&mut self, round_id: RoundId) -> Result<()> {
        let round = self
            .rounds
            .get_mut(&round_id)
            .ok_or_else(|| EngineError::Reference(format!("round {}", round_id.0)))?;
        round.is_completed = true;
        Ok(())
    }

    pub fn add_driver(&mut self, psn_id: &str, messaging_id: Option<&str>) -> Result<DriverId> {
        if self.drivers.values().any(|d| d.psn_id == psn_id) {
            return Err(EngineError::Overlap(format!(
                "psn_id '{}' is taken",
                psn_id
            )));
        }
        let id = DriverId(self.next_driver_id);
        self.next_driver_id += 1;
        self.drivers.insert(
            id,
            Driver {
                id,
                psn_id: psn_id.to_string(),
                messaging_id: messaging_id.map(str::to_string),
            },
        );
        Ok(id)
    }

    pub fn add_team(&mut self, name: &str, credits: i32) -> Result<TeamId> {
        if self.teams.values().any(|t| t.name == name) {
            return Err(EngineError::Overlap(format!("team '{}' is taken", name)));
        }
        let id = TeamId(self.next_team_id);
        self.next_team_id += 1;
        self.teams.insert(
            id,
            Team {
                id,
                name: name.to_string(),
                credits,
            },
        );
        Ok(id)
    }

    /// Enter a team into a championship
    pub fn enter_team(
        &mut self,
        team_id: TeamId,
        championship_id: ChampionshipId,
        joined_on: NaiveDate,
    ) -> Result<()> {
        self.team(team_id)?;
        self.championship(championship_id)?;
        if self
            .team_entries
            .iter()
            .any(|e| e.team_id == team_id && e.championship_id == championship_id)
        {
            return Err(EngineError::Overlap(format!(
                "team {} already entered championship {}",
                team_id.0, championship_id.0
            )));
        }
        self.team_entries.push(TeamEntry {
            team_id,
            championship_id,
            joined_on,
            penalty_points: 0.0,
        });
        Ok(())
    }

    /// Add penalty points to a team's championship tally
    pub fn add_team_penalty_points(
        &mut self,
        team_id: TeamId,
        championship_id: ChampionshipId,
        points: f64,
    ) -> Result<()> {
        let entry = self
            .team_entries
            .iter_mut()
            .find(|e| e.team_id == team_id && e.championship_id == championship_id)
            .ok_or_else(|| {
                EngineError::Reference(format!(
                    "team {} has no entry in championship {}",
                    team_id.0, championship_id.0
                ))
            })?;
        entry.penalty_points += points;
        Ok(())
    }

    // === Lookups ===

    pub fn championship(&self, id: ChampionshipId) -> Result<&Championship> {
        self.championships
            .get(&id)
            .ok_or_else(|| EngineError::Reference(format!("championship {}", id.0)))
    }

    pub fn game(&self, id: GameId) -> Result<&Game> {
        self.games
            .get(&id)
            .ok_or_else(|| EngineError::Reference(format!("game {}", id.0)))
    }

    pub fn car_class(&self, id: CarClassId) -> Result<&CarClass> {
        self.car_classes
            .get(&id)
            .ok_or_else(|| EngineError::Reference(format!("car class {}", id.0)))
    }

    pub fn category(&self, id: CategoryId) -> Result<&Category> {
        self.categories
            .get(&id)
            .ok_or_else(|| EngineError::Reference(format!("category {}", id.0)))
    }

    pub fn session(&self, id: SessionId) -> Result<&SessionDef> {
        self.sessions
            .get(&id)
            .ok_or_else(|| EngineError::Reference(format!("session {}", id.0)))
    }

    pub fn round(&self, id: RoundId) -> Result<&Round> {
        self.rounds
            .get(&id)
            .ok_or_else(|| EngineError::Reference(format!("round {}", id.0)))
    }

    pub fn driver(&self, id: DriverId) -> Result<&Driver> {
        self.drivers
            .get(&id)
            .ok_or_else(|| EngineError::Reference(format!("driver {}", id.0)))
    }

    pub fn team(&self, id: TeamId) -> Result<&Team> {
        self.teams
            .get(&id)
            .ok_or_else(|| EngineError::Reference(format!("team {}", id.0)))
    }

    pub fn team_entry(&self, team_id: TeamId, championship_id: ChampionshipId) -> Option<&TeamEntry> {
        self.team_entries
            .iter()
            .find(|e| e.team_id == team_id && e.championship_id == championship_id)
    }

    /// Rounds of a category ordered by calendar number
    pub fn rounds_of_category(&self, category_id: CategoryId) -> Vec<&Round> {
        let mut rounds: Vec<&Round> = self
            .rounds
            .values()
            .filter(|r| r.category_id == category_id)
            .collect();
        rounds.sort_by_key(|r| r.number);
        rounds
    }

    /// Categories of a championship in id order
    pub fn categories_of_championship(&self, championship_id: ChampionshipId) -> Vec<&Category> {
        let mut categories: Vec<&Category> = self
            .categories
            .values()
            .filter(|c| c.championship_id == championship_id)
            .collect();
        categories.sort_by_key(|c| c.id.0);
        categories
    }

    pub fn drivers(&self) -> impl Iterator<Item = &Driver> {
        self.drivers.values()
    }

    pub fn teams(&self) -> impl Iterator<Item = &Team> {
        self.teams.values()
    }
}
