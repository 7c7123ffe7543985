//! Core type definitions used throughout the engine

use serde::{Deserialize, Serialize};

/// Unique identifier for championships
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChampionshipId(pub u16);

/// Unique identifier for games
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameId(pub u16);

/// Unique identifier for car classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CarClassId(pub u16);

/// Unique identifier for categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryId(pub u16);

/// Unique identifier for session definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u16);

/// Unique identifier for point systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointSystemId(pub u16);

/// Unique identifier for rounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoundId(pub u32);

/// Unique identifier for drivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DriverId(pub u32);

/// Unique identifier for teams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamId(pub u16);

/// Unique identifier for result rows (race and qualifying)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResultId(pub u32);

/// Unique identifier for incident reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportId(pub u32);

/// Unique identifier for driver/team assignments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignmentId(pub u32);

/// Lap times, total race times and gaps, in milliseconds
pub type Millis = u32;

/// 1-based finishing or qualifying position
pub type Position = u16;

/// Whether a session is run against the clock or wheel-to-wheel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionKind {
    Qualifying,
    Race,
}

impl SessionKind {
    /// Returns true for qualifying sessions
    pub fn is_qualifying(&self) -> bool {
        matches!(self, SessionKind::Qualifying)
    }
}
