//! Point tables and bonus rules
//!
//! A [`PointSystem`] converts a 1-based finishing or qualifying position
//! into championship points. Systems are configuration data: loaded once,
//! immutable for the lifetime of a championship. Redefining an id is
//! rejected rather than silently replacing the table.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{EngineError, Result};
use crate::core::types::{PointSystemId, Position};

/// An ordered table of point values indexed by position
///
/// Position 1 maps to the first value. Positions beyond the table length,
/// positions below 1 and unclassified results (no position) all score 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointSystem {
    pub id: PointSystemId,
    values: Vec<f64>,
}

impl PointSystem {
    pub fn new(id: PointSystemId, values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(EngineError::Config(format!(
                "point system {} has no values",
                id.0
            )));
        }
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(EngineError::Config(format!(
                "point system {} contains a negative or non-finite value",
                id.0
            )));
        }
        Ok(Self { id, values })
    }

    /// Parse one table from the JSON array form used by season archives,
    /// e.g. `[25, 18, 15, 12, 10, 8, 6, 4, 2, 1]`
    pub fn from_json_str(id: PointSystemId, content: &str) -> Result<Self> {
        let values: Vec<f64> = serde_json::from_str(content).map_err(|e| {
            EngineError::Config(format!("invalid point system JSON for {}: {}", id.0, e))
        })?;
        Self::new(id, values)
    }

    /// Points awarded for finishing at `position`
    pub fn points_for(&self, position: Option<Position>) -> f64 {
        match position {
            Some(p) if p >= 1 => self.values.get(p as usize - 1).copied().unwrap_or(0.0),
            _ => 0.0,
        }
    }

    /// Number of scoring positions in the table
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Fastest-lap bonus rule for a category
///
/// The bonus is additive and resolved independently of position-based
/// penalties: a driver keeps the bonus even if a time penalty drops them
/// down the order, but an unclassified driver never scores it. When a
/// split position is set, drivers finishing after it receive the reduced
/// value instead of the full one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FastestLapRule {
    pub full: f64,
    pub split: Option<(Position, f64)>,
}

impl FastestLapRule {
    pub fn flat(full: f64) -> Self {
        Self { full, split: None }
    }

    pub fn with_split(full: f64, split_position: Position, reduced: f64) -> Self {
        Self {
            full,
            split: Some((split_position, reduced)),
        }
    }

    /// Bonus points for the fastest lap scored from `position`
    pub fn bonus(&self, position: Option<Position>) -> f64 {
        let Some(position) = position else {
            return 0.0;
        };
        match self.split {
            Some((split, reduced)) if position > split => reduced,
            _ => self.full,
        }
    }
}

/// The immutable set of point systems available to sessions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PointsCatalog {
    systems: AHashMap<PointSystemId, PointSystem>,
}

#[derive(Debug, Deserialize)]
struct CatalogToml {
    #[serde(default)]
    point_system: Vec<PointSystemToml>,
}

#[derive(Debug, Deserialize)]
struct PointSystemToml {
    id: u16,
    points: Vec<f64>,
}

impl PointsCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a point system; duplicate ids are a configuration error
    pub fn insert(&mut self, system: PointSystem) -> Result<()> {
        if self.systems.contains_key(&system.id) {
            return Err(EngineError::Config(format!(
                "point system {} is already defined and may not change",
                system.id.0
            )));
        }
        self.systems.insert(system.id, system);
        Ok(())
    }

    /// Parse a catalog from a TOML document of `[[point_system]]` tables
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let parsed: CatalogToml = toml::from_str(content)
            .map_err(|e| EngineError::Config(format!("invalid point system TOML: {}", e)))?;

        let mut catalog = Self::new();
        for entry in parsed.point_system {
            catalog.insert(PointSystem::new(PointSystemId(entry.id), entry.points)?)?;
        }
        Ok(catalog)
    }

    pub fn get(&self, id: PointSystemId) -> Result<&PointSystem> {
        self.systems
            .get(&id)
            .ok_or_else(|| EngineError::Config(format!("point system {} is not defined", id.0)))
    }

    pub fn contains(&self, id: PointSystemId) -> bool {
        self.systems.contains_key(&id)
    }

    /// Resolve points for a position under the given system
    ///
    /// Fails only when the id itself does not resolve; out-of-table and
    /// unclassified positions score 0.
    pub fn points(&self, id: PointSystemId, position: Option<Position>) -> Result<f64> {
        Ok(self.get(id)?.points_for(position))
    }
}
