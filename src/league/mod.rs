//! League catalog: entities and the registry that owns them

pub mod entities;
pub mod registry;

pub use entities::{
    CarClass, Category, Championship, Driver, Game, Round, SessionDef, Team, TeamEntry,
};
pub use registry::LeagueRegistry;
