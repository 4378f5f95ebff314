pub mod config;
pub mod error;
pub mod types;

pub use config::GameConfig;
pub use error::{BattleRejection, GameError, Result};
pub use types::{CountyId, GameId, GeoPoint, Step, TeamId};
