use thiserror::Error;

use crate::core::types::{CountyId, TeamId};

#[derive(Error, Debug)]
pub enum GameError {
    #[error("Invalid geometry for county {county}: {reason}")]
    InvalidGeometry { county: CountyId, reason: String },

    #[error("Invalid battle: {0}")]
    InvalidBattle(#[from] BattleRejection),

    #[error("Step {step} is out of range (log has {len} events)")]
    OutOfRange { step: i64, len: usize },

    #[error("Save file is corrupt: {0}")]
    SaveCorrupt(String),

    #[error("Invalid setup: {0}")]
    InvalidSetup(String),

    #[error("Operation requires the game to be {expected}")]
    WrongPhase { expected: &'static str },

    #[error("Team not found: {0}")]
    TeamNotFound(TeamId),

    #[error("Team already exists: {0}")]
    DuplicateTeam(TeamId),

    #[error("Team {0} is referenced by the game and cannot be removed")]
    TeamInUse(TeamId),

    #[error("No spun matchup is waiting for a result")]
    NoPendingMatchup,

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),
}

/// Why a battle event was refused by the history engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BattleRejection {
    #[error("county {0} is not on the map")]
    UnknownCounty(CountyId),

    #[error("team {0} is not on the roster")]
    UnknownTeam(TeamId),

    #[error("team {0} cannot attack itself")]
    SelfAttack(TeamId),

    #[error("{defender} does not own {county} (owner is {owner})")]
    DefenderNotOwner {
        county: CountyId,
        defender: TeamId,
        owner: TeamId,
    },
}

pub type Result<T> = std::result::Result<T, GameError>;
