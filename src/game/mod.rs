//! Game session, roster management and matchup spinning

pub mod roster;
pub mod session;
pub mod spinner;

pub use roster::{parse_team_line, TeamRoster};
pub use session::{GamePhase, GameSession, SessionParts};
pub use spinner::{spin, Matchup};
