//! Versioned save file
//!
//! The save holds everything needed to rebuild a game: roster, metric,
//! initial snapshot and the ordered battle log. It is JSON with a `version`
//! field; unknown fields are ignored and newer optional fields default, so
//! older saves keep replaying.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::config::GameConfig;
use crate::core::error::{GameError, Result};
use crate::core::types::GameId;
use crate::game::roster::TeamRoster;
use crate::game::session::{GameSession, SessionParts};
use crate::game::spinner::Matchup;
use crate::history::engine::HistoryEngine;
use crate::history::event::{Battle, BattleEvent, BattleOutcome};
use crate::history::snapshot::OwnershipSnapshot;
use crate::map::county::CountyAtlas;
use crate::map::metric::DistanceMetric;
use crate::map::partition::GeometryIssue;
use crate::map::team::Team;

/// Save format version written by this build
pub const SAVE_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaveFile {
    pub version: u32,
    pub game_id: GameId,
    pub created_at: DateTime<Utc>,
    pub saved_at: DateTime<Utc>,
    /// County CSV the game was started from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counties_path: Option<PathBuf>,
    pub metric: DistanceMetric,
    pub teams: Vec<Team>,
    pub initial: OwnershipSnapshot,
    #[serde(default)]
    pub excluded: Vec<GeometryIssue>,
    #[serde(default)]
    pub events: Vec<BattleEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<Matchup>,
}

impl SaveFile {
    /// Capture an in-play session
    pub fn from_session(session: &GameSession, counties_path: Option<PathBuf>) -> Result<Self> {
        let parts = session.parts()?;
        Ok(Self {
            version: SAVE_VERSION,
            game_id: parts.id,
            created_at: parts.created_at,
            saved_at: Utc::now(),
            counties_path,
            metric: parts.metric,
            teams: parts.roster.teams().to_vec(),
            initial: parts.engine.initial().clone(),
            excluded: parts.excluded,
            events: parts.engine.events().to_vec(),
            pending: parts.pending,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and schema-check a save; every failure is `SaveCorrupt`
    pub fn from_json(text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| GameError::SaveCorrupt(format!("not valid JSON: {}", e)))?;

        let version = value
            .get("version")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| GameError::SaveCorrupt("missing version field".to_string()))?;
        if version == 0 || version > u64::from(SAVE_VERSION) {
            return Err(GameError::SaveCorrupt(format!(
                "unsupported save version {} (this build reads up to {})",
                version, SAVE_VERSION
            )));
        }

        serde_json::from_value(value).map_err(|e| GameError::SaveCorrupt(e.to_string()))
    }

    /// Rebuild the roster and replay the log
    pub fn into_parts(self) -> Result<SessionParts> {
        let roster = TeamRoster::from_teams(self.teams)
            .map_err(|e| GameError::SaveCorrupt(format!("team roster: {}", e)))?;
        let engine = HistoryEngine::from_parts(roster.ids().cloned(), self.initial, self.events)?;

        let pending = self.pending.filter(|m| {
            let battle = Battle::new(
                m.attacker.clone(),
                m.defender.clone(),
                m.county.clone(),
                BattleOutcome::AttackerWins,
            );
            let valid = engine.validate(&battle).is_ok();
            if !valid {
                tracing::warn!(county = %m.county, "dropping stale pending matchup");
            }
            valid
        });

        Ok(SessionParts {
            id: self.game_id,
            created_at: self.created_at,
            metric: self.metric,
            roster,
            engine,
            excluded: self.excluded,
            pending,
        })
    }

    pub fn into_session(self, atlas: CountyAtlas, config: GameConfig) -> Result<GameSession> {
        GameSession::restore(atlas, config, self.into_parts()?)
    }

    /// Absolute path of this save's county CSV; a relative path is taken
    /// from the save's directory
    pub fn resolve_counties_path(&self, save_path: &Path) -> Result<PathBuf> {
        let recorded = self.counties_path.as_ref().ok_or_else(|| {
            GameError::SaveCorrupt("save does not record its county data file".to_string())
        })?;
        let path = if recorded.is_relative() {
            parent_dir(save_path).join(recorded)
        } else {
            recorded.clone()
        };
        if !path.is_file() {
            return Err(GameError::SaveCorrupt(format!(
                "county data file {} not found",
                path.display()
            )));
        }
        // Absolute, so writing it back into the save stays valid
        Ok(std::fs::canonicalize(&path)?)
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Load a save with its county data and rebuild the session
///
/// Returns the resolved county file path alongside the session.
pub fn open_game(save_path: &Path, config: GameConfig) -> Result<(GameSession, PathBuf)> {
    let save = load(save_path)?;
    let counties_path = save.resolve_counties_path(save_path)?;
    let atlas = CountyAtlas::load_csv(&counties_path)?;
    let session = save.into_session(atlas, config)?;
    Ok((session, counties_path))
}

/// Write `contents` to a temporary file beside `path`, sync it, then rename
/// it over `path`. Readers see either the old file or the new one.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = parent_dir(path);
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    // The rename is only durable once the directory entry is flushed
    #[cfg(unix)]
    std::fs::File::open(dir)?.sync_all()?;
    Ok(())
}

pub fn save(path: &Path, save: &SaveFile) -> Result<()> {
    write_atomic(path, save.to_json()?.as_bytes())?;
    tracing::info!(path = %path.display(), events = save.events.len(), "game saved");
    Ok(())
}

pub fn load(path: &Path) -> Result<SaveFile> {
    let text = std::fs::read_to_string(path)?;
    let save = SaveFile::from_json(&text)?;
    tracing::info!(path = %path.display(), game = %save.game_id, "save loaded");
    Ok(save)
}
