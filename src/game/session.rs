//! Game session: the one object a front end threads through every call
//!
//! Holds the county atlas, the roster and the Setup / In Play state machine.
//! A session is exclusively owned; nothing here is global.

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::core::config::GameConfig;
use crate::core::error::{GameError, Result};
use crate::core::types::{GameId, TeamId};
use crate::game::roster::TeamRoster;
use crate::game::spinner::{self, Matchup};
use crate::history::engine::HistoryEngine;
use crate::history::event::{Battle, BattleEvent, BattleOutcome};
use crate::history::snapshot::OwnershipSnapshot;
use crate::map::color::Color;
use crate::map::county::CountyAtlas;
use crate::map::metric::DistanceMetric;
use crate::map::partition::{partition, GeometryIssue};
use crate::map::team::Team;

/// Lifecycle state
///
/// `Setup -> InPlay` happens once per game, when the partition is committed.
/// The only way back is [`GameSession::reset`], which discards the log.
#[derive(Debug, Clone)]
pub enum GamePhase {
    Setup,
    InPlay(Box<HistoryEngine>),
}

impl GamePhase {
    pub fn name(&self) -> &'static str {
        match self {
            GamePhase::Setup => "setup",
            GamePhase::InPlay(_) => "in play",
        }
    }
}

/// Persisted parts of an in-play game, used to rebuild a session
#[derive(Debug, Clone)]
pub struct SessionParts {
    pub id: GameId,
    pub created_at: DateTime<Utc>,
    pub metric: DistanceMetric,
    pub roster: TeamRoster,
    pub engine: HistoryEngine,
    pub excluded: Vec<GeometryIssue>,
    pub pending: Option<Matchup>,
}

#[derive(Debug, Clone)]
pub struct GameSession {
    id: GameId,
    created_at: DateTime<Utc>,
    config: GameConfig,
    atlas: CountyAtlas,
    roster: TeamRoster,
    metric: DistanceMetric,
    phase: GamePhase,
    excluded: Vec<GeometryIssue>,
    pending: Option<Matchup>,
}

impl GameSession {
    pub fn new(atlas: CountyAtlas, config: GameConfig) -> Self {
        let metric = config.partition.metric;
        Self {
            id: GameId::new(),
            created_at: Utc::now(),
            config,
            atlas,
            roster: TeamRoster::new(),
            metric,
            phase: GamePhase::Setup,
            excluded: Vec::new(),
            pending: None,
        }
    }

    /// Rebuild an in-play session from persisted parts
    ///
    /// Every county in the log must exist in `atlas`.
    pub fn restore(atlas: CountyAtlas, config: GameConfig, parts: SessionParts) -> Result<Self> {
        if let Some((county, _)) = parts
            .engine
            .initial()
            .iter()
            .find(|(county, _)| atlas.get(county).is_none())
        {
            return Err(GameError::SaveCorrupt(format!(
                "county {} is not in the county data",
                county
            )));
        }
        let roster_ids: std::collections::BTreeSet<&TeamId> = parts.roster.ids().collect();
        if parts.engine.teams().iter().collect::<std::collections::BTreeSet<_>>() != roster_ids {
            return Err(GameError::SaveCorrupt(
                "team roster does not match the battle log".to_string(),
            ));
        }

        tracing::info!(game = %parts.id, events = parts.engine.len(), "game restored");
        Ok(Self {
            id: parts.id,
            created_at: parts.created_at,
            config,
            atlas,
            roster: parts.roster,
            metric: parts.metric,
            phase: GamePhase::InPlay(Box::new(parts.engine)),
            excluded: parts.excluded,
            pending: parts.pending,
        })
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn atlas(&self) -> &CountyAtlas {
        &self.atlas
    }

    pub fn roster(&self) -> &TeamRoster {
        &self.roster
    }

    /// Metric in force: the configured one during setup, the committed one in play
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn phase(&self) -> &GamePhase {
        &self.phase
    }

    pub fn is_in_play(&self) -> bool {
        matches!(self.phase, GamePhase::InPlay(_))
    }

    /// Counties left out of the partition
    pub fn excluded(&self) -> &[GeometryIssue] {
        &self.excluded
    }

    pub fn pending(&self) -> Option<&Matchup> {
        self.pending.as_ref()
    }

    pub fn engine(&self) -> Result<&HistoryEngine> {
        match &self.phase {
            GamePhase::InPlay(engine) => Ok(engine.as_ref()),
            GamePhase::Setup => Err(GameError::WrongPhase { expected: "in play" }),
        }
    }

    fn require_setup(&self) -> Result<()> {
        match self.phase {
            GamePhase::Setup => Ok(()),
            GamePhase::InPlay(_) => Err(GameError::WrongPhase { expected: "in setup" }),
        }
    }

    pub fn add_team(&mut self, team: Team) -> Result<()> {
        self.require_setup()?;
        self.roster.add(team)
    }

    /// Remove a team; once in play only teams the log never mentions can go
    pub fn remove_team(&mut self, id: &TeamId) -> Result<Team> {
        if let GamePhase::InPlay(engine) = &mut self.phase {
            engine.unregister_team(id)?;
        }
        self.roster.remove(id)
    }

    pub fn rename_team(&mut self, id: &TeamId, name: impl Into<String>) -> Result<()> {
        self.roster.rename(id, name)
    }

    pub fn recolor_team(&mut self, id: &TeamId, color: Color) -> Result<()> {
        self.roster.recolor(id, color)
    }

    /// Partition the map and commit it as the initial snapshot
    pub fn start(&mut self) -> Result<()> {
        self.require_setup()?;
        let result = partition(self.atlas.counties(), self.roster.teams(), &self.config.partition)?;
        let engine = HistoryEngine::new(self.roster.ids().cloned(), result.snapshot)?;

        self.metric = self.config.partition.metric;
        self.excluded = result.excluded;
        self.phase = GamePhase::InPlay(Box::new(engine));
        tracing::info!(game = %self.id, teams = self.roster.len(), "game started");
        Ok(())
    }

    /// Discard the log and return to setup as a new game; the roster is kept
    pub fn reset(&mut self) {
        tracing::info!(game = %self.id, "game reset");
        self.id = GameId::new();
        self.created_at = Utc::now();
        self.metric = self.config.partition.metric;
        self.phase = GamePhase::Setup;
        self.excluded.clear();
        self.pending = None;
    }

    /// Record a battle now; any pending spin is dropped
    pub fn record_battle(&mut self, battle: Battle) -> Result<&BattleEvent> {
        let engine = match &mut self.phase {
            GamePhase::InPlay(engine) => engine,
            GamePhase::Setup => return Err(GameError::WrongPhase { expected: "in play" }),
        };
        let event = engine.append_event(battle, Utc::now())?;
        self.pending = None;
        Ok(event)
    }

    /// Spin a new matchup and hold it until its result is recorded
    ///
    /// Returns `None` once a single team owns the whole map.
    pub fn spin<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Option<&Matchup>> {
        let engine = self.engine()?;
        let matchup = spinner::spin(
            rng,
            self.roster.teams(),
            &self.atlas,
            engine.current(),
            self.metric,
            &self.config.spinner,
        );
        self.pending = matchup;
        Ok(self.pending.as_ref())
    }

    /// Record the result of the pending spin
    pub fn resolve_pending(&mut self, outcome: BattleOutcome) -> Result<&BattleEvent> {
        let matchup = self.pending.clone().ok_or(GameError::NoPendingMatchup)?;
        let battle = Battle::new(matchup.attacker, matchup.defender, matchup.county, outcome)
            .with_direction(matchup.direction);
        self.record_battle(battle)
    }

    pub fn current(&self) -> Result<&OwnershipSnapshot> {
        Ok(self.engine()?.current())
    }

    /// The sole team still owning land, if the game is over
    pub fn winner(&self) -> Result<Option<&Team>> {
        let owning = self.engine()?.current().owning_teams();
        Ok(match owning.len() {
            1 => owning.into_iter().next().and_then(|id| self.roster.get(id)),
            _ => None,
        })
    }

    /// Persistable view of an in-play session
    pub fn parts(&self) -> Result<SessionParts> {
        Ok(SessionParts {
            id: self.id,
            created_at: self.created_at,
            metric: self.metric,
            roster: self.roster.clone(),
            engine: self.engine()?.clone(),
            excluded: self.excluded.clone(),
            pending: self.pending.clone(),
        })
    }
}
