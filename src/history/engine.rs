//! History engine: validated appends and replay queries over the game log
//!
//! The log is the source of truth. The engine keeps one incrementally
//! updated snapshot for the newest step and answers every other step by
//! replaying forward from the initial snapshot, never by undoing events.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::error::{BattleRejection, GameError, Result};
use crate::core::types::{CountyId, Step, TeamId};
use crate::history::event::{Battle, BattleEvent, GameLog};
use crate::history::snapshot::OwnershipSnapshot;

/// County count for one team at one step
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Standing {
    pub team: TeamId,
    pub counties: usize,
}

#[derive(Clone, Debug)]
pub struct HistoryEngine {
    teams: BTreeSet<TeamId>,
    log: GameLog,
    current: OwnershipSnapshot,
}

impl HistoryEngine {
    /// Start a log from a committed initial snapshot
    ///
    /// Every owner in `initial` must be on the roster.
    pub fn new(teams: impl IntoIterator<Item = TeamId>, initial: OwnershipSnapshot) -> Result<Self> {
        let teams: BTreeSet<TeamId> = teams.into_iter().collect();
        if initial.is_empty() {
            return Err(GameError::InvalidSetup(
                "initial snapshot has no counties".to_string(),
            ));
        }
        if let Some((county, owner)) = initial.iter().find(|(_, owner)| !teams.contains(*owner)) {
            return Err(GameError::InvalidSetup(format!(
                "county {} is owned by unknown team {}",
                county, owner
            )));
        }

        Ok(Self {
            teams,
            current: initial.clone(),
            log: GameLog::new(initial),
        })
    }

    /// Rebuild an engine from a persisted log, re-validating every event
    ///
    /// Any inconsistency is reported as `SaveCorrupt` naming the event.
    pub fn from_parts(
        teams: impl IntoIterator<Item = TeamId>,
        initial: OwnershipSnapshot,
        events: Vec<BattleEvent>,
    ) -> Result<Self> {
        let mut engine = Self::new(teams, initial).map_err(|e| GameError::SaveCorrupt(e.to_string()))?;

        for event in events {
            let expected = engine.log.next_sequence();
            if event.sequence != expected {
                return Err(GameError::SaveCorrupt(format!(
                    "expected event {} but found sequence {}",
                    expected, event.sequence
                )));
            }
            let battle = Battle {
                attacker: event.attacker.clone(),
                defender: event.defender.clone(),
                county: event.county.clone(),
                outcome: event.outcome,
                direction: event.direction,
            };
            engine
                .validate(&battle)
                .map_err(|e| GameError::SaveCorrupt(format!("event {}: {}", event.sequence, e)))?;
            event.apply(&mut engine.current);
            engine.log.push(event);
        }

        tracing::debug!(events = engine.len(), "replayed persisted log");
        Ok(engine)
    }

    /// Check a battle against the current snapshot without recording it
    pub fn validate(&self, battle: &Battle) -> std::result::Result<(), BattleRejection> {
        for team in [&battle.attacker, &battle.defender] {
            if !self.teams.contains(team) {
                return Err(BattleRejection::UnknownTeam(team.clone()));
            }
        }
        if battle.attacker == battle.defender {
            return Err(BattleRejection::SelfAttack(battle.attacker.clone()));
        }
        let owner = self
            .current
            .owner(&battle.county)
            .ok_or_else(|| BattleRejection::UnknownCounty(battle.county.clone()))?;
        if *owner != battle.defender {
            return Err(BattleRejection::DefenderNotOwner {
                county: battle.county.clone(),
                defender: battle.defender.clone(),
                owner: owner.clone(),
            });
        }
        Ok(())
    }

    /// Validate, sequence and record a battle; the only mutating operation
    pub fn append_event(&mut self, battle: Battle, timestamp: DateTime<Utc>) -> Result<&BattleEvent> {
        self.validate(&battle)?;

        let event = BattleEvent {
            sequence: self.log.next_sequence(),
            attacker: battle.attacker,
            defender: battle.defender,
            county: battle.county,
            outcome: battle.outcome,
            timestamp,
            direction: battle.direction,
        };
        event.apply(&mut self.current);

        tracing::debug!(
            sequence = event.sequence,
            attacker = %event.attacker,
            defender = %event.defender,
            county = %event.county,
            winner = %event.winner(),
            "battle recorded"
        );

        self.log.push(event);
        Ok(&self.log.events()[self.log.len() - 1])
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    pub fn events(&self) -> &[BattleEvent] {
        self.log.events()
    }

    pub fn initial(&self) -> &OwnershipSnapshot {
        self.log.initial()
    }

    pub fn teams(&self) -> &BTreeSet<TeamId> {
        &self.teams
    }

    /// Newest snapshot, maintained incrementally on append
    pub fn current(&self) -> &OwnershipSnapshot {
        &self.current
    }

    /// Ownership after every event, recomputed by a full replay
    pub fn current_ownership(&self) -> OwnershipSnapshot {
        self.log.replay(self.log.len())
    }

    /// Cross-check the incremental snapshot against a full replay
    pub fn verify(&self) -> bool {
        self.log.replay(self.log.len()) == self.current
    }

    /// Convert a signed step from a caller into a checked replay step
    pub fn resolve_step(&self, step: i64) -> Result<Step> {
        usize::try_from(step)
            .ok()
            .filter(|&s| s <= self.len())
            .ok_or(GameError::OutOfRange { step, len: self.len() })
    }

    fn check_step(&self, step: Step) -> Result<()> {
        if step > self.len() {
            return Err(GameError::OutOfRange {
                step: i64::try_from(step).unwrap_or(i64::MAX),
                len: self.len(),
            });
        }
        Ok(())
    }

    /// Ownership after the first `step` events
    pub fn ownership_at_step(&self, step: Step) -> Result<OwnershipSnapshot> {
        self.check_step(step)?;
        if step == self.len() {
            return Ok(self.current.clone());
        }
        tracing::debug!(step, "replaying from initial snapshot");
        Ok(self.log.replay(step))
    }

    /// Counties owned by `team` after the first `step` events
    pub fn team_counties_at_step(&self, step: Step, team: &TeamId) -> Result<Vec<CountyId>> {
        if !self.teams.contains(team) {
            return Err(GameError::TeamNotFound(team.clone()));
        }
        let snapshot = self.ownership_at_step(step)?;
        Ok(snapshot.counties_of(team).cloned().collect())
    }

    /// Every rostered team with its county count, most counties first
    pub fn standings_at_step(&self, step: Step) -> Result<Vec<Standing>> {
        let snapshot = self.ownership_at_step(step)?;
        let tally = snapshot.tally();
        let mut standings: Vec<Standing> = self
            .teams
            .iter()
            .map(|team| Standing {
                team: team.clone(),
                counties: tally.get(team).copied().unwrap_or(0),
            })
            .collect();
        standings.sort_by(|a, b| b.counties.cmp(&a.counties).then_with(|| a.team.cmp(&b.team)));
        Ok(standings)
    }

    /// Teams owning at least one county after the first `step` events
    pub fn active_teams_at_step(&self, step: Step) -> Result<Vec<TeamId>> {
        let snapshot = self.ownership_at_step(step)?;
        Ok(snapshot.owning_teams().into_iter().cloned().collect())
    }

    /// Counties whose owner differs between two steps
    pub fn changed_counties(&self, from: Step, to: Step) -> Result<BTreeSet<CountyId>> {
        let a = self.ownership_at_step(from)?;
        let b = self.ownership_at_step(to)?;
        Ok(a.diff(&b).into_iter().cloned().collect())
    }

    /// Whether any part of the log mentions `team`
    pub fn references_team(&self, team: &TeamId) -> bool {
        self.initial().iter().any(|(_, owner)| owner == team)
            || self
                .events()
                .iter()
                .any(|e| &e.attacker == team || &e.defender == team)
    }

    /// Drop a team that nothing in the log refers to
    pub fn unregister_team(&mut self, team: &TeamId) -> Result<()> {
        if !self.teams.contains(team) {
            return Err(GameError::TeamNotFound(team.clone()));
        }
        if self.references_team(team) {
            return Err(GameError::TeamInUse(team.clone()));
        }
        self.teams.remove(team);
        Ok(())
    }

    /// Counties touched by events `from+1 ..= to`
    pub fn touched_between(&self, from: Step, to: Step) -> Result<HashSet<&CountyId>> {
        self.check_step(from)?;
        self.check_step(to)?;
        let (lo, hi) = if from <= to { (from, to) } else { (to, from) };
        Ok(self.events()[lo..hi].iter().map(|e| &e.county).collect())
    }
}
