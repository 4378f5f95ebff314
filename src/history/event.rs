//! Battle events and the append-only game log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::types::{CountyId, Direction, TeamId};
use crate::history::snapshot::OwnershipSnapshot;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BattleOutcome {
    #[value(name = "attacker", alias = "attacker-wins")]
    AttackerWins,
    #[value(name = "defender", alias = "defender-wins")]
    DefenderWins,
}

/// A battle as requested, before it is validated and sequenced
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Battle {
    pub attacker: TeamId,
    pub defender: TeamId,
    pub county: CountyId,
    pub outcome: BattleOutcome,
    pub direction: Option<Direction>,
}

impl Battle {
    pub fn new(attacker: TeamId, defender: TeamId, county: CountyId, outcome: BattleOutcome) -> Self {
        Self {
            attacker,
            defender,
            county,
            outcome,
            direction: None,
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }
}

/// A recorded battle
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleEvent {
    /// 1-based position in the log; event `k` produces replay step `k`
    pub sequence: u64,
    pub attacker: TeamId,
    pub defender: TeamId,
    pub county: CountyId,
    pub outcome: BattleOutcome,
    pub timestamp: DateTime<Utc>,
    /// Spin direction that produced the matchup, if it was spun
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
}

impl BattleEvent {
    pub fn winner(&self) -> &TeamId {
        match self.outcome {
            BattleOutcome::AttackerWins => &self.attacker,
            BattleOutcome::DefenderWins => &self.defender,
        }
    }

    pub fn loser(&self) -> &TeamId {
        match self.outcome {
            BattleOutcome::AttackerWins => &self.defender,
            BattleOutcome::DefenderWins => &self.attacker,
        }
    }

    /// Apply this event's result to a snapshot
    pub fn apply(&self, snapshot: &mut OwnershipSnapshot) {
        snapshot.set_owner(self.county.clone(), self.winner().clone());
    }
}

/// Initial snapshot plus the ordered battle events
///
/// Events can only be pushed; nothing in the log is ever edited or removed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GameLog {
    initial: OwnershipSnapshot,
    events: Vec<BattleEvent>,
}

impl GameLog {
    pub fn new(initial: OwnershipSnapshot) -> Self {
        Self {
            initial,
            events: Vec::new(),
        }
    }

    pub fn initial(&self) -> &OwnershipSnapshot {
        &self.initial
    }

    pub fn events(&self) -> &[BattleEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn next_sequence(&self) -> u64 {
        self.events.len() as u64 + 1
    }

    pub(crate) fn push(&mut self, event: BattleEvent) {
        debug_assert_eq!(event.sequence, self.next_sequence());
        self.events.push(event);
    }

    /// Replay the first `step` events on top of the initial snapshot
    ///
    /// Callers check `step <= len()`.
    pub fn replay(&self, step: usize) -> OwnershipSnapshot {
        let mut snapshot = self.initial.clone();
        for event in &self.events[..step.min(self.events.len())] {
            event.apply(&mut snapshot);
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(outcome: BattleOutcome) -> BattleEvent {
        BattleEvent {
            sequence: 1,
            attacker: TeamId::new("bears"),
            defender: TeamId::new("packers"),
            county: CountyId::new("55009"),
            outcome,
            timestamp: Utc::now(),
            direction: None,
        }
    }

    #[test]
    fn test_winner_and_loser() {
        let e = event(BattleOutcome::AttackerWins);
        assert_eq!(e.winner().as_str(), "bears");
        assert_eq!(e.loser().as_str(), "packers");

        let e = event(BattleOutcome::DefenderWins);
        assert_eq!(e.winner().as_str(), "packers");
        assert_eq!(e.loser().as_str(), "bears");
    }

    #[test]
    fn test_older_events_without_direction_deserialize() {
        let json = r#"{
            "sequence": 1,
            "attacker": "bears",
            "defender": "packers",
            "county": "55009",
            "outcome": "attacker_wins",
            "timestamp": "2024-09-08T17:00:00Z"
        }"#;
        let e: BattleEvent = serde_json::from_str(json).unwrap();
        assert_eq!(e.direction, None);
        assert_eq!(e.outcome, BattleOutcome::AttackerWins);
    }

    #[test]
    fn test_replay_prefix() {
        let initial: OwnershipSnapshot = [(CountyId::new("55009"), TeamId::new("packers"))]
            .into_iter()
            .collect();
        let mut log = GameLog::new(initial.clone());
        log.push(event(BattleOutcome::AttackerWins));

        assert_eq!(log.replay(0), initial);
        assert_eq!(
            log.replay(1).owner(&CountyId::new("55009")).unwrap().as_str(),
            "bears"
        );
    }
}
