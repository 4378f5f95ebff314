//! Plain-text views of standings and the battle log

use std::fmt::Write;

use crate::core::types::Step;
use crate::game::roster::TeamRoster;
use crate::history::engine::Standing;
use crate::history::event::{BattleEvent, BattleOutcome};
use crate::map::county::CountyAtlas;

/// One line per team: rank, name, county count and share of the map
pub fn format_standings(roster: &TeamRoster, standings: &[Standing]) -> String {
    let total: usize = standings.iter().map(|s| s.counties).sum();
    let width = standings
        .iter()
        .map(|s| roster.name_of(&s.team).len())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for (rank, standing) in standings.iter().enumerate() {
        let share = if total == 0 {
            0.0
        } else {
            standing.counties as f64 * 100.0 / total as f64
        };
        let _ = writeln!(
            out,
            "{:>3}. {:<width$}  {:>5}  {:>5.1}%{}",
            rank + 1,
            roster.name_of(&standing.team),
            standing.counties,
            share,
            if standing.counties == 0 { "  (eliminated)" } else { "" },
            width = width,
        );
    }
    out
}

/// Human-readable description of one battle
pub fn describe_event(roster: &TeamRoster, atlas: &CountyAtlas, event: &BattleEvent) -> String {
    let county = atlas
        .get(&event.county)
        .map(|c| c.label())
        .unwrap_or_else(|| event.county.to_string());
    let direction = event
        .direction
        .map(|d| format!(" ({})", d.abbrev()))
        .unwrap_or_default();
    let verdict = match event.outcome {
        BattleOutcome::AttackerWins => "captured",
        BattleOutcome::DefenderWins => "held",
    };
    let holder = roster.name_of(event.winner());

    format!(
        "#{:<4} {} {}{} attacked {} over {}: {} {}",
        event.sequence,
        event.timestamp.format("%Y-%m-%d %H:%M"),
        roster.name_of(&event.attacker),
        direction,
        roster.name_of(&event.defender),
        county,
        holder,
        verdict,
    )
}

/// The log, optionally marking the step currently shown
pub fn format_history(
    roster: &TeamRoster,
    atlas: &CountyAtlas,
    events: &[BattleEvent],
    marker: Option<Step>,
) -> String {
    if events.is_empty() {
        return "No battles recorded yet.\n".to_string();
    }
    let mut out = String::new();
    for (index, event) in events.iter().enumerate() {
        let mark = if marker == Some(index + 1) { '>' } else { ' ' };
        let _ = writeln!(out, "{} {}", mark, describe_event(roster, atlas, event));
    }
    out
}
