//! The spinner: random matchup selection
//!
//! Two stages, attacker first, then an attack direction that picks the
//! defender. Selection is a pure function of the RNG and the game state;
//! any animation belongs to the front end.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::SpinnerConfig;
use crate::core::types::{CountyId, Direction, GeoPoint, TeamId};
use crate::history::snapshot::OwnershipSnapshot;
use crate::map::county::CountyAtlas;
use crate::map::metric::DistanceMetric;
use crate::map::team::Team;

/// Result of a spin, waiting for the game to be played
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Matchup {
    pub attacker: TeamId,
    pub defender: TeamId,
    pub county: CountyId,
    pub direction: Direction,
    /// Point the attack aimed at
    pub target: GeoPoint,
}

/// Roster teams that still own land, sorted by id
pub fn active_teams<'a>(teams: &'a [Team], snapshot: &OwnershipSnapshot) -> Vec<&'a Team> {
    let owning = snapshot.owning_teams();
    let mut active: Vec<&Team> = teams.iter().filter(|t| owning.contains(&t.id)).collect();
    active.sort_by(|a, b| a.id.cmp(&b.id));
    active
}

/// Where an attack from `origin` in `direction` lands
pub fn attack_target(origin: GeoPoint, direction: Direction, config: &SpinnerConfig) -> GeoPoint {
    let reach = if direction.is_diagonal() {
        config.diagonal_reach
    } else {
        config.cardinal_reach
    };
    let (dlat, dlon) = direction.unit();
    origin.offset(dlat * reach, dlon * reach)
}

/// Resolve the defender and contested county for an attack
///
/// The contested county is the one nearest the target. If the attacker
/// already owns it, a random other active team defends instead, over its
/// own county nearest the target. `None` means nobody is left to fight.
pub fn find_defender<R: Rng + ?Sized>(
    rng: &mut R,
    attacker: &Team,
    target: GeoPoint,
    active: &[&Team],
    atlas: &CountyAtlas,
    snapshot: &OwnershipSnapshot,
    metric: DistanceMetric,
) -> Option<(TeamId, CountyId)> {
    let nearest = atlas.nearest(target, metric, |c| snapshot.contains(&c.id))?;
    let owner = snapshot.owner(&nearest.id)?;
    if *owner != attacker.id {
        return Some((owner.clone(), nearest.id.clone()));
    }

    let others: Vec<&Team> = active
        .iter()
        .copied()
        .filter(|t| t.id != attacker.id)
        .collect();
    let defender = others.choose(rng)?;
    let county = atlas.nearest(target, metric, |c| snapshot.owner(&c.id) == Some(&defender.id))?;
    Some((defender.id.clone(), county.id.clone()))
}

/// Spin for a full matchup
pub fn spin<R: Rng + ?Sized>(
    rng: &mut R,
    teams: &[Team],
    atlas: &CountyAtlas,
    snapshot: &OwnershipSnapshot,
    metric: DistanceMetric,
    config: &SpinnerConfig,
) -> Option<Matchup> {
    let active = active_teams(teams, snapshot);
    if active.len() < 2 {
        return None;
    }

    let attacker = *active.choose(rng)?;
    let direction = *Direction::ALL.choose(rng)?;
    let target = attack_target(attacker.seed, direction, config);
    let (defender, county) = find_defender(rng, attacker, target, &active, atlas, snapshot, metric)?;

    tracing::debug!(
        attacker = %attacker.id,
        direction = direction.abbrev(),
        defender = %defender,
        county = %county,
        "spin"
    );

    Some(Matchup {
        attacker: attacker.id.clone(),
        defender,
        county,
        direction,
        target,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::color::Color;
    use crate::map::county::County;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn team(id: &str, lat: f64, lon: f64) -> Team {
        Team::new(TeamId::new(id), id, Color::new(90, 90, 90), GeoPoint::new(lat, lon))
    }

    fn atlas() -> CountyAtlas {
        // A 3x3 grid, one degree apart, around (40, -90)
        let mut counties = Vec::new();
        for row in 0..3 {
            for col in 0..3 {
                let id = CountyId::new(format!("{}{}", row, col));
                counties.push(County::new(
                    id,
                    "c",
                    "",
                    GeoPoint::new(39.0 + row as f64, -91.0 + col as f64),
                ));
            }
        }
        CountyAtlas::new(counties).unwrap()
    }

    fn snapshot(owner_of: impl Fn(&str) -> &'static str) -> OwnershipSnapshot {
        atlas()
            .counties()
            .iter()
            .map(|c| (c.id.clone(), TeamId::new(owner_of(c.id.as_str()))))
            .collect()
    }

    #[test]
    fn test_attack_target_reach() {
        let config = SpinnerConfig::default();
        let origin = GeoPoint::new(40.0, -90.0);
        assert_eq!(attack_target(origin, Direction::North, &config), GeoPoint::new(42.0, -90.0));
        assert_eq!(attack_target(origin, Direction::SouthWest, &config), GeoPoint::new(38.5, -91.5));
    }

    #[test]
    fn test_defender_is_owner_of_target_county() {
        let atlas = atlas();
        // "west" owns column 0, "east" owns the rest
        let snap = snapshot(|id| if id.ends_with('0') { "west" } else { "east" });
        let east = team("east", 40.0, -89.0);
        let west = team("west", 40.0, -91.0);
        let active = vec![&east, &west];
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let target = attack_target(east.seed, Direction::West, &SpinnerConfig::default());
        let (defender, county) = find_defender(
            &mut rng, &east, target, &active, &atlas, &snap, DistanceMetric::Planar,
        )
        .unwrap();
        assert_eq!(defender.as_str(), "west");
        assert_eq!(county.as_str(), "10");
    }

    #[test]
    fn test_own_land_falls_back_to_other_team() {
        let atlas = atlas();
        let snap = snapshot(|id| if id == "22" { "small" } else { "big" });
        let big = team("big", 40.0, -90.0);
        let small = team("small", 41.0, -89.0);
        let active = vec![&big, &small];
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let target = attack_target(big.seed, Direction::South, &SpinnerConfig::default());
        let (defender, county) = find_defender(
            &mut rng, &big, target, &active, &atlas, &snap, DistanceMetric::Planar,
        )
        .unwrap();
        assert_eq!(defender.as_str(), "small");
        assert_eq!(county.as_str(), "22");
    }

    #[test]
    fn test_spin_is_seed_deterministic_and_valid() {
        let atlas = atlas();
        let snap = snapshot(|id| match id.as_bytes()[1] {
            b'0' => "a",
            b'1' => "b",
            _ => "c",
        });
        let teams = vec![team("a", 40.0, -91.0), team("b", 40.0, -90.0), team("c", 40.0, -89.0)];

        for seed in 0..50 {
            let first = spin(
                &mut ChaCha8Rng::seed_from_u64(seed),
                &teams, &atlas, &snap, DistanceMetric::Haversine, &SpinnerConfig::default(),
            )
            .unwrap();
            let second = spin(
                &mut ChaCha8Rng::seed_from_u64(seed),
                &teams, &atlas, &snap, DistanceMetric::Haversine, &SpinnerConfig::default(),
            )
            .unwrap();
            assert_eq!(first, second);
            assert_ne!(first.attacker, first.defender);
            assert_eq!(snap.owner(&first.county), Some(&first.defender));
        }
    }

    #[test]
    fn test_no_spin_when_one_team_left() {
        let atlas = atlas();
        let snap = snapshot(|_| "a");
        let teams = vec![team("a", 40.0, -91.0), team("b", 40.0, -90.0)];
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(spin(&mut rng, &teams, &atlas, &snap, DistanceMetric::Planar, &SpinnerConfig::default()).is_none());
    }

    #[test]
    fn test_eliminated_teams_never_attack() {
        let atlas = atlas();
        let snap = snapshot(|id| if id.starts_with('0') { "a" } else { "b" });
        let teams = vec![team("a", 39.0, -90.0), team("b", 41.0, -90.0), team("ghost", 40.0, -90.0)];
        for seed in 0..50 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let m = spin(&mut rng, &teams, &atlas, &snap, DistanceMetric::Planar, &SpinnerConfig::default()).unwrap();
            assert_ne!(m.attacker.as_str(), "ghost");
            assert_ne!(m.defender.as_str(), "ghost");
        }
    }
}
