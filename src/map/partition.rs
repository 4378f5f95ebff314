//! Territory partitioner: nearest-seed (Voronoi) assignment of counties
//!
//! Every county with a usable centroid goes to the team whose seed is
//! closest under the configured metric. Seeds within `tie_epsilon` of the
//! best distance are tied and the smallest team id wins, so the result is
//! identical across runs, thread counts and input orderings.

use std::collections::BTreeSet;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::config::PartitionConfig;
use crate::core::error::{GameError, Result};
use crate::core::types::{CountyId, GeoPoint, TeamId};
use crate::history::snapshot::OwnershipSnapshot;
use crate::map::county::County;
use crate::map::metric::DistanceMetric;
use crate::map::team::Team;

/// A county left out of the partition and why
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeometryIssue {
    pub county: CountyId,
    pub reason: String,
}

/// Output of [`partition`]
#[derive(Clone, Debug, PartialEq)]
pub struct Partition {
    pub snapshot: OwnershipSnapshot,
    /// Counties rejected with `InvalidGeometry`, in input order
    pub excluded: Vec<GeometryIssue>,
}

/// Assign every county to its nearest team seed
pub fn partition(counties: &[County], teams: &[Team], config: &PartitionConfig) -> Result<Partition> {
    let seeds = sorted_seeds(teams)?;

    let mut seen = BTreeSet::new();
    for county in counties {
        if !seen.insert(&county.id) {
            return Err(GameError::InvalidSetup(format!(
                "county {} appears more than once",
                county.id
            )));
        }
    }

    let assign = |county: &County| -> std::result::Result<(CountyId, TeamId), GeometryIssue> {
        match county.checked_centroid() {
            Ok(point) => Ok((
                county.id.clone(),
                nearest_seed(point, &seeds, config.metric, config.tie_epsilon).clone(),
            )),
            Err(err) => Err(GeometryIssue {
                county: county.id.clone(),
                reason: match err {
                    GameError::InvalidGeometry { reason, .. } => reason,
                    other => other.to_string(),
                },
            }),
        }
    };

    let results: Vec<_> = if counties.len() >= config.parallel_threshold {
        counties.par_iter().map(assign).collect()
    } else {
        counties.iter().map(assign).collect()
    };

    let mut snapshot = OwnershipSnapshot::new();
    let mut excluded = Vec::new();
    for result in results {
        match result {
            Ok((county, team)) => {
                snapshot.set_owner(county, team);
            }
            Err(issue) => {
                tracing::warn!(county = %issue.county, reason = %issue.reason, "county excluded from partition");
                excluded.push(issue);
            }
        }
    }

    if snapshot.is_empty() {
        return Err(GameError::InvalidSetup(
            "no county has a usable centroid".to_string(),
        ));
    }

    tracing::info!(
        counties = snapshot.len(),
        teams = seeds.len(),
        excluded = excluded.len(),
        metric = config.metric.name(),
        "partition complete"
    );

    Ok(Partition { snapshot, excluded })
}

/// Validate the roster and return (id, seed) pairs sorted by id
fn sorted_seeds(teams: &[Team]) -> Result<Vec<(TeamId, GeoPoint)>> {
    if teams.is_empty() {
        return Err(GameError::InvalidSetup(
            "at least one team is required".to_string(),
        ));
    }

    let mut seeds: Vec<(TeamId, GeoPoint)> = Vec::with_capacity(teams.len());
    for team in teams {
        if !team.seed.is_valid() {
            return Err(GameError::InvalidSetup(format!(
                "team {} has an invalid seed ({}, {})",
                team.id, team.seed.lat, team.seed.lon
            )));
        }
        seeds.push((team.id.clone(), team.seed));
    }
    seeds.sort_by(|a, b| a.0.cmp(&b.0));

    if let Some(pair) = seeds.windows(2).find(|w| w[0].0 == w[1].0) {
        return Err(GameError::DuplicateTeam(pair[0].0.clone()));
    }

    Ok(seeds)
}

/// Smallest id among the seeds within `epsilon` of the minimum distance
///
/// `seeds` must be non-empty and sorted by id.
fn nearest_seed(
    point: GeoPoint,
    seeds: &[(TeamId, GeoPoint)],
    metric: DistanceMetric,
    epsilon: f64,
) -> &TeamId {
    let distances: Vec<f64> = seeds
        .iter()
        .map(|(_, seed)| metric.distance(point, *seed))
        .collect();
    let best = distances.iter().copied().fold(f64::INFINITY, f64::min);

    seeds
        .iter()
        .zip(&distances)
        .find(|(_, d)| **d <= best + epsilon)
        .map(|((id, _), _)| id)
        .unwrap_or(&seeds[0].0)
}
