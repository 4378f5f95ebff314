//! Distance metrics for nearest-seed assignment

use geo::HaversineDistance;
use serde::{Deserialize, Serialize};

use crate::core::types::GeoPoint;

/// How the distance between a county centroid and a team seed is measured
///
/// The metric is fixed when a game starts and written to the save file:
/// the two metrics disagree near territory boundaries.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Great-circle distance in metres on the mean Earth radius
    #[default]
    Haversine,
    /// Euclidean distance on raw (lat, lon) degrees
    Planar,
}

impl DistanceMetric {
    pub fn distance(self, a: GeoPoint, b: GeoPoint) -> f64 {
        match self {
            DistanceMetric::Haversine => a.to_point().haversine_distance(&b.to_point()),
            DistanceMetric::Planar => {
                let dlat = a.lat - b.lat;
                let dlon = a.lon - b.lon;
                (dlat * dlat + dlon * dlon).sqrt()
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DistanceMetric::Haversine => "haversine",
            DistanceMetric::Planar => "planar",
        }
    }
}
