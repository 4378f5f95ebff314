//! Team - a competing side with a home seed on the map

use serde::{Deserialize, Serialize};

use crate::core::types::{GeoPoint, TeamId};
use crate::map::color::Color;

/// A competing team
///
/// `id` is fixed for the lifetime of a game; `name` and `color` are cosmetic
/// and may change at any time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub color: Color,
    /// Home location; only used for the initial partition and for spins
    pub seed: GeoPoint,
}

impl Team {
    pub fn new(id: TeamId, name: impl Into<String>, color: Color, seed: GeoPoint) -> Self {
        Self {
            id,
            name: name.into(),
            color,
            seed,
        }
    }
}
