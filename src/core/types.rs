//! Core type definitions used throughout the codebase

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable county key: 5-digit zero-padded FIPS code
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CountyId(pub String);

impl CountyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build an id from a numeric FIPS code (`1001` -> `"01001"`)
    pub fn from_fips(fips: u32) -> Self {
        Self(format!("{:05}", fips))
    }

    /// Normalize a raw FIPS field. Purely numeric input shorter than five
    /// digits is left-padded with zeros; anything else is kept trimmed.
    pub fn normalize(raw: &str) -> Self {
        let raw = raw.trim();
        if !raw.is_empty() && raw.len() < 5 && raw.bytes().all(|b| b.is_ascii_digit()) {
            Self(format!("{:0>5}", raw))
        } else {
            Self(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Immutable team identifier
///
/// Ordering is lexicographic on the underlying string; partition tie-breaks
/// depend on it.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TeamId(pub String);

impl TeamId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive an id from a display name: lowercase ASCII alphanumerics,
    /// everything else collapsed into single dashes.
    pub fn slugify(name: &str) -> Self {
        let mut slug = String::with_capacity(name.len());
        let mut pending_dash = false;
        for c in name.chars() {
            if c.is_ascii_alphanumeric() {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.push(c.to_ascii_lowercase());
            } else {
                pending_dash = true;
            }
        }
        Self(slug)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Unique identifier for a single game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub Uuid);

impl GameId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GameId {
    fn default() -> Self {
        Self::new()
    }
}

/// Geographic coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Finite and inside the lat/lon domain
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// Shift by a number of degrees (no wrapping; spinner offsets stay small)
    pub fn offset(&self, dlat: f64, dlon: f64) -> Self {
        Self {
            lat: self.lat + dlat,
            lon: self.lon + dlon,
        }
    }

    /// Convert to a `geo` point (x = lon, y = lat)
    pub fn to_point(self) -> geo_types::Point<f64> {
        geo_types::Point::new(self.lon, self.lat)
    }
}

/// Replay step: number of battle events applied on top of the initial snapshot
pub type Step = usize;

/// Compass direction of a spun attack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::NorthEast,
        Direction::NorthWest,
        Direction::SouthEast,
        Direction::SouthWest,
    ];

    pub fn is_diagonal(self) -> bool {
        matches!(
            self,
            Direction::NorthEast | Direction::NorthWest | Direction::SouthEast | Direction::SouthWest
        )
    }

    /// Unit steps on the (lat, lon) axes: north is +lat, east is +lon
    pub fn unit(self) -> (f64, f64) {
        match self {
            Direction::North => (1.0, 0.0),
            Direction::South => (-1.0, 0.0),
            Direction::East => (0.0, 1.0),
            Direction::West => (0.0, -1.0),
            Direction::NorthEast => (1.0, 1.0),
            Direction::NorthWest => (1.0, -1.0),
            Direction::SouthEast => (-1.0, 1.0),
            Direction::SouthWest => (-1.0, -1.0),
        }
    }

    pub fn abbrev(self) -> &'static str {
        match self {
            Direction::North => "N",
            Direction::South => "S",
            Direction::East => "E",
            Direction::West => "W",
            Direction::NorthEast => "NE",
            Direction::NorthWest => "NW",
            Direction::SouthEast => "SE",
            Direction::SouthWest => "SW",
        }
    }
}
