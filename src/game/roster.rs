//! Team roster and roster file parsing

use std::path::Path;

use rand::Rng;
use serde::Deserialize;

use crate::core::error::{GameError, Result};
use crate::core::types::{GeoPoint, TeamId};
use crate::map::color::Color;
use crate::map::team::Team;

/// Teams in the order they were entered
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TeamRoster {
    teams: Vec<Team>,
}

/// One `[[team]]` table in a roster file
#[derive(Debug, Deserialize)]
struct TeamEntry {
    id: Option<String>,
    name: String,
    lat: f64,
    lon: f64,
    color: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RosterFile {
    #[serde(default, rename = "team")]
    teams: Vec<TeamEntry>,
}

impl TeamRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_teams(teams: Vec<Team>) -> Result<Self> {
        let mut roster = Self::new();
        for team in teams {
            roster.add(team)?;
        }
        Ok(roster)
    }

    /// Parse a TOML roster; teams without a color get a random one
    pub fn from_toml_str<R: Rng + ?Sized>(content: &str, rng: &mut R) -> Result<Self> {
        let file: RosterFile = toml::from_str(content)?;
        let mut roster = Self::new();
        for entry in file.teams {
            let id = entry
                .id
                .map(TeamId::new)
                .unwrap_or_else(|| TeamId::slugify(&entry.name));
            let color = match entry.color {
                Some(text) => text.parse()?,
                None => Color::random(rng),
            };
            roster.add(Team::new(id, entry.name, color, GeoPoint::new(entry.lat, entry.lon)))?;
        }
        Ok(roster)
    }

    pub fn load<R: Rng + ?Sized>(path: &Path, rng: &mut R) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content, rng)
    }

    /// Add a team; ids must be unique, non-empty, and seeds valid
    pub fn add(&mut self, team: Team) -> Result<()> {
        if team.id.as_str().is_empty() {
            return Err(GameError::InvalidSetup(format!(
                "team {:?} has an empty id",
                team.name
            )));
        }
        if !team.seed.is_valid() {
            return Err(GameError::InvalidSetup(format!(
                "team {} has an invalid seed ({}, {})",
                team.id, team.seed.lat, team.seed.lon
            )));
        }
        if self.get(&team.id).is_some() {
            return Err(GameError::DuplicateTeam(team.id));
        }
        self.teams.push(team);
        Ok(())
    }

    pub fn remove(&mut self, id: &TeamId) -> Result<Team> {
        let index = self
            .teams
            .iter()
            .position(|t| &t.id == id)
            .ok_or_else(|| GameError::TeamNotFound(id.clone()))?;
        Ok(self.teams.remove(index))
    }

    pub fn get(&self, id: &TeamId) -> Option<&Team> {
        self.teams.iter().find(|t| &t.id == id)
    }

    fn get_mut(&mut self, id: &TeamId) -> Result<&mut Team> {
        self.teams
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| GameError::TeamNotFound(id.clone()))
    }

    pub fn rename(&mut self, id: &TeamId, name: impl Into<String>) -> Result<()> {
        self.get_mut(id)?.name = name.into();
        Ok(())
    }

    pub fn recolor(&mut self, id: &TeamId, color: Color) -> Result<()> {
        self.get_mut(id)?.color = color;
        Ok(())
    }

    /// Display name for an id, falling back to the id itself
    pub fn name_of<'a>(&'a self, id: &'a TeamId) -> &'a str {
        self.get(id).map(|t| t.name.as_str()).unwrap_or(id.as_str())
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn ids(&self) -> impl Iterator<Item = &TeamId> {
        self.teams.iter().map(|t| &t.id)
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }
}

/// Parse a quick `Name, lat, lon` team line
///
/// The name may itself contain commas; the last two fields are coordinates.
pub fn parse_team_line<R: Rng + ?Sized>(line: &str, rng: &mut R) -> Result<Team> {
    let mut fields = line.rsplitn(3, ',');
    let (lon, lat, name) = match (fields.next(), fields.next(), fields.next()) {
        (Some(lon), Some(lat), Some(name)) => (lon.trim(), lat.trim(), name.trim()),
        _ => {
            return Err(GameError::InvalidSetup(format!(
                "expected `Name, lat, lon`, got {:?}",
                line
            )))
        }
    };
    let parse = |field: &str| {
        field.parse::<f64>().map_err(|_| {
            GameError::InvalidSetup(format!("bad coordinate {:?} in {:?}", field, line))
        })
    };
    let seed = GeoPoint::new(parse(lat)?, parse(lon)?);
    if name.is_empty() {
        return Err(GameError::InvalidSetup(format!("missing team name in {:?}", line)));
    }
    Ok(Team::new(TeamId::slugify(name), name, Color::random(rng), seed))
}
