//! Ownership snapshot: which team owns each county at one point in time

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::core::types::{CountyId, TeamId};

/// Total mapping from county to owning team
///
/// Ordered so that equality, iteration and serialization are deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnershipSnapshot {
    owners: BTreeMap<CountyId, TeamId>,
}

impl OwnershipSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    pub fn owner(&self, county: &CountyId) -> Option<&TeamId> {
        self.owners.get(county)
    }

    pub fn contains(&self, county: &CountyId) -> bool {
        self.owners.contains_key(county)
    }

    /// Set the owner, returning the previous one
    pub fn set_owner(&mut self, county: CountyId, team: TeamId) -> Option<TeamId> {
        self.owners.insert(county, team)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CountyId, &TeamId)> {
        self.owners.iter()
    }

    /// Counties owned by `team`, in id order
    pub fn counties_of<'a>(&'a self, team: &'a TeamId) -> impl Iterator<Item = &'a CountyId> + 'a {
        self.owners
            .iter()
            .filter(move |(_, owner)| *owner == team)
            .map(|(county, _)| county)
    }

    pub fn count_for(&self, team: &TeamId) -> usize {
        self.owners.values().filter(|owner| *owner == team).count()
    }

    /// Teams that own at least one county
    pub fn owning_teams(&self) -> BTreeSet<&TeamId> {
        self.owners.values().collect()
    }

    /// County count per owning team
    pub fn tally(&self) -> BTreeMap<&TeamId, usize> {
        let mut tally = BTreeMap::new();
        for owner in self.owners.values() {
            *tally.entry(owner).or_insert(0) += 1;
        }
        tally
    }

    /// Counties whose owner differs between `self` and `other`
    ///
    /// Counties present in only one of the two snapshots count as changed.
    pub fn diff<'a>(&'a self, other: &'a OwnershipSnapshot) -> BTreeSet<&'a CountyId> {
        let mut changed: BTreeSet<&CountyId> = self
            .owners
            .iter()
            .filter(|(county, owner)| other.owner(county) != Some(*owner))
            .map(|(county, _)| county)
            .collect();
        changed.extend(other.owners.keys().filter(|c| !self.contains(c)));
        changed
    }
}

impl FromIterator<(CountyId, TeamId)> for OwnershipSnapshot {
    fn from_iter<I: IntoIterator<Item = (CountyId, TeamId)>>(iter: I) -> Self {
        Self {
            owners: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(pairs: &[(&str, &str)]) -> OwnershipSnapshot {
        pairs
            .iter()
            .map(|(c, t)| (CountyId::new(*c), TeamId::new(*t)))
            .collect()
    }

    #[test]
    fn test_tally_and_counties_of() {
        let s = snap(&[("1", "a"), ("2", "b"), ("3", "a")]);
        let a = TeamId::new("a");
        assert_eq!(s.count_for(&a), 2);
        let mine: Vec<&str> = s.counties_of(&a).map(|c| c.as_str()).collect();
        assert_eq!(mine, vec!["1", "3"]);
        assert_eq!(s.tally().get(&TeamId::new("b")), Some(&1));
        assert_eq!(s.owning_teams().len(), 2);
    }

    #[test]
    fn test_diff_is_symmetric_in_content() {
        let before = snap(&[("1", "a"), ("2", "b"), ("3", "a")]);
        let after = snap(&[("1", "a"), ("2", "a"), ("3", "b")]);
        let changed: Vec<&str> = before.diff(&after).into_iter().map(|c| c.as_str()).collect();
        assert_eq!(changed, vec!["2", "3"]);
        assert_eq!(before.diff(&after), after.diff(&before));
        assert!(before.diff(&before).is_empty());
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let s = snap(&[("01001", "bears")]);
        assert_eq!(serde_json::to_string(&s).unwrap(), r#"{"01001":"bears"}"#);
    }
}
