//! Field-level changesets.

use std::collections::BTreeMap;

use crate::entity::FieldValue;

/// Old and new value of one member.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub old: FieldValue,
    pub new: FieldValue,
}

/// Member name → `(old, new)` for every member that changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changeset {
    changes: BTreeMap<String, FieldChange>,
}

impl Changeset {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a change, replacing any earlier entry for the same member.
    pub fn record(&mut self, name: impl Into<String>, old: FieldValue, new: FieldValue) {
        self.changes.insert(name.into(), FieldChange { old, new });
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldChange> {
        self.changes.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.changes.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Changed member names, sorted.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.changes.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldChange)> {
        self.changes.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl IntoIterator for Changeset {
    type Item = (String, FieldChange);
    type IntoIter = std::collections::btree_map::IntoIter<String, FieldChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}
