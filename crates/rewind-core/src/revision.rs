//! Revisions and revision collections.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entity::EntityRef;
use crate::errors::CoreError;
use crate::identifier::Identifier;

/// What happened to an identity at a revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RevisionKind {
    #[serde(rename = "INS")]
    Create,
    #[serde(rename = "UPD")]
    Update,
    #[serde(rename = "DEL")]
    Delete,
}

impl RevisionKind {
    /// Marker stored in the revision-kind column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "INS",
            Self::Update => "UPD",
            Self::Delete => "DEL",
        }
    }

    #[must_use]
    pub const fn is_delete(self) -> bool {
        matches!(self, Self::Delete)
    }
}

impl fmt::Display for RevisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RevisionKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "INS" => Ok(Self::Create),
            "UPD" => Ok(Self::Update),
            "DEL" => Ok(Self::Delete),
            other => Err(CoreError::InvalidRevisionKind(other.to_string())),
        }
    }
}

/// One historical snapshot of a tracked identity.
#[derive(Debug, Clone)]
pub struct HistoryRevision {
    revision: i64,
    kind: RevisionKind,
    identifier: Identifier,
    entity: EntityRef,
}

impl HistoryRevision {
    #[must_use]
    pub const fn new(
        revision: i64,
        kind: RevisionKind,
        identifier: Identifier,
        entity: EntityRef,
    ) -> Self {
        Self {
            revision,
            kind,
            identifier,
            entity,
        }
    }

    #[must_use]
    pub const fn revision(&self) -> i64 {
        self.revision
    }

    #[must_use]
    pub const fn kind(&self) -> RevisionKind {
        self.kind
    }

    #[must_use]
    pub const fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    #[must_use]
    pub const fn entity(&self) -> &EntityRef {
        &self.entity
    }
}

/// Revisions grouped by identity, each group in row-arrival order.
#[derive(Debug, Clone, Default)]
pub struct HistoryCollection {
    groups: Vec<(Identifier, Vec<HistoryRevision>)>,
    index: HashMap<String, usize>,
}

impl HistoryCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a revision to its identity's group, creating the group on
    /// first sight.
    pub fn push(&mut self, revision: HistoryRevision) {
        let key = revision.identifier().key();
        if let Some(&idx) = self.index.get(&key) {
            self.groups[idx].1.push(revision);
        } else {
            self.index.insert(key, self.groups.len());
            self.groups
                .push((revision.identifier().clone(), vec![revision]));
        }
    }

    /// Revisions recorded for `identifier`, empty if none.
    #[must_use]
    pub fn revisions(&self, identifier: &Identifier) -> &[HistoryRevision] {
        match self.index.get(&identifier.key()) {
            Some(&idx) => &self.groups[idx].1,
            None => &[],
        }
    }

    #[must_use]
    pub fn count(&self, identifier: &Identifier) -> usize {
        self.revisions(identifier).len()
    }

    /// Identities in first-seen order.
    pub fn identifiers(&self) -> impl Iterator<Item = &Identifier> {
        self.groups.iter().map(|(id, _)| id)
    }

    /// Number of distinct identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of revisions across all identities.
    #[must_use]
    pub fn total(&self) -> usize {
        self.groups.iter().map(|(_, revs)| revs.len()).sum()
    }

    /// All revisions, grouped by identity in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryRevision> {
        self.groups.iter().flat_map(|(_, revs)| revs.iter())
    }

    /// Flatten into a single list, grouped by identity in first-seen order.
    #[must_use]
    pub fn into_revisions(self) -> Vec<HistoryRevision> {
        self.groups.into_iter().flat_map(|(_, revs)| revs).collect()
    }
}
