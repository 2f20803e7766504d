//! Ordered, append-only record of the snapshots taken during a run.

use serde::{Deserialize, Serialize};

use crate::snapshot::Snapshot;

/// Snapshots in collection order. Only the sampler appends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    entries: Vec<Snapshot>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, snapshot: Snapshot) -> &Snapshot {
        debug_assert!(
            self.entries
                .last()
                .is_none_or(|prev| prev.timestamp < snapshot.timestamp),
            "history timestamps must be strictly increasing"
        );
        self.entries.push(snapshot);
        &self.entries[self.entries.len() - 1]
    }

    pub fn all(&self) -> &[Snapshot] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn first(&self) -> Option<&Snapshot> {
        self.entries.first()
    }

    pub fn last(&self) -> Option<&Snapshot> {
        self.entries.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Snapshot> {
        self.entries.iter()
    }

    /// Pretty JSON array of every snapshot.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a Snapshot;
    type IntoIter = std::slice::Iter<'a, Snapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
