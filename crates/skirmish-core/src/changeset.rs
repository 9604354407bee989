//! Ordered log of changes, the unit of replication
//!
//! A `Changeset` is created empty at the start of a batch, grows by append as
//! changes are committed, and is replayed in order on every replica. Later
//! changes may depend on earlier ones, so the order is never rearranged.

use crate::{Change, Error, GameState};
use serde::{Deserialize, Serialize};

/// An ordered sequence of changes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Changeset {
    /// The changes in application order
    changes: Vec<Change>,
}

impl Changeset {
    /// Create a new empty changeset
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a change
    pub fn push(&mut self, change: Change) {
        self.changes.push(change);
    }

    /// Append every change of another changeset
    pub fn extend(&mut self, other: Changeset) {
        self.changes.extend(other.changes);
    }

    /// Get the number of changes
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Check if the changeset is empty
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Get an iterator over the changes
    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.changes.iter()
    }

    /// Get a reference to the underlying changes
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Consume the changeset and return the underlying changes
    pub fn into_changes(self) -> Vec<Change> {
        self.changes
    }

    /// Remove every change
    pub fn clear(&mut self) {
        self.changes.clear();
    }

    /// Replay every change against `state`, in order
    ///
    /// All or nothing: on failure the index of the offending change is
    /// returned together with its error, and no intermediate state escapes.
    pub fn apply_to(&self, state: &GameState) -> Result<GameState, (usize, Error)> {
        let mut current = state.clone();
        for (index, change) in self.changes.iter().enumerate() {
            current = change.apply(&current).map_err(|err| (index, err))?;
        }
        Ok(current)
    }
}

impl From<Vec<Change>> for Changeset {
    fn from(changes: Vec<Change>) -> Self {
        Self { changes }
    }
}

impl FromIterator<Change> for Changeset {
    fn from_iter<T: IntoIterator<Item = Change>>(iter: T) -> Self {
        Self {
            changes: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Changeset {
    type Item = Change;
    type IntoIter = std::vec::IntoIter<Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

impl<'a> IntoIterator for &'a Changeset {
    type Item = &'a Change;
    type IntoIter = std::slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}
