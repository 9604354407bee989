//! Journal of committed batches
//!
//! The journal keeps every committed changeset in sequence order together
//! with periodic state snapshots. Snapshots are cheap: a `GameState` clone
//! only bumps reference counts. Together they let a replica join late:
//! restore the newest snapshot, then replay the changesets committed after
//! it.
//!
//! # Example
//!
//! ```
//! use skirmish_hub::{ChangerConfig, GameStateChanger, GameState, JournalConfig};
//!
//! let config = ChangerConfig {
//!     journal: JournalConfig { enabled: true, snapshot_interval: 2, ..Default::default() },
//!     ..Default::default()
//! };
//! let mut changer = GameStateChanger::with_config(GameState::new(), config);
//!
//! for _ in 0..3 {
//!     changer.begin_batch().unwrap();
//!     changer.spawn_entity().unwrap();
//!     changer.commit_batch().unwrap();
//! }
//!
//! let catch_up = changer.journal().catch_up().unwrap();
//! assert_eq!(catch_up.base.seq, 2);
//! assert_eq!(catch_up.changesets.len(), 1);
//! ```

use serde::{Deserialize, Serialize};
use skirmish_core::{Changeset, GameState, IdWatermark};

/// Configuration for the journal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    /// Whether committed batches are recorded
    pub enabled: bool,
    /// Snapshot the state every N batches (0 = only the initial state)
    pub snapshot_interval: u64,
    /// Maximum number of batches to keep (0 = unlimited)
    pub max_batches: usize,
    /// Maximum number of snapshots to keep (0 = unlimited)
    pub max_snapshots: usize,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            snapshot_interval: 100,
            max_batches: 0,
            max_snapshots: 10,
        }
    }
}

/// A committed batch
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    /// Batch sequence number
    pub seq: u64,
    /// The changes committed in that batch
    pub changeset: Changeset,
}

/// State after the batch with sequence number `seq` (0 = initial state)
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub seq: u64,
    pub state: GameState,
    /// Highest ids allocated by then, including ids of destroyed objects
    pub ids: IdWatermark,
}

/// What a late-joining replica needs: a base state and the batches after it
#[derive(Debug, Clone)]
pub struct CatchUp<'a> {
    pub base: &'a Snapshot,
    /// Contiguous, starting at `base.seq + 1`
    pub changesets: Vec<&'a JournalEntry>,
}

/// Statistics about the journal
#[derive(Debug, Clone, PartialEq)]
pub struct JournalStats {
    /// Number of batches kept
    pub batch_count: usize,
    /// Number of changes across the kept batches
    pub change_count: usize,
    /// Number of snapshots kept
    pub snapshot_count: usize,
    /// Oldest batch kept
    pub first_seq: Option<u64>,
    /// Newest batch recorded
    pub last_seq: Option<u64>,
}

/// Record of committed batches and snapshots
#[derive(Debug, Clone, Default)]
pub struct BatchJournal {
    config: JournalConfig,
    entries: Vec<JournalEntry>,
    snapshots: Vec<Snapshot>,
    last_seq: Option<u64>,
}

impl BatchJournal {
    /// Create a journal with the given configuration
    pub fn new(config: JournalConfig) -> Self {
        Self {
            config,
            entries: Vec::new(),
            snapshots: Vec::new(),
            last_seq: None,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &JournalConfig {
        &self.config
    }

    /// Check if recording is enabled
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Record the state the simulation starts from as snapshot 0
    pub fn record_genesis(&mut self, state: &GameState, ids: IdWatermark) {
        if !self.config.enabled {
            return;
        }
        self.entries.clear();
        self.snapshots.clear();
        self.last_seq = None;
        self.snapshots.push(Snapshot {
            seq: 0,
            state: state.clone(),
            ids,
        });
    }

    /// Record a committed batch and the state it produced
    pub fn record(&mut self, seq: u64, changeset: &Changeset, state: &GameState, ids: IdWatermark) {
        if !self.config.enabled {
            return;
        }

        self.entries.push(JournalEntry {
            seq,
            changeset: changeset.clone(),
        });
        self.last_seq = Some(seq);

        if self.config.snapshot_interval > 0 && seq % self.config.snapshot_interval == 0 {
            self.snapshots.push(Snapshot {
                seq,
                state: state.clone(),
                ids,
            });
        }

        self.enforce_limits();
    }

    /// Get all kept batches
    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    /// Get all kept snapshots
    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// Newest snapshot taken at or before `seq`
    pub fn snapshot_at_or_before(&self, seq: u64) -> Option<&Snapshot> {
        self.snapshots
            .iter()
            .filter(|s| s.seq <= seq)
            .max_by_key(|s| s.seq)
    }

    /// Every batch committed after `seq`, in order
    ///
    /// Returns `None` when some of those batches were already evicted.
    pub fn changesets_after(&self, seq: u64) -> Option<Vec<&JournalEntry>> {
        let after: Vec<&JournalEntry> = self.entries.iter().filter(|e| e.seq > seq).collect();
        match after.first() {
            Some(first) if first.seq != seq + 1 => None,
            Some(_) => Some(after),
            None if self.last_seq.is_some_and(|last| last > seq) => None,
            None => Some(after),
        }
    }

    /// Newest snapshot plus the batches after it, for a late-joining replica
    pub fn catch_up(&self) -> Option<CatchUp<'_>> {
        self.snapshots.iter().rev().find_map(|base| {
            self.changesets_after(base.seq)
                .map(|changesets| CatchUp { base, changesets })
        })
    }

    /// Get statistics about the journal
    pub fn stats(&self) -> JournalStats {
        JournalStats {
            batch_count: self.entries.len(),
            change_count: self.entries.iter().map(|e| e.changeset.len()).sum(),
            snapshot_count: self.snapshots.len(),
            first_seq: self.entries.first().map(|e| e.seq),
            last_seq: self.last_seq,
        }
    }

    /// Drop every batch and snapshot
    pub fn clear(&mut self) {
        self.entries.clear();
        self.snapshots.clear();
        self.last_seq = None;
    }

    fn enforce_limits(&mut self) {
        if self.config.max_batches > 0 && self.entries.len() > self.config.max_batches {
            let excess = self.entries.len() - self.config.max_batches;
            self.entries.drain(0..excess);
        }
        if self.config.max_snapshots > 0 && self.snapshots.len() > self.config.max_snapshots {
            let excess = self.snapshots.len() - self.config.max_snapshots;
            self.snapshots.drain(0..excess);
        }
    }
}
