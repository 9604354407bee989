//! Skirmish Hub - Batch orchestrator for the authoritative simulation
//!
//! This crate owns the working [`GameState`] of one simulation instance and
//! is the only path through which it changes:
//!
//! ```text
//! gameplay subsystem
//!  │  apply(Change)
//!  ▼
//! GameStateChanger ──▶ Change::apply(state) ──▶ new state
//!  │   │
//!  │   ├── append to the batch Changeset
//!  │   └── notify every System (registration order)
//!  │
//!  └── commit_batch ──▶ CommittedBatch { seq, changeset } ──▶ BatchJournal
//!                                         │
//!                                         └──▶ serialized and sent to replicas
//! ```
//!
//! ## Key Components
//!
//! - [`GameStateChanger`]: applies changes, keeps the batch checkpoint and
//!   rolls back a batch that hit a failing change
//! - [`System`]: hooks through which subsystems keep derived indexes in step
//! - [`Messenger`]: interception channel whose handlers act on the changer
//! - [`BatchJournal`]: committed changesets plus periodic snapshots, for
//!   late-joining replicas and debugging
//! - [`ChangerConfig`]: RON-loadable settings

mod changer;
mod clock;
mod config;
mod error;
pub mod journal;
mod system;
mod type_index;

pub use changer::{CommittedBatch, GameStateChanger};
pub use clock::{FixedClock, SystemClock, TurnClock};
pub use config::ChangerConfig;
pub use error::{Error, Result};
pub use journal::{BatchJournal, CatchUp, JournalConfig, JournalEntry, JournalStats, Snapshot};
pub use system::System;
pub use type_index::TypeIndex;

// Re-export core types for convenience
pub use skirmish_core::{Change, ChangeKind, Changeset, GameState, IdWatermark};

/// Messenger whose handlers receive the orchestrator as their environment
pub type Messenger<C, A> = skirmish_messenger::Messenger<C, A, GameStateChanger>;
pub use skirmish_messenger::{Propagation, SubscriberId};
