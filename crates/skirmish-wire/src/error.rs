//! Error types for skirmish-wire

use skirmish_core::ChangeKind;
use thiserror::Error;

/// Wire error type
#[derive(Debug, Error)]
pub enum Error {
    /// Change-kind tag outside the known set
    #[error("Unknown change kind tag: {0}")]
    UnknownChangeKind(u8),

    /// Component type tag outside the known set
    #[error("Unknown component type tag: {0:?}")]
    UnknownComponentType(String),

    /// A record lacks a field its kind requires
    #[error("{kind} record is missing `{field}`")]
    MissingField {
        kind: ChangeKind,
        field: &'static str,
    },

    /// Serialization failed
    #[error("Encode error: {0}")]
    Encode(String),

    /// Malformed input
    #[error("Decode error: {0}")]
    Decode(String),

    /// A received changeset does not apply to the replica state
    #[error("Replay failed at change #{index}: {source}")]
    Replay {
        index: usize,
        source: skirmish_core::Error,
    },

    /// A packet arrived out of sequence
    #[error("Out of order: expected seq {expected}, got {got}")]
    OutOfOrder { expected: u64, got: u64 },

    /// A snapshot violates the state invariants
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(skirmish_core::Error),
}

/// Result type for wire operations
pub type Result<T> = std::result::Result<T, Error>;
