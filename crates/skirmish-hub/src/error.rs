//! Error types for skirmish-hub

use skirmish_core::{ComponentType, EntityId};
use thiserror::Error;

/// Result type for skirmish-hub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in skirmish-hub
#[derive(Debug, Error)]
pub enum Error {
    /// A change failed its preconditions, or an id allocator ran dry; working
    /// state and changeset are untouched
    #[error("change rejected: {0}")]
    Change(#[from] skirmish_core::Error),

    /// The batch was rolled back because the change at `index` failed
    #[error("batch rolled back: change #{index} failed: {source}")]
    BatchFailed {
        /// Position of the failing change within the batch
        index: usize,
        /// Why it failed
        source: skirmish_core::Error,
    },

    /// A second component of the same type was attached while strict typing is on
    #[error("{entity} already has a {component_type} component")]
    DuplicateComponentType {
        entity: EntityId,
        component_type: ComponentType,
    },

    /// `begin_batch` called while a batch is open
    #[error("a batch is already open")]
    BatchAlreadyOpen,

    /// `commit_batch` or `abort_batch` called with no open batch
    #[error("no batch is open")]
    NoOpenBatch,

    /// Configuration could not be parsed
    #[error("config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The underlying core error, if this error carries one
    pub fn core_error(&self) -> Option<&skirmish_core::Error> {
        match self {
            Error::Change(err) | Error::BatchFailed { source: err, .. } => Some(err),
            _ => None,
        }
    }
}
