//! Error types for skirmish-core

use crate::{ComponentId, ComponentType, EntityId, TeamId};
use thiserror::Error;

/// Core error type
///
/// Every variant is a precondition violation. None of them are transient:
/// retrying the same change against the same state fails the same way.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Duplicate entity: {0}")]
    DuplicateEntity(EntityId),

    #[error("Unknown entity: {0}")]
    UnknownEntity(EntityId),

    #[error("Duplicate component: {0}")]
    DuplicateComponent(ComponentId),

    #[error("Unknown component: {0}")]
    UnknownComponent(ComponentId),

    #[error("Component {component} is not owned by {entity}")]
    ComponentNotOwned {
        entity: EntityId,
        component: ComponentId,
    },

    #[error("Game already started")]
    AlreadyStarted,

    #[error("Game not started")]
    NotStarted,

    #[error("Component {component} has type {expected}, update carries {found}")]
    ComponentTypeChanged {
        component: ComponentId,
        expected: ComponentType,
        found: ComponentType,
    },

    #[error("Component {component} has type {found}, expected {expected}")]
    WrongComponentType {
        component: ComponentId,
        expected: ComponentType,
        found: ComponentType,
    },

    #[error("Unknown component type: {0}")]
    UnknownComponentType(String),

    #[error("{0} is outside the playing teams")]
    InvalidTeam(TeamId),

    #[error("No {0} ids left to allocate")]
    IdSpaceExhausted(&'static str),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
