//! Skirmish Core - Immutable simulation state and replicable changes
//!
//! This crate provides the data model shared by the authoritative process
//! and every replica:
//! - Entity and component identifiers with per-instance allocators
//! - Typed components stored as a closed tagged union
//! - `GameState`, an immutable, structurally shared snapshot
//! - `Change`, the closed set of pure state transitions
//! - `Changeset`, the ordered log of changes used as the unit of replication
//!
//! Nothing in this crate mutates a `GameState` in place. Every transition
//! goes through [`Change::apply`], which either produces a new state or
//! fails without touching its input.
//!
//! # Example
//!
//! ```
//! use skirmish_core::{Change, Component, ComponentId, EntityId, GameState, Name};
//!
//! let empty = GameState::new();
//! let entity = EntityId::new(1);
//! let state = Change::create_entity(entity).apply(&empty).unwrap();
//! let state = Change::attach(entity, Component::new(ComponentId::new(1), Name::new("Falcon")))
//!     .apply(&state)
//!     .unwrap();
//!
//! assert_eq!(state.get_component::<Name>(entity).map(|n| n.name.as_str()), Some("Falcon"));
//! assert!(!empty.has_entity(entity));
//! ```

mod change;
mod changeset;
mod component;
mod error;
mod identity;
mod state;
mod turn;

pub use change::{Change, ChangeKind};
pub use changeset::Changeset;
pub use component::{
    Charge, Component, ComponentData, ComponentKind, ComponentType, Deployable, Health, Name,
    Position, Team,
};
pub use error::{Error, Result};
pub use identity::{ComponentId, EntityId, IdAllocator, IdWatermark, RawId};
pub use state::GameState;
pub use turn::{TeamId, Timestamp, TEAM_COUNT};
