//! Identity types for entities and components

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Identifier types that can be minted from a raw counter value
pub trait RawId: Copy + Ord {
    /// What the id names, for error messages
    const KIND: &'static str;

    /// Build the identifier from its raw value
    fn from_raw(raw: u64) -> Self;

    /// Get the raw value
    fn raw(&self) -> u64;
}

/// Opaque identifier of a simulation object
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Create a new entity ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity:{}", self.0)
    }
}

impl RawId for EntityId {
    const KIND: &'static str = "entity";

    fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    fn raw(&self) -> u64 {
        self.0
    }
}

/// Globally unique identifier of a component value
///
/// Assigned once when the component is created. Updates keep the id, and a
/// component never moves to another entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ComponentId(pub u64);

impl ComponentId {
    /// Create a new component ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component:{}", self.0)
    }
}

impl RawId for ComponentId {
    const KIND: &'static str = "component";

    fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    fn raw(&self) -> u64 {
        self.0
    }
}

/// Monotone id allocator scoped to one simulation instance
///
/// Ids start at 1 and are never handed out twice, so a stale reference to a
/// destroyed entity can be detected instead of silently resolving to a new one.
/// Once `u64::MAX` has been handed out the allocator refuses further requests.
#[derive(Debug, Clone)]
pub struct IdAllocator<I> {
    /// `None` once the id space is used up
    next: Option<u64>,
    _marker: PhantomData<I>,
}

impl<I: RawId> IdAllocator<I> {
    /// Create an allocator whose first id is 1
    pub fn new() -> Self {
        Self {
            next: Some(1),
            _marker: PhantomData,
        }
    }

    /// Create an allocator that resumes after `highest`
    ///
    /// Used when a simulation instance is restored from an existing state.
    pub fn after(highest: Option<I>) -> Self {
        Self {
            next: highest.map_or(Some(1), |id| id.raw().checked_add(1)),
            _marker: PhantomData,
        }
    }

    /// Allocate the next id
    pub fn allocate(&mut self) -> Result<I> {
        let raw = self.next.ok_or(Error::IdSpaceExhausted(I::KIND))?;
        self.next = raw.checked_add(1);
        Ok(I::from_raw(raw))
    }

    /// Peek at the id the next call to `allocate` returns
    pub fn peek(&self) -> Option<I> {
        self.next.map(I::from_raw)
    }

    /// Highest id this allocator has reserved, handed out or resumed past
    pub fn high_water(&self) -> Option<I> {
        match self.next {
            Some(1) => None,
            Some(next) => Some(I::from_raw(next - 1)),
            None => Some(I::from_raw(u64::MAX)),
        }
    }
}

/// Highest entity and component ids a simulation instance has used
///
/// Carried alongside a state when it is saved, so a restored instance keeps
/// allocating past ids that were destroyed before the save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdWatermark {
    pub entity: Option<EntityId>,
    pub component: Option<ComponentId>,
}

impl IdWatermark {
    /// The higher of both marks, per id kind
    pub fn max(self, other: IdWatermark) -> IdWatermark {
        IdWatermark {
            entity: self.entity.max(other.entity),
            component: self.component.max(other.component),
        }
    }
}

impl<I: RawId> Default for IdAllocator<I> {
    fn default() -> Self {
        Self::new()
    }
}
