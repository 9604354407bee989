//! Immutable, structurally shared state store
//!
//! `GameState` holds every entity, every component and the scalar turn
//! fields. Each substructure sits behind an `Arc`:
//! - **Cloning a state is O(1)**: only reference counts change
//! - **Transitions copy on write**: `Arc::make_mut` copies a map only when
//!   it is shared, and copies the map of `Arc`s, never the values
//! - **Unchanged entities and components stay shared** between a state and
//!   its successor, so retaining old snapshots is cheap
//!
//! Only [`Change`](crate::Change) produces a modified state; the
//! copy-on-write accessors are crate-private.

use crate::{Component, ComponentId, ComponentKind, ComponentType, EntityId, Error, Result};
use crate::{IdWatermark, TeamId, Timestamp};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;
use std::sync::Arc;

type ComponentSet = IndexSet<ComponentId>;

/// Immutable snapshot of the whole simulation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GameState {
    /// Entity -> ids of the components attached to it
    entities: Arc<IndexMap<EntityId, Arc<ComponentSet>>>,
    /// Component id -> current value
    components: Arc<IndexMap<ComponentId, Arc<Component>>>,
    /// Team whose turn it is
    current_team: TeamId,
    /// When the current turn began
    turn_start: Option<Timestamp>,
    /// Whether the game has started
    started: bool,
}

impl GameState {
    /// Create an empty state: no entities, team 0, not started
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a state from raw parts, validating both referential invariants
    /// and the team range
    ///
    /// Used to restore a state received as a full snapshot.
    pub fn from_parts(
        entities: impl IntoIterator<Item = (EntityId, Vec<ComponentId>)>,
        components: impl IntoIterator<Item = Component>,
        current_team: TeamId,
        turn_start: Option<Timestamp>,
        started: bool,
    ) -> Result<Self> {
        let mut entity_map = IndexMap::new();
        for (entity, ids) in entities {
            let set: ComponentSet = ids.into_iter().collect();
            if entity_map.insert(entity, Arc::new(set)).is_some() {
                return Err(Error::DuplicateEntity(entity));
            }
        }

        let mut component_map = IndexMap::new();
        for component in components {
            let id = component.id();
            if component_map.insert(id, Arc::new(component)).is_some() {
                return Err(Error::DuplicateComponent(id));
            }
        }

        let state = Self {
            entities: Arc::new(entity_map),
            components: Arc::new(component_map),
            current_team,
            turn_start,
            started,
        };
        state.check_invariants()?;
        Ok(state)
    }

    // ========================================================================
    // Entity Read Methods
    // ========================================================================

    /// Check if an entity exists
    pub fn has_entity(&self, entity: EntityId) -> bool {
        self.entities.contains_key(&entity)
    }

    /// Iterate over all entities in insertion order
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    /// Get the number of entities
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Ids of the components attached to `entity`
    ///
    /// Empty when the entity does not exist.
    pub fn component_ids(&self, entity: EntityId) -> impl Iterator<Item = ComponentId> + '_ {
        self.entities
            .get(&entity)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Components attached to `entity`
    ///
    /// Empty when the entity does not exist.
    pub fn components_of(&self, entity: EntityId) -> impl Iterator<Item = &Component> + '_ {
        self.component_ids(entity)
            .filter_map(move |id| self.components.get(&id).map(|c| c.as_ref()))
    }

    /// Check whether `entity` owns `component`
    pub fn owns(&self, entity: EntityId, component: ComponentId) -> bool {
        self.entities
            .get(&entity)
            .is_some_and(|set| set.contains(&component))
    }

    /// Find the entity a component is attached to
    pub fn owner_of(&self, component: ComponentId) -> Option<EntityId> {
        self.entities
            .iter()
            .find(|(_, set)| set.contains(&component))
            .map(|(entity, _)| *entity)
    }

    // ========================================================================
    // Component Read Methods
    // ========================================================================

    /// Get a component by id
    pub fn component(&self, id: ComponentId) -> Option<&Component> {
        self.components.get(&id).map(|c| c.as_ref())
    }

    /// Iterate over all components in insertion order
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.values().map(|c| c.as_ref())
    }

    /// Get the number of components
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// First component of the given type on `entity`
    ///
    /// At most one component per type per entity is the usual convention;
    /// when there are several, the earliest attached wins.
    pub fn find_component(&self, entity: EntityId, ty: ComponentType) -> Option<&Component> {
        self.components_of(entity)
            .find(|c| c.component_type() == ty)
    }

    /// Typed payload of the first `T` component on `entity`
    pub fn get_component<T: ComponentKind>(&self, entity: EntityId) -> Option<&T> {
        self.components_of(entity)
            .find_map(|c| T::from_data(c.data()))
    }

    /// Like [`get_component`](Self::get_component), also returning the id
    pub fn get_component_with_id<T: ComponentKind>(
        &self,
        entity: EntityId,
    ) -> Option<(ComponentId, &T)> {
        self.components_of(entity)
            .find_map(|c| T::from_data(c.data()).map(|data| (c.id(), data)))
    }

    /// Highest entity id present
    pub fn max_entity_id(&self) -> Option<EntityId> {
        self.entities.keys().max().copied()
    }

    /// Highest component id present
    pub fn max_component_id(&self) -> Option<ComponentId> {
        self.components.keys().max().copied()
    }

    /// Highest ids present, as a floor for resuming allocation
    pub fn id_watermark(&self) -> IdWatermark {
        IdWatermark {
            entity: self.max_entity_id(),
            component: self.max_component_id(),
        }
    }

    // ========================================================================
    // Turn Read Methods
    // ========================================================================

    /// Team whose turn it is
    pub fn current_team(&self) -> TeamId {
        self.current_team
    }

    /// When the current turn started, if any turn has ended yet
    pub fn turn_start(&self) -> Option<Timestamp> {
        self.turn_start
    }

    /// Whether the game has started
    pub fn is_started(&self) -> bool {
        self.started
    }

    // ========================================================================
    // Sharing and invariants
    // ========================================================================

    /// Whether both states share the same entity map allocation
    pub fn shares_entities_with(&self, other: &GameState) -> bool {
        Arc::ptr_eq(&self.entities, &other.entities)
    }

    /// Whether both states hold the same allocation for component `id`
    pub fn shares_component_with(&self, other: &GameState, id: ComponentId) -> bool {
        match (self.components.get(&id), other.components.get(&id)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Verify that every referenced component exists and has a single owner,
    /// and that the current team is one of the playing teams
    pub fn check_invariants(&self) -> Result<()> {
        if !self.current_team.is_valid() {
            return Err(Error::InvalidTeam(self.current_team));
        }
        let mut seen = HashSet::new();
        for (entity, set) in self.entities.iter() {
            for id in set.iter() {
                if !self.components.contains_key(id) {
                    return Err(Error::UnknownComponent(*id));
                }
                if !seen.insert(*id) {
                    return Err(Error::ComponentNotOwned {
                        entity: *entity,
                        component: *id,
                    });
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Copy-on-write accessors used by Change
    // ========================================================================

    pub(crate) fn entities_mut(&mut self) -> &mut IndexMap<EntityId, Arc<ComponentSet>> {
        Arc::make_mut(&mut self.entities)
    }

    pub(crate) fn components_mut(&mut self) -> &mut IndexMap<ComponentId, Arc<Component>> {
        Arc::make_mut(&mut self.components)
    }

    pub(crate) fn component_set(&self, entity: EntityId) -> Option<&Arc<ComponentSet>> {
        self.entities.get(&entity)
    }

    pub(crate) fn set_started(&mut self) {
        self.started = true;
    }

    pub(crate) fn begin_turn(&mut self, team: TeamId, at: Timestamp) {
        self.current_team = team;
        self.turn_start = Some(at);
    }
}
