//! The closed set of state transitions
//!
//! A [`Change`] carries only the data needed to reproduce its effect. Applying
//! it is a pure function of the input state: no clock, no randomness, no I/O.
//! Time-dependent changes (`EndTurn`) carry the instant chosen by the
//! authority, so every replica stamps the same value.
//!
//! Either every precondition holds and a complete new state is returned, or
//! the change fails and the caller keeps its input state untouched.

use crate::{Component, ComponentId, EntityId, Error, GameState, Result, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Discriminant of a [`Change`], with a stable numeric wire tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ChangeKind {
    StartGame = 0,
    CreateEntity = 1,
    DestroyEntity = 2,
    AttachComponent = 3,
    DetachComponent = 4,
    UpdateComponent = 5,
    EndTurn = 6,
}

impl ChangeKind {
    /// Get the numeric tag
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Look up a kind by numeric tag
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(ChangeKind::StartGame),
            1 => Some(ChangeKind::CreateEntity),
            2 => Some(ChangeKind::DestroyEntity),
            3 => Some(ChangeKind::AttachComponent),
            4 => Some(ChangeKind::DetachComponent),
            5 => Some(ChangeKind::UpdateComponent),
            6 => Some(ChangeKind::EndTurn),
            _ => None,
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// An atomic, serializable state transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Change {
    /// Mark the game as started
    StartGame,

    /// Insert a new entity with no components
    CreateEntity {
        /// The entity to create
        entity: EntityId,
    },

    /// Remove an entity and every component attached to it
    DestroyEntity {
        /// The entity to destroy
        entity: EntityId,
    },

    /// Attach a new component to an entity
    AttachComponent {
        /// The owning entity
        entity: EntityId,
        /// The full component value
        component: Component,
    },

    /// Detach a component from its entity and delete it
    DetachComponent {
        /// The owning entity
        entity: EntityId,
        /// The component to remove
        component: ComponentId,
    },

    /// Replace the stored value of an existing component
    UpdateComponent {
        /// The new value (same id and type as the stored one)
        component: Component,
    },

    /// Hand the turn to the next team
    EndTurn {
        /// Start time of the next turn
        at: Timestamp,
    },
}

impl Change {
    /// Start the game
    pub fn start_game() -> Self {
        Change::StartGame
    }

    /// Create `entity` with no components
    pub fn create_entity(entity: EntityId) -> Self {
        Change::CreateEntity { entity }
    }

    /// Destroy `entity` and every component attached to it
    pub fn destroy_entity(entity: EntityId) -> Self {
        Change::DestroyEntity { entity }
    }

    /// Attach a new component to `entity`
    pub fn attach(entity: EntityId, component: Component) -> Self {
        Change::AttachComponent { entity, component }
    }

    /// Detach `component` from `entity` and delete it
    pub fn detach(entity: EntityId, component: ComponentId) -> Self {
        Change::DetachComponent { entity, component }
    }

    /// Replace the value of an existing component, keeping its type
    pub fn update(component: Component) -> Self {
        Change::UpdateComponent { component }
    }

    /// End the turn; the next team's turn starts `at`
    pub fn end_turn(at: Timestamp) -> Self {
        Change::EndTurn { at }
    }

    /// Get the kind of this change
    pub fn kind(&self) -> ChangeKind {
        match self {
            Change::StartGame => ChangeKind::StartGame,
            Change::CreateEntity { .. } => ChangeKind::CreateEntity,
            Change::DestroyEntity { .. } => ChangeKind::DestroyEntity,
            Change::AttachComponent { .. } => ChangeKind::AttachComponent,
            Change::DetachComponent { .. } => ChangeKind::DetachComponent,
            Change::UpdateComponent { .. } => ChangeKind::UpdateComponent,
            Change::EndTurn { .. } => ChangeKind::EndTurn,
        }
    }

    /// The entity this change targets, if any
    pub fn entity(&self) -> Option<EntityId> {
        match self {
            Change::CreateEntity { entity }
            | Change::DestroyEntity { entity }
            | Change::AttachComponent { entity, .. }
            | Change::DetachComponent { entity, .. } => Some(*entity),
            Change::StartGame | Change::UpdateComponent { .. } | Change::EndTurn { .. } => None,
        }
    }

    /// Produce the successor of `state`, or fail without side effects
    pub fn apply(&self, state: &GameState) -> Result<GameState> {
        match self {
            Change::StartGame => {
                if state.is_started() {
                    return Err(Error::AlreadyStarted);
                }
                let mut next = state.clone();
                next.set_started();
                Ok(next)
            }

            Change::CreateEntity { entity } => {
                if state.has_entity(*entity) {
                    return Err(Error::DuplicateEntity(*entity));
                }
                let mut next = state.clone();
                next.entities_mut().insert(*entity, Arc::default());
                Ok(next)
            }

            Change::DestroyEntity { entity } => {
                let owned = state
                    .component_set(*entity)
                    .cloned()
                    .ok_or(Error::UnknownEntity(*entity))?;
                let mut next = state.clone();
                next.entities_mut().shift_remove(entity);
                if !owned.is_empty() {
                    let components = next.components_mut();
                    for id in owned.iter() {
                        components.shift_remove(id);
                    }
                }
                Ok(next)
            }

            Change::AttachComponent { entity, component } => {
                let owned = state
                    .component_set(*entity)
                    .ok_or(Error::UnknownEntity(*entity))?;
                let id = component.id();
                if state.component(id).is_some() || owned.contains(&id) {
                    return Err(Error::DuplicateComponent(id));
                }
                let mut next = state.clone();
                next.components_mut().insert(id, Arc::new(component.clone()));
                if let Some(set) = next.entities_mut().get_mut(entity) {
                    Arc::make_mut(set).insert(id);
                }
                Ok(next)
            }

            Change::DetachComponent { entity, component } => {
                let owned = state
                    .component_set(*entity)
                    .ok_or(Error::UnknownEntity(*entity))?;
                if state.component(*component).is_none() {
                    return Err(Error::UnknownComponent(*component));
                }
                if !owned.contains(component) {
                    return Err(Error::ComponentNotOwned {
                        entity: *entity,
                        component: *component,
                    });
                }
                let mut next = state.clone();
                if let Some(set) = next.entities_mut().get_mut(entity) {
                    Arc::make_mut(set).shift_remove(component);
                }
                next.components_mut().shift_remove(component);
                Ok(next)
            }

            Change::UpdateComponent { component } => {
                let id = component.id();
                let current = state.component(id).ok_or(Error::UnknownComponent(id))?;
                if current.component_type() != component.component_type() {
                    return Err(Error::ComponentTypeChanged {
                        component: id,
                        expected: current.component_type(),
                        found: component.component_type(),
                    });
                }
                let mut next = state.clone();
                next.components_mut().insert(id, Arc::new(component.clone()));
                Ok(next)
            }

            Change::EndTurn { at } => {
                if !state.is_started() {
                    return Err(Error::NotStarted);
                }
                let mut next = state.clone();
                next.begin_turn(state.current_team().next(), *at);
                Ok(next)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ComponentType, Health, Name, Team, TeamId};
    use chrono::{TimeZone, Utc};

    fn name(id: u64, value: &str) -> Component {
        Component::new(ComponentId(id), Name::new(value))
    }

    fn with_entity(entity: EntityId) -> GameState {
        Change::create_entity(entity)
            .apply(&GameState::new())
            .expect("create")
    }

    #[test]
    fn test_entity_lifecycle_scenario() {
        let e1 = EntityId(1);
        let state = with_entity(e1);
        let state = Change::attach(e1, name(1, "Falcon")).apply(&state).unwrap();
        let state = Change::attach(e1, Component::new(ComponentId(2), Team::new(0)))
            .apply(&state)
            .unwrap();

        let ids: Vec<_> = state.component_ids(e1).collect();
        assert_eq!(ids, vec![ComponentId(1), ComponentId(2)]);
        assert_eq!(
            state
                .component(ComponentId(1))
                .and_then(|c| c.get::<Name>().ok())
                .map(|n| n.name.as_str()),
            Some("Falcon")
        );

        let state = Change::destroy_entity(e1).apply(&state).unwrap();
        assert!(!state.has_entity(e1));
        assert!(state.component(ComponentId(1)).is_none());
        assert!(state.component(ComponentId(2)).is_none());
        assert_eq!(state.component_count(), 0);
    }

    #[test]
    fn test_create_duplicate_entity() {
        let state = with_entity(EntityId(1));
        assert_eq!(
            Change::create_entity(EntityId(1)).apply(&state),
            Err(Error::DuplicateEntity(EntityId(1)))
        );
    }

    #[test]
    fn test_destroy_unknown_entity() {
        assert_eq!(
            Change::destroy_entity(EntityId(4)).apply(&GameState::new()),
            Err(Error::UnknownEntity(EntityId(4)))
        );
    }

    #[test]
    fn test_attach_errors() {
        let state = with_entity(EntityId(1));
        assert_eq!(
            Change::attach(EntityId(2), name(1, "x")).apply(&state),
            Err(Error::UnknownEntity(EntityId(2)))
        );

        let state = Change::attach(EntityId(1), name(1, "x")).apply(&state).unwrap();
        let state = Change::create_entity(EntityId(2)).apply(&state).unwrap();
        // Component ids are global: another entity cannot reuse one
        assert_eq!(
            Change::attach(EntityId(2), name(1, "y")).apply(&state),
            Err(Error::DuplicateComponent(ComponentId(1)))
        );
    }

    #[test]
    fn test_detach() {
        let state = with_entity(EntityId(1));
        let state = Change::attach(EntityId(1), name(1, "x")).apply(&state).unwrap();
        let state = Change::create_entity(EntityId(2)).apply(&state).unwrap();

        assert_eq!(
            Change::detach(EntityId(3), ComponentId(1)).apply(&state),
            Err(Error::UnknownEntity(EntityId(3)))
        );
        assert_eq!(
            Change::detach(EntityId(1), ComponentId(9)).apply(&state),
            Err(Error::UnknownComponent(ComponentId(9)))
        );
        assert_eq!(
            Change::detach(EntityId(2), ComponentId(1)).apply(&state),
            Err(Error::ComponentNotOwned {
                entity: EntityId(2),
                component: ComponentId(1),
            })
        );

        let next = Change::detach(EntityId(1), ComponentId(1)).apply(&state).unwrap();
        assert!(next.has_entity(EntityId(1)));
        assert_eq!(next.component_ids(EntityId(1)).count(), 0);
        assert!(next.component(ComponentId(1)).is_none());
    }

    #[test]
    fn test_update() {
        let state = with_entity(EntityId(1));
        let hp = Component::new(ComponentId(1), Health::full(10));
        let state = Change::attach(EntityId(1), hp.clone()).apply(&state).unwrap();

        let hurt = hp.updated(Health { current: 3, max: 10 }).unwrap();
        let next = Change::update(hurt).apply(&state).unwrap();
        assert_eq!(
            next.get_component::<Health>(EntityId(1)).map(|h| h.current),
            Some(3)
        );
        assert_eq!(next.owner_of(ComponentId(1)), Some(EntityId(1)));
        // Ownership untouched, so the entity map is still shared
        assert!(next.shares_entities_with(&state));

        assert_eq!(
            Change::update(name(7, "ghost")).apply(&state),
            Err(Error::UnknownComponent(ComponentId(7)))
        );
        assert_eq!(
            Change::update(name(1, "not health")).apply(&state),
            Err(Error::ComponentTypeChanged {
                component: ComponentId(1),
                expected: ComponentType::Health,
                found: ComponentType::Name,
            })
        );
    }

    #[test]
    fn test_turn_cycle() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let state = GameState::new();

        assert_eq!(Change::end_turn(at).apply(&state), Err(Error::NotStarted));

        let started = Change::start_game().apply(&state).unwrap();
        assert!(started.is_started());
        assert_eq!(Change::start_game().apply(&started), Err(Error::AlreadyStarted));

        let next = Change::end_turn(at).apply(&started).unwrap();
        assert_eq!(next.current_team(), TeamId(1));
        assert_eq!(next.turn_start(), Some(at));

        let back = Change::end_turn(at).apply(&next).unwrap();
        assert_eq!(back.current_team(), TeamId(0));
    }

    #[test]
    fn test_apply_leaves_input_untouched() {
        let state = with_entity(EntityId(1));
        let before = state.clone();

        let next = Change::attach(EntityId(1), name(1, "x")).apply(&state).unwrap();
        assert_eq!(state, before);
        assert_eq!(state.component_count(), 0);
        assert_eq!(next.component_count(), 1);

        let _ = Change::create_entity(EntityId(1)).apply(&state);
        assert_eq!(state, before);
    }

    #[test]
    fn test_unchanged_components_stay_shared() {
        let state = with_entity(EntityId(1));
        let state = Change::attach(EntityId(1), name(1, "x")).apply(&state).unwrap();
        let state = Change::create_entity(EntityId(2)).apply(&state).unwrap();

        let next = Change::attach(EntityId(2), name(2, "y")).apply(&state).unwrap();
        assert!(next.shares_component_with(&state, ComponentId(1)));
    }

    #[test]
    fn test_kind_tags() {
        for tag in 0..=6u8 {
            let kind = ChangeKind::from_tag(tag).expect("known tag");
            assert_eq!(kind.tag(), tag);
        }
        assert_eq!(ChangeKind::from_tag(7), None);
        assert_eq!(Change::start_game().kind(), ChangeKind::StartGame);
        assert_eq!(
            Change::detach(EntityId(1), ComponentId(1)).kind(),
            ChangeKind::DetachComponent
        );
    }
}
