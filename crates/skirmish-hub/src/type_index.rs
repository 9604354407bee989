//! Built-in index: component type -> entities owning such a component

use crate::System;
use indexmap::{IndexMap, IndexSet};
use skirmish_core::{Component, ComponentType, EntityId, GameState};

/// Tracks which entities carry a component of each type
///
/// # Example
///
/// ```
/// use skirmish_core::{ComponentType, Health};
/// use skirmish_hub::{GameStateChanger, TypeIndex};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let index = Rc::new(RefCell::new(TypeIndex::new()));
/// let mut changer = GameStateChanger::new();
/// changer.register_system(Rc::clone(&index));
///
/// let unit = changer.spawn_entity().unwrap();
/// changer.attach(unit, Health::full(10)).unwrap();
///
/// assert!(index.borrow().contains(ComponentType::Health, unit));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TypeIndex {
    by_type: IndexMap<ComponentType, IndexSet<EntityId>>,
}

impl TypeIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Entities carrying at least one component of type `ty`
    pub fn entities_with(&self, ty: ComponentType) -> impl Iterator<Item = EntityId> + '_ {
        self.by_type
            .get(&ty)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Number of entities carrying a component of type `ty`
    pub fn count(&self, ty: ComponentType) -> usize {
        self.by_type.get(&ty).map_or(0, |set| set.len())
    }

    /// Whether `entity` carries a component of type `ty`
    pub fn contains(&self, ty: ComponentType, entity: EntityId) -> bool {
        self.by_type
            .get(&ty)
            .is_some_and(|set| set.contains(&entity))
    }

    fn insert(&mut self, ty: ComponentType, entity: EntityId) {
        self.by_type.entry(ty).or_default().insert(entity);
    }

    fn remove(&mut self, ty: ComponentType, entity: EntityId) {
        if let Some(set) = self.by_type.get_mut(&ty) {
            set.shift_remove(&entity);
        }
    }
}

impl System for TypeIndex {
    fn name(&self) -> &'static str {
        "type_index"
    }

    fn rebuild(&mut self, state: &GameState) {
        self.by_type.clear();
        for entity in state.entities() {
            for component in state.components_of(entity) {
                self.insert(component.component_type(), entity);
            }
        }
    }

    fn entity_destroyed(&mut self, _state: &GameState, entity: EntityId, removed: &[Component]) {
        for component in removed {
            self.remove(component.component_type(), entity);
        }
    }

    fn component_attached(&mut self, _state: &GameState, entity: EntityId, component: &Component) {
        self.insert(component.component_type(), entity);
    }

    fn component_detached(&mut self, state: &GameState, entity: EntityId, component: &Component) {
        let ty = component.component_type();
        // Another component of the same type may still be attached
        if state.find_component(entity, ty).is_none() {
            self.remove(ty, entity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::{Change, ComponentId, Health, Name};

    fn named(id: u64) -> Component {
        Component::new(ComponentId(id), Name::new("n"))
    }

    #[test]
    fn test_rebuild_from_state() {
        let state = GameState::from_parts(
            vec![
                (EntityId(1), vec![ComponentId(1), ComponentId(2)]),
                (EntityId(2), vec![ComponentId(3)]),
            ],
            vec![
                named(1),
                Component::new(ComponentId(2), Health::full(5)),
                named(3),
            ],
            Default::default(),
            None,
            false,
        )
        .unwrap();

        let mut index = TypeIndex::new();
        index.rebuild(&state);

        assert_eq!(index.count(ComponentType::Name), 2);
        assert_eq!(
            index.entities_with(ComponentType::Health).collect::<Vec<_>>(),
            vec![EntityId(1)]
        );
        assert_eq!(index.count(ComponentType::Team), 0);
    }

    #[test]
    fn test_detach_keeps_entity_while_same_type_remains() {
        let state = Change::create_entity(EntityId(1))
            .apply(&GameState::new())
            .unwrap();
        let state = Change::attach(EntityId(1), named(1)).apply(&state).unwrap();
        let state = Change::attach(EntityId(1), named(2)).apply(&state).unwrap();

        let mut index = TypeIndex::new();
        index.rebuild(&state);

        let after = Change::detach(EntityId(1), ComponentId(1))
            .apply(&state)
            .unwrap();
        index.component_detached(&after, EntityId(1), &named(1));
        assert!(index.contains(ComponentType::Name, EntityId(1)));

        let last = Change::detach(EntityId(1), ComponentId(2))
            .apply(&after)
            .unwrap();
        index.component_detached(&last, EntityId(1), &named(2));
        assert!(!index.contains(ComponentType::Name, EntityId(1)));
    }
}
