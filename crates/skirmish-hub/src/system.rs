//! Contract between the orchestrator and gameplay subsystems
//!
//! A System owns derived indexes over the state (which entity stands on a
//! cell, which units wait in a hanger...). It never builds changes; it only
//! reads the state it is handed and reacts to lifecycle hooks, which the
//! [`GameStateChanger`](crate::GameStateChanger) calls synchronously after
//! each committed change, in registration order.
//!
//! | Change            | Hook                 |
//! |-------------------|----------------------|
//! | `CreateEntity`    | `entity_created`     |
//! | `DestroyEntity`   | `entity_destroyed`   |
//! | `AttachComponent` | `component_attached` |
//! | `DetachComponent` | `component_detached` |
//! | `EndTurn`         | `process_turn_end`   |
//! | `UpdateComponent` | none                 |
//! | `StartGame`       | none                 |
//!
//! `rebuild` runs when the system is registered and whenever a batch is
//! rolled back, so indexes never drift from the working state.

use skirmish_core::{Component, EntityId, GameState};
use std::cell::RefCell;
use std::rc::Rc;

/// A subsystem keeping derived indexes in step with the state
///
/// Every hook receives the state *after* the change. Hooks must not call
/// back into the orchestrator.
pub trait System {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Recompute every index from scratch
    fn rebuild(&mut self, _state: &GameState) {}

    fn entity_created(&mut self, _state: &GameState, _entity: EntityId) {}

    /// `removed` holds the components that were attached to the entity
    fn entity_destroyed(&mut self, _state: &GameState, _entity: EntityId, _removed: &[Component]) {}

    fn component_attached(&mut self, _state: &GameState, _entity: EntityId, _component: &Component) {
    }

    /// `component` is the value that was detached
    fn component_detached(&mut self, _state: &GameState, _entity: EntityId, _component: &Component) {
    }

    /// The turn passed to `state.current_team()`
    fn process_turn_end(&mut self, _state: &GameState) {}
}

/// Shared handle: register a clone with the orchestrator, read the other
impl<S: System> System for Rc<RefCell<S>> {
    fn name(&self) -> &'static str {
        self.borrow().name()
    }

    fn rebuild(&mut self, state: &GameState) {
        self.borrow_mut().rebuild(state);
    }

    fn entity_created(&mut self, state: &GameState, entity: EntityId) {
        self.borrow_mut().entity_created(state, entity);
    }

    fn entity_destroyed(&mut self, state: &GameState, entity: EntityId, removed: &[Component]) {
        self.borrow_mut().entity_destroyed(state, entity, removed);
    }

    fn component_attached(&mut self, state: &GameState, entity: EntityId, component: &Component) {
        self.borrow_mut().component_attached(state, entity, component);
    }

    fn component_detached(&mut self, state: &GameState, entity: EntityId, component: &Component) {
        self.borrow_mut().component_detached(state, entity, component);
    }

    fn process_turn_end(&mut self, state: &GameState) {
        self.borrow_mut().process_turn_end(state);
    }
}
