//! Priority pub/sub channel with a per-entity re-entrancy guard

use log::{trace, warn};
use skirmish_core::EntityId;
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

/// Handle returned by [`Messenger::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Get the raw ID value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Whether lower-priority handlers still run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    /// Pass the argument on to the next handler
    Continue,
    /// End the chain; the current argument is the result
    Stop,
}

type Handler<C, A, E> = Rc<dyn Fn(&C, A, EntityId, &mut E) -> (A, Propagation)>;

struct Subscriber<C, A, E> {
    id: SubscriberId,
    priority: i32,
    handler: Handler<C, A, E>,
}

/// Priority-ordered interception channel
///
/// - `C` is the read-only context describing the effect (attacker, target...)
/// - `A` is the value threaded through the handlers and returned to the caller
/// - `E` is the environment every handler may act on, typically the
///   orchestrator owning the working state
///
/// Handlers run in descending priority; equal priorities keep registration
/// order. `subscribe`, `unsubscribe` and `publish` take `&self`, so a handler
/// holding a (weak) reference to its messenger can subscribe or publish
/// from inside the chain.
pub struct Messenger<C, A, E> {
    name: String,
    /// Kept sorted by descending priority, stable for ties
    subscribers: RefCell<Vec<Subscriber<C, A, E>>>,
    next_id: Cell<u64>,
    /// Originating entities with a publish in progress
    in_flight: RefCell<HashSet<EntityId>>,
}

impl<C, A, E> Messenger<C, A, E> {
    /// Create a messenger; the name only appears in logs
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subscribers: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
            in_flight: RefCell::new(HashSet::new()),
        }
    }

    /// Get the messenger name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a handler; higher priority runs first
    pub fn subscribe<F>(&self, priority: i32, handler: F) -> SubscriberId
    where
        F: Fn(&C, A, EntityId, &mut E) -> (A, Propagation) + 'static,
    {
        let id = SubscriberId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let mut subscribers = self.subscribers.borrow_mut();
        let position = subscribers.partition_point(|s| s.priority >= priority);
        subscribers.insert(
            position,
            Subscriber {
                id,
                priority,
                handler: Rc::new(handler),
            },
        );
        trace!(
            "messenger `{}`: subscriber {} registered at priority {}",
            self.name,
            id.0,
            priority
        );
        id
    }

    /// Remove a handler; returns false if it was not registered
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }

    /// Get the number of registered handlers
    pub fn len(&self) -> usize {
        self.subscribers.borrow().len()
    }

    /// Check if no handler is registered
    pub fn is_empty(&self) -> bool {
        self.subscribers.borrow().is_empty()
    }

    /// Check whether a publish for `origin` is in progress
    pub fn is_publishing(&self, origin: EntityId) -> bool {
        self.in_flight.borrow().contains(&origin)
    }

    /// Run `arg` through the handler chain and return the final value
    ///
    /// The chain is the set of handlers registered when the call starts.
    /// A nested call for an `origin` that is already being published is
    /// refused: `arg` comes back unchanged and no handler runs.
    pub fn publish(&self, context: &C, arg: A, origin: EntityId, env: &mut E) -> A {
        if !self.in_flight.borrow_mut().insert(origin) {
            warn!(
                "messenger `{}`: nested publish for {} refused",
                self.name, origin
            );
            return arg;
        }
        let _guard = InFlight {
            set: &self.in_flight,
            origin,
        };

        let chain: Vec<(SubscriberId, Handler<C, A, E>)> = self
            .subscribers
            .borrow()
            .iter()
            .map(|s| (s.id, Rc::clone(&s.handler)))
            .collect();

        let mut arg = arg;
        for (id, handler) in chain {
            let (next, propagation) = handler(context, arg, origin, env);
            arg = next;
            if propagation == Propagation::Stop {
                trace!(
                    "messenger `{}`: subscriber {} stopped the chain for {}",
                    self.name,
                    id.0,
                    origin
                );
                break;
            }
        }
        arg
    }
}

impl<C, A, E> fmt::Debug for Messenger<C, A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Messenger")
            .field("name", &self.name)
            .field("subscribers", &self.len())
            .finish()
    }
}

/// Clears the in-flight mark when a publish returns or unwinds
struct InFlight<'a> {
    set: &'a RefCell<HashSet<EntityId>>,
    origin: EntityId,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set.borrow_mut().remove(&self.origin);
    }
}
