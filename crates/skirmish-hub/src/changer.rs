//! GameStateChanger - sequences changes within a batch
//!
//! The changer owns the working state of one simulation instance. A batch
//! (one player action, or one turn transition) is a run of `apply` calls
//! closed by `commit_batch` or `abort_batch`:
//!
//! - `apply` runs the change against the working state; on success the new
//!   state replaces the old one, the change is appended to the batch
//!   changeset and every System gets the matching hook before `apply`
//!   returns
//! - a failing `apply` leaves state and changeset exactly as they were and
//!   poisons the batch: later `apply` calls are refused and `commit_batch`
//!   rolls the state back to the checkpoint taken when the batch began
//! - `commit_batch` hands out the changeset with a sequence number; only
//!   committed changesets are meant to leave the process

use crate::clock::{SystemClock, TurnClock};
use crate::config::ChangerConfig;
use crate::journal::BatchJournal;
use crate::system::System;
use crate::{Error, Result};
use log::{debug, error, trace, warn};
use crate::journal::Snapshot;
use skirmish_core::{
    Change, Changeset, Component, ComponentData, ComponentId, EntityId, GameState, IdAllocator,
    IdWatermark,
};

/// A committed batch, ready to be serialized for replicas
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedBatch {
    /// Sequence number; consecutive non-empty batches get consecutive numbers
    pub seq: u64,
    /// The committed changes, in application order
    pub changeset: Changeset,
}

impl CommittedBatch {
    /// Empty batches are not sequenced and need not be sent
    pub fn is_empty(&self) -> bool {
        self.changeset.is_empty()
    }
}

/// Failure that poisoned the open batch
#[derive(Debug, Clone)]
struct BatchFailure {
    index: usize,
    error: skirmish_core::Error,
}

/// Orchestrator applying changes to the working state
pub struct GameStateChanger {
    /// Working state
    state: GameState,
    /// Changes committed so far in the open batch
    changeset: Changeset,
    /// State at the start of the open batch; `None` when no batch is open
    checkpoint: Option<GameState>,
    /// Set when a change of the open batch failed
    failure: Option<BatchFailure>,
    /// Registered systems, notified in registration order
    systems: Vec<Box<dyn System>>,
    entity_ids: IdAllocator<EntityId>,
    component_ids: IdAllocator<ComponentId>,
    clock: Box<dyn TurnClock>,
    config: ChangerConfig,
    journal: BatchJournal,
    /// Sequence number of the last committed batch
    seq: u64,
}

impl GameStateChanger {
    /// Create a changer over an empty state
    pub fn new() -> Self {
        Self::with_config(GameState::new(), ChangerConfig::default())
    }

    /// Create a changer over an existing state
    pub fn with_state(state: GameState) -> Self {
        Self::with_config(state, ChangerConfig::default())
    }

    /// Create a changer with a specific configuration
    ///
    /// Id allocation resumes after the highest ids present in `state`. Ids of
    /// objects destroyed before `state` was saved are unknown here; use
    /// [`resume`](Self::resume) to carry them over.
    pub fn with_config(state: GameState, config: ChangerConfig) -> Self {
        Self::resume(state, IdWatermark::default(), config)
    }

    /// Continue a saved simulation instance
    ///
    /// Id allocation resumes after the higher of `ids` and the highest ids
    /// present in `state`, so ids destroyed before the save stay retired.
    pub fn resume(state: GameState, ids: IdWatermark, config: ChangerConfig) -> Self {
        let ids = ids.max(state.id_watermark());
        let mut journal = BatchJournal::new(config.journal.clone());
        journal.record_genesis(&state, ids);
        debug!(
            "changer resumed with {} entities, ids after {:?}",
            state.entity_count(),
            ids
        );
        Self {
            entity_ids: IdAllocator::after(ids.entity),
            component_ids: IdAllocator::after(ids.component),
            state,
            changeset: Changeset::new(),
            checkpoint: None,
            failure: None,
            systems: Vec::new(),
            clock: Box::new(SystemClock),
            config,
            journal,
            seq: 0,
        }
    }

    /// Continue from a journal snapshot
    pub fn from_snapshot(snapshot: &Snapshot, config: ChangerConfig) -> Self {
        Self::resume(snapshot.state.clone(), snapshot.ids, config)
    }

    /// Replace the clock used to stamp turn starts
    pub fn with_clock(mut self, clock: impl TurnClock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Register a system; it immediately indexes the working state
    pub fn register_system(&mut self, mut system: impl System + 'static) {
        system.rebuild(&self.state);
        debug!("registered system `{}`", system.name());
        self.systems.push(Box::new(system));
    }

    /// Get the number of registered systems
    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Get the working state
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Get the changes committed so far in the open batch
    pub fn changeset(&self) -> &Changeset {
        &self.changeset
    }

    /// Get the configuration
    pub fn config(&self) -> &ChangerConfig {
        &self.config
    }

    /// Get the journal of committed batches
    pub fn journal(&self) -> &BatchJournal {
        &self.journal
    }

    /// Sequence number of the last committed batch (0 before the first)
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Check if a batch is open
    pub fn in_batch(&self) -> bool {
        self.checkpoint.is_some()
    }

    /// Check if the open batch hit a failing change
    pub fn is_poisoned(&self) -> bool {
        self.failure.is_some()
    }

    /// Highest ids allocated so far; save it with the state to resume later
    pub fn id_watermark(&self) -> IdWatermark {
        IdWatermark {
            entity: self.entity_ids.high_water(),
            component: self.component_ids.high_water(),
        }
    }

    /// Allocate a fresh entity id (never reused, even if the batch aborts)
    pub fn allocate_entity(&mut self) -> Result<EntityId> {
        Ok(self.entity_ids.allocate()?)
    }

    /// Allocate a fresh component id (never reused, even if the batch aborts)
    pub fn allocate_component(&mut self) -> Result<ComponentId> {
        Ok(self.component_ids.allocate()?)
    }

    // ========================================================================
    // Batch API
    // ========================================================================

    /// Open a batch, checkpointing the working state
    pub fn begin_batch(&mut self) -> Result<()> {
        if self.checkpoint.is_some() {
            return Err(Error::BatchAlreadyOpen);
        }
        self.checkpoint = Some(self.state.clone());
        self.changeset.clear();
        self.failure = None;
        trace!("batch {} opened", self.seq + 1);
        Ok(())
    }

    /// Apply one change, opening a batch first if none is open
    pub fn apply(&mut self, change: Change) -> Result<()> {
        if self.checkpoint.is_none() {
            self.begin_batch()?;
        }

        if let Some(failure) = &self.failure {
            return Err(Error::BatchFailed {
                index: failure.index,
                source: failure.error.clone(),
            });
        }

        if self.config.strict_component_types {
            if let Change::AttachComponent { entity, component } = &change {
                let ty = component.component_type();
                if self.state.find_component(*entity, ty).is_some() {
                    return Err(Error::DuplicateComponentType {
                        entity: *entity,
                        component_type: ty,
                    });
                }
            }
        }

        match change.apply(&self.state) {
            Ok(next) => {
                let previous = std::mem::replace(&mut self.state, next);
                trace!("applied {} (#{})", change.kind(), self.changeset.len());
                self.changeset.push(change);
                if let Some(change) = self.changeset.changes().last() {
                    notify(&mut self.systems, &self.state, change, &previous);
                }
                Ok(())
            }
            Err(err) => {
                let index = self.changeset.len();
                error!(
                    "change #{} ({}) of batch {} rejected: {}",
                    index,
                    change.kind(),
                    self.seq + 1,
                    err
                );
                self.failure = Some(BatchFailure {
                    index,
                    error: err.clone(),
                });
                Err(Error::Change(err))
            }
        }
    }

    /// Close the open batch
    ///
    /// Empty batches keep the current sequence number. A poisoned batch is
    /// rolled back and reported as [`Error::BatchFailed`].
    pub fn commit_batch(&mut self) -> Result<CommittedBatch> {
        let checkpoint = self.checkpoint.take().ok_or(Error::NoOpenBatch)?;

        if let Some(failure) = self.failure.take() {
            warn!(
                "batch {} rolled back after change #{} failed",
                self.seq + 1,
                failure.index
            );
            self.restore(checkpoint);
            return Err(Error::BatchFailed {
                index: failure.index,
                source: failure.error,
            });
        }

        let changeset = std::mem::take(&mut self.changeset);
        if changeset.is_empty() {
            return Ok(CommittedBatch {
                seq: self.seq,
                changeset,
            });
        }

        self.seq += 1;
        let ids = self.id_watermark();
        self.journal.record(self.seq, &changeset, &self.state, ids);
        debug!("batch {} committed with {} changes", self.seq, changeset.len());
        Ok(CommittedBatch {
            seq: self.seq,
            changeset,
        })
    }

    /// Roll the open batch back and return the discarded changes
    pub fn abort_batch(&mut self) -> Result<Changeset> {
        let checkpoint = self.checkpoint.take().ok_or(Error::NoOpenBatch)?;
        let discarded = std::mem::take(&mut self.changeset);
        warn!(
            "batch {} aborted, {} changes discarded",
            self.seq + 1,
            discarded.len()
        );
        self.restore(checkpoint);
        Ok(discarded)
    }

    /// Run `f` as one batch: commit on `Ok`, roll back on `Err`
    ///
    /// # Example
    ///
    /// ```
    /// use skirmish_core::Name;
    /// use skirmish_hub::GameStateChanger;
    ///
    /// let mut changer = GameStateChanger::new();
    /// let (unit, batch) = changer
    ///     .run_batch(|changer| {
    ///         let unit = changer.spawn_entity()?;
    ///         changer.attach(unit, Name::new("Falcon"))?;
    ///         Ok(unit)
    ///     })
    ///     .unwrap();
    ///
    /// assert_eq!(batch.seq, 1);
    /// assert_eq!(batch.changeset.len(), 2);
    /// assert!(changer.state().has_entity(unit));
    /// ```
    pub fn run_batch<T, F>(&mut self, f: F) -> Result<(T, CommittedBatch)>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        self.begin_batch()?;
        match f(self) {
            Ok(value) => {
                let batch = self.commit_batch()?;
                Ok((value, batch))
            }
            Err(err) => {
                // The closure may have closed the batch itself
                if let Err(abort) = self.abort_batch() {
                    warn!("batch closure failed ({}), abort skipped: {}", err, abort);
                }
                Err(err)
            }
        }
    }

    // ========================================================================
    // Convenience helpers
    // ========================================================================

    /// Allocate an entity id and create the entity
    pub fn spawn_entity(&mut self) -> Result<EntityId> {
        let entity = self.allocate_entity()?;
        self.apply(Change::create_entity(entity))?;
        Ok(entity)
    }

    /// Destroy an entity with all its components
    pub fn despawn_entity(&mut self, entity: EntityId) -> Result<()> {
        self.apply(Change::destroy_entity(entity))
    }

    /// Allocate a component id and attach `data` to `entity`
    pub fn attach(&mut self, entity: EntityId, data: impl Into<ComponentData>) -> Result<ComponentId> {
        let id = self.allocate_component()?;
        self.apply(Change::attach(entity, Component::new(id, data)))?;
        Ok(id)
    }

    /// Detach and delete a component
    pub fn detach(&mut self, entity: EntityId, component: ComponentId) -> Result<()> {
        self.apply(Change::detach(entity, component))
    }

    /// Replace the value of an existing component
    pub fn update(&mut self, component: ComponentId, data: impl Into<ComponentData>) -> Result<()> {
        self.apply(Change::update(Component::new(component, data)))
    }

    /// Start the game
    pub fn start_game(&mut self) -> Result<()> {
        self.apply(Change::start_game())
    }

    /// End the current turn, stamping the next turn start from the clock
    pub fn end_turn(&mut self) -> Result<()> {
        let at = self.clock.now();
        self.apply(Change::end_turn(at))
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn restore(&mut self, checkpoint: GameState) {
        self.state = checkpoint;
        self.changeset.clear();
        self.failure = None;
        for system in self.systems.iter_mut() {
            system.rebuild(&self.state);
        }
    }
}

/// Dispatch the hooks matching `change`, which already produced `state`
fn notify(
    systems: &mut [Box<dyn System>],
    state: &GameState,
    change: &Change,
    previous: &GameState,
) {
    match change {
        Change::CreateEntity { entity } => {
            for system in systems.iter_mut() {
                system.entity_created(state, *entity);
            }
        }
        Change::DestroyEntity { entity } => {
            let removed: Vec<Component> = previous.components_of(*entity).cloned().collect();
            for system in systems.iter_mut() {
                system.entity_destroyed(state, *entity, &removed);
            }
        }
        Change::AttachComponent { entity, component } => {
            for system in systems.iter_mut() {
                system.component_attached(state, *entity, component);
            }
        }
        Change::DetachComponent { entity, component } => {
            if let Some(detached) = previous.component(*component) {
                for system in systems.iter_mut() {
                    system.component_detached(state, *entity, detached);
                }
            }
        }
        Change::EndTurn { .. } => {
            for system in systems.iter_mut() {
                system.process_turn_end(state);
            }
        }
        Change::UpdateComponent { .. } | Change::StartGame => {}
    }
}

impl Default for GameStateChanger {
    fn default() -> Self {
        Self::new()
    }
}
