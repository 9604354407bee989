//! Full state snapshots for replica bootstrap

use crate::codec::{decode, encode};
use crate::{ComponentRecord, Error, Result, WireFormat};
use serde::{Deserialize, Serialize};
use skirmish_core::{ComponentId, EntityId, GameState, IdWatermark, TeamId, Timestamp};

/// Serializable copy of a [`GameState`]
///
/// Entities and components keep their state order, so restoring a snapshot
/// yields a state equal to the one it was taken from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Entity -> attached component ids
    pub entities: Vec<(EntityId, Vec<ComponentId>)>,
    pub components: Vec<ComponentRecord>,
    pub current_team: TeamId,
    pub turn_start: Option<Timestamp>,
    pub started: bool,
    /// Highest ids the authority has allocated, for resuming allocation
    #[serde(default)]
    pub ids: IdWatermark,
}

impl StateSnapshot {
    /// Capture a state
    pub fn from_state(state: &GameState) -> Result<Self> {
        let entities = state
            .entities()
            .map(|entity| (entity, state.component_ids(entity).collect()))
            .collect();
        let components = state
            .components()
            .map(ComponentRecord::from_component)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            entities,
            components,
            current_team: state.current_team(),
            turn_start: state.turn_start(),
            started: state.is_started(),
            ids: state.id_watermark(),
        })
    }

    /// Record the authority's id watermark, which may exceed what the state
    /// still holds
    pub fn with_ids(mut self, ids: IdWatermark) -> Self {
        self.ids = self.ids.max(ids);
        self
    }

    /// Restore the state, validating both referential invariants and the
    /// team range
    pub fn into_state(self) -> Result<GameState> {
        let components = self
            .components
            .iter()
            .map(ComponentRecord::to_component)
            .collect::<Result<Vec<_>>>()?;
        GameState::from_parts(
            self.entities,
            components,
            self.current_team,
            self.turn_start,
            self.started,
        )
        .map_err(Error::InvalidSnapshot)
    }

    /// Encode the snapshot
    pub fn encode(&self, format: WireFormat) -> Result<Vec<u8>> {
        encode(self, format)
    }

    /// Decode a snapshot; invariants are checked by [`into_state`](Self::into_state)
    pub fn decode(bytes: &[u8], format: WireFormat) -> Result<Self> {
        decode(bytes, format)
    }
}
