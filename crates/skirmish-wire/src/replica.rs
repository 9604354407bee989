//! Replication packets and the replica that consumes them

use crate::codec::{decode, decode_changeset, encode, encode_changeset};
use crate::{Error, Result, StateSnapshot, WireFormat};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use skirmish_core::{Changeset, GameState};

/// Packet sent from the authority to replicas
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Packet {
    /// Full state after batch `seq`, for bootstrap
    Snapshot {
        /// Batch the state corresponds to
        seq: u64,
        /// Encoded [`StateSnapshot`]
        data: Vec<u8>,
    },
    /// One committed batch
    Changeset {
        /// Batch sequence number
        seq: u64,
        /// Encoded changeset
        data: Vec<u8>,
    },
}

impl Packet {
    /// Build a snapshot packet
    pub fn snapshot(seq: u64, state: &GameState, format: WireFormat) -> Result<Self> {
        let data = StateSnapshot::from_state(state)?.encode(format)?;
        Ok(Packet::Snapshot { seq, data })
    }

    /// Build a changeset packet
    pub fn changeset(seq: u64, changeset: &Changeset, format: WireFormat) -> Result<Self> {
        let data = encode_changeset(changeset, format)?;
        Ok(Packet::Changeset { seq, data })
    }

    /// Get the sequence number
    pub fn seq(&self) -> u64 {
        match self {
            Packet::Snapshot { seq, .. } | Packet::Changeset { seq, .. } => *seq,
        }
    }

    /// Frame the packet for transport
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode(self, WireFormat::Binary)
    }

    /// Parse a framed packet
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        decode(bytes, WireFormat::Binary)
    }
}

/// Non-authoritative copy of the state, rebuilt by replaying changesets
///
/// # Example
///
/// ```
/// use skirmish_core::{Change, Changeset, EntityId, GameState};
/// use skirmish_wire::{Packet, Replica, WireFormat};
///
/// let batch: Changeset = vec![Change::create_entity(EntityId(1))].into();
/// let packet = Packet::changeset(1, &batch, WireFormat::Binary).unwrap();
///
/// let mut replica = Replica::new(WireFormat::Binary);
/// replica.receive(&packet).unwrap();
/// assert!(replica.state().has_entity(EntityId(1)));
/// assert_eq!(replica.seq(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Replica {
    state: GameState,
    /// Last batch applied
    seq: u64,
    format: WireFormat,
}

impl Replica {
    /// Start from the empty initial state, expecting batch 1 next
    pub fn new(format: WireFormat) -> Self {
        Self {
            state: GameState::new(),
            seq: 0,
            format,
        }
    }

    /// Bootstrap from a full snapshot taken after batch `seq`
    pub fn from_snapshot(seq: u64, snapshot: StateSnapshot, format: WireFormat) -> Result<Self> {
        let state = snapshot.into_state()?;
        debug!(
            "replica bootstrapped from snapshot at seq {} ({} entities)",
            seq,
            state.entity_count()
        );
        Ok(Self { state, seq, format })
    }

    /// Bootstrap by replaying every batch since the start, in order
    pub fn from_history<'a>(
        changesets: impl IntoIterator<Item = &'a Changeset>,
        format: WireFormat,
    ) -> Result<Self> {
        let mut replica = Self::new(format);
        for changeset in changesets {
            let seq = replica.seq + 1;
            replica.apply(seq, changeset)?;
        }
        debug!("replica bootstrapped from {} batches", replica.seq);
        Ok(replica)
    }

    /// Get the replicated state
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Last batch applied
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Get the payload encoding this replica expects
    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// Apply batch `seq`
    ///
    /// Batches must arrive in strict order. The changeset applies as a whole
    /// or not at all; on failure the replica keeps its previous state. An
    /// empty changeset repeating the current `seq` is accepted as a no-op.
    pub fn apply(&mut self, seq: u64, changeset: &Changeset) -> Result<()> {
        if seq == self.seq && changeset.is_empty() {
            return Ok(());
        }
        let expected = self.seq + 1;
        if seq != expected {
            return Err(Error::OutOfOrder { expected, got: seq });
        }
        self.state = changeset
            .apply_to(&self.state)
            .map_err(|(index, source)| Error::Replay { index, source })?;
        self.seq = seq;
        trace!("replica applied batch {} ({} changes)", seq, changeset.len());
        Ok(())
    }

    /// Handle a packet from the authority
    ///
    /// A snapshot replaces the state unless it is older than what the
    /// replica already has.
    pub fn receive(&mut self, packet: &Packet) -> Result<()> {
        match packet {
            Packet::Snapshot { seq, data } => {
                if *seq < self.seq {
                    return Err(Error::OutOfOrder {
                        expected: self.seq,
                        got: *seq,
                    });
                }
                let snapshot = StateSnapshot::decode(data, self.format)?;
                *self = Self::from_snapshot(*seq, snapshot, self.format)?;
                Ok(())
            }
            Packet::Changeset { seq, data } => {
                let changeset = decode_changeset(data, self.format)?;
                self.apply(*seq, &changeset)
            }
        }
    }
}
