//! Skirmish Wire - Changeset encoding and replica replay
//!
//! Everything that crosses the simulation boundary goes through this crate:
//!
//! - [`ChangeRecord`] / [`ComponentRecord`]: tagged records with a numeric
//!   change-kind tag and opaque component payloads
//! - [`encode_changeset`] / [`decode_changeset`]: binary (bincode) or RON
//! - [`StateSnapshot`]: full state for bootstrapping a replica
//! - [`Packet`] and [`Replica`]: sequenced delivery and in-order replay
//!
//! A replica may bootstrap from a snapshot or from the full changeset
//! history; both reach the same state.
//!
//! Decoding never skips what it does not understand: unknown change kinds,
//! unknown component types and missing fields are errors.

mod codec;
mod error;
mod record;
mod replica;
mod snapshot;

pub use codec::{decode_changeset, encode_changeset, from_records, to_records, WireFormat};
pub use error::{Error, Result};
pub use record::{ChangeRecord, ComponentRecord};
pub use replica::{Packet, Replica};
pub use snapshot::StateSnapshot;
