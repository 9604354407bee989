//! Changeset encoding
//!
//! A changeset travels as an ordered array of [`ChangeRecord`]s. The binary
//! format (bincode) is what replicas receive; RON exists for inspection and
//! test fixtures. Both decode to the same `Changeset`.

use crate::{ChangeRecord, Error, Result};
use log::trace;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use skirmish_core::Changeset;

/// Encoding used for changesets, snapshots and packet payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WireFormat {
    /// Compact bincode encoding
    #[default]
    Binary,
    /// Human-readable RON text
    Ron,
}

/// Convert a changeset into wire records, preserving order
pub fn to_records(changeset: &Changeset) -> Result<Vec<ChangeRecord>> {
    changeset.iter().map(ChangeRecord::from_change).collect()
}

/// Rebuild a changeset from wire records
///
/// Fails on the first record that does not decode; nothing is skipped.
pub fn from_records(records: &[ChangeRecord]) -> Result<Changeset> {
    records.iter().map(ChangeRecord::to_change).collect()
}

/// Encode a changeset
///
/// # Example
///
/// ```
/// use skirmish_core::{Change, Changeset, EntityId};
/// use skirmish_wire::{decode_changeset, encode_changeset, WireFormat};
///
/// let changeset: Changeset = vec![Change::create_entity(EntityId(1))].into();
/// let bytes = encode_changeset(&changeset, WireFormat::Binary).unwrap();
/// assert_eq!(decode_changeset(&bytes, WireFormat::Binary).unwrap(), changeset);
/// ```
pub fn encode_changeset(changeset: &Changeset, format: WireFormat) -> Result<Vec<u8>> {
    let records = to_records(changeset)?;
    let bytes = encode(&records, format)?;
    trace!(
        "encoded {} changes into {} bytes ({:?})",
        records.len(),
        bytes.len(),
        format
    );
    Ok(bytes)
}

/// Decode a changeset
pub fn decode_changeset(bytes: &[u8], format: WireFormat) -> Result<Changeset> {
    let records: Vec<ChangeRecord> = decode(bytes, format)?;
    let changeset = from_records(&records)?;
    trace!("decoded {} changes ({:?})", changeset.len(), format);
    Ok(changeset)
}

pub(crate) fn encode<T: Serialize>(value: &T, format: WireFormat) -> Result<Vec<u8>> {
    match format {
        WireFormat::Binary => bincode::serialize(value).map_err(|e| Error::Encode(e.to_string())),
        WireFormat::Ron => ron::ser::to_string_pretty(value, ron::ser::PrettyConfig::default())
            .map(String::into_bytes)
            .map_err(|e| Error::Encode(e.to_string())),
    }
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8], format: WireFormat) -> Result<T> {
    match format {
        WireFormat::Binary => bincode::deserialize(bytes).map_err(|e| Error::Decode(e.to_string())),
        WireFormat::Ron => {
            let text = std::str::from_utf8(bytes).map_err(|e| Error::Decode(e.to_string()))?;
            ron::from_str(text).map_err(|e| Error::Decode(e.to_string()))
        }
    }
}
