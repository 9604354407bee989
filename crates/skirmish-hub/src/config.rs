//! Changer configuration, loadable from RON

use crate::journal::JournalConfig;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration for a [`GameStateChanger`](crate::GameStateChanger)
///
/// # Example
///
/// ```
/// use skirmish_hub::ChangerConfig;
///
/// let config = ChangerConfig::from_ron(
///     "(strict_component_types: true, journal: (enabled: true, snapshot_interval: 10))",
/// )
/// .unwrap();
/// assert!(config.strict_component_types);
/// assert_eq!(config.journal.snapshot_interval, 10);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangerConfig {
    /// Reject a second component of the same type on one entity
    ///
    /// Off by default: one component per type is a convention that
    /// lookups rely on, not something the change log enforces.
    pub strict_component_types: bool,
    /// Journal of committed batches
    pub journal: JournalConfig,
}

impl ChangerConfig {
    /// Parse a configuration from RON text
    pub fn from_ron(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load a configuration from a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_ron(&text)
    }

    /// Render the configuration as pretty RON
    pub fn to_ron(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| Error::Config(e.to_string()))
    }
}
