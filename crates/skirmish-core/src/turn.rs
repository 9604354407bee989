//! Turn bookkeeping types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wall-clock instant recorded in state (turn start)
pub type Timestamp = DateTime<Utc>;

/// Number of teams taking turns
pub const TEAM_COUNT: u8 = 2;

/// Identifier of a team
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct TeamId(pub u8);

impl TeamId {
    /// Create a new team ID
    pub fn new(id: u8) -> Self {
        Self(id)
    }

    /// The team whose turn follows this one
    ///
    /// Out-of-range ids are folded into range first, so this never overflows.
    pub fn next(self) -> Self {
        Self((self.0 % TEAM_COUNT + 1) % TEAM_COUNT)
    }

    /// Whether this is one of the playing teams
    pub fn is_valid(self) -> bool {
        self.0 < TEAM_COUNT
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "team:{}", self.0)
    }
}
