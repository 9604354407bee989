//! Time source for turn boundaries
//!
//! Only the authority reads the clock. The instant ends up inside the
//! `EndTurn` change, so replicas never consult their own clock.

use chrono::Utc;
use skirmish_core::Timestamp;

/// Source of "now" for stamping turn starts
pub trait TurnClock {
    fn now(&self) -> Timestamp;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TurnClock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// Always returns the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Timestamp);

impl TurnClock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}
