//! Skirmish Messenger - Priority-ordered interception of in-flight effects
//!
//! Gameplay subsystems publish an effect (damage, a charge change, an attack
//! result) through a [`Messenger`] before committing it. Other subsystems
//! subscribe with a priority and may rewrite the value or stop the chain,
//! without either side knowing about the other.
//!
//! ```text
//! publish(ctx, arg) ─▶ handler(prio 10) ─▶ handler(prio 5) ─▶ handler(prio 1) ─▶ arg'
//!                          │ Stop
//!                          └──────────────────────────────────────────────────▶ arg'
//! ```
//!
//! A nested `publish` on the same messenger for the same originating entity
//! is refused, which bounds self-triggering chains such as a reflected hit
//! reflecting itself.

mod messenger;

pub use messenger::{Messenger, Propagation, SubscriberId};
