//! Admission control for Waitroom.
//!
//! This crate is the waiting room itself:
//!
//! 1. **Capacity**: who currently holds a slot, and until when
//!    ([`CapacityStore`])
//! 2. **Waiting**: who is in line, in strict arrival order ([`WaitQueue`])
//! 3. **Coordination**: the one place that moves visitors between the two
//!    ([`Coordinator`])
//! 4. **Expiry**: the periodic sweep that frees lapsed slots
//!    ([`ExpirySweeper`])
//! 5. **Notification**: pushing "you're in" / "you're #3" to live
//!    channels ([`NotificationHub`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Server / HTTP (above)  ← call Coordinator operations, own the channels
//!     ↕
//! Admission (this crate) ← all queue state and its invariants
//!     ↕
//! Protocol / Tick (below) ← SessionId, ServerMessage, sweep cadence
//! ```
//!
//! # Invariants
//!
//! After every coordinator operation: the active set never exceeds the
//! configured capacity, no visitor is both active and waiting, and the
//! wait queue is strictly first-in first-out.

mod config;
mod coordinator;
mod error;
mod hub;
mod queue;
mod store;
mod sweeper;

pub use config::AdmissionConfig;
pub use coordinator::{
    Coordinator, ExpireOutcome, JoinOutcome, QueueStatus, Standing, StoreDump,
};
pub use error::AdmissionError;
pub use hub::{EventReceiver, EventSender, NotificationHub, QueueEvent};
pub use queue::WaitQueue;
pub use store::CapacityStore;
pub use sweeper::{ExpirySweeper, SweepReport};
