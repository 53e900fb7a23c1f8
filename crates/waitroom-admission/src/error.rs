//! Error types for the admission layer.

use waitroom_protocol::SessionId;

/// Errors that can occur during admission control.
///
/// None of these leave the capacity store and wait queue disagreeing:
/// every failing path either mutates nothing or compensates before
/// returning.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    /// The request carried no identity, or an empty one.
    #[error("Invalid userId")]
    InvalidIdentity,

    /// The identity does not currently hold a slot.
    ///
    /// This is a denial, not a fault: refresh and validate report it for
    /// visitors that are waiting or were never admitted.
    #[error("user {0} is not active")]
    NotActive(SessionId),

    /// The admission state could not be reached in time.
    #[error("admission store unavailable: {0}")]
    StoreUnavailable(String),

    /// A freed slot could not be given to the head of the queue.
    /// The visitor has been put back at the head of the queue.
    #[error("promotion of {0} lost a race for a free slot")]
    PromotionRace(SessionId),
}
