pub mod clock;
pub mod lot;
pub mod window;
pub mod reservation;
pub mod repository;
pub mod identity;
pub mod retry;

pub use clock::{Clock, FixedClock, SystemClock};
pub use identity::OwnerId;
pub use lot::{Floor, ParkingLot, Slot, SlotRef, VehicleCategory};
pub use repository::{ReservationLedger, SlotScope};
pub use reservation::{Reservation, ReservationDraft, ReservationStatus};
pub use retry::{retry_with_backoff, RetryConfig};
pub use window::TimeWindow;

use uuid::Uuid;

/// Per-request failure taxonomy. None of these are fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Slot {slot} is already reserved for an overlapping window")]
    Conflict { slot: String },
    #[error("Operation not permitted")]
    Forbidden,
    #[error("Reservation {0} is already cancelled")]
    AlreadyCancelled(Uuid),
    #[error("Reservation {0} has completed and can no longer be cancelled")]
    CancellationClosed(Uuid),
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Temporary storage failure: {0}")]
    Transient(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

impl CoreError {
    /// Only storage/network hiccups are worth retrying; everything else is
    /// a definitive answer for this request.
    pub fn is_transient(&self) -> bool {
        matches!(self, CoreError::Transient(_))
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
