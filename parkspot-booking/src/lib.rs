pub mod availability;
pub mod ledger;
pub mod service;

pub use availability::{AvailabilityIndex, LotAvailability, SlotAvailability};
pub use ledger::MemoryLedger;
pub use service::{BookingPolicy, ReservationHistory, ReservationService, ReserveRequest};
