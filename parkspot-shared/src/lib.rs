pub mod models;
pub mod pii;

pub use models::events::{SlotEvent, SlotEventKind};
pub use pii::Masked;
