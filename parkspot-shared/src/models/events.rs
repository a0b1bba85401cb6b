use chrono::{DateTime, Utc};
use uuid::Uuid;

/// What happened to a slot's book.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotEventKind {
    Reserved,
    Released,
}

impl SlotEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotEventKind::Reserved => "slot_reserved",
            SlotEventKind::Released => "slot_released",
        }
    }
}

/// Broadcast after a reservation is committed or cancelled, so that slot
/// grids can refresh without polling.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct SlotEvent {
    pub kind: SlotEventKind,
    pub lot_id: String,
    pub floor_id: String,
    pub slot_id: String,
    pub reservation_id: Uuid,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub occurred_at: i64,
}

impl SlotEvent {
    pub fn belongs_to_lot(&self, lot_id: &str) -> bool {
        self.lot_id == lot_id
    }
}
