use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::OwnerId;
use crate::lot::{SlotRef, VehicleCategory};
use crate::window::TimeWindow;
use crate::{CoreError, CoreResult};

/// Reservation status. `Completed` is never stored by the in-memory ledger;
/// it is projected from `Active` once the window has elapsed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Active,
    Cancelled,
    Completed,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Active => "ACTIVE",
            ReservationStatus::Cancelled => "CANCELLED",
            ReservationStatus::Completed => "COMPLETED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ACTIVE" => Some(ReservationStatus::Active),
            "CANCELLED" => Some(ReservationStatus::Cancelled),
            "COMPLETED" => Some(ReservationStatus::Completed),
            _ => None,
        }
    }
}

/// Everything needed to commit a reservation. Built by the service once the
/// slot has been resolved and priced.
///
/// `id` is fixed before the first commit attempt, so a retried commit of the
/// same draft is recognised by the ledger instead of being treated as a rival
/// booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationDraft {
    pub id: Uuid,
    pub slot: SlotRef,
    pub owner: OwnerId,
    pub window: TimeWindow,
    pub price: i64,
    pub currency: String,
    pub lot_name: String,
    pub slot_number: u32,
    pub category: VehicleCategory,
}

impl ReservationDraft {
    /// Only ledgers call this, inside the commit critical section.
    pub fn into_reservation(self, now: DateTime<Utc>) -> Reservation {
        Reservation {
            id: self.id,
            reference: reference_code(&self.id),
            slot: self.slot,
            owner: self.owner,
            window: self.window,
            price: self.price,
            currency: self.currency,
            lot_name: self.lot_name,
            slot_number: self.slot_number,
            category: self.category,
            status: ReservationStatus::Active,
            created_at: now,
            cancelled_at: None,
        }
    }
}

/// Short code printed on receipts, e.g. `BK3F9A12C0`. Display only: two
/// reservations may share a code, the id is what identifies a reservation.
pub fn reference_code(id: &Uuid) -> String {
    let simple = id.simple().to_string();
    format!("BK{}", simple[..8].to_uppercase())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reservation {
    pub id: Uuid,
    pub reference: String,
    pub slot: SlotRef,
    pub owner: OwnerId,
    pub window: TimeWindow,
    pub price: i64,
    pub currency: String,
    pub lot_name: String,
    pub slot_number: u32,
    pub category: VehicleCategory,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Reservation {
    /// Status as seen at `now`: an active reservation whose window has
    /// elapsed reads as completed.
    pub fn status_at(&self, now: DateTime<Utc>) -> ReservationStatus {
        match self.status {
            ReservationStatus::Active if self.window.has_elapsed(now) => ReservationStatus::Completed,
            other => other,
        }
    }

    /// Copy with the status projected at `now`, for read paths.
    pub fn projected(&self, now: DateTime<Utc>) -> Reservation {
        let mut view = self.clone();
        view.status = self.status_at(now);
        view
    }

    /// Whether this reservation still claims its slot for `window`.
    /// Uses the stored status so that the non-overlap invariant is checked
    /// against committed state only.
    pub fn blocks(&self, window: &TimeWindow) -> bool {
        self.status == ReservationStatus::Active && self.window.overlaps(window)
    }

    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.status == ReservationStatus::Active && self.window.start() > now
    }

    /// Active → Cancelled. The only explicit write a reservation ever sees.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        match self.status {
            ReservationStatus::Cancelled => Err(CoreError::AlreadyCancelled(self.id)),
            ReservationStatus::Active | ReservationStatus::Completed => {
                self.status = ReservationStatus::Cancelled;
                self.cancelled_at = Some(now);
                Ok(())
            }
        }
    }
}
