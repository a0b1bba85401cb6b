use async_trait::async_trait;
use uuid::Uuid;

use crate::identity::OwnerId;
use crate::lot::SlotRef;
use crate::reservation::{Reservation, ReservationDraft};
use crate::window::TimeWindow;
use crate::CoreResult;

/// Which slots a read covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotScope {
    Slot(SlotRef),
    Floor { lot_id: String, floor_id: String },
    Lot { lot_id: String },
}

impl SlotScope {
    pub fn floor(lot_id: &str, floor_id: &str) -> Self {
        SlotScope::Floor {
            lot_id: lot_id.to_string(),
            floor_id: floor_id.to_string(),
        }
    }

    pub fn lot(lot_id: &str) -> Self {
        SlotScope::Lot {
            lot_id: lot_id.to_string(),
        }
    }

    pub fn covers(&self, slot: &SlotRef) -> bool {
        match self {
            SlotScope::Slot(target) => target == slot,
            SlotScope::Floor { lot_id, floor_id } => slot.in_floor(lot_id, floor_id),
            SlotScope::Lot { lot_id } => &slot.lot_id == lot_id,
        }
    }
}

/// Authoritative store of reservations.
///
/// Implementations must make `commit` atomic with respect to every other
/// `commit` on the same slot: no two active reservations on one slot may
/// overlap, whatever the interleaving of callers.
#[async_trait]
pub trait ReservationLedger: Send + Sync {
    /// Insert the draft unless an active reservation on the same slot
    /// overlaps its window, in which case `CoreError::Conflict`.
    ///
    /// Committing a draft whose id is already stored returns the stored
    /// reservation, so callers may replay a commit whose outcome was lost.
    async fn commit(&self, draft: ReservationDraft) -> CoreResult<Reservation>;

    /// Flip an active reservation to cancelled.
    /// Errors: `NotFound`, `Forbidden` (requester is not the owner),
    /// `AlreadyCancelled`.
    async fn cancel(&self, id: Uuid, requester: &OwnerId) -> CoreResult<Reservation>;

    /// Active reservations inside `scope` whose window intersects `window`.
    async fn active_overlapping(
        &self,
        scope: &SlotScope,
        window: &TimeWindow,
    ) -> CoreResult<Vec<Reservation>>;

    async fn get(&self, id: Uuid) -> CoreResult<Option<Reservation>>;

    /// Every reservation ever committed for `owner`, any status.
    async fn list_by_owner(&self, owner: &OwnerId) -> CoreResult<Vec<Reservation>>;

    async fn active_on_slot(
        &self,
        slot: &SlotRef,
        window: &TimeWindow,
    ) -> CoreResult<Vec<Reservation>> {
        self.active_overlapping(&SlotScope::Slot(slot.clone()), window).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_coverage() {
        let slot = SlotRef::new("L1", "F1", "F1-3");
        assert!(SlotScope::Slot(slot.clone()).covers(&slot));
        assert!(SlotScope::floor("L1", "F1").covers(&slot));
        assert!(!SlotScope::floor("L1", "F2").covers(&slot));
        assert!(SlotScope::lot("L1").covers(&slot));
        assert!(!SlotScope::lot("L2").covers(&slot));
    }
}
