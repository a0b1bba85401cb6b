use async_trait::async_trait;
use dashmap::DashMap;
use parkspot_core::{
    Clock, CoreError, CoreResult, OwnerId, Reservation, ReservationDraft, ReservationLedger,
    SlotRef, SlotScope, SystemClock, TimeWindow,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// All reservations ever committed on one slot.
type SlotBook = Arc<RwLock<Vec<Reservation>>>;

/// In-memory ledger.
///
/// Each slot owns its own book behind a write lock, so the overlap check and
/// the insert of a commit run in one critical section per slot while
/// unrelated slots proceed in parallel.
pub struct MemoryLedger {
    books: DashMap<SlotRef, SlotBook>,
    index: DashMap<Uuid, SlotRef>,
    clock: Arc<dyn Clock>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            books: DashMap::new(),
            index: DashMap::new(),
            clock,
        }
    }

    /// Book for `slot`, created on first use. The map guard is released
    /// before the caller awaits the book's lock.
    fn book(&self, slot: &SlotRef) -> SlotBook {
        self.books.entry(slot.clone()).or_default().clone()
    }

    fn existing_book(&self, slot: &SlotRef) -> Option<SlotBook> {
        self.books.get(slot).map(|b| b.value().clone())
    }

    fn books_in(&self, scope: &SlotScope) -> Vec<SlotBook> {
        match scope {
            SlotScope::Slot(slot) => self.existing_book(slot).into_iter().collect(),
            _ => self
                .books
                .iter()
                .filter(|entry| scope.covers(entry.key()))
                .map(|entry| entry.value().clone())
                .collect(),
        }
    }

    fn all_books(&self) -> Vec<SlotBook> {
        self.books.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn reservation_count(&self) -> usize {
        self.index.len()
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReservationLedger for MemoryLedger {
    async fn commit(&self, draft: ReservationDraft) -> CoreResult<Reservation> {
        if let Some(slot) = self.index.get(&draft.id).map(|entry| entry.value().clone()) {
            if slot != draft.slot {
                return Err(CoreError::InternalError(format!(
                    "reservation id {} already used on {}",
                    draft.id, slot
                )));
            }
        }

        let book = self.book(&draft.slot);
        let mut entries = book.write().await;

        // A replayed commit of a draft that already landed returns the stored row.
        if let Some(existing) = entries.iter().find(|r| r.id == draft.id) {
            debug!("Commit of {} replayed, returning stored reservation", draft.id);
            return Ok(existing.clone());
        }

        if let Some(existing) = entries.iter().find(|r| r.blocks(&draft.window)) {
            debug!(
                "Commit on {} rejected: overlaps reservation {}",
                draft.slot, existing.id
            );
            return Err(CoreError::Conflict {
                slot: draft.slot.to_string(),
            });
        }

        let reservation = draft.into_reservation(self.clock.now());
        self.index.insert(reservation.id, reservation.slot.clone());
        entries.push(reservation.clone());

        info!(
            "Reservation {} committed on {} for {}",
            reservation.id,
            reservation.slot,
            reservation.owner.masked()
        );
        Ok(reservation)
    }

    async fn cancel(&self, id: Uuid, requester: &OwnerId) -> CoreResult<Reservation> {
        let slot = self
            .index
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| CoreError::NotFound(format!("Reservation not found: {}", id)))?;

        let book = self.book(&slot);
        let mut entries = book.write().await;
        let reservation = entries
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| CoreError::NotFound(format!("Reservation not found: {}", id)))?;

        // Ownership first: a stranger learns nothing about the status.
        if &reservation.owner != requester {
            return Err(CoreError::Forbidden);
        }

        reservation.cancel(self.clock.now())?;
        info!("Reservation {} cancelled on {}", id, slot);
        Ok(reservation.clone())
    }

    async fn active_overlapping(
        &self,
        scope: &SlotScope,
        window: &TimeWindow,
    ) -> CoreResult<Vec<Reservation>> {
        let mut found = Vec::new();
        for book in self.books_in(scope) {
            let entries = book.read().await;
            found.extend(entries.iter().filter(|r| r.blocks(window)).cloned());
        }
        Ok(found)
    }

    async fn get(&self, id: Uuid) -> CoreResult<Option<Reservation>> {
        let slot = match self.index.get(&id) {
            Some(entry) => entry.value().clone(),
            None => return Ok(None),
        };

        let Some(book) = self.existing_book(&slot) else {
            return Ok(None);
        };
        let entries = book.read().await;
        Ok(entries.iter().find(|r| r.id == id).cloned())
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> CoreResult<Vec<Reservation>> {
        let mut found = Vec::new();
        for book in self.all_books() {
            let entries = book.read().await;
            found.extend(entries.iter().filter(|r| &r.owner == owner).cloned());
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use parkspot_core::{FixedClock, ReservationStatus, VehicleCategory};

    fn window(hour: u32, hours: u32) -> TimeWindow {
        TimeWindow::starting_at(Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap(), hours).unwrap()
    }

    fn draft(slot: &str, owner: &str, hour: u32, hours: u32) -> ReservationDraft {
        ReservationDraft {
            id: Uuid::new_v4(),
            slot: SlotRef::new("L1", "F1", slot),
            owner: OwnerId::new(owner).unwrap(),
            window: window(hour, hours),
            price: 50 * i64::from(hours),
            currency: "INR".into(),
            lot_name: "Central Plaza Parking".into(),
            slot_number: 1,
            category: VehicleCategory::Car,
        }
    }

    fn ledger() -> MemoryLedger {
        MemoryLedger::with_clock(Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap(),
        )))
    }

    #[tokio::test]
    async fn test_commit_is_idempotent_on_draft_id() {
        let ledger = ledger();
        let draft = draft("A1", "u1", 10, 2);

        let first = ledger.commit(draft.clone()).await.unwrap();
        let replayed = ledger.commit(draft.clone()).await.unwrap();
        assert_eq!(first, replayed);
        assert_eq!(ledger.reservation_count(), 1);

        let mut moved = draft;
        moved.slot = SlotRef::new("L1", "F1", "A2");
        assert!(matches!(ledger.commit(moved).await, Err(CoreError::InternalError(_))));
    }

    #[tokio::test]
    async fn test_commit_rejects_overlap_on_same_slot() {
        let ledger = ledger();

        let first = ledger.commit(draft("A1", "u1", 10, 2)).await.unwrap();
        assert_eq!(first.status, ReservationStatus::Active);

        let clash = ledger.commit(draft("A1", "u2", 11, 1)).await;
        assert!(matches!(clash, Err(CoreError::Conflict { .. })));

        // back-to-back windows and other slots are fine
        ledger.commit(draft("A1", "u2", 12, 1)).await.unwrap();
        ledger.commit(draft("A2", "u2", 10, 2)).await.unwrap();
        assert_eq!(ledger.reservation_count(), 3);
    }

    #[tokio::test]
    async fn test_cancel_rules() {
        let ledger = ledger();
        let owner = OwnerId::new("u1").unwrap();
        let stranger = OwnerId::new("u2").unwrap();
        let reservation = ledger.commit(draft("A1", "u1", 10, 2)).await.unwrap();

        assert_eq!(ledger.cancel(reservation.id, &stranger).await, Err(CoreError::Forbidden));
        assert!(matches!(
            ledger.cancel(Uuid::new_v4(), &owner).await,
            Err(CoreError::NotFound(_))
        ));

        let cancelled = ledger.cancel(reservation.id, &owner).await.unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);
        assert!(cancelled.cancelled_at.is_some());

        assert_eq!(
            ledger.cancel(reservation.id, &owner).await,
            Err(CoreError::AlreadyCancelled(reservation.id))
        );
        // a stranger still only sees Forbidden
        assert_eq!(ledger.cancel(reservation.id, &stranger).await, Err(CoreError::Forbidden));
    }

    #[tokio::test]
    async fn test_cancel_frees_the_window() {
        let ledger = ledger();
        let owner = OwnerId::new("u1").unwrap();
        let reservation = ledger.commit(draft("A1", "u1", 10, 2)).await.unwrap();
        ledger.cancel(reservation.id, &owner).await.unwrap();

        ledger.commit(draft("A1", "u2", 10, 2)).await.unwrap();
        let stored = ledger.get(reservation.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ReservationStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_scoped_reads() {
        let ledger = ledger();
        ledger.commit(draft("A1", "u1", 10, 2)).await.unwrap();
        ledger.commit(draft("A2", "u1", 14, 1)).await.unwrap();
        ledger.commit(draft("A3", "u2", 10, 1)).await.unwrap();

        let probe = window(10, 1);
        let floor = ledger.active_overlapping(&SlotScope::floor("L1", "F1"), &probe).await.unwrap();
        assert_eq!(floor.len(), 2);

        let other_floor = ledger.active_overlapping(&SlotScope::floor("L1", "F2"), &probe).await.unwrap();
        assert!(other_floor.is_empty());

        let a2 = ledger.active_on_slot(&SlotRef::new("L1", "F1", "A2"), &probe).await.unwrap();
        assert!(a2.is_empty());

        let mine = ledger.list_by_owner(&OwnerId::new("u1").unwrap()).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(ledger.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_commits_yield_single_winner() {
        let ledger = Arc::new(ledger());
        let mut handles = Vec::new();

        for i in 0..32 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                // all windows contain 11:00
                let start = 10 + (i % 2);
                ledger.commit(draft("A1", &format!("u{}", i), start, 2)).await
            }));
        }

        let mut wins = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => wins += 1,
                Err(CoreError::Conflict { .. }) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(wins, 1);
        assert_eq!(conflicts, 31);
    }
}
