use parkspot_catalog::SlotRegistry;
use parkspot_core::{CoreResult, ReservationLedger, Slot, SlotRef, SlotScope, TimeWindow};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SlotAvailability {
    #[serde(flatten)]
    pub slot: Slot,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LotAvailability {
    pub lot_id: String,
    pub available: usize,
    pub total: usize,
}

/// Answers "is this slot free during that window?" from the ledger's
/// current state. Nothing is cached, so a caller always sees its own
/// committed writes.
#[derive(Clone)]
pub struct AvailabilityIndex {
    registry: Arc<SlotRegistry>,
    ledger: Arc<dyn ReservationLedger>,
}

impl AvailabilityIndex {
    pub fn new(registry: Arc<SlotRegistry>, ledger: Arc<dyn ReservationLedger>) -> Self {
        Self { registry, ledger }
    }

    /// Slot ids with at least one active reservation intersecting `window`.
    async fn taken(&self, scope: &SlotScope, window: &TimeWindow) -> CoreResult<HashSet<SlotRef>> {
        let active = self.ledger.active_overlapping(scope, window).await?;
        Ok(active.into_iter().map(|r| r.slot).collect())
    }

    pub async fn is_available(&self, slot: &SlotRef, window: &TimeWindow) -> CoreResult<bool> {
        self.registry.resolve(slot)?;
        let active = self.ledger.active_on_slot(slot, window).await?;
        Ok(active.is_empty())
    }

    pub async fn list_available(
        &self,
        lot_id: &str,
        floor_id: &str,
        window: &TimeWindow,
    ) -> CoreResult<BTreeSet<String>> {
        Ok(self
            .floor_grid(lot_id, floor_id, window)
            .await?
            .into_iter()
            .filter(|cell| cell.available)
            .map(|cell| cell.slot.id)
            .collect())
    }

    /// Every slot of the floor in layout order with its availability flag.
    pub async fn floor_grid(
        &self,
        lot_id: &str,
        floor_id: &str,
        window: &TimeWindow,
    ) -> CoreResult<Vec<SlotAvailability>> {
        let floor = self.registry.get_floor(lot_id, floor_id)?;
        let taken = self.taken(&SlotScope::floor(lot_id, floor_id), window).await?;

        Ok(floor
            .slots
            .iter()
            .map(|slot| SlotAvailability {
                available: !taken.contains(&SlotRef::new(lot_id, floor_id, &slot.id)),
                slot: slot.clone(),
            })
            .collect())
    }

    /// Free versus total slots of a lot, for listing badges.
    pub async fn lot_summary(&self, lot_id: &str, window: &TimeWindow) -> CoreResult<LotAvailability> {
        let lot = self.registry.get_lot(lot_id)?;
        let taken = self.taken(&SlotScope::lot(lot_id), window).await?;
        let total = lot.total_slots();
        let busy = lot.slot_refs().filter(|slot| taken.contains(slot)).count();

        Ok(LotAvailability {
            lot_id: lot.id.clone(),
            available: total - busy,
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;
    use chrono::{TimeZone, Utc};
    use parkspot_core::{CoreError, Floor, OwnerId, ParkingLot, ReservationDraft, VehicleCategory};

    fn registry() -> Arc<SlotRegistry> {
        let slots = (1..=3)
            .map(|n| Slot {
                id: format!("A{}", n),
                number: n,
                category: VehicleCategory::Car,
            })
            .collect();
        Arc::new(
            SlotRegistry::new(vec![ParkingLot {
                id: "L1".into(),
                name: "Central Plaza Parking".into(),
                location: "Connaught Place".into(),
                price_per_hour: 50,
                currency: "INR".into(),
                floors: vec![Floor {
                    id: "F1".into(),
                    name: "Floor 1".into(),
                    slots,
                }],
            }])
            .unwrap(),
        )
    }

    fn window(hour: u32, hours: u32) -> TimeWindow {
        TimeWindow::starting_at(Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap(), hours).unwrap()
    }

    async fn book(ledger: &MemoryLedger, slot: &str, hour: u32, hours: u32) {
        ledger
            .commit(ReservationDraft {
                id: uuid::Uuid::new_v4(),
                slot: SlotRef::new("L1", "F1", slot),
                owner: OwnerId::new("u1").unwrap(),
                window: window(hour, hours),
                price: 50,
                currency: "INR".into(),
                lot_name: "Central Plaza Parking".into(),
                slot_number: 1,
                category: VehicleCategory::Car,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_fully_booked_floor_has_nothing_available() {
        let ledger = Arc::new(MemoryLedger::new());
        let index = AvailabilityIndex::new(registry(), ledger.clone());

        for slot in ["A1", "A2", "A3"] {
            book(&ledger, slot, 10, 2).await;
        }

        assert!(index.list_available("L1", "F1", &window(10, 2)).await.unwrap().is_empty());
        let summary = index.lot_summary("L1", &window(11, 1)).await.unwrap();
        assert_eq!((summary.available, summary.total), (0, 3));
    }

    #[tokio::test]
    async fn test_disjoint_booking_leaves_slot_available() {
        let ledger = Arc::new(MemoryLedger::new());
        let index = AvailabilityIndex::new(registry(), ledger.clone());

        book(&ledger, "A1", 14, 1).await;

        let free = index.list_available("L1", "F1", &window(10, 2)).await.unwrap();
        assert_eq!(free.into_iter().collect::<Vec<_>>(), vec!["A1", "A2", "A3"]);
        assert!(index.is_available(&SlotRef::new("L1", "F1", "A1"), &window(10, 2)).await.unwrap());
        assert!(!index.is_available(&SlotRef::new("L1", "F1", "A1"), &window(14, 2)).await.unwrap());
    }

    #[tokio::test]
    async fn test_reads_see_latest_commit() {
        let ledger = Arc::new(MemoryLedger::new());
        let index = AvailabilityIndex::new(registry(), ledger.clone());
        let probe = window(9, 1);

        let grid = index.floor_grid("L1", "F1", &probe).await.unwrap();
        assert!(grid.iter().all(|cell| cell.available));

        book(&ledger, "A2", 9, 1).await;

        let grid = index.floor_grid("L1", "F1", &probe).await.unwrap();
        let a2 = grid.iter().find(|cell| cell.slot.id == "A2").unwrap();
        assert!(!a2.available);
        assert_eq!(index.lot_summary("L1", &probe).await.unwrap().available, 2);
    }

    #[tokio::test]
    async fn test_unknown_slot_is_not_found() {
        let index = AvailabilityIndex::new(registry(), Arc::new(MemoryLedger::new()));

        let err = index
            .is_available(&SlotRef::new("L1", "F1", "Z9"), &window(10, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
        assert!(index.list_available("L2", "F1", &window(10, 1)).await.is_err());
    }
}
