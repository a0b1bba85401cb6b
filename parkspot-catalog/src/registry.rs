use parkspot_core::{Floor, ParkingLot, Slot, SlotRef};
use std::collections::HashSet;
use tracing::info;

use crate::layout::LotSpec;
use crate::CatalogError;

/// Read-only catalog of lots, floors and slots.
#[derive(Debug, Clone, Default)]
pub struct SlotRegistry {
    lots: Vec<ParkingLot>,
}

impl SlotRegistry {
    /// Validates identity rules: lot ids unique, floor ids unique within a
    /// lot, slot ids unique within a floor, prices positive.
    pub fn new(lots: Vec<ParkingLot>) -> Result<Self, CatalogError> {
        let mut lot_ids = HashSet::new();
        for lot in &lots {
            if !lot_ids.insert(lot.id.as_str()) {
                return Err(CatalogError::InvalidCatalog(format!("duplicate lot id {}", lot.id)));
            }
            if lot.price_per_hour <= 0 {
                return Err(CatalogError::InvalidCatalog(format!(
                    "lot {} must have a positive hourly price",
                    lot.id
                )));
            }

            let mut floor_ids = HashSet::new();
            for floor in &lot.floors {
                if !floor_ids.insert(floor.id.as_str()) {
                    return Err(CatalogError::InvalidCatalog(format!(
                        "duplicate floor id {} in lot {}",
                        floor.id, lot.id
                    )));
                }

                let mut slot_ids = HashSet::new();
                for slot in &floor.slots {
                    if !slot_ids.insert(slot.id.as_str()) {
                        return Err(CatalogError::InvalidCatalog(format!(
                            "duplicate slot id {} on {}/{}",
                            slot.id, lot.id, floor.id
                        )));
                    }
                }
            }
        }

        Ok(Self { lots })
    }

    pub fn from_specs(specs: &[LotSpec]) -> Result<Self, CatalogError> {
        let registry = Self::new(specs.iter().map(LotSpec::build).collect())?;
        info!(
            "Catalog loaded: {} lots, {} slots",
            registry.lots.len(),
            registry.lots.iter().map(ParkingLot::total_slots).sum::<usize>()
        );
        Ok(registry)
    }

    pub fn list_lots(&self) -> &[ParkingLot] {
        &self.lots
    }

    /// Lots whose name or location contains `query`, ignoring case.
    pub fn search(&self, query: &str) -> Vec<&ParkingLot> {
        let needle = query.trim().to_lowercase();
        self.lots
            .iter()
            .filter(|lot| {
                needle.is_empty()
                    || lot.name.to_lowercase().contains(&needle)
                    || lot.location.to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub fn get_lot(&self, lot_id: &str) -> Result<&ParkingLot, CatalogError> {
        self.lots
            .iter()
            .find(|l| l.id == lot_id)
            .ok_or_else(|| CatalogError::LotNotFound(lot_id.to_string()))
    }

    pub fn get_floor(&self, lot_id: &str, floor_id: &str) -> Result<&Floor, CatalogError> {
        self.get_lot(lot_id)?
            .floor(floor_id)
            .ok_or_else(|| CatalogError::FloorNotFound {
                lot_id: lot_id.to_string(),
                floor_id: floor_id.to_string(),
            })
    }

    pub fn get_slot(&self, lot_id: &str, floor_id: &str, slot_id: &str) -> Result<&Slot, CatalogError> {
        self.get_floor(lot_id, floor_id)?
            .slot(slot_id)
            .ok_or_else(|| CatalogError::SlotNotFound {
                lot_id: lot_id.to_string(),
                floor_id: floor_id.to_string(),
                slot_id: slot_id.to_string(),
            })
    }

    /// Resolve a global slot reference to its lot and slot.
    pub fn resolve(&self, slot: &SlotRef) -> Result<(&ParkingLot, &Slot), CatalogError> {
        let lot = self.get_lot(&slot.lot_id)?;
        let found = self.get_slot(&slot.lot_id, &slot.floor_id, &slot.slot_id)?;
        Ok((lot, found))
    }
}
