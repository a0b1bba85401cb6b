use serde::{Deserialize, Serialize};
use std::fmt;

/// Vehicle category a slot is built for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum VehicleCategory {
    Car,
    Bike,
    Ev,
}

impl VehicleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleCategory::Car => "car",
            VehicleCategory::Bike => "bike",
            VehicleCategory::Ev => "ev",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "car" => Some(VehicleCategory::Car),
            "bike" => Some(VehicleCategory::Bike),
            "ev" => Some(VehicleCategory::Ev),
            _ => None,
        }
    }
}

impl fmt::Display for VehicleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single physical parking space.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Slot {
    pub id: String,
    pub number: u32,
    pub category: VehicleCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Floor {
    pub id: String,
    pub name: String,
    pub slots: Vec<Slot>,
}

impl Floor {
    pub fn slot(&self, slot_id: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.id == slot_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParkingLot {
    pub id: String,
    pub name: String,
    pub location: String,
    /// Minor currency units per started hour.
    pub price_per_hour: i64,
    pub currency: String,
    pub floors: Vec<Floor>,
}

impl ParkingLot {
    pub fn floor(&self, floor_id: &str) -> Option<&Floor> {
        self.floors.iter().find(|f| f.id == floor_id)
    }

    pub fn total_slots(&self) -> usize {
        self.floors.iter().map(|f| f.slots.len()).sum()
    }

    /// Distinct categories offered anywhere in the lot, in stable order.
    pub fn vehicle_categories(&self) -> Vec<VehicleCategory> {
        let mut categories: Vec<VehicleCategory> = self
            .floors
            .iter()
            .flat_map(|f| f.slots.iter().map(|s| s.category))
            .collect();
        categories.sort();
        categories.dedup();
        categories
    }

    /// Every slot of the lot as a global reference.
    pub fn slot_refs(&self) -> impl Iterator<Item = SlotRef> + '_ {
        self.floors.iter().flat_map(move |f| {
            f.slots
                .iter()
                .map(move |s| SlotRef::new(&self.id, &f.id, &s.id))
        })
    }
}

/// Globally unique address of a slot: ids are only unique within their parent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotRef {
    pub lot_id: String,
    pub floor_id: String,
    pub slot_id: String,
}

impl SlotRef {
    pub fn new(lot_id: impl Into<String>, floor_id: impl Into<String>, slot_id: impl Into<String>) -> Self {
        Self {
            lot_id: lot_id.into(),
            floor_id: floor_id.into(),
            slot_id: slot_id.into(),
        }
    }

    pub fn in_floor(&self, lot_id: &str, floor_id: &str) -> bool {
        self.lot_id == lot_id && self.floor_id == floor_id
    }
}

impl fmt::Display for SlotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.lot_id, self.floor_id, self.slot_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lot() -> ParkingLot {
        ParkingLot {
            id: "L1".into(),
            name: "Central Plaza Parking".into(),
            location: "Connaught Place, New Delhi".into(),
            price_per_hour: 50,
            currency: "INR".into(),
            floors: vec![Floor {
                id: "F1".into(),
                name: "Floor 1".into(),
                slots: vec![
                    Slot { id: "A1".into(), number: 1, category: VehicleCategory::Ev },
                    Slot { id: "A2".into(), number: 2, category: VehicleCategory::Car },
                    Slot { id: "A3".into(), number: 3, category: VehicleCategory::Car },
                ],
            }],
        }
    }

    #[test]
    fn test_lot_lookups() {
        let lot = lot();
        assert_eq!(lot.total_slots(), 3);
        assert!(lot.floor("F1").unwrap().slot("A2").is_some());
        assert!(lot.floor("F2").is_none());
        assert_eq!(lot.vehicle_categories(), vec![VehicleCategory::Car, VehicleCategory::Ev]);

        let refs: Vec<SlotRef> = lot.slot_refs().collect();
        assert_eq!(refs[0].to_string(), "L1/F1/A1");
        assert!(refs[0].in_floor("L1", "F1"));
    }

    #[test]
    fn test_category_serde() {
        assert_eq!(serde_json::to_string(&VehicleCategory::Ev).unwrap(), "\"ev\"");
        assert_eq!(VehicleCategory::parse("BIKE"), Some(VehicleCategory::Bike));
        assert_eq!(VehicleCategory::parse("truck"), None);
    }
}
