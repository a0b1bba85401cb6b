use parkspot_core::{Floor, ParkingLot, Slot, VehicleCategory};
use serde::Deserialize;

/// How categories are distributed over a generated floor.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LayoutPattern {
    /// Every third slot is EV, remaining even positions are bikes, the rest cars.
    #[default]
    Mixed,
    Car,
    Bike,
    Ev,
}

impl LayoutPattern {
    /// Category for the zero-based position `index` on the floor.
    pub fn category_at(&self, index: u32) -> VehicleCategory {
        match self {
            LayoutPattern::Mixed => {
                if index % 3 == 0 {
                    VehicleCategory::Ev
                } else if index % 2 == 0 {
                    VehicleCategory::Bike
                } else {
                    VehicleCategory::Car
                }
            }
            LayoutPattern::Car => VehicleCategory::Car,
            LayoutPattern::Bike => VehicleCategory::Bike,
            LayoutPattern::Ev => VehicleCategory::Ev,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FloorSpec {
    pub id: String,
    pub name: Option<String>,
    pub slot_count: u32,
    #[serde(default)]
    pub pattern: LayoutPattern,
}

impl FloorSpec {
    /// Slots are labelled `<floor id>-<n>` with `n` starting at 1.
    pub fn build(&self) -> Floor {
        let slots = (0..self.slot_count)
            .map(|i| Slot {
                id: format!("{}-{}", self.id, i + 1),
                number: i + 1,
                category: self.pattern.category_at(i),
            })
            .collect();

        Floor {
            id: self.id.clone(),
            name: self.name.clone().unwrap_or_else(|| format!("Floor {}", self.id)),
            slots,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LotSpec {
    pub id: String,
    pub name: String,
    pub location: String,
    pub price_per_hour: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub floors: Vec<FloorSpec>,
}

fn default_currency() -> String {
    "INR".to_string()
}

impl LotSpec {
    pub fn build(&self) -> ParkingLot {
        ParkingLot {
            id: self.id.clone(),
            name: self.name.clone(),
            location: self.location.clone(),
            price_per_hour: self.price_per_hour,
            currency: self.currency.clone(),
            floors: self.floors.iter().map(FloorSpec::build).collect(),
        }
    }
}
