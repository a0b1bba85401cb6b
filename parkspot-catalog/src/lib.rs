pub mod layout;
pub mod pricing;
pub mod registry;

pub use layout::{FloorSpec, LayoutPattern, LotSpec};
pub use pricing::{PricingConfig, PricingEngine, Quote};
pub use registry::SlotRegistry;

use parkspot_core::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Lot not found: {0}")]
    LotNotFound(String),

    #[error("Floor not found: {lot_id}/{floor_id}")]
    FloorNotFound { lot_id: String, floor_id: String },

    #[error("Slot not found: {lot_id}/{floor_id}/{slot_id}")]
    SlotNotFound {
        lot_id: String,
        floor_id: String,
        slot_id: String,
    },

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("Duration of {hours}h is not offered")]
    DurationNotOffered { hours: u32 },

    #[error("Price overflow for {hours}h at {rate}/h")]
    PriceOverflow { rate: i64, hours: u32 },
}

impl From<CatalogError> for CoreError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::LotNotFound(_)
            | CatalogError::FloorNotFound { .. }
            | CatalogError::SlotNotFound { .. } => CoreError::NotFound(err.to_string()),
            CatalogError::DurationNotOffered { .. } => CoreError::ValidationError(err.to_string()),
            CatalogError::InvalidCatalog(_) | CatalogError::PriceOverflow { .. } => {
                CoreError::InternalError(err.to_string())
            }
        }
    }
}
