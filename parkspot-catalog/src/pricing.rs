use parkspot_core::ParkingLot;
use serde::{Deserialize, Serialize};

use crate::CatalogError;

/// Durations the booking flow offers, in whole hours.
pub const DEFAULT_OFFERED_DURATIONS: [u32; 10] = [1, 2, 3, 4, 5, 6, 8, 10, 12, 24];

#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    #[serde(default = "default_durations")]
    pub offered_durations: Vec<u32>,
}

fn default_durations() -> Vec<u32> {
    DEFAULT_OFFERED_DURATIONS.to_vec()
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            offered_durations: default_durations(),
        }
    }
}

/// Price shown before commit and charged on commit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Quote {
    pub rate_per_hour: i64,
    pub hours: u32,
    pub total: i64,
    pub currency: String,
}

/// Flat hourly pricing: `rate * hours`, integer minor units, no rounding.
pub struct PricingEngine {
    config: PricingConfig,
}

impl PricingEngine {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn is_offered(&self, hours: u32) -> bool {
        self.config.offered_durations.contains(&hours)
    }

    pub fn quote(&self, lot: &ParkingLot, hours: u32) -> Result<Quote, CatalogError> {
        if !self.is_offered(hours) {
            return Err(CatalogError::DurationNotOffered { hours });
        }

        let total = lot
            .price_per_hour
            .checked_mul(i64::from(hours))
            .ok_or(CatalogError::PriceOverflow {
                rate: lot.price_per_hour,
                hours,
            })?;

        Ok(Quote {
            rate_per_hour: lot.price_per_hour,
            hours,
            total,
            currency: lot.currency.clone(),
        })
    }
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::new(PricingConfig::default())
    }
}
