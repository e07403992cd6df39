use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::repository::StoreResult;

/// Platform-wide policy values read at booking time.
#[async_trait]
pub trait SettingsProvider: Send + Sync {
    /// Current platform fee as a percentage (25.0 means 25%).
    async fn platform_fee_percent(&self) -> StoreResult<f64>;

    /// Rate used when a trainer has not set one.
    async fn default_hourly_rate_cents(&self) -> StoreResult<i64>;
}

/// Settings held in memory, adjustable at runtime.
pub struct StaticSettings {
    fee_percent_bits: AtomicU64,
    default_rate_cents: AtomicU64,
}

impl StaticSettings {
    pub fn new(fee_percent: f64, default_rate_cents: i64) -> Self {
        Self {
            fee_percent_bits: AtomicU64::new(fee_percent.to_bits()),
            default_rate_cents: AtomicU64::new(default_rate_cents.max(0) as u64),
        }
    }

    pub fn set_fee_percent(&self, fee_percent: f64) {
        self.fee_percent_bits.store(fee_percent.to_bits(), Ordering::SeqCst);
    }
}

impl Default for StaticSettings {
    fn default() -> Self {
        Self::new(25.0, 5000)
    }
}

#[async_trait]
impl SettingsProvider for StaticSettings {
    async fn platform_fee_percent(&self) -> StoreResult<f64> {
        Ok(f64::from_bits(self.fee_percent_bits.load(Ordering::SeqCst)))
    }

    async fn default_hourly_rate_cents(&self) -> StoreResult<i64> {
        Ok(self.default_rate_cents.load(Ordering::SeqCst) as i64)
    }
}
