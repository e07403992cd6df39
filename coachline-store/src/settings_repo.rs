use async_trait::async_trait;
use coachline_core::settings::SettingsProvider;
use coachline_core::StoreResult;
use tracing::warn;

use crate::app_config::BusinessRules;
use crate::database::{map_sqlx, DbClient};

/// Live business rules: the `business_rules` table wins over configuration.
pub struct DbSettings {
    db: DbClient,
    defaults: BusinessRules,
}

impl DbSettings {
    pub fn new(db: DbClient, defaults: BusinessRules) -> Self {
        Self { db, defaults }
    }

    async fn current(&self) -> StoreResult<BusinessRules> {
        self.db
            .fetch_business_rules(self.defaults.clone())
            .await
            .map_err(map_sqlx)
    }
}

#[async_trait]
impl SettingsProvider for DbSettings {
    async fn platform_fee_percent(&self) -> StoreResult<f64> {
        let percent = self.current().await?.platform_fee_percent;
        if !(0.0..=100.0).contains(&percent) {
            warn!("Ignoring out-of-range platform fee {}%", percent);
            return Ok(self.defaults.platform_fee_percent);
        }
        Ok(percent)
    }

    async fn default_hourly_rate_cents(&self) -> StoreResult<i64> {
        Ok(self.current().await?.default_hourly_rate_cents)
    }
}
