use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    /// Signals are only logged when no broker is configured.
    pub kafka: Option<KafkaConfig>,
    pub auth: AuthConfig,
    #[serde(default)]
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    #[serde(default = "default_fee_percent")]
    pub platform_fee_percent: f64,
    #[serde(default = "default_hourly_rate_cents")]
    pub default_hourly_rate_cents: i64,
    /// Occurrences materialized ahead for each active series.
    #[serde(default = "default_recurring_window")]
    pub recurring_window: u32,
    #[serde(default = "default_score_sweep_seconds")]
    pub score_sweep_seconds: u64,
    #[serde(default = "default_series_topup_seconds")]
    pub series_topup_seconds: u64,
}

fn default_fee_percent() -> f64 { 25.0 }
fn default_hourly_rate_cents() -> i64 { 5000 }
fn default_recurring_window() -> u32 { 4 }
fn default_score_sweep_seconds() -> u64 { 86_400 }
fn default_series_topup_seconds() -> u64 { 3_600 }

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            platform_fee_percent: default_fee_percent(),
            default_hourly_rate_cents: default_hourly_rate_cents(),
            recurring_window: default_recurring_window(),
            score_sweep_seconds: default_score_sweep_seconds(),
            series_topup_seconds: default_series_topup_seconds(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    #[serde(default = "default_topic")]
    pub topic: String,
}

fn default_topic() -> String { "coachline.signals".to_string() }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Developer overrides, never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `COACHLINE__DATABASE__URL=postgres://...`
            .add_source(config::Environment::with_prefix("COACHLINE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
