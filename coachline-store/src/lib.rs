pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod events;
pub mod series_repo;
pub mod settings_repo;
pub mod trainer_repo;

pub use booking_repo::PgBookingStore;
pub use database::DbClient;
pub use events::{EventProducer, KafkaSignalListener};
pub use series_repo::PgSeriesRepository;
pub use settings_repo::DbSettings;
pub use trainer_repo::PgTrainerRepository;
