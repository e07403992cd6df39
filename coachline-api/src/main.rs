use coachline_api::state::{AppState, AuthConfig, Backends};
use coachline_api::{app, worker};
use coachline_core::payout::EscrowPayoutAdapter;
use coachline_core::{SignalBus, SystemClock};
use coachline_store::app_config::Config;
use coachline_store::{
    DbClient, DbSettings, EventProducer, KafkaSignalListener, PgBookingStore, PgSeriesRepository,
    PgTrainerRepository,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coachline_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!("Starting Coachline API on port {}", config.server.port);

    // Database
    let db = DbClient::new(&config.database.url).await?;
    db.migrate().await?;

    // Signals leave the process through Kafka when a broker is configured
    let signals = SignalBus::new();
    match &config.kafka {
        Some(kafka) => {
            let producer = EventProducer::new(&kafka.brokers)?;
            signals.subscribe(Arc::new(KafkaSignalListener::new(producer, kafka.topic.clone())));
        }
        None => tracing::warn!("No Kafka brokers configured, signals stay in-process"),
    }

    let trainers = Arc::new(PgTrainerRepository::new(db.pool.clone()));
    let rules = config.business_rules.clone();
    let backends = Backends {
        bookings: Arc::new(PgBookingStore::new(db.pool.clone())),
        series: Arc::new(PgSeriesRepository::new(db.pool.clone())),
        trainers: trainers.clone(),
        reviews: trainers,
        settings: Arc::new(DbSettings::new(db.clone(), rules.clone())),
        payouts: Arc::new(EscrowPayoutAdapter),
        clock: Arc::new(SystemClock),
    };

    let state = AppState::build(
        backends,
        signals,
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
        },
        rules.recurring_window,
    );

    // Background workers
    tokio::spawn(worker::start_score_sweep(
        state.scorer.clone(),
        Duration::from_secs(rules.score_sweep_seconds),
    ));
    tokio::spawn(worker::start_series_topup(
        state.engine.clone(),
        rules.recurring_window,
        Duration::from_secs(rules.series_topup_seconds),
    ));

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
