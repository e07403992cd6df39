use coachline_booking::{BookingLifecycle, PayoutListener, RecurringEngine, SeriesProgressListener};
use coachline_core::payout::PayoutAdapter;
use coachline_core::repository::{BookingStore, ReviewRepository, SeriesRepository, TrainerRepository};
use coachline_core::settings::SettingsProvider;
use coachline_core::{Clock, SignalBus};
use coachline_scoring::{ReliabilityScorer, ScoreRefreshListener};
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

/// Storage and collaborator implementations the services run on.
pub struct Backends {
    pub bookings: Arc<dyn BookingStore>,
    pub series: Arc<dyn SeriesRepository>,
    pub trainers: Arc<dyn TrainerRepository>,
    pub reviews: Arc<dyn ReviewRepository>,
    pub settings: Arc<dyn SettingsProvider>,
    pub payouts: Arc<dyn PayoutAdapter>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<BookingLifecycle>,
    pub engine: Arc<RecurringEngine>,
    pub scorer: Arc<ReliabilityScorer>,
    pub signals: SignalBus,
    pub auth: AuthConfig,
}

impl AppState {
    /// Wire services and subscribe the in-process listeners next to any already
    /// on `signals` (e.g. Kafka). Each listener gets its own task per signal.
    pub fn build(backends: Backends, signals: SignalBus, auth: AuthConfig, recurring_window: u32) -> Self {
        let lifecycle = Arc::new(BookingLifecycle::new(
            backends.bookings.clone(),
            backends.trainers.clone(),
            backends.settings,
            signals.clone(),
            backends.clock.clone(),
        ));
        let engine = Arc::new(RecurringEngine::new(
            lifecycle.clone(),
            backends.series,
            recurring_window,
        ));
        let scorer = Arc::new(ReliabilityScorer::new(
            backends.bookings,
            backends.trainers,
            backends.reviews,
            signals.clone(),
            backends.clock,
        ));

        signals.subscribe(Arc::new(PayoutListener::new(backends.payouts)));
        signals.subscribe(Arc::new(SeriesProgressListener::new(&engine)));
        signals.subscribe(Arc::new(ScoreRefreshListener::new(&scorer)));

        Self {
            lifecycle,
            engine,
            scorer,
            signals,
            auth,
        }
    }
}
