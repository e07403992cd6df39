use coachline_booking::RecurringEngine;
use coachline_scoring::ReliabilityScorer;
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};

/// Daily pass over every active trainer to catch drift not tied to a single event.
pub async fn start_score_sweep(scorer: Arc<ReliabilityScorer>, period: Duration) {
    info!("Score sweep worker started, every {:?}", period);
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if let Err(e) = scorer.sweep_all().await {
            error!("Score sweep failed: {}", e);
        }
    }
}

/// Keeps each active series materialized `window` occurrences ahead.
pub async fn start_series_topup(engine: Arc<RecurringEngine>, window: u32, period: Duration) {
    info!("Series top-up worker started, every {:?}", period);
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match engine.top_up_active(window).await {
            Ok(created) if created > 0 => info!("Series top-up created {} bookings", created),
            Ok(_) => {}
            Err(e) => error!("Series top-up failed: {}", e),
        }
    }
}
