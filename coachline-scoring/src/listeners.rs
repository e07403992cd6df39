use async_trait::async_trait;
use coachline_core::SignalListener;
use coachline_shared::Signal;
use std::sync::{Arc, Weak};
use tracing::debug;

use crate::scorer::ReliabilityScorer;

/// Rescores the trainer whenever one of their sessions completes.
pub struct ScoreRefreshListener {
    scorer: Weak<ReliabilityScorer>,
}

impl ScoreRefreshListener {
    pub fn new(scorer: &Arc<ReliabilityScorer>) -> Self {
        Self {
            scorer: Arc::downgrade(scorer),
        }
    }
}

#[async_trait]
impl SignalListener for ScoreRefreshListener {
    fn name(&self) -> &'static str {
        "score_refresh"
    }

    async fn handle(&self, signal: &Signal) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let Signal::SessionCompleted { trainer_id, .. } = signal else {
            return Ok(());
        };

        match self.scorer.upgrade() {
            Some(scorer) => {
                scorer.compute_composite(*trainer_id).await?;
            }
            None => debug!("Scorer dropped, skipping refresh for trainer {}", trainer_id),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use coachline_core::memory::InMemoryStore;
    use coachline_core::repository::TrainerRepository;
    use coachline_core::{FixedClock, SignalBus, TrainerProfile};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_session_completed_triggers_rescore() {
        let store = InMemoryStore::new();
        let trainer_id = Uuid::new_v4();
        store
            .add_trainer(TrainerProfile {
                id: trainer_id,
                hourly_rate_cents: None,
                is_active: true,
            })
            .await;

        let signals = SignalBus::new();
        let scorer = Arc::new(ReliabilityScorer::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            signals.clone(),
            Arc::new(FixedClock::on(NaiveDate::from_ymd_opt(2026, 6, 1).unwrap())),
        ));
        signals.subscribe(Arc::new(ScoreRefreshListener::new(&scorer)));

        signals
            .emit(Signal::SessionCompleted {
                booking_id: Uuid::new_v4(),
                trainer_id,
                parent_id: None,
                recurring_id: None,
            });
        signals.settled().await;

        let score = store.get_score(trainer_id).await.unwrap().unwrap();
        assert_eq!(score.composite, 97);
        assert!(score.computed_at.is_some());
    }
}
