use coachline_core::models::Review;
use coachline_core::repository::{BookingStore, ReviewRepository, TrainerRepository};
use coachline_core::{Clock, CoreError, CoreResult, SignalBus, TrainerScore};
use coachline_shared::Signal;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::components::ScoreInputs;

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewRequest {
    pub rating: i16,
    pub comment: Option<String>,
}

/// Recomputes trainer quality scores from booking and review history.
///
/// Reads bookings, never writes them. The only writes are the score fields
/// and the sticky elite grant.
pub struct ReliabilityScorer {
    bookings: Arc<dyn BookingStore>,
    trainers: Arc<dyn TrainerRepository>,
    reviews: Arc<dyn ReviewRepository>,
    signals: SignalBus,
    clock: Arc<dyn Clock>,
}

impl ReliabilityScorer {
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        trainers: Arc<dyn TrainerRepository>,
        reviews: Arc<dyn ReviewRepository>,
        signals: SignalBus,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            bookings,
            trainers,
            reviews,
            signals,
            clock,
        }
    }

    pub async fn current_score(&self, trainer_id: Uuid) -> CoreResult<TrainerScore> {
        self.trainers
            .get_score(trainer_id)
            .await?
            .ok_or(CoreError::InvalidTrainer(trainer_id))
    }

    /// Recompute and persist all sub-scores, then evaluate the elite tier.
    pub async fn compute_composite(&self, trainer_id: Uuid) -> CoreResult<TrainerScore> {
        if self.trainers.get_trainer(trainer_id).await?.is_none() {
            return Err(CoreError::InvalidTrainer(trainer_id));
        }

        // 1. Gather history
        let inputs = ScoreInputs {
            trainer_id,
            bookings: self.bookings.list_trainer_bookings(trainer_id).await?,
            average_rating: self.reviews.average_rating(trainer_id).await?,
            now: self.clock.now(),
            today: self.clock.today(),
        };

        // 2. Score and persist
        let score = inputs.score();
        self.trainers.save_score(trainer_id, &score).await?;

        // 3. Elite tier, granted once and never revoked here
        if inputs.is_elite_eligible(score.composite)
            && self.trainers.grant_elite(trainer_id, inputs.now).await?
        {
            info!(
                "Trainer {} awarded elite tier with composite {}",
                trainer_id, score.composite
            );
            self.signals
                .emit(Signal::EliteTierAwarded {
                    trainer_id,
                    composite_score: score.composite,
                    awarded_at: inputs.now,
                });
        }

        info!("Trainer {} scored {}", trainer_id, score.composite);
        self.current_score(trainer_id).await
    }

    /// Full pass over every active trainer. Returns how many were scored.
    pub async fn sweep_all(&self) -> CoreResult<usize> {
        let trainer_ids = self.trainers.list_active_trainer_ids().await?;
        let mut scored = 0;
        for trainer_id in trainer_ids {
            match self.compute_composite(trainer_id).await {
                Ok(_) => scored += 1,
                Err(e) => warn!("Score sweep failed for trainer {}: {}", trainer_id, e),
            }
        }
        info!("Score sweep finished: {} trainers", scored);
        Ok(scored)
    }

    /// Store a star rating and rescore the trainer.
    pub async fn submit_review(
        &self,
        trainer_id: Uuid,
        parent_id: Option<Uuid>,
        req: ReviewRequest,
    ) -> CoreResult<TrainerScore> {
        if !(1..=5).contains(&req.rating) {
            return Err(CoreError::Validation(format!(
                "rating must be between 1 and 5, got {}",
                req.rating
            )));
        }
        if self.trainers.get_trainer(trainer_id).await?.is_none() {
            return Err(CoreError::InvalidTrainer(trainer_id));
        }

        let review = Review {
            id: Uuid::new_v4(),
            trainer_id,
            parent_id,
            rating: req.rating,
            comment: req.comment,
            created_at: self.clock.now(),
        };
        self.reviews.add_review(&review).await?;

        self.compute_composite(trainer_id).await
    }
}
