use async_trait::async_trait;
use chrono::{DateTime, Utc};
use coachline_core::models::{ParentStats, Review, TrainerStats};
use coachline_core::repository::{ReviewRepository, StoreResult, TrainerRepository};
use coachline_core::{TrainerProfile, TrainerScore};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::map_sqlx;

#[derive(sqlx::FromRow)]
struct ScoreRow {
    reliability_score: f64,
    responsiveness_score: f64,
    return_rate_score: f64,
    rating_score: f64,
    composite_score: i32,
    is_elite: bool,
    elite_awarded_at: Option<DateTime<Utc>>,
    score_computed_at: Option<DateTime<Utc>>,
}

impl From<ScoreRow> for TrainerScore {
    fn from(row: ScoreRow) -> Self {
        TrainerScore {
            reliability: row.reliability_score,
            responsiveness: row.responsiveness_score,
            return_rate: row.return_rate_score,
            rating: row.rating_score,
            composite: row.composite_score,
            is_elite: row.is_elite,
            elite_awarded_at: row.elite_awarded_at,
            computed_at: row.score_computed_at,
        }
    }
}

/// Score and statistics columns on the trainer profile, plus reviews.
pub struct PgTrainerRepository {
    pool: PgPool,
}

impl PgTrainerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TrainerRepository for PgTrainerRepository {
    async fn get_trainer(&self, id: Uuid) -> StoreResult<Option<TrainerProfile>> {
        let row: Option<(Uuid, Option<i64>, bool)> =
            sqlx::query_as("SELECT id, hourly_rate_cents, is_active FROM trainers WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx)?;

        Ok(row.map(|(id, hourly_rate_cents, is_active)| TrainerProfile {
            id,
            hourly_rate_cents,
            is_active,
        }))
    }

    async fn get_score(&self, id: Uuid) -> StoreResult<Option<TrainerScore>> {
        let row: Option<ScoreRow> = sqlx::query_as(
            r#"
            SELECT reliability_score, responsiveness_score, return_rate_score, rating_score,
                   composite_score, is_elite, elite_awarded_at, score_computed_at
            FROM trainers WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(row.map(TrainerScore::from))
    }

    async fn save_score(&self, id: Uuid, score: &TrainerScore) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE trainers SET
                reliability_score = $2,
                responsiveness_score = $3,
                return_rate_score = $4,
                rating_score = $5,
                composite_score = $6,
                score_computed_at = $7
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(score.reliability)
        .bind(score.responsiveness)
        .bind(score.return_rate)
        .bind(score.rating)
        .bind(score.composite)
        .bind(score.computed_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(())
    }

    async fn grant_elite(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE trainers SET is_elite = TRUE, elite_awarded_at = $2 WHERE id = $1 AND is_elite = FALSE",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_active_trainer_ids(&self) -> StoreResult<Vec<Uuid>> {
        sqlx::query_scalar("SELECT id FROM trainers WHERE is_active = TRUE")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)
    }

    async fn get_trainer_stats(&self, id: Uuid) -> StoreResult<Option<TrainerStats>> {
        let row: Option<(i64, i64)> = sqlx::query_as(
            "SELECT completed_sessions, total_earnings_cents FROM trainers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(row.map(|(completed_sessions, total_earnings_cents)| TrainerStats {
            completed_sessions,
            total_earnings_cents,
        }))
    }

    async fn get_parent_stats(&self, id: Uuid) -> StoreResult<Option<ParentStats>> {
        let row: Option<(i64, i64)> = sqlx::query_as(
            "SELECT completed_sessions, total_spent_cents FROM parent_stats WHERE parent_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(row.map(|(completed_sessions, total_spent_cents)| ParentStats {
            completed_sessions,
            total_spent_cents,
        }))
    }
}

#[async_trait]
impl ReviewRepository for PgTrainerRepository {
    async fn add_review(&self, review: &Review) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO reviews (id, trainer_id, parent_id, rating, comment, created_at) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(review.id)
        .bind(review.trainer_id)
        .bind(review.parent_id)
        .bind(review.rating)
        .bind(&review.comment)
        .bind(review.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(())
    }

    async fn average_rating(&self, trainer_id: Uuid) -> StoreResult<Option<f64>> {
        sqlx::query_scalar("SELECT AVG(rating)::FLOAT8 FROM reviews WHERE trainer_id = $1")
            .bind(trainer_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)
    }
}
