use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Type};
use thiserror::Error;

use super::paper::PaperStatus;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Review assignment not found")]
    NotFound,
    #[error("Reviewer is not assigned to this paper")]
    NotAssigned,
    #[error("Paper decision is already finalized")]
    DecisionFinalized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(type_name = "review_recommendation", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Accept,
    Reject,
    RevisionRequired,
}

impl Recommendation {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "accept" => Some(Recommendation::Accept),
            "reject" => Some(Recommendation::Reject),
            "revision_required" => Some(Recommendation::RevisionRequired),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Review {
    pub review_id: i64,
    pub paper_id: i64,
    pub reviewer_role_id: i64,
    pub comments_to_author: Option<String>,
    pub comments_to_organiser: Option<String>,
    pub score: Option<i32>,
    /// NULL until the reviewer submits; a pending assignment.
    pub recommendation: Option<Recommendation>,
    pub created_at: DateTime<Utc>,
}

/// Assignment joined with its paper for the reviewer dashboard.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReviewWithPaper {
    pub review_id: i64,
    pub paper_id: i64,
    pub paper_title: String,
    pub paper_status: PaperStatus,
    pub score: Option<i32>,
    pub recommendation: Option<Recommendation>,
}

/// Submitted review joined with the reviewer for the decision form.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReviewWithReviewer {
    pub review_id: i64,
    pub reviewer_name: String,
    pub comments_to_author: Option<String>,
    pub comments_to_organiser: Option<String>,
    pub score: Option<i32>,
    pub recommendation: Option<Recommendation>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewSubmission {
    pub score: i32,
    pub recommendation: Recommendation,
    pub comments_to_author: String,
    pub comments_to_organiser: Option<String>,
}

impl Review {
    /// Assigns reviewers to a paper. Existing assignments are skipped via
    /// the unique constraint; a submitted paper with at least one new
    /// assignment moves to under_review in the same transaction. Returns
    /// the number of new assignments.
    pub async fn assign_many(
        pool: &PgPool,
        paper_id: i64,
        reviewer_role_ids: &[i64],
    ) -> Result<u64, ReviewError> {
        let mut tx = pool.begin().await?;

        let mut inserted = 0u64;
        for role_id in reviewer_role_ids {
            let result = sqlx::query(
                r#"
                INSERT INTO reviews (paper_id, reviewer_role_id)
                VALUES ($1, $2)
                ON CONFLICT (paper_id, reviewer_role_id) DO NOTHING
                "#,
            )
            .bind(paper_id)
            .bind(role_id)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        if inserted > 0 {
            sqlx::query(
                "UPDATE papers SET status = 'under_review' WHERE paper_id = $1 AND status = 'submitted'",
            )
            .bind(paper_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    pub async fn find(pool: &PgPool, review_id: i64) -> Result<Self, ReviewError> {
        sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE review_id = $1")
            .bind(review_id)
            .fetch_optional(pool)
            .await?
            .ok_or(ReviewError::NotFound)
    }

    pub async fn find_assignment(
        pool: &PgPool,
        paper_id: i64,
        reviewer_role_id: i64,
    ) -> Result<Option<Self>, ReviewError> {
        let review = sqlx::query_as::<_, Review>(
            "SELECT * FROM reviews WHERE paper_id = $1 AND reviewer_role_id = $2",
        )
        .bind(paper_id)
        .bind(reviewer_role_id)
        .fetch_optional(pool)
        .await?;
        Ok(review)
    }

    pub async fn list_for_reviewer(
        pool: &PgPool,
        reviewer_role_id: i64,
    ) -> Result<Vec<ReviewWithPaper>, ReviewError> {
        let reviews = sqlx::query_as::<_, ReviewWithPaper>(
            r#"
            SELECT v.review_id, v.paper_id, p.title AS paper_title, p.status AS paper_status,
                   v.score, v.recommendation
            FROM reviews v
            JOIN papers p ON p.paper_id = v.paper_id
            WHERE v.reviewer_role_id = $1
            ORDER BY v.created_at
            "#,
        )
        .bind(reviewer_role_id)
        .fetch_all(pool)
        .await?;
        Ok(reviews)
    }

    /// Submitted reviews only (recommendation present), for the
    /// organizer's decision form.
    pub async fn list_submitted_for_paper(
        pool: &PgPool,
        paper_id: i64,
    ) -> Result<Vec<ReviewWithReviewer>, ReviewError> {
        let reviews = sqlx::query_as::<_, ReviewWithReviewer>(
            r#"
            SELECT v.review_id, u.name AS reviewer_name, v.comments_to_author,
                   v.comments_to_organiser, v.score, v.recommendation
            FROM reviews v
            JOIN conference_roles r ON r.id = v.reviewer_role_id
            JOIN users u ON u.user_id = r.user_id
            WHERE v.paper_id = $1 AND v.recommendation IS NOT NULL
            ORDER BY u.name
            "#,
        )
        .bind(paper_id)
        .fetch_all(pool)
        .await?;
        Ok(reviews)
    }

    /// Records the reviewer's verdict. Re-submission always overwrites;
    /// the locked state shown to reviewers is a UI affordance only.
    pub async fn submit(
        pool: &PgPool,
        review_id: i64,
        data: &ReviewSubmission,
    ) -> Result<Self, ReviewError> {
        let review = sqlx::query_as::<_, Review>(
            r#"
            UPDATE reviews
            SET score = $2, recommendation = $3, comments_to_author = $4,
                comments_to_organiser = $5, created_at = now()
            WHERE review_id = $1
            RETURNING *
            "#,
        )
        .bind(review_id)
        .bind(data.score)
        .bind(data.recommendation)
        .bind(&data.comments_to_author)
        .bind(&data.comments_to_organiser)
        .fetch_optional(pool)
        .await?
        .ok_or(ReviewError::NotFound)?;
        Ok(review)
    }

    /// Unassignment is permitted only while the paper has no final
    /// decision.
    pub async fn remove(pool: &PgPool, review_id: i64) -> Result<i64, ReviewError> {
        let paper_status = sqlx::query_scalar::<_, PaperStatus>(
            r#"
            SELECT p.status FROM reviews v
            JOIN papers p ON p.paper_id = v.paper_id
            WHERE v.review_id = $1
            "#,
        )
        .bind(review_id)
        .fetch_optional(pool)
        .await?
        .ok_or(ReviewError::NotFound)?;

        if !matches!(
            paper_status,
            PaperStatus::Submitted | PaperStatus::UnderReview | PaperStatus::RevisionRequired
        ) {
            return Err(ReviewError::DecisionFinalized);
        }

        let paper_id = sqlx::query_scalar::<_, i64>(
            "DELETE FROM reviews WHERE review_id = $1 RETURNING paper_id",
        )
        .bind(review_id)
        .fetch_optional(pool)
        .await?
        .ok_or(ReviewError::NotFound)?;
        Ok(paper_id)
    }
}
