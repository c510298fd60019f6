use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Session not found")]
    NotFound,
    #[error("Paper is already assigned to a session")]
    PaperAlreadyScheduled,
    #[error("Paper is not eligible for scheduling")]
    NotEligible,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Session {
    pub session_id: i64,
    pub conference_id: i64,
    pub track_id: Option<i64>,
    pub name: String,
    pub schedule_time: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub session_chair_role_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SessionForm {
    pub name: String,
    pub schedule_time: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub track_id: Option<i64>,
    pub session_chair_role_id: Option<i64>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SessionPaper {
    pub id: i64,
    pub session_id: i64,
    pub paper_id: i64,
    pub presenter_role_id: i64,
    pub presentation_time: Option<DateTime<Utc>>,
}

/// Flattened schedule row for rendering the program and its PDF.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ScheduleEntry {
    pub session_id: i64,
    pub session_name: String,
    pub schedule_time: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub track_name: Option<String>,
    pub chair_name: Option<String>,
    pub paper_title: Option<String>,
    pub presenter_name: Option<String>,
}

impl Session {
    pub async fn create(
        pool: &PgPool,
        conference_id: i64,
        data: &SessionForm,
    ) -> Result<Self, ScheduleError> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (conference_id, track_id, name, schedule_time, location, session_chair_role_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(conference_id)
        .bind(data.track_id)
        .bind(&data.name)
        .bind(data.schedule_time)
        .bind(&data.location)
        .bind(data.session_chair_role_id)
        .fetch_one(pool)
        .await?;
        Ok(session)
    }

    pub async fn update(
        pool: &PgPool,
        conference_id: i64,
        session_id: i64,
        data: &SessionForm,
    ) -> Result<(), ScheduleError> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET name = $3, schedule_time = $4, location = $5, track_id = $6, session_chair_role_id = $7
            WHERE session_id = $2 AND conference_id = $1
            "#,
        )
        .bind(conference_id)
        .bind(session_id)
        .bind(&data.name)
        .bind(data.schedule_time)
        .bind(&data.location)
        .bind(data.track_id)
        .bind(data.session_chair_role_id)
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(ScheduleError::NotFound);
        }
        Ok(())
    }

    pub async fn delete(
        pool: &PgPool,
        conference_id: i64,
        session_id: i64,
    ) -> Result<(), ScheduleError> {
        let result =
            sqlx::query("DELETE FROM sessions WHERE session_id = $2 AND conference_id = $1")
                .bind(conference_id)
                .bind(session_id)
                .execute(pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(ScheduleError::NotFound);
        }
        Ok(())
    }

    pub async fn list_for_conference(
        pool: &PgPool,
        conference_id: i64,
    ) -> Result<Vec<Self>, ScheduleError> {
        let sessions = sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE conference_id = $1 ORDER BY schedule_time NULLS LAST",
        )
        .bind(conference_id)
        .fetch_all(pool)
        .await?;
        Ok(sessions)
    }

    /// One row per (session, assigned paper), sessions without papers
    /// included, ordered for the schedule PDF.
    pub async fn schedule_entries(
        pool: &PgPool,
        conference_id: i64,
    ) -> Result<Vec<ScheduleEntry>, ScheduleError> {
        let entries = sqlx::query_as::<_, ScheduleEntry>(
            r#"
            SELECT s.session_id, s.name AS session_name, s.schedule_time, s.location,
                   t.name AS track_name, cu.name AS chair_name,
                   p.title AS paper_title, pu.name AS presenter_name
            FROM sessions s
            LEFT JOIN tracks t ON t.track_id = s.track_id
            LEFT JOIN conference_roles cr ON cr.id = s.session_chair_role_id
            LEFT JOIN users cu ON cu.user_id = cr.user_id
            LEFT JOIN session_papers sp ON sp.session_id = s.session_id
            LEFT JOIN papers p ON p.paper_id = sp.paper_id
            LEFT JOIN conference_roles pr ON pr.id = sp.presenter_role_id
            LEFT JOIN users pu ON pu.user_id = pr.user_id
            WHERE s.conference_id = $1
            ORDER BY s.schedule_time NULLS LAST, s.session_id, p.title
            "#,
        )
        .bind(conference_id)
        .fetch_all(pool)
        .await?;
        Ok(entries)
    }
}

impl SessionPaper {
    /// Places a paper in a session. Eligibility (accepted + paid) is
    /// checked first; the unique constraint on paper_id turns a second
    /// placement into a clean failure.
    pub async fn assign(
        pool: &PgPool,
        session_id: i64,
        paper_id: i64,
    ) -> Result<Self, ScheduleError> {
        let eligible = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT count(*)
            FROM papers p
            JOIN registrations g ON g.role_id = p.author_role_id
            WHERE p.paper_id = $1 AND p.status = 'accepted' AND g.payment_status = 'completed'
            "#,
        )
        .bind(paper_id)
        .fetch_one(pool)
        .await?;
        if eligible == 0 {
            return Err(ScheduleError::NotEligible);
        }

        let assignment = sqlx::query_as::<_, SessionPaper>(
            r#"
            INSERT INTO session_papers (session_id, paper_id, presenter_role_id)
            SELECT $1, $2, p.author_role_id FROM papers p WHERE p.paper_id = $2
            RETURNING *
            "#,
        )
        .bind(session_id)
        .bind(paper_id)
        .fetch_one(pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ScheduleError::PaperAlreadyScheduled
            }
            _ => ScheduleError::Database(e),
        })?;

        Ok(assignment)
    }
}
