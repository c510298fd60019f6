use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use super::conference::ConferenceError;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Track {
    pub track_id: i64,
    pub conference_id: i64,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TrackForm {
    pub name: String,
    pub description: Option<String>,
}

impl Track {
    pub async fn create(
        pool: &PgPool,
        conference_id: i64,
        data: &TrackForm,
    ) -> Result<Self, ConferenceError> {
        let track = sqlx::query_as::<_, Track>(
            r#"
            INSERT INTO tracks (conference_id, name, description)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(conference_id)
        .bind(&data.name)
        .bind(&data.description)
        .fetch_one(pool)
        .await?;
        Ok(track)
    }

    pub async fn update(
        pool: &PgPool,
        conference_id: i64,
        track_id: i64,
        data: &TrackForm,
    ) -> Result<(), ConferenceError> {
        let result = sqlx::query(
            "UPDATE tracks SET name = $3, description = $4 WHERE track_id = $2 AND conference_id = $1",
        )
        .bind(conference_id)
        .bind(track_id)
        .bind(&data.name)
        .bind(&data.description)
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(ConferenceError::NotFound);
        }
        Ok(())
    }

    pub async fn delete(
        pool: &PgPool,
        conference_id: i64,
        track_id: i64,
    ) -> Result<(), ConferenceError> {
        let result = sqlx::query("DELETE FROM tracks WHERE track_id = $2 AND conference_id = $1")
            .bind(conference_id)
            .bind(track_id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ConferenceError::NotFound);
        }
        Ok(())
    }

    pub async fn list_for_conference(
        pool: &PgPool,
        conference_id: i64,
    ) -> Result<Vec<Self>, ConferenceError> {
        let tracks = sqlx::query_as::<_, Track>(
            "SELECT * FROM tracks WHERE conference_id = $1 ORDER BY name",
        )
        .bind(conference_id)
        .fetch_all(pool)
        .await?;
        Ok(tracks)
    }
}
