use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConferenceError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Conference not found")]
    NotFound,
    #[error("Start date cannot be after the end date")]
    InvalidDates,
}

/// Derived, never stored: a pure function of today's date against the
/// conference window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConferenceStatus {
    Upcoming,
    Ongoing,
    Completed,
}

impl ConferenceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ConferenceStatus::Upcoming => "upcoming",
            ConferenceStatus::Ongoing => "ongoing",
            ConferenceStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Conference {
    pub conference_id: i64,
    pub title: String,
    pub hosting_university: String,
    pub hosting_department: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub author_fee_cents: i64,
    pub participant_fee_cents: i64,
    pub final_schedule_file: Option<String>,
    pub created_by_admin_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct NewConference {
    pub title: String,
    pub hosting_university: String,
    pub hosting_department: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub author_fee_cents: i64,
    pub participant_fee_cents: i64,
}

#[derive(Debug, Deserialize)]
pub struct ConferenceDetails {
    pub description: String,
    pub location: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub author_fee_cents: i64,
    pub participant_fee_cents: i64,
}

pub fn status_on(today: NaiveDate, start: NaiveDate, end: NaiveDate) -> ConferenceStatus {
    if today < start {
        ConferenceStatus::Upcoming
    } else if today > end {
        ConferenceStatus::Completed
    } else {
        ConferenceStatus::Ongoing
    }
}

impl Conference {
    pub fn status(&self) -> ConferenceStatus {
        status_on(Utc::now().date_naive(), self.start_date, self.end_date)
    }

    pub async fn create(
        pool: &PgPool,
        admin_id: i64,
        data: NewConference,
    ) -> Result<Self, ConferenceError> {
        if data.start_date > data.end_date {
            return Err(ConferenceError::InvalidDates);
        }

        let conference = sqlx::query_as::<_, Conference>(
            r#"
            INSERT INTO conferences (
                title, hosting_university, hosting_department, description, location,
                start_date, end_date, author_fee_cents, participant_fee_cents, created_by_admin_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(&data.title)
        .bind(&data.hosting_university)
        .bind(&data.hosting_department)
        .bind(&data.description)
        .bind(&data.location)
        .bind(data.start_date)
        .bind(data.end_date)
        .bind(data.author_fee_cents)
        .bind(data.participant_fee_cents)
        .bind(admin_id)
        .fetch_one(pool)
        .await?;

        Ok(conference)
    }

    pub async fn find(pool: &PgPool, conference_id: i64) -> Result<Self, ConferenceError> {
        sqlx::query_as::<_, Conference>("SELECT * FROM conferences WHERE conference_id = $1")
            .bind(conference_id)
            .fetch_optional(pool)
            .await?
            .ok_or(ConferenceError::NotFound)
    }

    pub async fn list_by_start_date(pool: &PgPool) -> Result<Vec<Self>, ConferenceError> {
        let conferences =
            sqlx::query_as::<_, Conference>("SELECT * FROM conferences ORDER BY start_date")
                .fetch_all(pool)
                .await?;
        Ok(conferences)
    }

    pub async fn list_by_admin(pool: &PgPool, admin_id: i64) -> Result<Vec<Self>, ConferenceError> {
        let conferences = sqlx::query_as::<_, Conference>(
            "SELECT * FROM conferences WHERE created_by_admin_id = $1 ORDER BY start_date",
        )
        .bind(admin_id)
        .fetch_all(pool)
        .await?;
        Ok(conferences)
    }

    pub async fn update_details(
        pool: &PgPool,
        conference_id: i64,
        details: ConferenceDetails,
    ) -> Result<(), ConferenceError> {
        if details.start_date > details.end_date {
            return Err(ConferenceError::InvalidDates);
        }

        let result = sqlx::query(
            r#"
            UPDATE conferences
            SET description = $2, location = $3, start_date = $4, end_date = $5,
                author_fee_cents = $6, participant_fee_cents = $7
            WHERE conference_id = $1
            "#,
        )
        .bind(conference_id)
        .bind(&details.description)
        .bind(&details.location)
        .bind(details.start_date)
        .bind(details.end_date)
        .bind(details.author_fee_cents)
        .bind(details.participant_fee_cents)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ConferenceError::NotFound);
        }
        Ok(())
    }

    pub async fn set_final_schedule(
        pool: &PgPool,
        conference_id: i64,
        filename: &str,
    ) -> Result<(), ConferenceError> {
        let result =
            sqlx::query("UPDATE conferences SET final_schedule_file = $2 WHERE conference_id = $1")
                .bind(conference_id)
                .bind(filename)
                .execute(pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(ConferenceError::NotFound);
        }
        Ok(())
    }

    /// Deletion is restricted to the admin who created the conference.
    pub async fn delete_owned(
        pool: &PgPool,
        conference_id: i64,
        admin_id: i64,
    ) -> Result<(), ConferenceError> {
        let result = sqlx::query(
            "DELETE FROM conferences WHERE conference_id = $1 AND created_by_admin_id = $2",
        )
        .bind(conference_id)
        .bind(admin_id)
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(ConferenceError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn status_is_pure_function_of_dates() {
        let start = date("2030-01-01");
        let end = date("2030-01-03");

        assert_eq!(status_on(date("2029-12-01"), start, end), ConferenceStatus::Upcoming);
        assert_eq!(status_on(date("2030-01-01"), start, end), ConferenceStatus::Ongoing);
        assert_eq!(status_on(date("2030-01-02"), start, end), ConferenceStatus::Ongoing);
        assert_eq!(status_on(date("2030-01-03"), start, end), ConferenceStatus::Ongoing);
        assert_eq!(status_on(date("2030-01-04"), start, end), ConferenceStatus::Completed);
    }

    #[test]
    fn one_day_conference_is_ongoing_on_that_day() {
        let d = date("2030-06-15");
        assert_eq!(status_on(d, d, d), ConferenceStatus::Ongoing);
    }
}
