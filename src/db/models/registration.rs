use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Type};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Registration already exists for this role")]
    AlreadyRegistered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Registration {
    pub registration_id: i64,
    pub role_id: i64,
    pub conference_id: i64,
    pub fee_cents: i64,
    pub payment_status: PaymentStatus,
    pub registration_date: DateTime<Utc>,
}

impl Registration {
    /// Payment is simulated: a successful confirmation lands directly as a
    /// completed registration. The unique role_id makes double payment an
    /// integrity error.
    pub async fn create_completed(
        pool: &PgPool,
        role_id: i64,
        conference_id: i64,
        fee_cents: i64,
    ) -> Result<Self, RegistrationError> {
        let registration = sqlx::query_as::<_, Registration>(
            r#"
            INSERT INTO registrations (role_id, conference_id, fee_cents, payment_status)
            VALUES ($1, $2, $3, 'completed')
            RETURNING *
            "#,
        )
        .bind(role_id)
        .bind(conference_id)
        .bind(fee_cents)
        .fetch_one(pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RegistrationError::AlreadyRegistered
            }
            _ => RegistrationError::Database(e),
        })?;

        Ok(registration)
    }

    pub async fn find_by_role(
        pool: &PgPool,
        role_id: i64,
    ) -> Result<Option<Self>, RegistrationError> {
        let registration =
            sqlx::query_as::<_, Registration>("SELECT * FROM registrations WHERE role_id = $1")
                .bind(role_id)
                .fetch_optional(pool)
                .await?;
        Ok(registration)
    }

    pub async fn is_paid(pool: &PgPool, role_id: i64) -> Result<bool, RegistrationError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT count(*) FROM registrations WHERE role_id = $1 AND payment_status = 'completed'",
        )
        .bind(role_id)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }
}
