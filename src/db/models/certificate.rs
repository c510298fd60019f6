use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Type};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CertificateError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("A certificate of this type is already issued for the role")]
    AlreadyIssued,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(type_name = "certificate_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CertificateType {
    Author,
    Participant,
    Reviewer,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Certificate {
    pub certificate_id: i64,
    pub role_id: i64,
    pub certificate_type: CertificateType,
    pub file_path: Option<String>,
    pub issued_at: DateTime<Utc>,
}

impl Certificate {
    /// At most one certificate per (role, type); a concurrent duplicate
    /// insert surfaces as `AlreadyIssued` via the unique constraint.
    pub async fn issue(
        pool: &PgPool,
        role_id: i64,
        certificate_type: CertificateType,
        file_path: &str,
    ) -> Result<Self, CertificateError> {
        sqlx::query_as::<_, Certificate>(
            r#"
            INSERT INTO certificates (role_id, certificate_type, file_path)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(role_id)
        .bind(certificate_type)
        .bind(file_path)
        .fetch_one(pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                CertificateError::AlreadyIssued
            }
            _ => CertificateError::Database(e),
        })
    }

    pub async fn find_for_role(
        pool: &PgPool,
        role_id: i64,
        certificate_type: CertificateType,
    ) -> Result<Option<Self>, CertificateError> {
        let certificate = sqlx::query_as::<_, Certificate>(
            "SELECT * FROM certificates WHERE role_id = $1 AND certificate_type = $2",
        )
        .bind(role_id)
        .bind(certificate_type)
        .fetch_optional(pool)
        .await?;
        Ok(certificate)
    }
}
