use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("User not found")]
    NotFound,
    #[error("Email already registered")]
    EmailTaken,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub university_name: Option<String>,
    pub department: Option<String>,
    pub contact_no: Option<String>,
    pub is_admin: bool,
    pub is_super_admin: bool,
    pub is_email_verified: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub university_name: Option<String>,
    pub department: Option<String>,
    pub contact_no: Option<String>,
}

/// Editable account details; email and flags stay fixed.
#[derive(Debug, Deserialize)]
pub struct ProfileUpdate {
    pub name: String,
    pub university_name: Option<String>,
    pub department: Option<String>,
    pub contact_no: Option<String>,
}

impl User {
    pub async fn create(pool: &PgPool, data: NewUser) -> Result<Self, UserError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash, university_name, department, contact_no)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(&data.email)
        .bind(&data.password_hash)
        .bind(&data.university_name)
        .bind(&data.department)
        .bind(&data.contact_no)
        .fetch_one(pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => UserError::EmailTaken,
            _ => UserError::Database(e),
        })?;

        Ok(user)
    }

    /// Admin accounts skip email verification; the welcome mail carries the
    /// initial credentials.
    pub async fn create_admin(
        pool: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<Self, UserError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash, is_admin, is_email_verified)
            VALUES ($1, $2, $3, TRUE, TRUE)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => UserError::EmailTaken,
            _ => UserError::Database(e),
        })?;

        Ok(user)
    }

    /// Startup bootstrap: inserts the super-admin account if the email is
    /// not taken yet. Idempotent across restarts.
    pub async fn ensure_super_admin(
        pool: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<(), UserError> {
        sqlx::query(
            r#"
            INSERT INTO users (name, email, password_hash, is_admin, is_super_admin, is_email_verified)
            VALUES ($1, $2, $3, TRUE, TRUE, TRUE)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn find(pool: &PgPool, user_id: i64) -> Result<Self, UserError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?
            .ok_or(UserError::NotFound)
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, UserError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await?;
        Ok(user)
    }

    pub async fn mark_email_verified(pool: &PgPool, user_id: i64) -> Result<(), UserError> {
        let result = sqlx::query("UPDATE users SET is_email_verified = TRUE WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(UserError::NotFound);
        }
        Ok(())
    }

    pub async fn update_profile(
        pool: &PgPool,
        user_id: i64,
        data: &ProfileUpdate,
    ) -> Result<Self, UserError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = $2, university_name = $3, department = $4, contact_no = $5
            WHERE user_id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&data.name)
        .bind(&data.university_name)
        .bind(&data.department)
        .bind(&data.contact_no)
        .fetch_optional(pool)
        .await?
        .ok_or(UserError::NotFound)
    }

    pub async fn set_password_hash(
        pool: &PgPool,
        user_id: i64,
        password_hash: &str,
    ) -> Result<(), UserError> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(password_hash)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(UserError::NotFound);
        }
        Ok(())
    }

    pub async fn list_admins(pool: &PgPool) -> Result<Vec<Self>, UserError> {
        let admins = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE is_admin AND NOT is_super_admin ORDER BY name",
        )
        .fetch_all(pool)
        .await?;
        Ok(admins)
    }

    /// Super-admin only removal; refuses to touch non-admin or super-admin rows.
    pub async fn delete_admin(pool: &PgPool, user_id: i64) -> Result<(), UserError> {
        let result = sqlx::query(
            "DELETE FROM users WHERE user_id = $1 AND is_admin AND NOT is_super_admin",
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(UserError::NotFound);
        }
        Ok(())
    }
}
