use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Type};
use thiserror::Error;

use super::registration::PaymentStatus;

#[derive(Debug, Error)]
pub enum RoleError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Conference role not found")]
    NotFound,
    #[error("A role already exists for this user and conference")]
    AlreadyExists,
    #[error("A user cannot approve or reject their own application")]
    SelfApproval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(type_name = "role_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    Participant,
    Author,
    Reviewer,
    Organizer,
    Admin,
}

impl RoleKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "participant" => Some(RoleKind::Participant),
            "author" => Some(RoleKind::Author),
            "reviewer" => Some(RoleKind::Reviewer),
            "organizer" => Some(RoleKind::Organizer),
            "admin" => Some(RoleKind::Admin),
            _ => None,
        }
    }

    /// Approval policy per role kind: authors get dashboard access on
    /// submission intent, participants are approved together with payment,
    /// everyone else waits for an organizer.
    pub fn initial_status(self) -> RoleStatus {
        match self {
            RoleKind::Author | RoleKind::Participant => RoleStatus::Approved,
            RoleKind::Reviewer | RoleKind::Organizer | RoleKind::Admin => RoleStatus::Pending,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RoleKind::Participant => "participant",
            RoleKind::Author => "author",
            RoleKind::Reviewer => "reviewer",
            RoleKind::Organizer => "organizer",
            RoleKind::Admin => "admin",
        }
    }
}

impl std::fmt::Display for RoleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(type_name = "role_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RoleStatus {
    Pending,
    Approved,
}

impl std::fmt::Display for RoleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RoleStatus::Pending => "pending",
            RoleStatus::Approved => "approved",
        })
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ConferenceRole {
    pub id: i64,
    pub user_id: i64,
    pub conference_id: i64,
    pub role: RoleKind,
    pub status: RoleStatus,
    pub expertise: Option<String>,
}

/// Role row joined with the applicant, for organizer management views.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RoleWithUser {
    pub id: i64,
    pub user_id: i64,
    pub role: RoleKind,
    pub status: RoleStatus,
    pub expertise: Option<String>,
    pub name: String,
    pub email: String,
}

/// Role row joined with its conference, for the user hub dashboard.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RoleWithConference {
    pub id: i64,
    pub conference_id: i64,
    pub role: RoleKind,
    pub status: RoleStatus,
    pub title: String,
}

impl ConferenceRole {
    /// Creates the role with the kind's initial status. Reviewer
    /// applications carry an expertise string of track ids.
    pub async fn apply(
        pool: &PgPool,
        user_id: i64,
        conference_id: i64,
        role: RoleKind,
        expertise: Option<&str>,
    ) -> Result<Self, RoleError> {
        let created = sqlx::query_as::<_, ConferenceRole>(
            r#"
            INSERT INTO conference_roles (user_id, conference_id, role, status, expertise)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(conference_id)
        .bind(role)
        .bind(role.initial_status())
        .bind(expertise)
        .fetch_one(pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => RoleError::AlreadyExists,
            _ => RoleError::Database(e),
        })?;

        Ok(created)
    }

    /// Participant role and completed registration land in one
    /// transaction; if the registration insert fails the role does not
    /// persist either.
    pub async fn register_participant(
        pool: &PgPool,
        user_id: i64,
        conference_id: i64,
        fee_cents: i64,
    ) -> Result<Self, RoleError> {
        let mut tx = pool.begin().await?;

        let role = sqlx::query_as::<_, ConferenceRole>(
            r#"
            INSERT INTO conference_roles (user_id, conference_id, role, status)
            VALUES ($1, $2, 'participant', 'approved')
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(conference_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => RoleError::AlreadyExists,
            _ => RoleError::Database(e),
        })?;

        sqlx::query(
            r#"
            INSERT INTO registrations (role_id, conference_id, fee_cents, payment_status)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(role.id)
        .bind(conference_id)
        .bind(fee_cents)
        .bind(PaymentStatus::Completed)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(role)
    }

    pub async fn find(pool: &PgPool, role_id: i64) -> Result<Self, RoleError> {
        sqlx::query_as::<_, ConferenceRole>("SELECT * FROM conference_roles WHERE id = $1")
            .bind(role_id)
            .fetch_optional(pool)
            .await?
            .ok_or(RoleError::NotFound)
    }

    pub async fn find_for_user(
        pool: &PgPool,
        user_id: i64,
        conference_id: i64,
    ) -> Result<Option<Self>, RoleError> {
        let role = sqlx::query_as::<_, ConferenceRole>(
            "SELECT * FROM conference_roles WHERE user_id = $1 AND conference_id = $2",
        )
        .bind(user_id)
        .bind(conference_id)
        .fetch_optional(pool)
        .await?;
        Ok(role)
    }

    /// Authorization guard lookup: an approved role of the given kind,
    /// checked against the database on every request.
    pub async fn find_approved(
        pool: &PgPool,
        user_id: i64,
        conference_id: i64,
        role: RoleKind,
    ) -> Result<Option<Self>, RoleError> {
        let found = sqlx::query_as::<_, ConferenceRole>(
            r#"
            SELECT * FROM conference_roles
            WHERE user_id = $1 AND conference_id = $2 AND role = $3 AND status = 'approved'
            "#,
        )
        .bind(user_id)
        .bind(conference_id)
        .bind(role)
        .fetch_optional(pool)
        .await?;
        Ok(found)
    }

    pub async fn list_for_user(
        pool: &PgPool,
        user_id: i64,
    ) -> Result<Vec<RoleWithConference>, RoleError> {
        let roles = sqlx::query_as::<_, RoleWithConference>(
            r#"
            SELECT r.id, r.conference_id, r.role, r.status, c.title
            FROM conference_roles r
            JOIN conferences c ON c.conference_id = r.conference_id
            WHERE r.user_id = $1
            ORDER BY c.start_date
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(roles)
    }

    /// Pending reviewer and organizer applications awaiting approval.
    pub async fn list_pending_applications(
        pool: &PgPool,
        conference_id: i64,
    ) -> Result<Vec<RoleWithUser>, RoleError> {
        let roles = sqlx::query_as::<_, RoleWithUser>(
            r#"
            SELECT r.id, r.user_id, r.role, r.status, r.expertise, u.name, u.email
            FROM conference_roles r
            JOIN users u ON u.user_id = r.user_id
            WHERE r.conference_id = $1
              AND r.role IN ('reviewer', 'organizer')
              AND r.status = 'pending'
            ORDER BY u.name
            "#,
        )
        .bind(conference_id)
        .fetch_all(pool)
        .await?;
        Ok(roles)
    }

    pub async fn list_approved(
        pool: &PgPool,
        conference_id: i64,
        kinds: &[RoleKind],
    ) -> Result<Vec<RoleWithUser>, RoleError> {
        let roles = sqlx::query_as::<_, RoleWithUser>(
            r#"
            SELECT r.id, r.user_id, r.role, r.status, r.expertise, u.name, u.email
            FROM conference_roles r
            JOIN users u ON u.user_id = r.user_id
            WHERE r.conference_id = $1 AND r.status = 'approved' AND r.role = ANY($2)
            ORDER BY u.name
            "#,
        )
        .bind(conference_id)
        .bind(kinds.to_vec())
        .fetch_all(pool)
        .await?;
        Ok(roles)
    }

    /// Approves a pending application. `acting_user_id` must differ from
    /// the applicant.
    pub async fn approve(
        pool: &PgPool,
        role_id: i64,
        acting_user_id: i64,
    ) -> Result<Self, RoleError> {
        let role = Self::find(pool, role_id).await?;
        if role.user_id == acting_user_id {
            return Err(RoleError::SelfApproval);
        }

        let updated = sqlx::query_as::<_, ConferenceRole>(
            "UPDATE conference_roles SET status = 'approved' WHERE id = $1 RETURNING *",
        )
        .bind(role_id)
        .fetch_one(pool)
        .await?;
        Ok(updated)
    }

    /// Rejection is a hard delete; dependent papers, reviews and
    /// registrations go with the row.
    pub async fn reject(pool: &PgPool, role_id: i64, acting_user_id: i64) -> Result<(), RoleError> {
        let role = Self::find(pool, role_id).await?;
        if role.user_id == acting_user_id {
            return Err(RoleError::SelfApproval);
        }
        Self::delete(pool, role_id).await
    }

    pub async fn delete(pool: &PgPool, role_id: i64) -> Result<(), RoleError> {
        let result = sqlx::query("DELETE FROM conference_roles WHERE id = $1")
            .bind(role_id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RoleError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_status_per_role_kind() {
        assert_eq!(RoleKind::Author.initial_status(), RoleStatus::Approved);
        assert_eq!(RoleKind::Participant.initial_status(), RoleStatus::Approved);
        assert_eq!(RoleKind::Reviewer.initial_status(), RoleStatus::Pending);
        assert_eq!(RoleKind::Organizer.initial_status(), RoleStatus::Pending);
    }

    #[test]
    fn role_kind_parse_round_trip() {
        for kind in [
            RoleKind::Participant,
            RoleKind::Author,
            RoleKind::Reviewer,
            RoleKind::Organizer,
            RoleKind::Admin,
        ] {
            assert_eq!(RoleKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(RoleKind::parse("chair"), None);
    }
}
