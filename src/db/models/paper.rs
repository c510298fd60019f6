use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction, Type};
use thiserror::Error;

use super::role::{ConferenceRole, RoleError, RoleKind};

#[derive(Debug, Error)]
pub enum PaperError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Paper not found")]
    NotFound,
    #[error("Author already has a submitted paper")]
    AlreadySubmitted,
    #[error("You already hold a different role for this conference")]
    RoleConflict,
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: PaperStatus, to: PaperStatus },
}

impl From<RoleError> for PaperError {
    fn from(err: RoleError) -> Self {
        match err {
            RoleError::Database(e) => PaperError::Database(e),
            // One role per (user, conference): the clash is with an
            // existing reviewer/participant/organizer role, not a paper.
            RoleError::AlreadyExists => PaperError::RoleConflict,
            _ => PaperError::NotFound,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(type_name = "paper_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaperStatus {
    Submitted,
    UnderReview,
    Accepted,
    Rejected,
    RevisionRequired,
}

impl PaperStatus {
    /// The full transition table. Edges not listed here are rejected
    /// without mutation.
    pub fn can_transition_to(self, next: PaperStatus) -> bool {
        use PaperStatus::*;
        matches!(
            (self, next),
            (Submitted, UnderReview)
                | (RevisionRequired, UnderReview)
                | (UnderReview, Accepted)
                | (UnderReview, Rejected)
                | (UnderReview, RevisionRequired)
                | (RevisionRequired, Accepted)
                | (Accepted, Accepted)
        )
    }

    pub fn transition_to(self, next: PaperStatus) -> Result<PaperStatus, PaperError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(PaperError::InvalidTransition { from: self, to: next })
        }
    }

    /// Camera-ready upload is permitted while accepted or revision-required;
    /// in the latter case the upload itself promotes the paper.
    pub fn allows_camera_ready(self) -> bool {
        matches!(self, PaperStatus::Accepted | PaperStatus::RevisionRequired)
    }

    pub fn is_final(self) -> bool {
        matches!(
            self,
            PaperStatus::Accepted | PaperStatus::Rejected | PaperStatus::RevisionRequired
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PaperStatus::Submitted => "submitted",
            PaperStatus::UnderReview => "under_review",
            PaperStatus::Accepted => "accepted",
            PaperStatus::Rejected => "rejected",
            PaperStatus::RevisionRequired => "revision_required",
        }
    }
}

impl std::fmt::Display for PaperStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Paper {
    pub paper_id: i64,
    pub author_role_id: i64,
    pub conference_id: i64,
    pub track_id: Option<i64>,
    pub title: String,
    pub abstract_text: String,
    pub keywords: String,
    pub blind_paper_file: String,
    pub camera_ready_file: Option<String>,
    pub status: PaperStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct NewPaper {
    pub conference_id: i64,
    pub track_id: Option<i64>,
    pub title: String,
    pub abstract_text: String,
    pub keywords: String,
    pub blind_paper_file: String,
}

/// Paper joined with author identity and review progress for the
/// organizer's paper list.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PaperWithAuthor {
    pub paper_id: i64,
    pub author_role_id: i64,
    pub track_id: Option<i64>,
    pub title: String,
    pub status: PaperStatus,
    pub author_name: String,
    pub author_email: String,
    pub review_count: i64,
    pub submitted_review_count: i64,
}

const PAPER_COLUMNS: &str = r#"paper_id, author_role_id, conference_id, track_id, title,
    abstract AS abstract_text, keywords, blind_paper_file, camera_ready_file, status, created_at"#;

impl Paper {
    /// Paper submission bundles the author role (created approved if
    /// absent) with the paper insert in one transaction.
    pub async fn submit(
        pool: &PgPool,
        user_id: i64,
        data: NewPaper,
    ) -> Result<Self, PaperError> {
        let mut tx: Transaction<'_, Postgres> = pool.begin().await?;

        let existing = sqlx::query_as::<_, ConferenceRole>(
            r#"
            SELECT * FROM conference_roles
            WHERE user_id = $1 AND conference_id = $2 AND role = $3
            "#,
        )
        .bind(user_id)
        .bind(data.conference_id)
        .bind(RoleKind::Author)
        .fetch_optional(&mut *tx)
        .await?;

        let author_role_id = match existing {
            Some(role) => {
                let has_paper =
                    sqlx::query_scalar::<_, i64>("SELECT count(*) FROM papers WHERE author_role_id = $1")
                        .bind(role.id)
                        .fetch_one(&mut *tx)
                        .await?;
                if has_paper > 0 {
                    return Err(PaperError::AlreadySubmitted);
                }
                sqlx::query("UPDATE conference_roles SET status = 'approved' WHERE id = $1")
                    .bind(role.id)
                    .execute(&mut *tx)
                    .await?;
                role.id
            }
            None => {
                sqlx::query_scalar::<_, i64>(
                    r#"
                    INSERT INTO conference_roles (user_id, conference_id, role, status)
                    VALUES ($1, $2, 'author', 'approved')
                    RETURNING id
                    "#,
                )
                .bind(user_id)
                .bind(data.conference_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| match &e {
                    // No author role existed, so the unique (user, conference)
                    // clash is with a role of another kind.
                    sqlx::Error::Database(db) if db.is_unique_violation() => {
                        PaperError::RoleConflict
                    }
                    _ => PaperError::Database(e),
                })?
            }
        };

        let paper = sqlx::query_as::<_, Paper>(&format!(
            r#"
            INSERT INTO papers (author_role_id, conference_id, track_id, title, abstract, keywords, blind_paper_file)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {PAPER_COLUMNS}
            "#
        ))
        .bind(author_role_id)
        .bind(data.conference_id)
        .bind(data.track_id)
        .bind(&data.title)
        .bind(&data.abstract_text)
        .bind(&data.keywords)
        .bind(&data.blind_paper_file)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(paper)
    }

    pub async fn find(pool: &PgPool, paper_id: i64) -> Result<Self, PaperError> {
        sqlx::query_as::<_, Paper>(&format!(
            "SELECT {PAPER_COLUMNS} FROM papers WHERE paper_id = $1"
        ))
        .bind(paper_id)
        .fetch_optional(pool)
        .await?
        .ok_or(PaperError::NotFound)
    }

    pub async fn find_by_author_role(
        pool: &PgPool,
        author_role_id: i64,
    ) -> Result<Option<Self>, PaperError> {
        let paper = sqlx::query_as::<_, Paper>(&format!(
            "SELECT {PAPER_COLUMNS} FROM papers WHERE author_role_id = $1"
        ))
        .bind(author_role_id)
        .fetch_optional(pool)
        .await?;
        Ok(paper)
    }

    pub async fn list_for_conference(
        pool: &PgPool,
        conference_id: i64,
    ) -> Result<Vec<PaperWithAuthor>, PaperError> {
        let papers = sqlx::query_as::<_, PaperWithAuthor>(
            r#"
            SELECT p.paper_id, p.author_role_id, p.track_id, p.title, p.status,
                   u.name AS author_name, u.email AS author_email,
                   count(v.review_id) AS review_count,
                   count(v.recommendation) AS submitted_review_count
            FROM papers p
            JOIN conference_roles r ON r.id = p.author_role_id
            JOIN users u ON u.user_id = r.user_id
            LEFT JOIN reviews v ON v.paper_id = p.paper_id
            WHERE p.conference_id = $1
            GROUP BY p.paper_id, u.name, u.email
            ORDER BY p.created_at
            "#,
        )
        .bind(conference_id)
        .fetch_all(pool)
        .await?;
        Ok(papers)
    }

    /// Records the camera-ready file; a revision-required paper is
    /// promoted to accepted by the upload.
    pub async fn attach_camera_ready(
        pool: &PgPool,
        paper_id: i64,
        filename: &str,
    ) -> Result<Self, PaperError> {
        let paper = Self::find(pool, paper_id).await?;
        if !paper.status.allows_camera_ready() {
            return Err(PaperError::InvalidTransition {
                from: paper.status,
                to: PaperStatus::Accepted,
            });
        }

        let updated = sqlx::query_as::<_, Paper>(&format!(
            r#"
            UPDATE papers SET camera_ready_file = $2, status = 'accepted'
            WHERE paper_id = $1
            RETURNING {PAPER_COLUMNS}
            "#
        ))
        .bind(paper_id)
        .bind(filename)
        .fetch_one(pool)
        .await?;
        Ok(updated)
    }

    /// Revised blind copy replaces the original file and puts the paper
    /// back under review. Only valid while revision is required.
    pub async fn replace_blind_copy(
        pool: &PgPool,
        paper_id: i64,
        filename: &str,
    ) -> Result<Self, PaperError> {
        let paper = Self::find(pool, paper_id).await?;
        if paper.status != PaperStatus::RevisionRequired {
            return Err(PaperError::InvalidTransition {
                from: paper.status,
                to: PaperStatus::UnderReview,
            });
        }

        let updated = sqlx::query_as::<_, Paper>(&format!(
            r#"
            UPDATE papers SET blind_paper_file = $2, status = 'under_review'
            WHERE paper_id = $1
            RETURNING {PAPER_COLUMNS}
            "#
        ))
        .bind(paper_id)
        .bind(filename)
        .fetch_one(pool)
        .await?;
        Ok(updated)
    }

    /// Accepted papers whose author registration is paid and that are not
    /// yet placed in any session.
    pub async fn list_schedule_eligible(
        pool: &PgPool,
        conference_id: i64,
    ) -> Result<Vec<PaperWithAuthor>, PaperError> {
        let papers = sqlx::query_as::<_, PaperWithAuthor>(
            r#"
            SELECT p.paper_id, p.author_role_id, p.track_id, p.title, p.status,
                   u.name AS author_name, u.email AS author_email,
                   0::bigint AS review_count, 0::bigint AS submitted_review_count
            FROM papers p
            JOIN conference_roles r ON r.id = p.author_role_id
            JOIN users u ON u.user_id = r.user_id
            JOIN registrations g ON g.role_id = r.id AND g.payment_status = 'completed'
            WHERE p.conference_id = $1
              AND p.status = 'accepted'
              AND NOT EXISTS (SELECT 1 FROM session_papers sp WHERE sp.paper_id = p.paper_id)
            ORDER BY p.title
            "#,
        )
        .bind(conference_id)
        .fetch_all(pool)
        .await?;
        Ok(papers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PaperStatus::*;

    #[test]
    fn transition_table_accepts_exactly_the_listed_edges() {
        let allowed = [
            (Submitted, UnderReview),
            (RevisionRequired, UnderReview),
            (UnderReview, Accepted),
            (UnderReview, Rejected),
            (UnderReview, RevisionRequired),
            (RevisionRequired, Accepted),
            (Accepted, Accepted),
        ];
        let all = [Submitted, UnderReview, Accepted, Rejected, RevisionRequired];

        for from in all {
            for to in all {
                let expected = allowed.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "edge {from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn rejected_is_terminal() {
        let all = [Submitted, UnderReview, Accepted, Rejected, RevisionRequired];
        for to in all {
            assert!(!Rejected.can_transition_to(to));
        }
    }

    #[test]
    fn invalid_edge_reports_both_ends() {
        let err = Submitted.transition_to(Accepted).unwrap_err();
        match err {
            PaperError::InvalidTransition { from, to } => {
                assert_eq!(from, Submitted);
                assert_eq!(to, Accepted);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn clashing_role_is_not_reported_as_duplicate_paper() {
        let err = PaperError::from(RoleError::AlreadyExists);
        assert!(matches!(err, PaperError::RoleConflict));
    }

    #[test]
    fn camera_ready_allowed_only_when_accepted_or_revision_required() {
        assert!(Accepted.allows_camera_ready());
        assert!(RevisionRequired.allows_camera_ready());
        assert!(!Submitted.allows_camera_ready());
        assert!(!UnderReview.allows_camera_ready());
        assert!(!Rejected.allows_camera_ready());
    }
}
