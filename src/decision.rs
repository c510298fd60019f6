//! Final decisions on papers. One organizer-chosen outcome per paper; no
//! averaging or majority rule over the submitted reviews.

use sqlx::{FromRow, PgPool};

use crate::db::models::paper::PaperStatus;
use crate::error::ApiError;
use crate::notify::{rejection_message, Mailer};

/// Maps the submitted decision key onto the paper status enumeration.
/// `accept`/`reject` are normalized to their past-tense status names;
/// anything unrecognized fails the operation with no state change.
pub fn normalize_decision(input: &str) -> Option<PaperStatus> {
    match input.trim().to_ascii_lowercase().as_str() {
        "accept" | "accepted" => Some(PaperStatus::Accepted),
        "reject" | "rejected" => Some(PaperStatus::Rejected),
        "revision_required" => Some(PaperStatus::RevisionRequired),
        _ => None,
    }
}

#[derive(Debug)]
pub struct DecisionOutcome {
    pub status: PaperStatus,
    /// Rejection deletes the author role and with it the paper row.
    pub paper_deleted: bool,
    /// Some(false) means the rejection mail could not be delivered; the
    /// decision still stands.
    pub notification_sent: Option<bool>,
}

#[derive(Debug, FromRow)]
struct DecisionTarget {
    author_role_id: i64,
    status: PaperStatus,
    title: String,
    author_name: String,
    author_email: String,
}

/// Applies the organizer's final decision inside one transaction.
///
/// For a rejection the order is fixed: capture the author's identity,
/// attempt the notification, delete the author role (cascading paper,
/// reviews and registration), commit. A failed send is reported but does
/// not roll back; a database failure rolls back everything.
pub async fn apply_final_decision(
    pool: &PgPool,
    mailer: &dyn Mailer,
    conference_id: i64,
    conference_title: &str,
    paper_id: i64,
    raw_decision: &str,
) -> Result<DecisionOutcome, ApiError> {
    let decision = normalize_decision(raw_decision).ok_or_else(|| {
        ApiError::BadRequest(format!("Received invalid decision key: '{raw_decision}'"))
    })?;

    let mut tx = pool.begin().await?;

    let target = sqlx::query_as::<_, DecisionTarget>(
        r#"
        SELECT p.author_role_id, p.status, p.title,
               u.name AS author_name, u.email AS author_email
        FROM papers p
        JOIN conference_roles r ON r.id = p.author_role_id
        JOIN users u ON u.user_id = r.user_id
        WHERE p.paper_id = $1 AND p.conference_id = $2
        "#,
    )
    .bind(paper_id)
    .bind(conference_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| ApiError::NotFound("Paper not found".into()))?;

    let next = target.status.transition_to(decision)?;

    if next == PaperStatus::Rejected {
        let (subject, body) =
            rejection_message(&target.author_name, &target.title, conference_title);
        let notified = match mailer.send(&target.author_email, &subject, &body) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(paper_id, "rejection notification failed: {err}");
                false
            }
        };

        sqlx::query("DELETE FROM conference_roles WHERE id = $1")
            .bind(target.author_role_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        return Ok(DecisionOutcome {
            status: next,
            paper_deleted: true,
            notification_sent: Some(notified),
        });
    }

    sqlx::query("UPDATE papers SET status = $2 WHERE paper_id = $1")
        .bind(paper_id)
        .bind(next)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(DecisionOutcome {
        status: next,
        paper_deleted: false,
        notification_sent: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_forms_are_normalized() {
        assert_eq!(normalize_decision("accept"), Some(PaperStatus::Accepted));
        assert_eq!(normalize_decision("reject"), Some(PaperStatus::Rejected));
    }

    #[test]
    fn full_forms_pass_through() {
        assert_eq!(normalize_decision("accepted"), Some(PaperStatus::Accepted));
        assert_eq!(normalize_decision("rejected"), Some(PaperStatus::Rejected));
        assert_eq!(
            normalize_decision("revision_required"),
            Some(PaperStatus::RevisionRequired)
        );
    }

    #[test]
    fn input_is_trimmed_and_case_folded() {
        assert_eq!(normalize_decision("  ACCEPT "), Some(PaperStatus::Accepted));
        assert_eq!(
            normalize_decision("Revision_Required"),
            Some(PaperStatus::RevisionRequired)
        );
    }

    #[test]
    fn unrecognized_keys_are_refused() {
        assert_eq!(normalize_decision(""), None);
        assert_eq!(normalize_decision("maybe"), None);
        // Non-final statuses are not valid decisions.
        assert_eq!(normalize_decision("under_review"), None);
        assert_eq!(normalize_decision("submitted"), None);
    }
}
