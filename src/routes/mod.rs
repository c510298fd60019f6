pub mod admin;
pub mod auth;
pub mod author;
pub mod conference;
pub mod organizer;
pub mod participant;
pub mod profile;
pub mod reviewer;
pub mod schedule;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::Multipart;
use axum::http::header;
use axum::response::Response;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::db::models::certificate::{Certificate, CertificateError, CertificateType};
use crate::db::models::role::{ConferenceRole, RoleKind};
use crate::db::models::user::User;
use crate::error::ApiError;
use crate::state::AppState;

/// Streams a stored file back as an attachment with a guessed MIME type.
pub(crate) fn attachment(path: &Path, download_name: &str) -> Result<Response, ApiError> {
    if !path.exists() {
        return Err(ApiError::NotFound("File not found".into()));
    }
    let content = std::fs::read(path)?;
    let mime = mime_guess::from_path(download_name)
        .first_raw()
        .unwrap_or("application/octet-stream");
    Response::builder()
        .header(header::CONTENT_TYPE, mime)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", download_name),
        )
        .body(Body::from(content))
        .map_err(|e| ApiError::InternalError(e.to_string()))
}

/// A parsed multipart form: text fields by name plus at most one file
/// (original filename and bytes).
pub(crate) struct UploadForm {
    pub fields: HashMap<String, String>,
    pub file: Option<(String, Vec<u8>)>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut fields = HashMap::new();
        let mut file = None;
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name() {
                Some(original) => {
                    let original = original.to_string();
                    let data = field.bytes().await?.to_vec();
                    if !data.is_empty() {
                        file = Some((original, data));
                    }
                }
                None => {
                    fields.insert(name, field.text().await?);
                }
            }
        }
        Ok(UploadForm { fields, file })
    }

    pub fn text(&self, name: &str) -> Result<&str, ApiError> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ApiError::BadRequest(format!("Missing form field '{name}'")))
    }

    /// The uploaded file, which must carry a .pdf name.
    pub fn pdf(&self) -> Result<(&str, &[u8]), ApiError> {
        let (name, data) = self
            .file
            .as_ref()
            .ok_or_else(|| ApiError::BadRequest("A PDF file is required".into()))?;
        if !crate::storage::is_pdf(name) {
            return Err(ApiError::BadRequest("Only PDF uploads are accepted".into()));
        }
        Ok((name, data))
    }
}

/// Admin access is re-checked against the users table on every request;
/// the session flags are only a hint.
pub(crate) async fn require_admin(pool: &PgPool, user: &CurrentUser) -> Result<User, ApiError> {
    let row = User::find(pool, user.user_id).await?;
    if !row.is_admin {
        return Err(ApiError::Forbidden("Administrator access required".into()));
    }
    Ok(row)
}

pub(crate) async fn require_super_admin(
    pool: &PgPool,
    user: &CurrentUser,
) -> Result<User, ApiError> {
    let row = require_admin(pool, user).await?;
    if !row.is_super_admin {
        return Err(ApiError::Forbidden(
            "Super administrator access required".into(),
        ));
    }
    Ok(row)
}

pub(crate) async fn require_organizer(
    pool: &PgPool,
    user_id: i64,
    conference_id: i64,
) -> Result<ConferenceRole, ApiError> {
    ConferenceRole::find_approved(pool, user_id, conference_id, RoleKind::Organizer)
        .await?
        .ok_or_else(|| {
            ApiError::Forbidden("Organizer access required for this conference".into())
        })
}

/// Role applications are handled by an approved organizer or by the
/// admin who created the conference; the latter also bootstraps the
/// first organizer.
pub(crate) async fn require_conference_manager(
    pool: &PgPool,
    user: &CurrentUser,
    conference_id: i64,
) -> Result<(), ApiError> {
    if ConferenceRole::find_approved(pool, user.user_id, conference_id, RoleKind::Organizer)
        .await?
        .is_some()
    {
        return Ok(());
    }

    let row = User::find(pool, user.user_id).await?;
    if row.is_admin {
        let owner: Option<i64> = sqlx::query_scalar(
            "SELECT created_by_admin_id FROM conferences WHERE conference_id = $1",
        )
        .bind(conference_id)
        .fetch_optional(pool)
        .await?;
        if owner == Some(row.user_id) {
            return Ok(());
        }
    }

    Err(ApiError::Forbidden(
        "Organizer or owning-admin access required for this conference".into(),
    ))
}

pub(crate) async fn require_approved_role(
    pool: &PgPool,
    user_id: i64,
    conference_id: i64,
    role: RoleKind,
) -> Result<ConferenceRole, ApiError> {
    ConferenceRole::find_approved(pool, user_id, conference_id, role)
        .await?
        .ok_or_else(|| {
            ApiError::Forbidden(format!(
                "An approved {} role is required for this conference",
                role
            ))
        })
}

/// Returns the certificate on file for the role, generating and recording
/// it on first request.
pub(crate) async fn issue_or_fetch_certificate(
    state: &Arc<AppState>,
    role_id: i64,
    certificate_type: CertificateType,
    recipient_name: &str,
    conference_title: &str,
) -> Result<Certificate, ApiError> {
    if let Some(existing) = Certificate::find_for_role(&state.pool, role_id, certificate_type).await? {
        return Ok(existing);
    }

    let filename = format!("cert_{}_{}.pdf", role_id, Uuid::new_v4().simple());
    let output_path = state.config.certificates_dir().join(&filename);
    crate::pdf::generate_certificate(
        recipient_name,
        conference_title,
        certificate_type,
        &output_path,
    )
    .map_err(ApiError::InternalError)?;

    match Certificate::issue(&state.pool, role_id, certificate_type, &filename).await {
        Ok(certificate) => Ok(certificate),
        // A concurrent request won the insert; hand back its row and drop
        // the PDF generated for the losing side.
        Err(CertificateError::AlreadyIssued) => {
            let _ = std::fs::remove_file(&output_path);
            Certificate::find_for_role(&state.pool, role_id, certificate_type)
                .await?
                .ok_or_else(|| ApiError::NotFound("Certificate not found".into()))
        }
        Err(err) => Err(err.into()),
    }
}
