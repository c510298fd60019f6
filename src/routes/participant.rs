//! Participant view: registration summary and the attendance certificate
//! once the conference is over.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tera::Context;

use crate::auth::CurrentUser;
use crate::db::models::certificate::{Certificate, CertificateType};
use crate::db::models::conference::{Conference, ConferenceStatus};
use crate::db::models::registration::Registration;
use crate::db::models::role::RoleKind;
use crate::error::ApiError;
use crate::state::AppState;
use crate::templates::render;

use super::{attachment, issue_or_fetch_certificate, require_approved_role};

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(conference_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let conference = Conference::find(&state.pool, conference_id).await?;
    let role = require_approved_role(
        &state.pool,
        user.user_id,
        conference_id,
        RoleKind::Participant,
    )
    .await?;

    let registration = Registration::find_by_role(&state.pool, role.id).await?;
    let certificate =
        Certificate::find_for_role(&state.pool, role.id, CertificateType::Participant).await?;

    let mut ctx = Context::new();
    ctx.insert("conference", &conference);
    ctx.insert("status", conference.status().as_str());
    ctx.insert("registration", &registration);
    ctx.insert("has_certificate", &certificate.is_some());
    ctx.insert(
        "certificate_available",
        &(conference.status() == ConferenceStatus::Completed),
    );
    render("participant_dashboard.html", &ctx)
}

/// Attendance certificate, generated on first download.
pub async fn certificate(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(conference_id): Path<i64>,
) -> Result<Response, ApiError> {
    let conference = Conference::find(&state.pool, conference_id).await?;
    let role = require_approved_role(
        &state.pool,
        user.user_id,
        conference_id,
        RoleKind::Participant,
    )
    .await?;

    if conference.status() != ConferenceStatus::Completed {
        return Err(ApiError::BadRequest(
            "Certificates are issued after the conference ends".into(),
        ));
    }
    if !Registration::is_paid(&state.pool, role.id).await? {
        return Err(ApiError::Forbidden(
            "Registration payment is required for a certificate".into(),
        ));
    }

    let cert = issue_or_fetch_certificate(
        &state,
        role.id,
        CertificateType::Participant,
        &user.name,
        &conference.title,
    )
    .await?;
    let filename = cert
        .file_path
        .ok_or_else(|| ApiError::NotFound("Certificate file missing".into()))?;
    attachment(&state.config.certificates_dir().join(&filename), &filename)
}
