//! Author workflow: paper submission, payment, camera-ready and revision
//! uploads. One paper per author per conference.

use axum::{
    extract::{Multipart, Path, State},
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tera::Context;

use crate::auth::CurrentUser;
use crate::db::models::certificate::CertificateType;
use crate::db::models::conference::{Conference, ConferenceStatus};
use crate::db::models::paper::{NewPaper, Paper, PaperError, PaperStatus};
use crate::db::models::registration::Registration;
use crate::db::models::review::Review;
use crate::db::models::role::RoleKind;
use crate::db::models::track::Track;
use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::{save_bytes, unique_filename};
use crate::templates::render;

use super::{attachment, issue_or_fetch_certificate, require_approved_role, UploadForm};

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(conference_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let conference = Conference::find(&state.pool, conference_id).await?;
    let role =
        require_approved_role(&state.pool, user.user_id, conference_id, RoleKind::Author).await?;

    let paper = Paper::find_by_author_role(&state.pool, role.id).await?;
    let registration = Registration::find_by_role(&state.pool, role.id).await?;

    // Review feedback is released only once the decision is final, and
    // always without reviewer identities or organizer-only notes.
    let feedback: Vec<serde_json::Value> = match &paper {
        Some(p) if p.status.is_final() => Review::list_submitted_for_paper(&state.pool, p.paper_id)
            .await?
            .into_iter()
            .map(|r| {
                serde_json::json!({
                    "score": r.score,
                    "recommendation": r.recommendation,
                    "comments": r.comments_to_author,
                })
            })
            .collect(),
        _ => Vec::new(),
    };

    let mut ctx = Context::new();
    ctx.insert("conference", &conference);
    ctx.insert("conference_status", conference.status().as_str());
    ctx.insert("paper", &paper);
    ctx.insert("registration", &registration);
    ctx.insert("feedback", &feedback);
    ctx.insert(
        "certificate_available",
        &(conference.status() == ConferenceStatus::Completed
            && paper.as_ref().is_some_and(|p| p.status == PaperStatus::Accepted)),
    );
    render("author_dashboard.html", &ctx)
}

pub async fn submit_page(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(conference_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let conference = Conference::find(&state.pool, conference_id).await?;
    if conference.status() != ConferenceStatus::Upcoming {
        return Err(ApiError::BadRequest(
            "Submissions are only open before the conference starts".into(),
        ));
    }
    let tracks = Track::list_for_conference(&state.pool, conference_id).await?;

    let mut ctx = Context::new();
    ctx.insert("conference", &conference);
    ctx.insert("tracks", &tracks);
    render("submit_paper.html", &ctx)
}

pub async fn submit(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(conference_id): Path<i64>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let conference = Conference::find(&state.pool, conference_id).await?;
    if conference.status() != ConferenceStatus::Upcoming {
        return Err(ApiError::BadRequest(
            "Submissions are only open before the conference starts".into(),
        ));
    }

    let form = UploadForm::read(multipart).await?;
    let title = form.text("title")?.trim().to_string();
    let abstract_text = form.text("abstract")?.trim().to_string();
    let keywords = form.text("keywords")?.trim().to_string();
    let track_id = match form.fields.get("track_id").map(String::as_str) {
        Some("") | None => None,
        Some(raw) => Some(raw.parse::<i64>().map_err(|_| {
            ApiError::BadRequest("Invalid track selection".into())
        })?),
    };
    let (original, data) = form.pdf()?;

    let filename = unique_filename("paper", user.user_id, original);
    save_bytes(&state.config.blind_papers_dir(), &filename, data)?;

    Paper::submit(
        &state.pool,
        user.user_id,
        NewPaper {
            conference_id,
            track_id,
            title,
            abstract_text,
            keywords,
            blind_paper_file: filename,
        },
    )
    .await?;

    Ok(Redirect::to(&format!("/conferences/{conference_id}/author")))
}

/// Simulated author fee payment; lands as a completed registration.
pub async fn pay(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(conference_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let conference = Conference::find(&state.pool, conference_id).await?;
    let role =
        require_approved_role(&state.pool, user.user_id, conference_id, RoleKind::Author).await?;

    let paper = Paper::find_by_author_role(&state.pool, role.id)
        .await?
        .ok_or(PaperError::NotFound)?;
    if paper.status != PaperStatus::Accepted {
        return Err(ApiError::BadRequest(
            "The author fee is due once the paper is accepted".into(),
        ));
    }

    Registration::create_completed(&state.pool, role.id, conference_id, conference.author_fee_cents)
        .await?;
    Ok(Redirect::to(&format!("/conferences/{conference_id}/author")))
}

pub async fn upload_camera_ready(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(conference_id): Path<i64>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let role =
        require_approved_role(&state.pool, user.user_id, conference_id, RoleKind::Author).await?;
    let paper = Paper::find_by_author_role(&state.pool, role.id)
        .await?
        .ok_or(PaperError::NotFound)?;

    let form = UploadForm::read(multipart).await?;
    let (original, data) = form.pdf()?;
    let filename = unique_filename("camera", user.user_id, original);
    save_bytes(&state.config.camera_ready_dir(), &filename, data)?;

    Paper::attach_camera_ready(&state.pool, paper.paper_id, &filename).await?;
    Ok(Redirect::to(&format!("/conferences/{conference_id}/author")))
}

/// Revised anonymous manuscript; puts the paper back under review.
pub async fn upload_revision(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(conference_id): Path<i64>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let role =
        require_approved_role(&state.pool, user.user_id, conference_id, RoleKind::Author).await?;
    let paper = Paper::find_by_author_role(&state.pool, role.id)
        .await?
        .ok_or(PaperError::NotFound)?;

    let form = UploadForm::read(multipart).await?;
    let (original, data) = form.pdf()?;
    let filename = unique_filename("paper", user.user_id, original);
    save_bytes(&state.config.blind_papers_dir(), &filename, data)?;

    Paper::replace_blind_copy(&state.pool, paper.paper_id, &filename).await?;
    Ok(Redirect::to(&format!("/conferences/{conference_id}/author")))
}

/// Authors can retrieve their own uploads.
pub async fn download(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((conference_id, kind)): Path<(i64, String)>,
) -> Result<Response, ApiError> {
    let role =
        require_approved_role(&state.pool, user.user_id, conference_id, RoleKind::Author).await?;
    let paper = Paper::find_by_author_role(&state.pool, role.id)
        .await?
        .ok_or(PaperError::NotFound)?;

    match kind.as_str() {
        "blind" => attachment(
            &state.config.blind_papers_dir().join(&paper.blind_paper_file),
            &paper.blind_paper_file,
        ),
        "camera" => {
            let filename = paper
                .camera_ready_file
                .ok_or_else(|| ApiError::NotFound("No camera-ready file uploaded".into()))?;
            attachment(&state.config.camera_ready_dir().join(&filename), &filename)
        }
        _ => Err(ApiError::NotFound("Unknown file kind".into())),
    }
}

/// Presentation certificate, available after the conference for accepted
/// papers with completed payment.
pub async fn certificate(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(conference_id): Path<i64>,
) -> Result<Response, ApiError> {
    let conference = Conference::find(&state.pool, conference_id).await?;
    let role =
        require_approved_role(&state.pool, user.user_id, conference_id, RoleKind::Author).await?;

    if conference.status() != ConferenceStatus::Completed {
        return Err(ApiError::BadRequest(
            "Certificates are issued after the conference ends".into(),
        ));
    }
    let paper = Paper::find_by_author_role(&state.pool, role.id)
        .await?
        .ok_or(PaperError::NotFound)?;
    if paper.status != PaperStatus::Accepted {
        return Err(ApiError::Forbidden(
            "Only accepted papers receive a certificate".into(),
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
        CertificateType::Author,
        &user.name,
        &conference.title,
    )
    .await?;
    let filename = cert
        .file_path
        .ok_or_else(|| ApiError::NotFound("Certificate file missing".into()))?;
    attachment(&state.config.certificates_dir().join(&filename), &filename)
}
