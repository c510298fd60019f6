//! Public conference pages: the explore listing grouped by derived status,
//! the detail page with its role actions, and a small JSON status probe.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect},
    Form, Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tera::Context;

use crate::auth::CurrentUser;
use crate::db::models::conference::{Conference, ConferenceStatus};
use crate::db::models::role::{ConferenceRole, RoleKind};
use crate::db::models::track::Track;
use crate::error::ApiError;
use crate::state::AppState;
use crate::templates::render;

pub async fn explore(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let conferences = Conference::list_by_start_date(&state.pool).await?;

    let mut ongoing = Vec::new();
    let mut upcoming = Vec::new();
    let mut completed = Vec::new();
    for conference in conferences {
        match conference.status() {
            ConferenceStatus::Ongoing => ongoing.push(conference),
            ConferenceStatus::Upcoming => upcoming.push(conference),
            ConferenceStatus::Completed => completed.push(conference),
        }
    }

    let mut ctx = Context::new();
    ctx.insert("ongoing", &ongoing);
    ctx.insert("upcoming", &upcoming);
    ctx.insert("completed", &completed);
    render("index.html", &ctx)
}

pub async fn detail(
    State(state): State<Arc<AppState>>,
    user: Option<CurrentUser>,
    Path(conference_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let conference = Conference::find(&state.pool, conference_id).await?;
    let tracks = Track::list_for_conference(&state.pool, conference_id).await?;

    let existing_role = match &user {
        Some(u) => ConferenceRole::find_for_user(&state.pool, u.user_id, conference_id).await?,
        None => None,
    };

    let mut ctx = Context::new();
    ctx.insert("conference", &conference);
    ctx.insert("status", conference.status().as_str());
    ctx.insert("tracks", &tracks);
    ctx.insert("logged_in", &user.is_some());
    ctx.insert("existing_role", &existing_role);
    render("conference_detail.html", &ctx)
}

pub async fn status(
    State(state): State<Arc<AppState>>,
    Path(conference_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let conference = Conference::find(&state.pool, conference_id).await?;
    Ok(Json(serde_json::json!({
        "conference_id": conference.conference_id,
        "title": conference.title,
        "status": conference.status().as_str(),
        "start_date": conference.start_date,
        "end_date": conference.end_date,
    })))
}

#[derive(Deserialize)]
pub struct ApplyForm {
    pub role: String,
    pub expertise: Option<String>,
}

/// Reviewer and organizer applications land pending for the organizer (or
/// the conference admin) to approve. Author and participant roles have
/// their own entry points.
pub async fn apply(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(conference_id): Path<i64>,
    Form(form): Form<ApplyForm>,
) -> Result<impl IntoResponse, ApiError> {
    let role = RoleKind::parse(&form.role)
        .filter(|r| matches!(r, RoleKind::Reviewer | RoleKind::Organizer))
        .ok_or_else(|| ApiError::BadRequest(format!("Cannot apply for role '{}'", form.role)))?;

    Conference::find(&state.pool, conference_id).await?;
    ConferenceRole::apply(
        &state.pool,
        user.user_id,
        conference_id,
        role,
        form.expertise.as_deref(),
    )
    .await?;

    Ok(Redirect::to(&format!("/conferences/{conference_id}")))
}

/// Participant registration: role and completed payment in one step. The
/// fee is read from the conference, never from the form.
pub async fn register_participant(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(conference_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let conference = Conference::find(&state.pool, conference_id).await?;
    if conference.status() == ConferenceStatus::Completed {
        return Err(ApiError::BadRequest(
            "This conference has already ended".into(),
        ));
    }

    ConferenceRole::register_participant(
        &state.pool,
        user.user_id,
        conference_id,
        conference.participant_fee_cents,
    )
    .await?;

    Ok(Redirect::to(&format!(
        "/conferences/{conference_id}/participant"
    )))
}
