//! Reviewer workflow: the application form, the assignment dashboard and
//! review submission. Blind manuscripts are only handed to assigned
//! reviewers.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use std::sync::Arc;
use tera::Context;

use crate::auth::CurrentUser;
use crate::db::models::conference::Conference;
use crate::db::models::paper::Paper;
use crate::db::models::review::{Recommendation, Review, ReviewError, ReviewSubmission};
use crate::db::models::role::RoleKind;
use crate::db::models::track::Track;
use crate::error::ApiError;
use crate::state::AppState;
use crate::templates::render;

use super::{attachment, require_approved_role};

pub async fn apply_page(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(conference_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let conference = Conference::find(&state.pool, conference_id).await?;
    let tracks = Track::list_for_conference(&state.pool, conference_id).await?;

    let mut ctx = Context::new();
    ctx.insert("conference", &conference);
    ctx.insert("tracks", &tracks);
    render("reviewer_apply.html", &ctx)
}

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(conference_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let conference = Conference::find(&state.pool, conference_id).await?;
    let role =
        require_approved_role(&state.pool, user.user_id, conference_id, RoleKind::Reviewer).await?;
    let assignments = Review::list_for_reviewer(&state.pool, role.id).await?;

    let mut ctx = Context::new();
    ctx.insert("conference", &conference);
    ctx.insert("assignments", &assignments);
    render("reviewer_dashboard.html", &ctx)
}

/// Loads a review only if it belongs to this reviewer's role.
async fn owned_review(
    state: &Arc<AppState>,
    user_id: i64,
    conference_id: i64,
    review_id: i64,
) -> Result<Review, ApiError> {
    let role =
        require_approved_role(&state.pool, user_id, conference_id, RoleKind::Reviewer).await?;
    let review = Review::find(&state.pool, review_id).await?;
    if review.reviewer_role_id != role.id {
        return Err(ReviewError::NotAssigned.into());
    }
    Ok(review)
}

pub async fn review_form(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((conference_id, review_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let review = owned_review(&state, user.user_id, conference_id, review_id).await?;
    let paper = Paper::find(&state.pool, review.paper_id).await?;

    let mut ctx = Context::new();
    ctx.insert("conference_id", &conference_id);
    ctx.insert("review", &review);
    ctx.insert("paper_title", &paper.title);
    ctx.insert("paper_abstract", &paper.abstract_text);
    ctx.insert("submitted", &review.recommendation.is_some());
    render("review_form.html", &ctx)
}

#[derive(Deserialize)]
pub struct ReviewForm {
    pub score: i32,
    pub recommendation: String,
    pub comments_to_author: String,
    pub comments_to_organiser: Option<String>,
}

pub async fn submit_review(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((conference_id, review_id)): Path<(i64, i64)>,
    Form(form): Form<ReviewForm>,
) -> Result<impl IntoResponse, ApiError> {
    let review = owned_review(&state, user.user_id, conference_id, review_id).await?;

    if !(1..=10).contains(&form.score) {
        return Err(ApiError::BadRequest("Score must be between 1 and 10".into()));
    }
    let recommendation = Recommendation::parse(&form.recommendation).ok_or_else(|| {
        ApiError::BadRequest(format!("Unknown recommendation '{}'", form.recommendation))
    })?;

    Review::submit(
        &state.pool,
        review.review_id,
        &ReviewSubmission {
            score: form.score,
            recommendation,
            comments_to_author: form.comments_to_author,
            comments_to_organiser: form.comments_to_organiser,
        },
    )
    .await?;

    Ok(Redirect::to(&format!(
        "/conferences/{conference_id}/reviewer"
    )))
}

/// Blind manuscript download, gated on an assignment for this paper.
pub async fn download_paper(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((conference_id, paper_id)): Path<(i64, i64)>,
) -> Result<Response, ApiError> {
    let role =
        require_approved_role(&state.pool, user.user_id, conference_id, RoleKind::Reviewer).await?;
    Review::find_assignment(&state.pool, paper_id, role.id)
        .await?
        .ok_or(ReviewError::NotAssigned)?;

    let paper = Paper::find(&state.pool, paper_id).await?;
    attachment(
        &state.config.blind_papers_dir().join(&paper.blind_paper_file),
        &paper.blind_paper_file,
    )
}
