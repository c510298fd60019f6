//! Public schedule access: the published PDF once the organizer uploads
//! it, and an HTML fallback rendered from the session tables.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tera::Context;

use crate::db::models::conference::Conference;
use crate::db::models::session::Session;
use crate::error::ApiError;
use crate::state::AppState;
use crate::templates::render;

use super::attachment;

pub async fn schedule_page(
    State(state): State<Arc<AppState>>,
    Path(conference_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let conference = Conference::find(&state.pool, conference_id).await?;
    let entries = Session::schedule_entries(&state.pool, conference_id).await?;

    let mut ctx = Context::new();
    ctx.insert("conference", &conference);
    ctx.insert("entries", &entries);
    ctx.insert("published", &conference.final_schedule_file.is_some());
    render("schedule.html", &ctx)
}

pub async fn download_schedule(
    State(state): State<Arc<AppState>>,
    Path(conference_id): Path<i64>,
) -> Result<Response, ApiError> {
    let conference = Conference::find(&state.pool, conference_id).await?;
    let filename = conference
        .final_schedule_file
        .ok_or_else(|| ApiError::NotFound("The schedule has not been published yet".into()))?;
    attachment(&state.config.schedules_dir().join(&filename), &filename)
}
