//! Administration: conference creation and the super-admin's management of
//! admin accounts. Every handler re-checks the admin flags in the database.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect},
    Form,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use tera::Context;

use crate::auth::{hash_password, CurrentUser};
use crate::db::models::conference::{Conference, NewConference};
use crate::db::models::user::User;
use crate::error::ApiError;
use crate::notify::admin_welcome_message;
use crate::state::AppState;
use crate::templates::render;

use super::{require_admin, require_super_admin};

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let admin = require_admin(&state.pool, &user).await?;
    let conferences = Conference::list_by_admin(&state.pool, admin.user_id).await?;

    let statuses: Vec<&str> = conferences.iter().map(|c| c.status().as_str()).collect();
    let mut ctx = Context::new();
    ctx.insert("name", &admin.name);
    ctx.insert("is_super_admin", &admin.is_super_admin);
    ctx.insert("conferences", &conferences);
    ctx.insert("statuses", &statuses);
    render("admin_dashboard.html", &ctx)
}

pub async fn add_conference_page(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&state.pool, &user).await?;
    render("add_conference.html", &Context::new())
}

#[derive(Deserialize)]
pub struct ConferenceForm {
    pub title: String,
    pub hosting_university: String,
    pub hosting_department: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub author_fee_cents: i64,
    pub participant_fee_cents: i64,
}

pub async fn add_conference(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Form(form): Form<ConferenceForm>,
) -> Result<impl IntoResponse, ApiError> {
    let admin = require_admin(&state.pool, &user).await?;

    if form.author_fee_cents < 0 || form.participant_fee_cents < 0 {
        return Err(ApiError::BadRequest("Fees cannot be negative".into()));
    }

    Conference::create(
        &state.pool,
        admin.user_id,
        NewConference {
            title: form.title.trim().to_string(),
            hosting_university: form.hosting_university,
            hosting_department: form.hosting_department,
            description: form.description,
            location: form.location,
            start_date: form.start_date,
            end_date: form.end_date,
            author_fee_cents: form.author_fee_cents,
            participant_fee_cents: form.participant_fee_cents,
        },
    )
    .await?;

    Ok(Redirect::to("/admin"))
}

/// Hard delete of a conference and all data hanging off it. Restricted to
/// the admin who created it.
pub async fn delete_conference(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(conference_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let admin = require_admin(&state.pool, &user).await?;
    Conference::delete_owned(&state.pool, conference_id, admin.user_id).await?;
    Ok(Redirect::to("/admin"))
}

pub async fn manage_admins(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    require_super_admin(&state.pool, &user).await?;
    let admins = User::list_admins(&state.pool).await?;

    let mut ctx = Context::new();
    ctx.insert("admins", &admins);
    render("manage_admins.html", &ctx)
}

#[derive(Deserialize)]
pub struct NewAdminForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

pub async fn add_admin(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Form(form): Form<NewAdminForm>,
) -> Result<impl IntoResponse, ApiError> {
    require_super_admin(&state.pool, &user).await?;

    if form.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "Password must be at least 8 characters".into(),
        ));
    }

    let email = form.email.trim().to_lowercase();
    let password_hash = hash_password(&form.password)?;
    let admin = User::create_admin(&state.pool, form.name.trim(), &email, &password_hash).await?;

    let (subject, body) = admin_welcome_message(&admin.name, &admin.email);
    if let Err(err) = state.mailer.send(&admin.email, &subject, &body) {
        tracing::warn!(user_id = admin.user_id, "admin welcome mail failed: {err}");
    }

    Ok(Redirect::to("/admin/admins"))
}

pub async fn delete_admin(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(admin_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let acting = require_super_admin(&state.pool, &user).await?;
    if acting.user_id == admin_id {
        return Err(ApiError::Forbidden(
            "You cannot delete your own account".into(),
        ));
    }
    User::delete_admin(&state.pool, admin_id).await?;
    Ok(Redirect::to("/admin/admins"))
}
