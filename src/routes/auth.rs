//! Account lifecycle: registration, email verification, login/logout and
//! password reset. New accounts stay locked out until the verification
//! link is followed.

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use std::sync::Arc;
use tera::Context;

use crate::auth::{
    clear_session_cookie, hash_password, issue_purpose_token, issue_session_token, session_cookie,
    verify_password, verify_purpose_token, AuthError, CurrentUser, TokenPurpose,
};
use crate::db::models::role::ConferenceRole;
use crate::db::models::user::{NewUser, User};
use crate::error::ApiError;
use crate::notify::{password_reset_message, verification_message};
use crate::state::AppState;
use crate::templates::render;

fn none_if_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim().to_string();
        (!trimmed.is_empty()).then_some(trimmed)
    })
}

pub async fn register_page() -> Result<impl IntoResponse, ApiError> {
    render("register.html", &Context::new())
}

#[derive(Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub university_name: Option<String>,
    pub department: Option<String>,
    pub contact_no: Option<String>,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, ApiError> {
    let name = form.name.trim().to_string();
    let email = form.email.trim().to_lowercase();
    if name.is_empty() || email.is_empty() || form.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "Name, email and a password of at least 8 characters are required".into(),
        ));
    }

    let password_hash = hash_password(&form.password)?;
    let user = User::create(
        &state.pool,
        NewUser {
            name,
            email,
            password_hash,
            university_name: none_if_empty(form.university_name),
            department: none_if_empty(form.department),
            contact_no: none_if_empty(form.contact_no),
        },
    )
    .await?;

    let token = issue_purpose_token(&state.config.secret_key, user.user_id, TokenPurpose::EmailVerify)?;
    let verify_url = format!("{}/verify-email/{}", state.config.base_url, token);
    let (subject, body) = verification_message(&user.name, &verify_url);
    if let Err(err) = state.mailer.send(&user.email, &subject, &body) {
        tracing::warn!(user_id = user.user_id, "verification mail failed: {err}");
    }

    let mut ctx = Context::new();
    ctx.insert(
        "message",
        "Registration successful. Check your inbox for the verification link.",
    );
    Ok(render("login.html", &ctx)?.into_response())
}

pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    let user_id = verify_purpose_token(&state.config.secret_key, &token, TokenPurpose::EmailVerify)?;
    User::mark_email_verified(&state.pool, user_id).await?;

    let mut ctx = Context::new();
    ctx.insert("message", "Email verified. You can now log in.");
    Ok(render("login.html", &ctx)?.into_response())
}

pub async fn login_page() -> Result<impl IntoResponse, ApiError> {
    render("login.html", &Context::new())
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    let email = form.email.trim().to_lowercase();
    let user = User::find_by_email(&state.pool, &email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !verify_password(&form.password, &user.password_hash) {
        return Err(AuthError::InvalidCredentials.into());
    }
    if !user.is_email_verified {
        return Err(AuthError::EmailNotVerified.into());
    }

    let token = issue_session_token(
        &state.config.secret_key,
        user.user_id,
        &user.name,
        user.is_admin,
        user.is_super_admin,
    )?;

    let target = if user.is_admin { "/admin" } else { "/dashboard" };
    Ok((
        [(header::SET_COOKIE, session_cookie(&token))],
        Redirect::to(target),
    )
        .into_response())
}

pub async fn logout() -> impl IntoResponse {
    (
        [(header::SET_COOKIE, clear_session_cookie())],
        Redirect::to("/"),
    )
}

/// The user hub: every role held across conferences, each linking to its
/// role dashboard.
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let roles = ConferenceRole::list_for_user(&state.pool, user.user_id).await?;

    let mut ctx = Context::new();
    ctx.insert("name", &user.name);
    ctx.insert("is_admin", &user.is_admin);
    ctx.insert("roles", &roles);
    render("dashboard.html", &ctx)
}

pub async fn forgot_password_page() -> Result<impl IntoResponse, ApiError> {
    render("forgot_password.html", &Context::new())
}

#[derive(Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

/// Always answers the same way so the form cannot be used to probe which
/// addresses have accounts.
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ForgotPasswordForm>,
) -> Result<Response, ApiError> {
    let email = form.email.trim().to_lowercase();
    if let Some(user) = User::find_by_email(&state.pool, &email).await? {
        let token = issue_purpose_token(
            &state.config.secret_key,
            user.user_id,
            TokenPurpose::PasswordReset,
        )?;
        let reset_url = format!("{}/reset-password/{}", state.config.base_url, token);
        let (subject, body) = password_reset_message(&user.name, &reset_url);
        if let Err(err) = state.mailer.send(&user.email, &subject, &body) {
            tracing::warn!(user_id = user.user_id, "password reset mail failed: {err}");
        }
    }

    let mut ctx = Context::new();
    ctx.insert(
        "message",
        "If that address has an account, a reset link is on its way.",
    );
    Ok(render("login.html", &ctx)?.into_response())
}

pub async fn reset_password_page(
    Path(token): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let mut ctx = Context::new();
    ctx.insert("token", &token);
    render("reset_password.html", &ctx)
}

#[derive(Deserialize)]
pub struct ResetPasswordForm {
    pub password: String,
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Form(form): Form<ResetPasswordForm>,
) -> Result<Response, ApiError> {
    if form.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "Password must be at least 8 characters".into(),
        ));
    }

    let user_id =
        verify_purpose_token(&state.config.secret_key, &token, TokenPurpose::PasswordReset)?;
    let password_hash = hash_password(&form.password)?;
    User::set_password_hash(&state.pool, user_id, &password_hash).await?;

    let mut ctx = Context::new();
    ctx.insert("message", "Password updated. Log in with your new password.");
    Ok(render("login.html", &ctx)?.into_response())
}
