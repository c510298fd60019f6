//! Account profile: view and edit contact details, and an authenticated
//! password change that verifies the current password first.

use axum::{
    extract::State,
    response::{IntoResponse, Redirect},
    Form,
};
use serde::Deserialize;
use std::sync::Arc;
use tera::Context;

use crate::auth::{hash_password, verify_password, CurrentUser};
use crate::db::models::user::{ProfileUpdate, User};
use crate::error::ApiError;
use crate::state::AppState;
use crate::templates::render;

pub async fn profile_page(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let account = User::find(&state.pool, user.user_id).await?;

    let mut ctx = Context::new();
    ctx.insert("user", &account);
    render("profile.html", &ctx)
}

#[derive(Deserialize)]
pub struct ProfileForm {
    pub name: String,
    pub university_name: Option<String>,
    pub department: Option<String>,
    pub contact_no: Option<String>,
}

fn none_if_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim().to_string();
        (!trimmed.is_empty()).then_some(trimmed)
    })
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Form(form): Form<ProfileForm>,
) -> Result<impl IntoResponse, ApiError> {
    let name = form.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Name cannot be empty".into()));
    }

    User::update_profile(
        &state.pool,
        user.user_id,
        &ProfileUpdate {
            name,
            university_name: none_if_empty(form.university_name),
            department: none_if_empty(form.department),
            contact_no: none_if_empty(form.contact_no),
        },
    )
    .await?;

    Ok(Redirect::to("/profile"))
}

#[derive(Deserialize)]
pub struct ChangePasswordForm {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// New password must be long enough and typed the same twice.
fn check_new_password(new: &str, confirm: &str) -> Result<(), &'static str> {
    if new.len() < 8 {
        return Err("New password must be at least 8 characters");
    }
    if new != confirm {
        return Err("The new passwords do not match");
    }
    Ok(())
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Form(form): Form<ChangePasswordForm>,
) -> Result<impl IntoResponse, ApiError> {
    let account = User::find(&state.pool, user.user_id).await?;
    if !verify_password(&form.current_password, &account.password_hash) {
        return Err(ApiError::Forbidden(
            "Your current password is incorrect".into(),
        ));
    }
    check_new_password(&form.new_password, &form.confirm_password)
        .map_err(|msg| ApiError::BadRequest(msg.into()))?;

    let password_hash = hash_password(&form.new_password)?;
    User::set_password_hash(&state.pool, user.user_id, &password_hash).await?;

    Ok(Redirect::to("/profile"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_password_must_be_long_enough() {
        assert!(check_new_password("short", "short").is_err());
        assert!(check_new_password("long enough", "long enough").is_ok());
    }

    #[test]
    fn mismatched_confirmation_is_refused() {
        assert!(check_new_password("long enough", "long enuogh").is_err());
    }

    #[test]
    fn blank_optional_fields_are_stored_as_none() {
        assert_eq!(none_if_empty(Some("  ".into())), None);
        assert_eq!(none_if_empty(None), None);
        assert_eq!(none_if_empty(Some(" MIT ".into())), Some("MIT".into()));
    }
}
