use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use thiserror::Error;

use crate::auth::AuthError;
use crate::db::models::{
    certificate::CertificateError, conference::ConferenceError, paper::PaperError,
    registration::RegistrationError, review::ReviewError, role::RoleError,
    session::ScheduleError, user::UserError,
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Template error: {0}")]
    Template(#[from] tera::Error),
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal Server Error: {0}")]
    InternalError(String),
    /// Missing or expired session; answered with a redirect to the login page.
    #[error("login required")]
    LoginRequired,
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::Database(e) => ApiError::Database(e),
            UserError::NotFound => ApiError::NotFound("User not found".into()),
            UserError::EmailTaken => {
                ApiError::Conflict("An account with this email address already exists".into())
            }
        }
    }
}

impl From<ConferenceError> for ApiError {
    fn from(err: ConferenceError) -> Self {
        match err {
            ConferenceError::Database(e) => ApiError::Database(e),
            ConferenceError::NotFound => ApiError::NotFound("Conference not found".into()),
            ConferenceError::InvalidDates => {
                ApiError::BadRequest("Start date cannot be after the end date".into())
            }
        }
    }
}

impl From<RoleError> for ApiError {
    fn from(err: RoleError) -> Self {
        match err {
            RoleError::Database(e) => ApiError::Database(e),
            RoleError::NotFound => ApiError::NotFound("Conference role not found".into()),
            RoleError::AlreadyExists => {
                ApiError::Conflict("You already have a role for this conference".into())
            }
            RoleError::SelfApproval => ApiError::Forbidden(
                "You cannot approve or reject your own application".into(),
            ),
        }
    }
}

impl From<PaperError> for ApiError {
    fn from(err: PaperError) -> Self {
        match err {
            PaperError::Database(e) => ApiError::Database(e),
            PaperError::NotFound => ApiError::NotFound("Paper not found".into()),
            PaperError::AlreadySubmitted => {
                ApiError::Conflict("You have already submitted a paper".into())
            }
            PaperError::RoleConflict => ApiError::Conflict(
                "You already hold a different role for this conference".into(),
            ),
            PaperError::InvalidTransition { from, to } => ApiError::BadRequest(format!(
                "Paper status cannot move from {} to {}",
                from, to
            )),
        }
    }
}

impl From<ReviewError> for ApiError {
    fn from(err: ReviewError) -> Self {
        match err {
            ReviewError::Database(e) => ApiError::Database(e),
            ReviewError::NotFound => ApiError::NotFound("Review assignment not found".into()),
            ReviewError::NotAssigned => {
                ApiError::Forbidden("You are not assigned to review this paper".into())
            }
            ReviewError::DecisionFinalized => {
                ApiError::Conflict("The paper decision is already finalized".into())
            }
        }
    }
}

impl From<CertificateError> for ApiError {
    fn from(err: CertificateError) -> Self {
        match err {
            CertificateError::Database(e) => ApiError::Database(e),
            CertificateError::AlreadyIssued => {
                ApiError::Conflict("This certificate has already been issued".into())
            }
        }
    }
}

impl From<RegistrationError> for ApiError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::Database(e) => ApiError::Database(e),
            RegistrationError::AlreadyRegistered => {
                ApiError::Conflict("Registration already finalized for this role".into())
            }
        }
    }
}

impl From<ScheduleError> for ApiError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::Database(e) => ApiError::Database(e),
            ScheduleError::NotFound => ApiError::NotFound("Session not found".into()),
            ScheduleError::PaperAlreadyScheduled => {
                ApiError::Conflict("This paper is already assigned to a session".into())
            }
            ScheduleError::NotEligible => ApiError::BadRequest(
                "Paper must be accepted with completed payment before scheduling".into(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if matches!(self, ApiError::LoginRequired) {
            return Redirect::to("/login").into_response();
        }

        let status = match &self {
            ApiError::BadRequest(_) | ApiError::Multipart(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Auth(err) => err.status_code(),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            ApiError::Database(_) | ApiError::Io(_) | ApiError::Template(_) => {
                tracing::error!("request failed: {}", self);
                "An internal error occurred. Please try again.".to_string()
            }
            other => other.to_string(),
        };

        let body = format!(
            "<!DOCTYPE html><html><body><h1>{}</h1><p>{}</p><p><a href=\"/\">Back to home</a></p></body></html>",
            status.canonical_reason().unwrap_or("Error"),
            message
        );
        (status, Html(body)).into_response()
    }
}
