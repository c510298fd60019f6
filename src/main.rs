mod auth;
mod config;
mod db;
mod decision;
mod error;
mod notify;
mod pdf;
mod routes;
mod state;
mod storage;
mod templates;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "uniconf=info,tower_http=info".into()),
        )
        .init();

    let config = config::Config::from_env()?;
    let config = Arc::new(config);

    storage::ensure_dirs(&config)?;

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(pool.as_ref()).await?;

    if let (Some(email), Some(password)) =
        (&config.super_admin_email, &config.super_admin_password)
    {
        let hash = auth::hash_password(password)?;
        db::models::user::User::ensure_super_admin(pool.as_ref(), "Super Admin", email, &hash)
            .await?;
    }

    let mailer = Arc::new(notify::LogMailer {
        from: config.mail_from.clone(),
    });

    let state = Arc::new(state::AppState {
        pool,
        config: config.clone(),
        mailer,
    });

    let app = Router::new()
        // public
        .route("/", get(routes::conference::explore))
        .route("/conferences/:conference_id", get(routes::conference::detail))
        .route("/api/conferences/:conference_id/status", get(routes::conference::status))
        .route("/conferences/:conference_id/schedule", get(routes::schedule::schedule_page))
        .route("/conferences/:conference_id/schedule/download", get(routes::schedule::download_schedule))
        // accounts
        .route("/register", get(routes::auth::register_page).post(routes::auth::register))
        .route("/verify-email/:token", get(routes::auth::verify_email))
        .route("/login", get(routes::auth::login_page).post(routes::auth::login))
        .route("/logout", get(routes::auth::logout))
        .route("/dashboard", get(routes::auth::dashboard))
        .route("/forgot-password", get(routes::auth::forgot_password_page).post(routes::auth::forgot_password))
        .route("/reset-password/:token", get(routes::auth::reset_password_page).post(routes::auth::reset_password))
        .route("/profile", get(routes::profile::profile_page).post(routes::profile::update_profile))
        .route("/profile/password", post(routes::profile::change_password))
        // role entry points
        .route("/conferences/:conference_id/apply", post(routes::conference::apply))
        .route("/conferences/:conference_id/register", post(routes::conference::register_participant))
        // admin
        .route("/admin", get(routes::admin::dashboard))
        .route("/admin/conferences/new", get(routes::admin::add_conference_page).post(routes::admin::add_conference))
        .route("/admin/conferences/:conference_id/delete", post(routes::admin::delete_conference))
        .route("/admin/admins", get(routes::admin::manage_admins).post(routes::admin::add_admin))
        .route("/admin/admins/:admin_id/delete", post(routes::admin::delete_admin))
        // author
        .route("/conferences/:conference_id/author", get(routes::author::dashboard))
        .route("/conferences/:conference_id/author/submit", get(routes::author::submit_page).post(routes::author::submit))
        .route("/conferences/:conference_id/author/pay", post(routes::author::pay))
        .route("/conferences/:conference_id/author/camera-ready", post(routes::author::upload_camera_ready))
        .route("/conferences/:conference_id/author/revision", post(routes::author::upload_revision))
        .route("/conferences/:conference_id/author/files/:kind", get(routes::author::download))
        .route("/conferences/:conference_id/author/certificate", get(routes::author::certificate))
        // reviewer
        .route("/conferences/:conference_id/reviewer", get(routes::reviewer::dashboard))
        .route("/conferences/:conference_id/reviewer/apply", get(routes::reviewer::apply_page))
        .route("/conferences/:conference_id/reviewer/reviews/:review_id", get(routes::reviewer::review_form).post(routes::reviewer::submit_review))
        .route("/conferences/:conference_id/reviewer/papers/:paper_id/download", get(routes::reviewer::download_paper))
        // organizer
        .route("/conferences/:conference_id/organizer", get(routes::organizer::dashboard))
        .route("/conferences/:conference_id/organizer/settings", get(routes::organizer::settings_page).post(routes::organizer::update_settings))
        .route("/conferences/:conference_id/organizer/reviewers", get(routes::organizer::manage_reviewers))
        .route("/conferences/:conference_id/organizer/reviewers/:role_id/approve", post(routes::organizer::approve_reviewer))
        .route("/conferences/:conference_id/organizer/reviewers/:role_id/reject", post(routes::organizer::reject_reviewer))
        .route("/conferences/:conference_id/organizer/reviewers/:role_id/remove", post(routes::organizer::remove_reviewer))
        .route("/conferences/:conference_id/organizer/participants/:role_filter", get(routes::organizer::view_participants))
        .route("/conferences/:conference_id/organizer/papers", get(routes::organizer::papers))
        .route("/conferences/:conference_id/organizer/papers/:paper_id/assign", get(routes::organizer::assign_page).post(routes::organizer::assign_reviewers))
        .route("/conferences/:conference_id/organizer/papers/:paper_id/reviews", get(routes::organizer::paper_reviews))
        .route("/conferences/:conference_id/organizer/papers/:paper_id/decision", post(routes::organizer::decide))
        .route("/conferences/:conference_id/organizer/papers/:paper_id/camera-ready", get(routes::organizer::download_camera_ready))
        .route("/conferences/:conference_id/organizer/reviews/:review_id/remove", post(routes::organizer::remove_assignment))
        .route("/conferences/:conference_id/organizer/tracks", get(routes::organizer::tracks_page).post(routes::organizer::add_track))
        .route("/conferences/:conference_id/organizer/tracks/:track_id", post(routes::organizer::update_track))
        .route("/conferences/:conference_id/organizer/tracks/:track_id/delete", post(routes::organizer::delete_track))
        .route("/conferences/:conference_id/organizer/sessions", get(routes::organizer::sessions_page).post(routes::organizer::add_session))
        .route("/conferences/:conference_id/organizer/sessions/:session_id", post(routes::organizer::update_session))
        .route("/conferences/:conference_id/organizer/sessions/:session_id/delete", post(routes::organizer::delete_session))
        .route("/conferences/:conference_id/organizer/sessions/:session_id/papers", get(routes::organizer::session_papers_page).post(routes::organizer::assign_session_paper))
        .route("/conferences/:conference_id/organizer/schedule/preview", get(routes::organizer::schedule_preview))
        .route("/conferences/:conference_id/organizer/schedule", post(routes::organizer::publish_schedule))
        // participant
        .route("/conferences/:conference_id/participant", get(routes::participant::dashboard))
        .route("/conferences/:conference_id/participant/certificate", get(routes::participant::certificate))
        .nest_service("/static", tower_http::services::ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("UniConf listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
