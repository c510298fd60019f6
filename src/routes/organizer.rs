//! Organizer workflow: reviewer management, reviewer assignment, final
//! decisions, tracks, sessions and the schedule. Every handler re-checks
//! access for the conference in the path; role application handlers also
//! admit the conference's owning admin.

use axum::{
    extract::{Multipart, Path, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tera::Context;

use crate::auth::CurrentUser;
use crate::db::models::conference::{Conference, ConferenceDetails};
use crate::db::models::paper::Paper;
use crate::db::models::review::Review;
use crate::db::models::role::{ConferenceRole, RoleKind};
use crate::db::models::session::{Session, SessionForm, SessionPaper};
use crate::db::models::track::{Track, TrackForm};
use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::{save_bytes, unique_filename};
use crate::templates::render;

use super::{attachment, require_conference_manager, require_organizer, UploadForm};

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(conference_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    require_organizer(&state.pool, user.user_id, conference_id).await?;
    let conference = Conference::find(&state.pool, conference_id).await?;

    let papers = Paper::list_for_conference(&state.pool, conference_id).await?;
    let pending_applications =
        ConferenceRole::list_pending_applications(&state.pool, conference_id).await?;
    let sessions = Session::list_for_conference(&state.pool, conference_id).await?;

    let mut ctx = Context::new();
    ctx.insert("conference", &conference);
    ctx.insert("status", conference.status().as_str());
    ctx.insert("paper_count", &papers.len());
    ctx.insert("pending_application_count", &pending_applications.len());
    ctx.insert("session_count", &sessions.len());
    render("organizer_dashboard.html", &ctx)
}

pub async fn settings_page(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(conference_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    require_organizer(&state.pool, user.user_id, conference_id).await?;
    let conference = Conference::find(&state.pool, conference_id).await?;

    let mut ctx = Context::new();
    ctx.insert("conference", &conference);
    render("conference_settings.html", &ctx)
}

pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(conference_id): Path<i64>,
    Form(details): Form<ConferenceDetails>,
) -> Result<impl IntoResponse, ApiError> {
    require_organizer(&state.pool, user.user_id, conference_id).await?;
    Conference::update_details(&state.pool, conference_id, details).await?;
    Ok(Redirect::to(&format!(
        "/conferences/{conference_id}/organizer"
    )))
}

/// Pending reviewer/organizer applications plus the approved reviewer
/// pool. Open to organizers and the conference's owning admin.
pub async fn manage_reviewers(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(conference_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    require_conference_manager(&state.pool, &user, conference_id).await?;

    let pending = ConferenceRole::list_pending_applications(&state.pool, conference_id).await?;
    let approved =
        ConferenceRole::list_approved(&state.pool, conference_id, &[RoleKind::Reviewer]).await?;

    let mut ctx = Context::new();
    ctx.insert("conference_id", &conference_id);
    ctx.insert("pending", &pending);
    ctx.insert("approved", &approved);
    render("manage_reviewers.html", &ctx)
}

pub async fn approve_reviewer(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((conference_id, role_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    require_conference_manager(&state.pool, &user, conference_id).await?;
    ConferenceRole::approve(&state.pool, role_id, user.user_id).await?;
    Ok(Redirect::to(&format!(
        "/conferences/{conference_id}/organizer/reviewers"
    )))
}

pub async fn reject_reviewer(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((conference_id, role_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    require_conference_manager(&state.pool, &user, conference_id).await?;
    ConferenceRole::reject(&state.pool, role_id, user.user_id).await?;
    Ok(Redirect::to(&format!(
        "/conferences/{conference_id}/organizer/reviewers"
    )))
}

/// Removes an approved reviewer or organizer; their assignments cascade
/// away.
pub async fn remove_reviewer(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((conference_id, role_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    require_conference_manager(&state.pool, &user, conference_id).await?;
    let role = ConferenceRole::find(&state.pool, role_id).await?;
    if role.conference_id != conference_id
        || !matches!(role.role, RoleKind::Reviewer | RoleKind::Organizer)
    {
        return Err(ApiError::NotFound("Reviewer role not found".into()));
    }
    if role.user_id == user.user_id {
        return Err(ApiError::Forbidden(
            "You cannot remove your own role".into(),
        ));
    }
    ConferenceRole::delete(&state.pool, role_id).await?;
    Ok(Redirect::to(&format!(
        "/conferences/{conference_id}/organizer/reviewers"
    )))
}

/// Maps the URL filter segment onto the role kinds to list. `all` covers
/// every approved attendee kind; management roles are not listed here.
fn participant_filter(value: &str) -> Option<Vec<RoleKind>> {
    match value {
        "all" => Some(vec![RoleKind::Participant, RoleKind::Author, RoleKind::Reviewer]),
        other => RoleKind::parse(other)
            .filter(|r| matches!(r, RoleKind::Participant | RoleKind::Author | RoleKind::Reviewer))
            .map(|r| vec![r]),
    }
}

/// Unified listing of approved participants, authors and reviewers.
pub async fn view_participants(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((conference_id, role_filter)): Path<(i64, String)>,
) -> Result<impl IntoResponse, ApiError> {
    require_organizer(&state.pool, user.user_id, conference_id).await?;
    let kinds = participant_filter(&role_filter)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid role filter '{role_filter}'")))?;
    let people = ConferenceRole::list_approved(&state.pool, conference_id, &kinds).await?;

    let mut ctx = Context::new();
    ctx.insert("conference_id", &conference_id);
    ctx.insert("people", &people);
    ctx.insert("role_filter", &role_filter);
    render("view_participants.html", &ctx)
}

pub async fn papers(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(conference_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    require_organizer(&state.pool, user.user_id, conference_id).await?;
    let papers = Paper::list_for_conference(&state.pool, conference_id).await?;

    let mut ctx = Context::new();
    ctx.insert("conference_id", &conference_id);
    ctx.insert("papers", &papers);
    render("organizer_papers.html", &ctx)
}

pub async fn assign_page(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((conference_id, paper_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    require_organizer(&state.pool, user.user_id, conference_id).await?;
    let paper = Paper::find(&state.pool, paper_id).await?;
    if paper.conference_id != conference_id {
        return Err(ApiError::NotFound("Paper not found".into()));
    }
    let reviewers =
        ConferenceRole::list_approved(&state.pool, conference_id, &[RoleKind::Reviewer]).await?;

    let mut ctx = Context::new();
    ctx.insert("conference_id", &conference_id);
    ctx.insert("paper", &paper);
    ctx.insert("reviewers", &reviewers);
    render("assign_reviewers.html", &ctx)
}

#[derive(Deserialize)]
pub struct AssignForm {
    /// Comma separated reviewer role ids.
    pub reviewer_role_ids: String,
}

/// Idempotent assignment: already assigned reviewers are skipped and a
/// submitted paper moves under review with the first assignment.
pub async fn assign_reviewers(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((conference_id, paper_id)): Path<(i64, i64)>,
    Form(form): Form<AssignForm>,
) -> Result<impl IntoResponse, ApiError> {
    require_organizer(&state.pool, user.user_id, conference_id).await?;
    let paper = Paper::find(&state.pool, paper_id).await?;
    if paper.conference_id != conference_id {
        return Err(ApiError::NotFound("Paper not found".into()));
    }

    let mut role_ids = Vec::new();
    for raw in form.reviewer_role_ids.split(',') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let role_id: i64 = raw
            .parse()
            .map_err(|_| ApiError::BadRequest(format!("Invalid reviewer id '{raw}'")))?;
        let role = ConferenceRole::find(&state.pool, role_id).await?;
        if role.conference_id != conference_id || role.role != RoleKind::Reviewer {
            return Err(ApiError::BadRequest(format!(
                "Role {role_id} is not a reviewer for this conference"
            )));
        }
        role_ids.push(role_id);
    }
    if role_ids.is_empty() {
        return Err(ApiError::BadRequest("No reviewers selected".into()));
    }

    let added = Review::assign_many(&state.pool, paper_id, &role_ids).await?;
    tracing::info!(paper_id, added, "reviewer assignment");

    Ok(Redirect::to(&format!(
        "/conferences/{conference_id}/organizer/papers"
    )))
}

pub async fn remove_assignment(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((conference_id, review_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    require_organizer(&state.pool, user.user_id, conference_id).await?;
    let paper_id = Review::remove(&state.pool, review_id).await?;
    Ok(Redirect::to(&format!(
        "/conferences/{conference_id}/organizer/papers/{paper_id}/reviews"
    )))
}

pub async fn paper_reviews(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((conference_id, paper_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    require_organizer(&state.pool, user.user_id, conference_id).await?;
    let paper = Paper::find(&state.pool, paper_id).await?;
    if paper.conference_id != conference_id {
        return Err(ApiError::NotFound("Paper not found".into()));
    }
    let reviews = Review::list_submitted_for_paper(&state.pool, paper_id).await?;

    let mut ctx = Context::new();
    ctx.insert("conference_id", &conference_id);
    ctx.insert("paper", &paper);
    ctx.insert("reviews", &reviews);
    ctx.insert("decision_open", &!paper.status.is_final());
    render("paper_reviews.html", &ctx)
}

#[derive(Deserialize)]
pub struct DecisionForm {
    pub decision: String,
}

pub async fn decide(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((conference_id, paper_id)): Path<(i64, i64)>,
    Form(form): Form<DecisionForm>,
) -> Result<impl IntoResponse, ApiError> {
    require_organizer(&state.pool, user.user_id, conference_id).await?;
    let conference = Conference::find(&state.pool, conference_id).await?;

    let outcome = crate::decision::apply_final_decision(
        &state.pool,
        state.mailer.as_ref(),
        conference_id,
        &conference.title,
        paper_id,
        &form.decision,
    )
    .await?;
    tracing::info!(paper_id, status = %outcome.status, "final decision recorded");

    Ok(Redirect::to(&format!(
        "/conferences/{conference_id}/organizer/papers"
    )))
}

pub async fn tracks_page(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(conference_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    require_organizer(&state.pool, user.user_id, conference_id).await?;
    let tracks = Track::list_for_conference(&state.pool, conference_id).await?;

    let mut ctx = Context::new();
    ctx.insert("conference_id", &conference_id);
    ctx.insert("tracks", &tracks);
    render("manage_tracks.html", &ctx)
}

pub async fn add_track(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(conference_id): Path<i64>,
    Form(form): Form<TrackForm>,
) -> Result<impl IntoResponse, ApiError> {
    require_organizer(&state.pool, user.user_id, conference_id).await?;
    Track::create(&state.pool, conference_id, &form).await?;
    Ok(Redirect::to(&format!(
        "/conferences/{conference_id}/organizer/tracks"
    )))
}

pub async fn update_track(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((conference_id, track_id)): Path<(i64, i64)>,
    Form(form): Form<TrackForm>,
) -> Result<impl IntoResponse, ApiError> {
    require_organizer(&state.pool, user.user_id, conference_id).await?;
    Track::update(&state.pool, conference_id, track_id, &form).await?;
    Ok(Redirect::to(&format!(
        "/conferences/{conference_id}/organizer/tracks"
    )))
}

pub async fn delete_track(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((conference_id, track_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    require_organizer(&state.pool, user.user_id, conference_id).await?;
    Track::delete(&state.pool, conference_id, track_id).await?;
    Ok(Redirect::to(&format!(
        "/conferences/{conference_id}/organizer/tracks"
    )))
}

/// Form payload for session create/update; the timestamp arrives as the
/// datetime-local format without a zone and is taken as UTC.
#[derive(Deserialize)]
pub struct SessionFormData {
    pub name: String,
    pub schedule_time: Option<String>,
    pub location: Option<String>,
    // Selects post "" for the empty choice, so these arrive as strings.
    pub track_id: Option<String>,
    pub session_chair_role_id: Option<String>,
}

fn parse_schedule_time(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M")
            .map(|naive| Some(naive.and_utc()))
            .map_err(|_| ApiError::BadRequest(format!("Invalid session time '{value}'"))),
    }
}

fn parse_optional_id(raw: Option<&str>, what: &str) -> Result<Option<i64>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ApiError::BadRequest(format!("Invalid {what} '{value}'"))),
    }
}

impl SessionFormData {
    fn into_session_form(self) -> Result<SessionForm, ApiError> {
        Ok(SessionForm {
            name: self.name,
            schedule_time: parse_schedule_time(self.schedule_time.as_deref())?,
            location: self.location.filter(|l| !l.trim().is_empty()),
            track_id: parse_optional_id(self.track_id.as_deref(), "track")?,
            session_chair_role_id: parse_optional_id(
                self.session_chair_role_id.as_deref(),
                "session chair",
            )?,
        })
    }
}

pub async fn sessions_page(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(conference_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    require_organizer(&state.pool, user.user_id, conference_id).await?;
    let sessions = Session::list_for_conference(&state.pool, conference_id).await?;
    let tracks = Track::list_for_conference(&state.pool, conference_id).await?;
    let chairs = ConferenceRole::list_approved(
        &state.pool,
        conference_id,
        &[RoleKind::Organizer, RoleKind::Reviewer],
    )
    .await?;

    let mut ctx = Context::new();
    ctx.insert("conference_id", &conference_id);
    ctx.insert("sessions", &sessions);
    ctx.insert("tracks", &tracks);
    ctx.insert("chairs", &chairs);
    render("manage_sessions.html", &ctx)
}

pub async fn add_session(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(conference_id): Path<i64>,
    Form(form): Form<SessionFormData>,
) -> Result<impl IntoResponse, ApiError> {
    require_organizer(&state.pool, user.user_id, conference_id).await?;
    Session::create(&state.pool, conference_id, &form.into_session_form()?).await?;
    Ok(Redirect::to(&format!(
        "/conferences/{conference_id}/organizer/sessions"
    )))
}

pub async fn update_session(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((conference_id, session_id)): Path<(i64, i64)>,
    Form(form): Form<SessionFormData>,
) -> Result<impl IntoResponse, ApiError> {
    require_organizer(&state.pool, user.user_id, conference_id).await?;
    Session::update(&state.pool, conference_id, session_id, &form.into_session_form()?).await?;
    Ok(Redirect::to(&format!(
        "/conferences/{conference_id}/organizer/sessions"
    )))
}

pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((conference_id, session_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    require_organizer(&state.pool, user.user_id, conference_id).await?;
    Session::delete(&state.pool, conference_id, session_id).await?;
    Ok(Redirect::to(&format!(
        "/conferences/{conference_id}/organizer/sessions"
    )))
}

pub async fn session_papers_page(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((conference_id, session_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    require_organizer(&state.pool, user.user_id, conference_id).await?;
    let eligible = Paper::list_schedule_eligible(&state.pool, conference_id).await?;
    let entries = Session::schedule_entries(&state.pool, conference_id).await?;

    let mut ctx = Context::new();
    ctx.insert("conference_id", &conference_id);
    ctx.insert("session_id", &session_id);
    ctx.insert("eligible", &eligible);
    ctx.insert("entries", &entries);
    render("session_papers.html", &ctx)
}

#[derive(Deserialize)]
pub struct SessionPaperForm {
    pub paper_id: i64,
}

pub async fn assign_session_paper(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((conference_id, session_id)): Path<(i64, i64)>,
    Form(form): Form<SessionPaperForm>,
) -> Result<impl IntoResponse, ApiError> {
    require_organizer(&state.pool, user.user_id, conference_id).await?;
    let paper = Paper::find(&state.pool, form.paper_id).await?;
    if paper.conference_id != conference_id {
        return Err(ApiError::NotFound("Paper not found".into()));
    }
    SessionPaper::assign(&state.pool, session_id, form.paper_id).await?;
    Ok(Redirect::to(&format!(
        "/conferences/{conference_id}/organizer/sessions/{session_id}/papers"
    )))
}

/// Generated draft of the program, rendered fresh from the session and
/// assignment tables.
pub async fn schedule_preview(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(conference_id): Path<i64>,
) -> Result<Response, ApiError> {
    require_organizer(&state.pool, user.user_id, conference_id).await?;
    let conference = Conference::find(&state.pool, conference_id).await?;
    let entries = Session::schedule_entries(&state.pool, conference_id).await?;

    let filename = format!("schedule_preview_{conference_id}.pdf");
    let path = state.config.schedules_dir().join(&filename);
    crate::pdf::generate_schedule(&conference.title, &entries, &path)
        .map_err(ApiError::InternalError)?;

    attachment(&path, &filename)
}

/// Publishes the final schedule PDF uploaded by the organizer.
pub async fn publish_schedule(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(conference_id): Path<i64>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    require_organizer(&state.pool, user.user_id, conference_id).await?;

    let form = UploadForm::read(multipart).await?;
    let (original, data) = form.pdf()?;
    let filename = unique_filename("schedule", conference_id, original);
    save_bytes(&state.config.schedules_dir(), &filename, data)?;

    Conference::set_final_schedule(&state.pool, conference_id, &filename).await?;
    Ok(Redirect::to(&format!(
        "/conferences/{conference_id}/organizer"
    )))
}

pub async fn download_camera_ready(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((conference_id, paper_id)): Path<(i64, i64)>,
) -> Result<Response, ApiError> {
    require_organizer(&state.pool, user.user_id, conference_id).await?;
    let paper = Paper::find(&state.pool, paper_id).await?;
    if paper.conference_id != conference_id {
        return Err(ApiError::NotFound("Paper not found".into()));
    }
    let filename = paper
        .camera_ready_file
        .ok_or_else(|| ApiError::NotFound("No camera-ready file uploaded".into()))?;
    attachment(&state.config.camera_ready_dir().join(&filename), &filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participant_filter_accepts_attendee_kinds() {
        assert_eq!(
            participant_filter("all"),
            Some(vec![RoleKind::Participant, RoleKind::Author, RoleKind::Reviewer])
        );
        assert_eq!(participant_filter("author"), Some(vec![RoleKind::Author]));
        assert_eq!(
            participant_filter("participant"),
            Some(vec![RoleKind::Participant])
        );
        assert_eq!(participant_filter("reviewer"), Some(vec![RoleKind::Reviewer]));
    }

    #[test]
    fn participant_filter_refuses_management_and_garbage() {
        assert_eq!(participant_filter("organizer"), None);
        assert_eq!(participant_filter("admin"), None);
        assert_eq!(participant_filter("everyone"), None);
    }
}
