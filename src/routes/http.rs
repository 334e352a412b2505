//! HTTP endpoint handlers. These are thin wrappers that forward to the store,
//! the renderer and the session registry. Each handler is instrumented.

use std::sync::Arc;
use axum::{extract::{Path, State}, http::StatusCode, Json, response::IntoResponse};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::{Id, Lesson};
use crate::error::AppError;
use crate::protocol::*;
use crate::render::{render, Action, ChallengeView, Exercise};
use crate::session::SessionSnapshot;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

/// Lesson with its ordered challenges and any authoring warnings.
#[instrument(level = "info", skip(state))]
pub async fn http_get_lesson_challenges(
  State(state): State<Arc<AppState>>,
  Path(lesson_id): Path<Id>,
) -> Result<Json<LessonOut>, AppError> {
  let store = state.store.read().await;
  let lesson = store.get::<Lesson>(lesson_id)?;
  let challenges = store.lesson_challenges(lesson_id)?;
  let warnings = store.validate_lesson(lesson_id)?;
  Ok(Json(LessonOut { lesson, challenges, warnings }))
}

/// Stateless dispatch: the caller supplies the challenge and its interaction state.
#[instrument(level = "info", skip(body), fields(tag = %body.tag, options = body.options.len(), pairs = body.matching_pairs.len()))]
pub async fn http_post_render(Json(body): Json<RenderIn>) -> Json<ChallengeView> {
  let exercise = Exercise::from_tag(&body.tag, &body.options, &body.matching_pairs, &body.selection);
  Json(render(&body.question, &exercise, body.status, body.disabled))
}

#[instrument(level = "info", skip(state, body), fields(lesson_id = body.lesson_id, user_id = %body.user_id))]
pub async fn http_post_session(
  State(state): State<Arc<AppState>>,
  Json(body): Json<StartSessionIn>,
) -> Result<(StatusCode, Json<SessionSnapshot>), AppError> {
  let snapshot = state.start_session(body.lesson_id, &body.user_id).await?;
  info!(target: "session", id = %snapshot.session_id, "HTTP session started");
  Ok((StatusCode::CREATED, Json(snapshot)))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_session(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
  state.session_snapshot(id).await.map(Json)
}

/// Abandon a session; its selection state is discarded.
#[instrument(level = "info", skip(state))]
pub async fn http_delete_session(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
  state.end_session(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_session_action(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
  Json(action): Json<Action>,
) -> Result<Json<SessionSnapshot>, AppError> {
  state.session_action(id, action).await.map(Json)
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_session_click(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ClickIn>,
) -> Result<Json<SessionSnapshot>, AppError> {
  state.session_click(id, body.target).await.map(Json)
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_session_submit(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
) -> Result<Json<SubmitOut>, AppError> {
  let (outcome, session) = state.session_submit(id).await?;
  info!(target: "session", %id, challenge_id = outcome.challenge_id, correct = outcome.correct, "HTTP submission judged");
  Ok(Json(SubmitOut { outcome, session }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_session_continue(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
  state.session_continue(id).await.map(Json)
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_user_progress(
  State(state): State<Arc<AppState>>,
  Path(user_id): Path<String>,
) -> Json<ProgressOut> {
  let store = state.store.read().await;
  Json(ProgressOut {
    profile: store.users.get(&user_id).cloned(),
    completed_challenge_ids: store.completed_challenges(&user_id),
  })
}
