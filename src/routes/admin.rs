//! Admin CRUD over every content table. One set of generic handlers serves all
//! tables through the `Record` trait; list responses carry `x-total-count` for
//! react-admin style clients.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use crate::domain::*;
use crate::error::AppError;
use crate::protocol::ListQuery;
use crate::state::AppState;
use crate::store::Record;

/// `/courses`, `/units`, ... each with list/create on the collection and get/put/delete on `/:id`.
pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(resource::<Course>("/courses"))
        .merge(resource::<Unit>("/units"))
        .merge(resource::<Lesson>("/lessons"))
        .merge(resource::<Challenge>("/challenges"))
        .merge(resource::<ChallengeOption>("/challenge-options"))
        .merge(resource::<MatchingPair>("/matching-pairs"))
        .merge(resource::<Word>("/words"))
        .merge(resource::<Phrase>("/phrases"))
        .merge(resource::<StopWord>("/stop-words"))
        .merge(resource::<UserSubscription>("/user-subscriptions"))
}

fn resource<T: Record>(path: &str) -> Router<Arc<AppState>> {
    Router::new()
        .route(path, get(list::<T>).post(create::<T>))
        .route(&format!("{}/:id", path), get(fetch::<T>).put(update::<T>).delete(remove::<T>))
}

#[instrument(level = "info", skip(state), fields(table = T::TABLE, parent = ?q.parent_id))]
async fn list<T: Record>(State(state): State<Arc<AppState>>, Query(q): Query<ListQuery>) -> impl IntoResponse {
    let rows = state.store.read().await.list::<T>(q.parent_id);
    ([("x-total-count", rows.len().to_string())], Json(rows))
}

#[instrument(level = "info", skip(state), fields(table = T::TABLE))]
async fn fetch<T: Record>(State(state): State<Arc<AppState>>, Path(id): Path<Id>) -> Result<Json<T>, AppError> {
    state.store.read().await.get::<T>(id).map(Json)
}

#[instrument(level = "info", skip(state, body), fields(table = T::TABLE))]
async fn create<T: Record>(
    State(state): State<Arc<AppState>>,
    Json(body): Json<T>,
) -> Result<(StatusCode, Json<T>), AppError> {
    let row = state.store.write().await.create(body)?;
    info!(target: "content", table = T::TABLE, id = row.id(), "Admin created row");
    Ok((StatusCode::CREATED, Json(row)))
}

#[instrument(level = "info", skip(state, body), fields(table = T::TABLE))]
async fn update<T: Record>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Id>,
    Json(body): Json<T>,
) -> Result<Json<T>, AppError> {
    state.store.write().await.update(id, body).map(Json)
}

#[instrument(level = "info", skip(state), fields(table = T::TABLE))]
async fn remove<T: Record>(State(state): State<Arc<AppState>>, Path(id): Path<Id>) -> Result<StatusCode, AppError> {
    state.store.write().await.delete::<T>(id)?;
    Ok(StatusCode::NO_CONTENT)
}
