//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod admin;
pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket lesson sessions at `/ws`
/// - Learner and admin API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    let api = Router::new()
        .route("/health", get(http::http_health))
        .route("/lessons/:id/challenges", get(http::http_get_lesson_challenges))
        .route("/render", post(http::http_post_render))
        .route("/sessions", post(http::http_post_session))
        .route("/sessions/:id", get(http::http_get_session).delete(http::http_delete_session))
        .route("/sessions/:id/action", post(http::http_post_session_action))
        .route("/sessions/:id/click", post(http::http_post_session_click))
        .route("/sessions/:id/submit", post(http::http_post_session_submit))
        .route("/sessions/:id/continue", post(http::http_post_session_continue))
        .route("/users/:user_id/progress", get(http::http_get_user_progress))
        .merge(admin::admin_routes());

    Router::new()
        .route("/ws", get(ws::ws_upgrade))
        .nest("/api/v1", api)
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .fallback_service(static_service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, Response, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::domain::{ChallengeType, Id};
    use crate::seeds::seed_bank;
    use crate::store::Store;

    fn seeded() -> Store {
        let mut store = Store::default();
        seed_bank().load_into(&mut store).unwrap();
        store
    }

    fn app(store: Store) -> Router {
        build_router(Arc::new(AppState::with_store(store)))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Response<Body> {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(v) => builder
                .header("content-type", "application/json")
                .body(Body::from(v.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        app.clone().oneshot(request).await.unwrap()
    }

    async fn json_of(response: Response<Body>) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// (challenge id, correct option id) of the first challenge of `kind` in lesson 1.
    fn first_of(store: &Store, kind: ChallengeType) -> (Id, Option<Id>) {
        let bundle = store
            .lesson_challenges(1)
            .unwrap()
            .into_iter()
            .find(|b| b.challenge.kind == kind)
            .unwrap();
        (bundle.challenge.id, bundle.options.iter().find(|o| o.correct).map(|o| o.id))
    }

    #[tokio::test]
    async fn health_ok() {
        let app = app(Store::default());
        let response = call(&app, "GET", "/api/v1/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_of(response).await, json!({ "ok": true }));
    }

    #[tokio::test]
    async fn admin_list_counts_and_filters_by_parent() {
        let app = app(seeded());

        let response = call(&app, "GET", "/api/v1/courses", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-total-count"], "1");

        let lessons = json_of(call(&app, "GET", "/api/v1/lessons?parentId=1", None).await).await;
        assert_eq!(lessons.as_array().unwrap().len(), 2);
        let none = json_of(call(&app, "GET", "/api/v1/lessons?parentId=42", None).await).await;
        assert!(none.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn admin_rejects_unknown_type_and_duplicate_order() {
        let app = app(seeded());

        let unknown = json!({ "lessonId": 1, "type": "TRUE_FALSE", "question": "q", "order": 99 });
        let response = call(&app, "POST", "/api/v1/challenges", Some(unknown)).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let duplicate = json!({ "lessonId": 1, "type": "SELECT", "question": "q", "order": 1 });
        let response = call(&app, "POST", "/api/v1/challenges", Some(duplicate)).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(json_of(response).await["error"], "conflict");

        let fresh = json!({ "lessonId": 1, "type": "SELECT", "question": "q", "order": 99 });
        let response = call(&app, "POST", "/api/v1/challenges", Some(fresh)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(json_of(response).await["id"].as_u64().unwrap() > 0);
    }

    #[tokio::test]
    async fn deleting_a_course_cascades_to_its_lessons() {
        let app = app(seeded());
        let response = call(&app, "DELETE", "/api/v1/courses/1", None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = call(&app, "GET", "/api/v1/lessons/1", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = call(&app, "GET", "/api/v1/lessons/1/challenges", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = call(&app, "GET", "/api/v1/challenge-options", None).await;
        assert_eq!(response.headers()["x-total-count"], "0");
    }

    #[tokio::test]
    async fn lesson_challenges_are_ordered_with_material() {
        let app = app(seeded());
        let lesson = json_of(call(&app, "GET", "/api/v1/lessons/1/challenges", None).await).await;
        let types: Vec<&str> = lesson["challenges"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["type"].as_str().unwrap())
            .collect();
        assert_eq!(types, ["VOCAB_INTRO", "SELECT", "FILL_BLANK", "MATCHING", "ASSIST", "ARRANGE"]);
        assert_eq!(lesson["challenges"][3]["matchingPairs"].as_array().unwrap().len(), 3);
        assert!(lesson["warnings"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn render_endpoint_dispatches_and_falls_back() {
        let app = app(Store::default());
        let options = json!([
            { "id": 1, "text": "ᯇᯉᯰᯰ", "correct": true },
            { "id": 2, "text": "ᯎᯒ", "correct": false },
        ]);

        let body = json!({ "type": "SELECT", "question": "Yang mana?", "options": options, "selectedOption": 0 });
        let view = json_of(call(&app, "POST", "/api/v1/render", Some(body)).await).await;
        assert_eq!(view["layout"], "select");
        assert_eq!(view["complete"], false);

        let body = json!({ "type": "TRUE_FALSE", "question": "?", "options": options, "selectedOption": 2 });
        let view = json_of(call(&app, "POST", "/api/v1/render", Some(body)).await).await;
        assert_eq!(view["type"], "TRUE_FALSE");
        assert_eq!(view["layout"], "fallback");
    }

    #[tokio::test]
    async fn http_session_walks_through_a_lesson() {
        let store = seeded();
        let (select_id, select_correct) = first_of(&store, ChallengeType::Select);
        let app = app(store);

        let response = call(&app, "POST", "/api/v1/sessions", Some(json!({ "lessonId": 1, "userId": "u1" }))).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let snap = json_of(response).await;
        let id = snap["sessionId"].as_str().unwrap().to_string();
        assert_eq!(snap["view"]["type"], "VOCAB_INTRO");
        assert_eq!(snap["total"], 6);

        // Vocabulary cards need no answer.
        let snap = json_of(call(&app, "POST", &format!("/api/v1/sessions/{}/continue", id), None).await).await;
        assert_eq!(snap["challengeId"], select_id);
        assert_eq!(snap["state"], "presenting");

        // A graded challenge cannot be skipped or submitted empty.
        let response = call(&app, "POST", &format!("/api/v1/sessions/{}/continue", id), None).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let response = call(&app, "POST", &format!("/api/v1/sessions/{}/submit", id), None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let action = json!({ "kind": "select", "optionId": select_correct.unwrap() });
        let snap = json_of(call(&app, "POST", &format!("/api/v1/sessions/{}/action", id), Some(action)).await).await;
        assert_eq!(snap["state"], "selecting");

        let out = json_of(call(&app, "POST", &format!("/api/v1/sessions/{}/submit", id), None).await).await;
        assert_eq!(out["outcome"]["correct"], true);
        assert_eq!(out["session"]["view"]["status"], "correct");

        let progress = json_of(call(&app, "GET", "/api/v1/users/u1/progress", None).await).await;
        assert_eq!(progress["completedChallengeIds"].as_array().unwrap().len(), 2);
        assert_eq!(progress["profile"]["activeCourseId"], 1);
        assert_eq!(progress["profile"]["hearts"], 5);
    }

    #[tokio::test]
    async fn click_wrong_then_retry() {
        let store = seeded();
        let bundle = store.lesson_challenges(1).unwrap().remove(1);
        let wrong = bundle.options.iter().find(|o| !o.correct).unwrap().id;
        let app = app(store);

        let snap = json_of(call(&app, "POST", "/api/v1/sessions", Some(json!({ "lessonId": 1 }))).await).await;
        let id = snap["sessionId"].as_str().unwrap().to_string();
        call(&app, "POST", &format!("/api/v1/sessions/{}/continue", id), None).await;

        let click = json!({ "target": { "element": "card", "id": wrong } });
        let response = call(&app, "POST", &format!("/api/v1/sessions/{}/click", id), Some(click)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let out = json_of(call(&app, "POST", &format!("/api/v1/sessions/{}/submit", id), None).await).await;
        assert_eq!(out["outcome"]["correct"], false);

        let snap = json_of(call(&app, "POST", &format!("/api/v1/sessions/{}/continue", id), None).await).await;
        assert_eq!(snap["state"], "presenting");
        assert_eq!(snap["challengeId"], bundle.challenge.id);

        let progress = json_of(call(&app, "GET", "/api/v1/users/anonymous/progress", None).await).await;
        assert_eq!(progress["completedChallengeIds"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn abandoned_session_can_be_deleted() {
        let app = app(seeded());
        let snap = json_of(call(&app, "POST", "/api/v1/sessions", Some(json!({ "lessonId": 1 }))).await).await;
        let uri = format!("/api/v1/sessions/{}", snap["sessionId"].as_str().unwrap());

        let response = call(&app, "DELETE", &uri, None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(call(&app, "GET", &uri, None).await.status(), StatusCode::NOT_FOUND);
        assert_eq!(call(&app, "DELETE", &uri, None).await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn idle_sessions_expire_when_the_next_one_starts() {
        let state = AppState::with_store(seeded()).with_idle_timeout(std::time::Duration::ZERO);
        let app = build_router(Arc::new(state));
        let first = json_of(call(&app, "POST", "/api/v1/sessions", Some(json!({ "lessonId": 1 }))).await).await;
        let uri = format!("/api/v1/sessions/{}", first["sessionId"].as_str().unwrap());

        let response = call(&app, "POST", "/api/v1/sessions", Some(json!({ "lessonId": 2 }))).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(call(&app, "GET", &uri, None).await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_session_and_lesson_are_not_found() {
        let app = app(seeded());
        let response = call(&app, "GET", &format!("/api/v1/sessions/{}", uuid::Uuid::new_v4()), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = call(&app, "POST", "/api/v1/sessions", Some(json!({ "lessonId": 404 }))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_of(response).await["error"], "not_found");
    }
}
