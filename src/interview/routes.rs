//! REST endpoints for interview sessions.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tracing::warn;
use uuid::Uuid;

use super::session::SessionStore;
use crate::error::{Error, SessionError};

/// Shared state for interview routes.
#[derive(Clone)]
pub struct InterviewRouteState {
    pub store: Arc<SessionStore>,
}

/// Body of `POST /interview/{id}/respond`.
#[derive(Debug, Deserialize)]
pub struct UserInput {
    pub message: String,
}

/// Build the interview REST routes.
pub fn interview_routes(store: Arc<SessionStore>) -> Router {
    let state = InterviewRouteState { store };

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/interview/start", post(start_interview))
        .route("/interview/{id}/respond", post(respond))
        .route("/interview/{id}/advance", post(advance))
        .route("/interview/{id}/state", get(get_state).patch(patch_state))
        .route("/interview/{id}/report", get(get_report))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root() -> impl IntoResponse {
    Json(json!({"message": "User Profiling System API"}))
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "interview-orchestrator"
    }))
}

/// POST /interview/start
///
/// Creates a session, runs the coordinator's opening turn, and returns the
/// greeting together with the new session id.
async fn start_interview(State(state): State<InterviewRouteState>) -> Response {
    match state.store.start().await {
        Ok(response) => Json(response).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /interview/{id}/respond
async fn respond(
    State(state): State<InterviewRouteState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UserInput>,
) -> Response {
    match state.store.respond(id, &input.message).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => error_response(e.into()),
    }
}

/// POST /interview/{id}/advance
///
/// Runs one step with no new user input.
async fn advance(State(state): State<InterviewRouteState>, Path(id): Path<Uuid>) -> Response {
    match state.store.advance(id).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => error_response(e.into()),
    }
}

/// GET /interview/{id}/state
async fn get_state(State(state): State<InterviewRouteState>, Path(id): Path<Uuid>) -> Response {
    match state.store.state(id).await {
        Ok(interview) => Json(interview.to_value()).into_response(),
        Err(e) => error_response(e.into()),
    }
}

/// PATCH /interview/{id}/state
///
/// Merges a raw patch. An unrecognized phase is rejected with 400.
async fn patch_state(
    State(state): State<InterviewRouteState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<Value>,
) -> Response {
    match state.store.merge_patch(id, &patch).await {
        Ok(interview) => Json(interview.to_value()).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /interview/{id}/report
///
/// Returns the final report, or 400 if the interview is not complete.
async fn get_report(State(state): State<InterviewRouteState>, Path(id): Path<Uuid>) -> Response {
    match state.store.report(id).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => error_response(e.into()),
    }
}

fn error_response(err: Error) -> Response {
    let status = match &err {
        Error::Session(SessionError::NotFound { .. }) => StatusCode::NOT_FOUND,
        Error::Session(SessionError::NotComplete { .. }) | Error::State(_) => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        warn!(error = %err, "Interview request failed");
    }
    (status, Json(json!({"error": err.to_string()}))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    fn app() -> Router {
        interview_routes(SessionStore::new(true).unwrap())
    }

    #[tokio::test]
    async fn root_and_health() {
        let (status, body) = send(app(), "GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "User Profiling System API");

        let (status, body) = send(app(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn start_returns_session_and_phase() {
        let (status, body) = send(app(), "POST", "/interview/start", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["session_id"].as_str().is_some());
        assert_eq!(body["phase"], "learning_style");
        assert_eq!(body["completed_phases"], json!(["initial"]));
        assert_eq!(body["next"], json!({"kind": "phase", "phase": "learning_style"}));
    }

    #[tokio::test]
    async fn unknown_session_is_404() {
        let uri = format!("/interview/{}/respond", Uuid::new_v4());
        let (status, body) = send(app(), "POST", &uri, Some(json!({"message": "hi"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn report_before_completion_is_400() {
        let store = SessionStore::new(true).unwrap();
        let id = store.start().await.unwrap().session_id;
        let app = interview_routes(store);

        let (status, _) = send(app, "GET", &format!("/interview/{id}/report"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn invalid_phase_patch_is_400() {
        let store = SessionStore::new(true).unwrap();
        let id = store.start().await.unwrap().session_id;
        let app = interview_routes(store);

        let (status, body) = send(
            app.clone(),
            "PATCH",
            &format!("/interview/{id}/state"),
            Some(json!({"current_phase": "not_a_phase"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("not_a_phase"));

        let (status, body) = send(app, "GET", &format!("/interview/{id}/state"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["current_phase"], "learning_style");
    }
}
