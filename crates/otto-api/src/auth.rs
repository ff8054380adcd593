//! Bearer-token middleware (spec §4.I: "absence or mismatch -> 401").

use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use otto_core::clock::Clock;
use serde_json::json;

use crate::state::AppState;

pub async fn require_bearer_token<C: Clock>(
    State(state): State<AppState<C>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    let provided = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match provided {
        Some(token) if token == state.token.as_ref() => next.run(request).await,
        _ => (StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized"}))).into_response(),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use otto_core::clock::FakeClock;
    use otto_gateway::FakeSessionController;
    use otto_storage::{AuditRepo, BindingsRepo, JobsRepo, OutboundRepo, ProfileRepo, RunSessionsRepo, Store};
    use std::sync::Arc;
    use tempfile::TempDir;

    pub fn test_state() -> (AppState<FakeClock>, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path()).unwrap());
        let state = AppState::new(
            Arc::new(JobsRepo::new(store.clone())),
            Arc::new(OutboundRepo::new(store.clone())),
            Arc::new(ProfileRepo::new(store.clone())),
            Arc::new(BindingsRepo::new(store.clone())),
            Arc::new(RunSessionsRepo::new(store.clone())),
            Arc::new(AuditRepo::new(store)),
            Arc::new(FakeSessionController::new()),
            FakeClock::default(),
            "secret-token",
            Some(777),
            dir.path().to_path_buf(),
        );
        (state, dir)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::test_state;
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use axum::routing::get;
    use axum::Router;
    use otto_core::clock::FakeClock;
    use tower::ServiceExt;

    fn app() -> Router {
        let (state, _dir) = test_state();
        Router::new()
            .route("/ping", get(|| async { "pong" }))
            .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_bearer_token::<FakeClock>))
            .with_state(state)
    }

    #[tokio::test]
    async fn missing_token_is_rejected() {
        let response = app().oneshot(HttpRequest::builder().uri("/ping").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_token_is_rejected() {
        let request = HttpRequest::builder().uri("/ping").header("Authorization", "Bearer nope").body(Body::empty()).unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn matching_token_is_accepted() {
        let request =
            HttpRequest::builder().uri("/ping").header("Authorization", "Bearer secret-token").body(Body::empty()).unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
