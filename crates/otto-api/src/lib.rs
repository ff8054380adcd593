//! Control-plane HTTP surface: the one interface Otto exposes to the
//! assistant session that is driving it (spec §4.I). Every route requires a
//! bearer token and writes exactly one `CommandAudit` row.

pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod resolve;
pub mod staging;
pub mod state;
pub mod token;

use axum::routing::post;
use axum::Router;
use otto_core::clock::Clock;
use tower_http::trace::TraceLayer;

pub use config::{ApiConfig, ApiConfigError};
pub use state::AppState;

pub fn build_router<C: Clock>(state: AppState<C>) -> Router {
    Router::new()
        .route("/internal/tools/queue-telegram-message", post(handlers::messages::queue_telegram_message))
        .route("/internal/tools/queue-telegram-file", post(handlers::messages::queue_telegram_file))
        .route("/internal/tools/tasks/create", post(handlers::tasks::tasks_create))
        .route("/internal/tools/tasks/update", post(handlers::tasks::tasks_update))
        .route("/internal/tools/tasks/delete", post(handlers::tasks::tasks_delete))
        .route("/internal/tools/tasks/list", post(handlers::tasks::tasks_list))
        .route("/internal/tools/tasks/failures/check", post(handlers::tasks::tasks_failures_check))
        .route("/internal/tools/tasks/audit/list", post(handlers::audit::tasks_audit_list))
        .route("/internal/tools/notification-profile/get", post(handlers::profile::notification_profile_get))
        .route("/internal/tools/notification-profile/set", post(handlers::profile::notification_profile_set))
        .route("/internal/tools/background-jobs/spawn", post(handlers::background::background_jobs_spawn))
        .route("/internal/tools/background-jobs/list", post(handlers::background::background_jobs_list))
        .route("/internal/tools/background-jobs/show", post(handlers::background::background_jobs_show))
        .route("/internal/tools/background-jobs/cancel", post(handlers::background::background_jobs_cancel))
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), auth::require_bearer_token::<C>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
