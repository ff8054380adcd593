//! Shared error taxonomy (spec §7).
//!
//! A single enum flows from the storage layer up through the engine to the
//! control-plane API, so the HTTP mapping in `otto-api` has one place to
//! read the stable error code from instead of re-deriving it per layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OttoError {
    #[error("invalid_request: {0}")]
    InvalidRequest(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("lane_forbidden")]
    LaneForbidden,
    #[error("forbidden_mutation")]
    ForbiddenMutation,
    #[error("not_found")]
    NotFound,
    #[error("state_conflict: {0}")]
    StateConflict(String),
    #[error("missing_chat")]
    MissingChat,
    #[error("invalid_file_path: {0}")]
    InvalidFilePath(String),
    #[error("file_too_large")]
    FileTooLarge,
    #[error("internal_error: {0}")]
    Internal(String),
}

impl OttoError {
    /// The stable error-kind string used in HTTP bodies and audit rows.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::Unauthorized => "unauthorized",
            Self::LaneForbidden => "lane_forbidden",
            Self::ForbiddenMutation => "forbidden_mutation",
            Self::NotFound => "not_found",
            Self::StateConflict(_) => "state_conflict",
            Self::MissingChat => "missing_chat",
            Self::InvalidFilePath(_) => "invalid_file_path",
            Self::FileTooLarge => "file_too_large",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn detail(&self) -> Option<String> {
        match self {
            Self::InvalidRequest(d)
            | Self::StateConflict(d)
            | Self::InvalidFilePath(d)
            | Self::Internal(d) => Some(d.clone()),
            _ => None,
        }
    }
}

pub type OttoResult<T> = Result<T, OttoError>;

/// Stable `errorCode` strings used inside [`crate::run::RunStatus`] records,
/// distinct from [`OttoError::code`] because a run's error originates from
/// agent output, not from a control-plane call.
pub mod run_error_code {
    pub const INVALID_TASK_PAYLOAD: &str = "invalid_task_payload";
    pub const INVALID_WATCHDOG_PAYLOAD: &str = "invalid_watchdog_payload";
    pub const INVALID_RESULT_JSON: &str = "invalid_result_json";
    pub const INVALID_RESULT_SCHEMA: &str = "invalid_result_schema";
    pub const TASK_EXECUTION_ERROR: &str = "task_execution_error";
    pub const WATCHDOG_NOTIFICATION_UNAVAILABLE: &str = "watchdog_notification_unavailable";
    pub const TASK_ERROR: &str = "task_error";
    pub const TASK_FAILED: &str = "task_failed";
}
