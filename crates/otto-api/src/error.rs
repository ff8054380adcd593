//! HTTP error mapping (spec §4.I, §7). `OttoError` already carries the
//! stable error-kind string; this module is the thin axum boundary that
//! turns it into a status code and JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use otto_core::OttoError;
use serde::Serialize;

pub struct ApiError(pub OttoError);

impl From<OttoError> for ApiError {
    fn from(e: OttoError) -> Self {
        Self(e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.code() {
            "invalid_request" | "missing_chat" | "invalid_file_path" | "file_too_large" => StatusCode::BAD_REQUEST,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "lane_forbidden" | "forbidden_mutation" => StatusCode::FORBIDDEN,
            "not_found" => StatusCode::NOT_FOUND,
            "state_conflict" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "internal_error");
            let body = ErrorBody { error: "internal_error", detail: None };
            return (status, Json(body)).into_response();
        }
        let body = ErrorBody { error: self.0.code(), detail: self.0.detail() };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
