//! `queue-telegram-message` / `queue-telegram-file` (spec §4.I).

use axum::extract::State;
use otto_core::clock::Clock;
use otto_core::{NewOutboundMessage, OttoError, OutboundId, OutboundKind, Priority};
use otto_storage::EnqueueOutcome;
use serde::{Deserialize, Serialize};

use crate::audit;
use crate::error::ApiResult;
use crate::resolve::resolve_chat_id;
use crate::staging::stage_outbound_file;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueTelegramMessageRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub chat_id: Option<i64>,
    pub content: String,
    #[serde(default)]
    pub dedupe_key: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Document,
    Photo,
}

impl From<FileKind> for OutboundKind {
    fn from(kind: FileKind) -> Self {
        match kind {
            FileKind::Document => OutboundKind::Document,
            FileKind::Photo => OutboundKind::Photo,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueTelegramFileRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub chat_id: Option<i64>,
    #[serde(default)]
    pub dedupe_key: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    pub kind: FileKind,
    pub file_path: String,
    pub mime_type: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueTelegramMessageResponse {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

pub async fn queue_telegram_message<C: Clock>(
    State(state): State<AppState<C>>,
    axum::Json(req): axum::Json<QueueTelegramMessageRequest>,
) -> ApiResult<axum::Json<QueueTelegramMessageResponse>> {
    let now = state.now();
    let chat_id = match resolve_chat_id(&state, req.chat_id, req.session_id.as_deref()) {
        Ok(chat_id) => chat_id,
        Err(e) => return audit::finish(&state, "queue-telegram-message", None, None, Err(e)),
    };

    let new_message = NewOutboundMessage::text(chat_id, req.content)
        .with_priority(req.priority.unwrap_or(Priority::Normal));
    let new_message = match req.dedupe_key {
        Some(key) => new_message.with_dedupe_key(key),
        None => new_message,
    };

    let result = state
        .outbound
        .enqueue_or_ignore_dedupe(new_message, now)
        .map_err(OttoError::from)
        .map(|(outcome, record)| QueueTelegramMessageResponse {
            outcome: match outcome {
                EnqueueOutcome::Enqueued => "enqueued",
                EnqueueOutcome::Duplicate => "duplicate",
            },
            message_id: record.map(|r| r.id.to_string()),
        });

    audit::finish(&state, "queue-telegram-message", None, None, result)
}

pub async fn queue_telegram_file<C: Clock>(
    State(state): State<AppState<C>>,
    axum::Json(req): axum::Json<QueueTelegramFileRequest>,
) -> ApiResult<axum::Json<QueueTelegramMessageResponse>> {
    let now = state.now();
    let chat_id = match resolve_chat_id(&state, req.chat_id, req.session_id.as_deref()) {
        Ok(chat_id) => chat_id,
        Err(e) => return audit::finish(&state, "queue-telegram-file", None, None, Err(e)),
    };

    let staged_id = OutboundId::new();
    let staged_path = match stage_outbound_file(&state.otto_home, &req.file_path, staged_id.as_str(), req.file_name.as_deref()).await
    {
        Ok(path) => path,
        Err(e) => return audit::finish(&state, "queue-telegram-file", None, None, Err(e)),
    };

    let new_message = NewOutboundMessage {
        chat_id,
        kind: req.kind.into(),
        content: req.caption.unwrap_or_default(),
        media_path: Some(staged_path.to_string_lossy().into_owned()),
        media_mime_type: Some(req.mime_type),
        media_filename: req.file_name,
        priority: req.priority.unwrap_or(Priority::Normal),
        dedupe_key: req.dedupe_key,
    };

    let result = state
        .outbound
        .enqueue_or_ignore_dedupe(new_message, now)
        .map_err(OttoError::from)
        .map(|(outcome, record)| QueueTelegramMessageResponse {
            outcome: match outcome {
                EnqueueOutcome::Enqueued => "enqueued",
                EnqueueOutcome::Duplicate => "duplicate",
            },
            message_id: record.map(|r| r.id.to_string()),
        });

    audit::finish(&state, "queue-telegram-file", None, None, result)
}
