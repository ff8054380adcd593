//! Shared chat-id resolution (spec §4.I: tasks/failures/check "mirrors the
//! message endpoint" for chatId resolution).

use otto_core::clock::Clock;
use otto_core::OttoError;

use crate::state::AppState;

pub fn resolve_chat_id<C: Clock>(
    state: &AppState<C>,
    chat_id: Option<i64>,
    session_id: Option<&str>,
) -> Result<i64, OttoError> {
    chat_id
        .or_else(|| session_id.and_then(|sid| state.bindings.get_telegram_chat_id_by_session_id(sid)))
        .or(state.default_chat_id)
        .ok_or(OttoError::MissingChat)
}
