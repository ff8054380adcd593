//! Retry policy configuration (spec §4.F).

/// The per-message text chunk size enforced by the intended chat transport.
pub const TEXT_CHUNK_LIMIT: usize = 4096;

/// Cap applied to a delivery error message before it is persisted.
pub const ERROR_MESSAGE_TRUNCATE_LEN: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: i64,
    pub max_delay_ms: i64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 5, base_delay_ms: 2_000, max_delay_ms: 15 * 60_000 }
    }
}
