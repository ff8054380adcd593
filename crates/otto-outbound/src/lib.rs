//! Outbound delivery queue: drains queued chat messages through the
//! notification gate and a transport, with retry/backoff (spec §4.F).

mod config;
mod drain;

pub use config::{RetryConfig, ERROR_MESSAGE_TRUNCATE_LEN, TEXT_CHUNK_LIMIT};
pub use drain::{DrainOutcome, Drainer};
