//! Outbound delivery records (spec §3 "OutboundMessage").

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for an outbound message.
    pub struct OutboundId("out-");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboundKind {
    Text,
    Document,
    Photo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
    Critical,
}

impl Priority {
    /// Maps to the urgency tier the notification policy reasons about
    /// (spec §4.F step 5: `high`/`critical` priority collapses to `critical`
    /// urgency for the purpose of the quiet-hours gate).
    pub fn urgency(self) -> Urgency {
        match self {
            Priority::High | Priority::Critical => Urgency::Critical,
            Priority::Low | Priority::Normal => Urgency::Normal,
        }
    }
}

/// Urgency tier consumed by [the notification policy](../../otto_policy/index.html).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Normal,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboundStatus {
    Queued,
    Sent,
    Failed,
}

/// Prefix recognizable on `error_message` of a record most recently blocked
/// by notification policy rather than by a transport failure (spec GLOSSARY
/// "Suppressed").
pub const SUPPRESSED_BY_POLICY_PREFIX: &str = "suppressed_by_policy:";

pub fn suppressed_reason(error_message: &str) -> Option<&str> {
    error_message.strip_prefix(SUPPRESSED_BY_POLICY_PREFIX)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub id: OutboundId,
    pub chat_id: i64,
    pub kind: OutboundKind,
    pub content: String,
    pub media_path: Option<String>,
    pub media_mime_type: Option<String>,
    pub media_filename: Option<String>,
    pub priority: Priority,
    pub dedupe_key: Option<String>,
    pub status: OutboundStatus,
    pub attempt_count: u32,
    pub next_attempt_at: i64,
    pub sent_at: Option<i64>,
    pub failed_at: Option<i64>,
    pub error_message: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl OutboundMessage {
    /// True iff the media fields required for non-text kinds are present.
    pub fn has_required_media(&self) -> bool {
        match self.kind {
            OutboundKind::Text => true,
            OutboundKind::Document | OutboundKind::Photo => self.media_path.is_some(),
        }
    }

    pub fn is_due_at(&self, t: i64) -> bool {
        self.status == OutboundStatus::Queued && self.next_attempt_at <= t
    }

    pub fn is_suppressed(&self) -> bool {
        self.error_message
            .as_deref()
            .map(suppressed_reason)
            .is_some_and(|r| r.is_some())
    }
}

#[derive(Debug, Clone)]
pub struct NewOutboundMessage {
    pub chat_id: i64,
    pub kind: OutboundKind,
    pub content: String,
    pub media_path: Option<String>,
    pub media_mime_type: Option<String>,
    pub media_filename: Option<String>,
    pub priority: Priority,
    pub dedupe_key: Option<String>,
}

impl NewOutboundMessage {
    pub fn text(chat_id: i64, content: impl Into<String>) -> Self {
        Self {
            chat_id,
            kind: OutboundKind::Text,
            content: content.into(),
            media_path: None,
            media_mime_type: None,
            media_filename: None,
            priority: Priority::Normal,
            dedupe_key: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_dedupe_key(mut self, key: impl Into<String>) -> Self {
        self.dedupe_key = Some(key.into());
        self
    }

    pub fn into_record(self, id: OutboundId, now: i64) -> OutboundMessage {
        OutboundMessage {
            id,
            chat_id: self.chat_id,
            kind: self.kind,
            content: self.content,
            media_path: self.media_path,
            media_mime_type: self.media_mime_type,
            media_filename: self.media_filename,
            priority: self.priority,
            dedupe_key: self.dedupe_key,
            status: OutboundStatus::Queued,
            attempt_count: 0,
            next_attempt_at: now,
            sent_at: None,
            failed_at: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Compute the capped exponential backoff delay for attempt number `n` (the
/// attempt that is *about* to run, i.e. 1-indexed) in milliseconds.
pub fn retry_delay_ms(n: u32, base_delay_ms: i64, max_delay_ms: i64) -> i64 {
    let exp = n.saturating_sub(1).min(32);
    let scaled = base_delay_ms.saturating_mul(1i64 << exp.min(62));
    scaled.min(max_delay_ms)
}
