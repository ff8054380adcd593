//! Typed shapes for the dynamic JSON a job carries as `payload` and the
//! structured result an agent session returns (spec §9 "dynamic payloads").

use serde::{Deserialize, Serialize};

fn default_lookback_minutes() -> u32 {
    120
}
fn default_threshold() -> u32 {
    3
}
fn default_max_failures() -> u32 {
    50
}
fn default_notify() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchdogPayload {
    #[serde(default = "default_lookback_minutes")]
    pub lookback_minutes: u32,
    #[serde(default = "default_threshold")]
    pub threshold: u32,
    #[serde(default = "default_max_failures")]
    pub max_failures: u32,
    #[serde(default = "default_notify")]
    pub notify: bool,
    #[serde(default)]
    pub chat_id: Option<i64>,
}

impl Default for WatchdogPayload {
    fn default() -> Self {
        Self {
            lookback_minutes: default_lookback_minutes(),
            threshold: default_threshold(),
            max_failures: default_max_failures(),
            notify: default_notify(),
            chat_id: None,
        }
    }
}

impl WatchdogPayload {
    /// Parse and clamp against the valid ranges from spec §4.E; out-of-range
    /// values fall back to the default rather than failing the job.
    pub fn parse(raw: Option<&str>) -> Self {
        let mut parsed: Self = raw.and_then(|s| serde_json::from_str(s).ok()).unwrap_or_default();
        if !(5..=1440).contains(&parsed.lookback_minutes) {
            parsed.lookback_minutes = default_lookback_minutes();
        }
        if !(1..=50).contains(&parsed.threshold) {
            parsed.threshold = default_threshold();
        }
        if !(1..=200).contains(&parsed.max_failures) {
            parsed.max_failures = default_max_failures();
        }
        parsed
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InteractiveBackgroundSource {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub chat_id: Option<i64>,
    #[serde(default)]
    pub source_message_id: Option<String>,
    #[serde(default)]
    pub surface: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractiveBackgroundRequest {
    pub text: String,
    pub requested_at: i64,
    #[serde(default)]
    pub rationale: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractiveBackgroundPayload {
    pub version: u32,
    #[serde(default)]
    pub source: InteractiveBackgroundSource,
    pub request: InteractiveBackgroundRequest,
}

#[derive(Debug, thiserror::Error)]
#[error("invalid interactive background payload: {0}")]
pub struct InvalidPayload(pub String);

impl InteractiveBackgroundPayload {
    pub fn parse(raw: Option<&str>) -> Result<Self, InvalidPayload> {
        let raw = raw.ok_or_else(|| InvalidPayload("payload is required".into()))?;
        serde_json::from_str(raw).map_err(|e| InvalidPayload(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Success,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultError {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredResult {
    pub status: ResultStatus,
    pub summary: String,
    #[serde(default)]
    pub errors: Vec<ResultError>,
    /// Present only when the agent's output could not be parsed cleanly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}
