//! Parses the agent's free-text response into a [`StructuredResult`]
//! (spec §4.E "Structured-result parsing").

use serde_json::Value;

use crate::payload::{ResultError, ResultStatus, StructuredResult};

pub enum ParsedResult {
    Ok(StructuredResult),
    InvalidJson { raw_output: String },
    InvalidSchema { raw_output: String },
    /// The gateway itself failed before returning any agent output (the
    /// session never ran), as opposed to the agent returning unparsable text.
    GatewayFailed { message: String },
}

pub fn parse_structured_result(raw: &str) -> ParsedResult {
    let trimmed = raw.trim();
    let value = serde_json::from_str::<Value>(trimmed)
        .ok()
        .or_else(|| extract_fenced_json(trimmed).and_then(|s| serde_json::from_str::<Value>(s).ok()));

    let Some(value) = value else {
        return ParsedResult::InvalidJson { raw_output: raw.to_string() };
    };

    match normalize_and_validate(value) {
        Some(result) => ParsedResult::Ok(result),
        None => ParsedResult::InvalidSchema { raw_output: raw.to_string() },
    }
}

fn extract_fenced_json(s: &str) -> Option<&str> {
    let start_marker = s.find("```json")?;
    let body_start = start_marker + "```json".len();
    let rest = &s[body_start..];
    let end = rest.find("```")?;
    Some(rest[..end].trim())
}

fn normalize_and_validate(value: Value) -> Option<StructuredResult> {
    let obj = value.as_object()?;

    let status = match obj.get("status")?.as_str()? {
        "success" => ResultStatus::Success,
        "failed" => ResultStatus::Failed,
        "skipped" => ResultStatus::Skipped,
        _ => return None,
    };

    let summary = obj.get("summary")?.as_str()?.to_string();
    if summary.is_empty() {
        return None;
    }

    let errors = match obj.get("errors") {
        None => Vec::new(),
        Some(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(normalize_error(item)?);
            }
            out
        }
        Some(_) => return None,
    };

    Some(StructuredResult { status, summary, errors, raw_output: None })
}

fn normalize_error(item: &Value) -> Option<ResultError> {
    match item {
        Value::String(message) => {
            if message.is_empty() {
                None
            } else {
                Some(ResultError { code: "task_error".to_string(), message: message.clone() })
            }
        }
        Value::Object(obj) => {
            let code = obj.get("code")?.as_str()?.to_string();
            let message = obj.get("message")?.as_str()?.to_string();
            if code.is_empty() || message.is_empty() {
                None
            } else {
                Some(ResultError { code, message })
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json() {
        let result = parse_structured_result(r#"{"status":"success","summary":"done","errors":[]}"#);
        assert!(matches!(result, ParsedResult::Ok(r) if r.summary == "done"));
    }

    #[test]
    fn parses_fenced_json_block() {
        let raw = "Here you go:\n```json\n{\"status\":\"success\",\"summary\":\"ok\"}\n```\nthanks";
        let result = parse_structured_result(raw);
        assert!(matches!(result, ParsedResult::Ok(_)));
    }

    #[test]
    fn non_json_text_is_invalid_json() {
        let result = parse_structured_result("not json");
        assert!(matches!(result, ParsedResult::InvalidJson { .. }));
    }

    #[test]
    fn missing_summary_is_invalid_schema() {
        let result = parse_structured_result(r#"{"status":"success"}"#);
        assert!(matches!(result, ParsedResult::InvalidSchema { .. }));
    }

    #[test]
    fn string_errors_become_task_error_entries() {
        let result = parse_structured_result(r#"{"status":"failed","summary":"bad","errors":["oops"]}"#);
        match result {
            ParsedResult::Ok(r) => {
                assert_eq!(r.errors.len(), 1);
                assert_eq!(r.errors[0].code, "task_error");
                assert_eq!(r.errors[0].message, "oops");
            }
            _ => panic!("expected Ok"),
        }
    }

    #[test]
    fn object_errors_with_empty_fields_are_invalid() {
        let result = parse_structured_result(r#"{"status":"failed","summary":"bad","errors":[{"code":"","message":"x"}]}"#);
        assert!(matches!(result, ParsedResult::InvalidSchema { .. }));
    }
}
