//! Centralized environment variable access for the daemon binary (spec §6).

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("could not determine otto home directory (set OTTO_HOME or HOME)")]
    NoHomeDir,
}

/// Resolve the otto home directory: `OTTO_HOME` > `XDG_STATE_HOME/otto` >
/// `~/.local/state/otto`.
pub fn otto_home() -> Result<PathBuf, EnvError> {
    if let Ok(dir) = std::env::var("OTTO_HOME") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("otto"));
    }
    let home = dirs::home_dir().ok_or(EnvError::NoHomeDir)?;
    Ok(home.join(".local/state/otto"))
}

pub fn internal_api_host() -> Option<String> {
    std::env::var("OTTO_INTERNAL_API_HOST").ok().filter(|s| !s.is_empty())
}

pub fn internal_api_port() -> Option<u16> {
    std::env::var("OTTO_INTERNAL_API_PORT").ok().and_then(|s| s.parse::<u16>().ok())
}

/// `"0"` disables the scheduler; absent (or anything else) leaves it enabled.
pub fn scheduler_enabled() -> bool {
    std::env::var("OTTO_SCHEDULER_ENABLED").map(|v| v != "0").unwrap_or(true)
}

pub fn scheduler_tick_ms() -> Option<u64> {
    std::env::var("OTTO_SCHEDULER_TICK_MS").ok().and_then(|s| s.parse::<u64>().ok())
}

pub fn scheduler_batch_size() -> Option<usize> {
    std::env::var("OTTO_SCHEDULER_BATCH_SIZE").ok().and_then(|s| s.parse::<usize>().ok())
}

pub fn scheduler_lock_lease_ms() -> Option<i64> {
    std::env::var("OTTO_SCHEDULER_LOCK_LEASE_MS").ok().and_then(|s| s.parse::<i64>().ok())
}

/// Fallback `chatId` used when a call can't otherwise resolve one.
pub fn telegram_allowed_user_id() -> Option<i64> {
    std::env::var("TELEGRAM_ALLOWED_USER_ID").ok().and_then(|s| s.parse::<i64>().ok())
}

/// Outbound drain loop cadence; not part of spec §6's core env list, kept
/// internal with a sensible fixed default rather than re-exposed as a knob.
pub const OUTBOUND_DRAIN_TICK_MS: u64 = 15_000;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn scheduler_enabled_defaults_to_true() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var("OTTO_SCHEDULER_ENABLED");
        assert!(scheduler_enabled());
    }

    #[test]
    fn scheduler_enabled_false_when_zero() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("OTTO_SCHEDULER_ENABLED", "0");
        assert!(!scheduler_enabled());
        std::env::remove_var("OTTO_SCHEDULER_ENABLED");
    }

    #[test]
    fn otto_home_honors_explicit_override() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("OTTO_HOME", "/tmp/otto-test-home");
        assert_eq!(otto_home().unwrap(), PathBuf::from("/tmp/otto-test-home"));
        std::env::remove_var("OTTO_HOME");
    }
}
