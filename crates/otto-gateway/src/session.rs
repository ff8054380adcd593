//! Collaborator traits for talking to the underlying agent session runtime
//! (spec §4.E "task execution engine" delegates all session lifecycle here).

use async_trait::async_trait;
use otto_core::Job;

use crate::error::GatewayError;

/// Starts and drives agent sessions on behalf of scheduled jobs.
#[async_trait]
pub trait SessionGateway: Send + Sync + 'static {
    /// Start a fresh session for one run of `job` and prompt it immediately,
    /// returning the new session id and the agent's raw text response.
    async fn spawn_session(&self, job: &Job, prompt: &str) -> Result<(String, String), GatewayError>;

    /// Send an additional message into an already-open session (used by
    /// recurring tasks that reuse a pinned [`otto_core::SessionBinding`]),
    /// returning the agent's raw text response.
    async fn send_message(&self, session_id: &str, text: &str) -> Result<String, GatewayError>;

    /// Tear down a session opened by [`Self::spawn_session`]. Best-effort:
    /// callers log but do not fail the run on error.
    async fn close_session(&self, session_id: &str) -> Result<(), GatewayError>;
}

/// Lifecycle control over an open session, independent of message flow.
#[async_trait]
pub trait SessionController: Send + Sync + 'static {
    async fn pause(&self, session_id: &str) -> Result<(), GatewayError>;
    async fn resume(&self, session_id: &str) -> Result<(), GatewayError>;
    async fn kill(&self, session_id: &str) -> Result<(), GatewayError>;
    async fn is_alive(&self, session_id: &str) -> Result<bool, GatewayError>;
}

/// Logs instead of touching a real session. No concrete agent-runtime
/// adapter (coop/docker/k8s-style) is in scope here (spec §6 names
/// `SessionGateway`/`SessionController` as external collaborator interfaces
/// only); a real deployment supplies its own implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSessionGateway;

#[async_trait]
impl SessionGateway for NoopSessionGateway {
    async fn spawn_session(&self, job: &Job, prompt: &str) -> Result<(String, String), GatewayError> {
        tracing::info!(job_id = %job.id, prompt_len = prompt.len(), "noop gateway: would spawn session");
        Ok((format!("noop-session-{}", job.id), String::new()))
    }

    async fn send_message(&self, session_id: &str, text: &str) -> Result<String, GatewayError> {
        tracing::info!(session_id, text_len = text.len(), "noop gateway: would send message");
        Ok(String::new())
    }

    async fn close_session(&self, session_id: &str) -> Result<(), GatewayError> {
        tracing::info!(session_id, "noop gateway: would close session");
        Ok(())
    }
}

/// Logs instead of controlling a real session; pairs with [`NoopSessionGateway`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSessionController;

#[async_trait]
impl SessionController for NoopSessionController {
    async fn pause(&self, session_id: &str) -> Result<(), GatewayError> {
        tracing::info!(session_id, "noop controller: would pause session");
        Ok(())
    }

    async fn resume(&self, session_id: &str) -> Result<(), GatewayError> {
        tracing::info!(session_id, "noop controller: would resume session");
        Ok(())
    }

    async fn kill(&self, session_id: &str) -> Result<(), GatewayError> {
        tracing::info!(session_id, "noop controller: would kill session");
        Ok(())
    }

    async fn is_alive(&self, session_id: &str) -> Result<bool, GatewayError> {
        tracing::info!(session_id, "noop controller: would check liveness");
        Ok(false)
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug, Clone)]
    pub struct SpawnCall {
        pub job_id: String,
        pub prompt: String,
    }

    #[derive(Debug, Clone, Default)]
    pub struct FakeSessionGateway {
        spawns: Arc<Mutex<Vec<SpawnCall>>>,
        sent: Arc<Mutex<Vec<(String, String)>>>,
        closed: Arc<Mutex<Vec<String>>>,
        next_session_id: Arc<Mutex<u64>>,
        fail_spawn: Arc<Mutex<bool>>,
        next_response: Arc<Mutex<Option<String>>>,
    }

    impl FakeSessionGateway {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_fail_spawn(&self, fail: bool) {
            *self.fail_spawn.lock() = fail;
        }

        /// Queue the raw text the next `spawn_session`/`send_message` call
        /// returns. Defaults to a well-formed success result when unset.
        pub fn set_next_response(&self, text: impl Into<String>) {
            *self.next_response.lock() = Some(text.into());
        }

        pub fn spawns(&self) -> Vec<SpawnCall> {
            self.spawns.lock().clone()
        }

        pub fn sent_messages(&self) -> Vec<(String, String)> {
            self.sent.lock().clone()
        }

        pub fn closed_sessions(&self) -> Vec<String> {
            self.closed.lock().clone()
        }

        fn take_response(&self) -> String {
            self.next_response
                .lock()
                .take()
                .unwrap_or_else(|| r#"{"status":"success","summary":"ok","errors":[]}"#.to_string())
        }
    }

    #[async_trait]
    impl SessionGateway for FakeSessionGateway {
        async fn spawn_session(&self, job: &Job, prompt: &str) -> Result<(String, String), GatewayError> {
            if *self.fail_spawn.lock() {
                return Err(GatewayError::SpawnFailed("fake spawn failure".into()));
            }
            self.spawns.lock().push(SpawnCall { job_id: job.id.to_string(), prompt: prompt.to_string() });
            let mut next = self.next_session_id.lock();
            *next += 1;
            Ok((format!("fake-session-{next}"), self.take_response()))
        }

        async fn send_message(&self, session_id: &str, text: &str) -> Result<String, GatewayError> {
            self.sent.lock().push((session_id.to_string(), text.to_string()));
            Ok(self.take_response())
        }

        async fn close_session(&self, session_id: &str) -> Result<(), GatewayError> {
            self.closed.lock().push(session_id.to_string());
            Ok(())
        }
    }

    #[derive(Debug, Clone, Default)]
    pub struct FakeSessionController {
        alive: Arc<Mutex<std::collections::HashSet<String>>>,
    }

    impl FakeSessionController {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn mark_alive(&self, session_id: impl Into<String>) {
            self.alive.lock().insert(session_id.into());
        }
    }

    #[async_trait]
    impl SessionController for FakeSessionController {
        async fn pause(&self, _session_id: &str) -> Result<(), GatewayError> {
            Ok(())
        }

        async fn resume(&self, _session_id: &str) -> Result<(), GatewayError> {
            Ok(())
        }

        async fn kill(&self, session_id: &str) -> Result<(), GatewayError> {
            self.alive.lock().remove(session_id);
            Ok(())
        }

        async fn is_alive(&self, session_id: &str) -> Result<bool, GatewayError> {
            Ok(self.alive.lock().contains(session_id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::*;
    use super::*;
    use otto_core::{Job, JobId, ScheduleKind};

    fn sample_job() -> Job {
        Job::new(JobId::new(), "demo", ScheduleKind::Oneshot, None, Some(0), None, None, None, 0, 0)
    }

    #[tokio::test]
    async fn fake_gateway_records_spawn_calls() {
        let gw = FakeSessionGateway::new();
        let job = sample_job();
        let (session_id, _response) = gw.spawn_session(&job, "do the thing").await.unwrap();
        assert_eq!(gw.spawns().len(), 1);
        assert!(session_id.starts_with("fake-session-"));
    }

    #[tokio::test]
    async fn fake_gateway_can_be_forced_to_fail() {
        let gw = FakeSessionGateway::new();
        gw.set_fail_spawn(true);
        let job = sample_job();
        assert!(gw.spawn_session(&job, "x").await.is_err());
    }

    #[tokio::test]
    async fn fake_controller_tracks_liveness() {
        let ctl = FakeSessionController::new();
        ctl.mark_alive("s1");
        assert!(ctl.is_alive("s1").await.unwrap());
        ctl.kill("s1").await.unwrap();
        assert!(!ctl.is_alive("s1").await.unwrap());
    }
}
