//! Shared control-plane state (spec §9: model external collaborators as an
//! explicit runtime context passed to constructors, not process-globals).

use std::path::PathBuf;
use std::sync::Arc;

use otto_core::clock::Clock;
use otto_gateway::SessionController;
use otto_storage::{AuditRepo, BindingsRepo, JobsRepo, OutboundRepo, ProfileRepo, RunSessionsRepo};

#[derive(Clone)]
pub struct AppState<C: Clock> {
    pub jobs: Arc<JobsRepo>,
    pub outbound: Arc<OutboundRepo>,
    pub profiles: Arc<ProfileRepo>,
    pub bindings: Arc<BindingsRepo>,
    pub run_sessions: Arc<RunSessionsRepo>,
    pub audit: Arc<AuditRepo>,
    pub session_controller: Arc<dyn SessionController>,
    pub clock: C,
    pub token: Arc<str>,
    pub default_chat_id: Option<i64>,
    pub otto_home: PathBuf,
}

impl<C: Clock> AppState<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        jobs: Arc<JobsRepo>,
        outbound: Arc<OutboundRepo>,
        profiles: Arc<ProfileRepo>,
        bindings: Arc<BindingsRepo>,
        run_sessions: Arc<RunSessionsRepo>,
        audit: Arc<AuditRepo>,
        session_controller: Arc<dyn SessionController>,
        clock: C,
        token: impl Into<Arc<str>>,
        default_chat_id: Option<i64>,
        otto_home: PathBuf,
    ) -> Self {
        Self {
            jobs,
            outbound,
            profiles,
            bindings,
            run_sessions,
            audit,
            session_controller,
            clock,
            token: token.into(),
            default_chat_id,
            otto_home,
        }
    }

    pub fn now(&self) -> i64 {
        self.clock.epoch_ms()
    }
}
