//! Otto daemon: wires storage, the scheduler kernel, the outbound drainer,
//! and the control-plane HTTP API together as concurrent Tokio tasks.

mod env;

use std::sync::Arc;

use anyhow::Context;
use otto_core::clock::SystemClock;
use otto_engine::{ensure_heartbeat_task, Executor, Scheduler, SchedulerConfig};
use otto_gateway::{NoopSessionController, NoopSessionGateway, NoopTransport};
use otto_outbound::{Drainer, RetryConfig};
use otto_storage::{AuditRepo, BindingsRepo, JobsRepo, OutboundRepo, ProfileRepo, RunSessionsRepo, Store};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive("otto=info".parse()?))
        .init();

    let otto_home = env::otto_home().context("resolving otto home directory")?;
    std::fs::create_dir_all(&otto_home).context("creating otto home directory")?;
    info!(otto_home = %otto_home.display(), "starting otto daemon");

    let store = Arc::new(Store::open(otto_home.join("data")).context("opening store")?);
    let jobs = Arc::new(JobsRepo::new(store.clone()));
    let outbound = Arc::new(OutboundRepo::new(store.clone()));
    let profiles = Arc::new(ProfileRepo::new(store.clone()));
    let bindings = Arc::new(BindingsRepo::new(store.clone()));
    let run_sessions = Arc::new(RunSessionsRepo::new(store.clone()));
    let audit = Arc::new(AuditRepo::new(store));

    let clock = SystemClock;
    let now = otto_core::clock::Clock::epoch_ms(&clock);

    let default_chat_id = env::telegram_allowed_user_id();

    let session_gateway = Arc::new(NoopSessionGateway);
    let session_controller: Arc<dyn otto_gateway::SessionController> = Arc::new(NoopSessionController);
    let transport = Arc::new(NoopTransport);

    ensure_heartbeat_task(&jobs, now);

    let scheduler_config = SchedulerConfig {
        enabled: env::scheduler_enabled(),
        tick_ms: env::scheduler_tick_ms().unwrap_or(SchedulerConfig::DEFAULT_TICK_MS),
        batch_size: env::scheduler_batch_size().unwrap_or(SchedulerConfig::DEFAULT_BATCH_SIZE),
        lock_lease_ms: env::scheduler_lock_lease_ms().unwrap_or(SchedulerConfig::DEFAULT_LOCK_LEASE_MS),
    }
    .validated()
    .context("invalid scheduler configuration")?;

    let executor = Arc::new(Executor {
        jobs: jobs.clone(),
        outbound: outbound.clone(),
        profiles: profiles.clone(),
        bindings: bindings.clone(),
        run_sessions: run_sessions.clone(),
        session_gateway,
        default_chat_id,
    });
    let scheduler = Arc::new(Scheduler::new(jobs.clone(), executor, clock.clone(), scheduler_config));

    let drainer = Arc::new(Drainer::new(
        outbound.clone(),
        profiles.clone(),
        Some(jobs.clone()),
        transport,
        RetryConfig::default(),
    ));

    let drain_clock = clock.clone();

    let token = otto_api::token::resolve_internal_api_config(&otto_home).context("resolving internal api token")?;
    let api_state = otto_api::AppState::new(
        jobs,
        outbound,
        profiles,
        bindings,
        run_sessions,
        audit,
        session_controller,
        clock,
        token,
        default_chat_id,
        otto_home,
    );
    let api_config = otto_api::ApiConfig {
        host: env::internal_api_host().unwrap_or_else(|| otto_api::ApiConfig::default().host),
        port: env::internal_api_port().unwrap_or(otto_api::ApiConfig::default().port),
    }
    .validated()
    .context("invalid control-plane api configuration")?;

    let scheduler_task = tokio::spawn(scheduler.run_forever());

    let drainer_for_loop = drainer.clone();
    let outbound_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_millis(env::OUTBOUND_DRAIN_TICK_MS));
        loop {
            interval.tick().await;
            let now = otto_core::clock::Clock::epoch_ms(&drain_clock);
            drainer_for_loop.drain_due_messages(now).await;
        }
    });

    let listener = tokio::net::TcpListener::bind((api_config.host.as_str(), api_config.port))
        .await
        .with_context(|| format!("binding control-plane api on {}:{}", api_config.host, api_config.port))?;
    info!(host = %api_config.host, port = api_config.port, "control-plane api listening");
    let router = otto_api::build_router(api_state);
    let api_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            warn!(error = %e, "control-plane api server exited");
        }
    });

    tokio::select! {
        res = scheduler_task => warn!(?res, "scheduler task exited"),
        res = outbound_task => warn!(?res, "outbound drain task exited"),
        res = api_task => warn!(?res, "api task exited"),
    }

    Ok(())
}
