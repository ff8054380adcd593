//! End-to-end scenarios spanning storage, the execution engine, the
//! outbound drainer, and the control-plane HTTP API together.

use std::sync::Arc;

use chrono::TimeZone;
use otto_core::clock::FakeClock;
use otto_core::{
    Job, JobId, JobRunSession, NewOutboundMessage, Priority, QuietMode, RunId, RunStatus,
    ScheduleKind, SessionBinding, TerminalState, UserProfile,
};
use otto_engine::{check_task_failures, Executor, NotificationStatus, WatchdogConfig};
use otto_gateway::{FakeMessageTransport, FakeSessionController, FakeSessionGateway};
use otto_outbound::{Drainer, RetryConfig};
use otto_storage::{AuditRepo, BindingsRepo, JobsRepo, OutboundRepo, ProfileRepo, RunSessionsRepo, Store};
use tower::ServiceExt;

struct Harness {
    _dir: tempfile::TempDir,
    jobs: Arc<JobsRepo>,
    outbound: Arc<OutboundRepo>,
    profiles: Arc<ProfileRepo>,
    bindings: Arc<BindingsRepo>,
    run_sessions: Arc<RunSessionsRepo>,
    audit: Arc<AuditRepo>,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path()).unwrap());
        Self {
            _dir: dir,
            jobs: Arc::new(JobsRepo::new(store.clone())),
            outbound: Arc::new(OutboundRepo::new(store.clone())),
            profiles: Arc::new(ProfileRepo::new(store.clone())),
            bindings: Arc::new(BindingsRepo::new(store.clone())),
            run_sessions: Arc::new(RunSessionsRepo::new(store.clone())),
            audit: Arc::new(AuditRepo::new(store)),
        }
    }

    fn executor(&self, gateway: FakeSessionGateway, default_chat_id: Option<i64>) -> Executor<FakeSessionGateway> {
        Executor {
            jobs: self.jobs.clone(),
            outbound: self.outbound.clone(),
            profiles: self.profiles.clone(),
            bindings: self.bindings.clone(),
            run_sessions: self.run_sessions.clone(),
            session_gateway: Arc::new(gateway),
            default_chat_id,
        }
    }

    fn router(&self, default_chat_id: Option<i64>) -> axum::Router {
        let state = otto_api::AppState::new(
            self.jobs.clone(),
            self.outbound.clone(),
            self.profiles.clone(),
            self.bindings.clone(),
            self.run_sessions.clone(),
            self.audit.clone(),
            Arc::new(FakeSessionController::new()),
            FakeClock::default(),
            "test-token",
            default_chat_id,
            self._dir.path().to_path_buf(),
        );
        otto_api::build_router(state)
    }
}

fn post(path: &str, body: serde_json::Value) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .header("authorization", "Bearer test-token")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// Scenario 1: recurring execute. claimDue picks up a due recurring job, the
// agent returns a well-formed success result, and the job reschedules with
// its lock released.
#[tokio::test]
async fn recurring_job_executes_and_reschedules() {
    let h = Harness::new();
    let job = Job::new(JobId::new(), "reminder", ScheduleKind::Recurring, Some(30), None, None, None, None, 1_000, 0);
    let job_id = job.id;
    h.jobs.create_task(job).unwrap();

    let claimed = h.jobs.claim_due(1_000, 20, 90_000).unwrap();
    assert_eq!(claimed.len(), 1);

    let gateway = FakeSessionGateway::new();
    gateway.set_next_response(r#"{"status":"success","summary":"Reminder handled","errors":[]}"#);
    let exec = h.executor(gateway, Some(777));
    exec.execute_claimed_job(claimed.into_iter().next().unwrap(), 2_000).await;

    let run = h.jobs.list_runs_by_job_id(&job_id, 10, 0).remove(0);
    assert_eq!(run.status, RunStatus::Success);

    let updated = h.jobs.get_by_id(&job_id).unwrap();
    assert_eq!(updated.next_run_at, Some(2_000 + 1_800_000));
    assert!(updated.lock_token.is_none());
    assert_eq!(updated.status, otto_core::JobStatus::Idle);
}

// Scenario 2: one-shot invalid JSON. The agent's raw text isn't JSON at
// all, so the run fails with invalid_result_json and the job finalizes.
#[tokio::test]
async fn oneshot_job_with_invalid_agent_output_finalizes_failed() {
    let h = Harness::new();
    let job = Job::new(JobId::new(), "reminder", ScheduleKind::Oneshot, None, Some(1_000), None, None, None, 1_000, 0);
    let job_id = job.id;
    h.jobs.create_task(job).unwrap();

    let claimed = h.jobs.claim_due(1_000, 20, 90_000).unwrap();
    let gateway = FakeSessionGateway::new();
    gateway.set_next_response("not json");
    let exec = h.executor(gateway, Some(777));
    exec.execute_claimed_job(claimed.into_iter().next().unwrap(), 2_000).await;

    let run = h.jobs.list_runs_by_job_id(&job_id, 10, 0).remove(0);
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.error_code.as_deref(), Some(otto_core::error::run_error_code::INVALID_RESULT_JSON));
    let result_json = run.result_json.unwrap();
    assert!(result_json.contains("rawOutput") || result_json.contains("raw_output"));

    let updated = h.jobs.get_by_id(&job_id).unwrap();
    assert_eq!(updated.terminal_state, Some(TerminalState::Completed));
    assert!(updated.next_run_at.is_none());
}

// Scenario 3: watchdog alert over HTTP, with dedupe on a repeat call.
#[tokio::test]
async fn watchdog_alert_dedupes_on_repeat_check() {
    let h = Harness::new();
    for _ in 0..2 {
        let job = Job::new(JobId::new(), "reminder", ScheduleKind::Oneshot, None, Some(0), None, None, None, 0, 0);
        let job_id = job.id;
        h.jobs.create_task(job).unwrap();
        let mut run = otto_core::JobRun::placeholder(RunId::new(), job_id, 1_000, 1_000);
        run.status = RunStatus::Failed;
        run.finished_at = Some(1_010);
        h.jobs.insert_run(run).unwrap();
    }

    let app = h.router(None);
    let body = serde_json::json!({"lane": "interactive", "threshold": 2, "notify": true, "chatId": 777});
    let response = app.clone().oneshot(post("/internal/tools/tasks/failures/check", body.clone())).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let first = json_body(response).await;
    assert_eq!(first["failedCount"], 2);
    assert_eq!(first["shouldAlert"], true);
    assert_eq!(first["notificationStatus"], "enqueued");

    let due = h.outbound.list_due(10_000);
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].priority, Priority::High);

    let response = app.oneshot(post("/internal/tools/tasks/failures/check", body)).await.unwrap();
    let second = json_body(response).await;
    assert_eq!(second["notificationStatus"], "duplicate");
    assert_eq!(h.outbound.list_due(10_000).len(), 1);
}

// Scenario 4: quiet-hours suppression at 23:30 local, released at 07:05
// local with a digest summarizing recent (non-heartbeat) runs.
#[tokio::test]
async fn quiet_hours_suppresses_then_releases_with_digest() {
    let h = Harness::new();
    let mut profile = UserProfile::defaults(0);
    profile.timezone = Some("Europe/Vienna".into());
    profile.quiet_hours_start = Some("22:00".into());
    profile.quiet_hours_end = Some("07:00".into());
    profile.quiet_mode = QuietMode::CriticalOnly;
    h.profiles.upsert(profile).unwrap();

    let tz = chrono_tz::Europe::Vienna;
    let at_2330 = tz.with_ymd_and_hms(2024, 6, 1, 23, 30, 0).unwrap().timestamp_millis();
    let at_0705 = tz.with_ymd_and_hms(2024, 6, 2, 7, 5, 0).unwrap().timestamp_millis();

    h.outbound.enqueue_or_ignore_dedupe(NewOutboundMessage::text(777, "hi").with_priority(Priority::Normal), at_2330).unwrap();

    let transport = FakeMessageTransport::new();
    let drainer = Drainer::new(h.outbound.clone(), h.profiles.clone(), Some(h.jobs.clone()), Arc::new(transport.clone()), RetryConfig::default());

    let outcome = drainer.drain_due_messages(at_2330).await.unwrap();
    assert_eq!(outcome.delivered, 0);
    assert_eq!(outcome.retried, 1);
    assert!(h.outbound.list_due(at_2330 + 1).is_empty());

    let outcome = drainer.drain_due_messages(at_0705).await.unwrap();
    assert_eq!(outcome.digests_sent, 1);
    assert_eq!(transport.sent().len(), 1);
    assert!(h.outbound.list_due(at_0705 + 1).is_empty());
    assert_eq!(h.profiles.get().last_digest_at, Some(at_0705));
}

// Scenario 5: background job spawn over HTTP, bound to a session that
// resolves to chatId 777, run to completion through the engine.
#[tokio::test]
async fn background_job_runs_end_to_end_with_lifecycle_messages() {
    let h = Harness::new();
    h.bindings
        .upsert(SessionBinding {
            binding_key: "telegram:session:sess-abc".into(),
            session_id: "sess-abc".into(),
            chat_id: Some(777),
            created_at: 0,
            updated_at: 0,
        })
        .unwrap();

    let app = h.router(None);
    let spawn_body = serde_json::json!({"text": "find my flight info", "sessionId": "sess-abc"});
    let response = app.oneshot(post("/internal/tools/background-jobs/spawn", spawn_body)).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let job_dto = json_body(response).await;
    assert_eq!(job_dto["jobType"], "interactive_background_oneshot");
    let job_id = JobId::from_string(job_dto["id"].as_str().unwrap());

    let claimed = h.jobs.claim_due(job_dto["nextRunAt"].as_i64().unwrap(), 20, 90_000).unwrap();
    assert_eq!(claimed.len(), 1);

    let gateway = FakeSessionGateway::new();
    gateway.set_next_response(r#"{"status":"success","summary":"Found it","errors":[]}"#);
    let exec = h.executor(gateway, None);
    let job = claimed.into_iter().next().unwrap();
    let run_id_before = h.jobs.count_runs_by_job_id(&job_id);
    exec.execute_claimed_job(job, 5_000).await;
    assert_eq!(h.jobs.count_runs_by_job_id(&job_id), run_id_before + 1);

    let run = h.jobs.list_runs_by_job_id(&job_id, 1, 0).remove(0);
    assert_eq!(run.status, RunStatus::Success);

    let session = h.run_sessions.get_by_run_id(&run.id).unwrap();
    assert!(session.closed_at.is_some());
    assert!(session.close_error_message.is_none());

    let due = h.outbound.list_due(5_000);
    let dedupe_keys: Vec<_> = due.iter().filter_map(|m| m.dedupe_key.clone()).collect();
    assert!(dedupe_keys.iter().any(|k| k == &format!("bg-run:{job_id}:{}:started", run.id)));
    let final_msg = due
        .iter()
        .find(|m| m.dedupe_key.as_deref() == Some(&format!("bg-run:{job_id}:{}:final_success", run.id)))
        .unwrap();
    assert_eq!(final_msg.priority, Priority::Normal);

    let updated_job = h.jobs.get_by_id(&job_id).unwrap();
    assert_eq!(updated_job.terminal_state, Some(TerminalState::Completed));
}

// Scenario 6: cancel a background job mid-run; active sessions are stopped
// once, and a repeat cancel is a no-op that reports already_terminal.
#[tokio::test]
async fn cancel_background_job_stops_active_sessions_once() {
    let h = Harness::new();
    let job = Job::new(
        JobId::new(),
        otto_core::INTERACTIVE_BACKGROUND_JOB_TYPE,
        ScheduleKind::Oneshot,
        None,
        Some(1_000),
        None,
        None,
        None,
        1_000,
        0,
    );
    let job_id = job.id;
    h.jobs.create_task(job).unwrap();
    let claimed = h.jobs.claim_due(1_000, 20, 90_000).unwrap();
    assert_eq!(claimed.len(), 1);

    let run_id = RunId::new();
    h.jobs.insert_run(otto_core::JobRun::placeholder(run_id, job_id, 1_000, 1_000)).unwrap();
    h.run_sessions.insert(JobRunSession::new(run_id, job_id, "live-session".into(), 1_000)).unwrap();

    let app = h.router(None);
    let cancel_body = serde_json::json!({"jobId": job_id.to_string()});
    let response = app.clone().oneshot(post("/internal/tools/background-jobs/cancel", cancel_body.clone())).await.unwrap();
    let first = json_body(response).await;
    assert_eq!(first["outcome"], "cancelled");
    assert_eq!(first["terminalState"], "cancelled");
    let stop_results = first["stopSessionResults"].as_array().unwrap();
    assert_eq!(stop_results.len(), 1);
    assert_eq!(stop_results[0]["sessionId"], "live-session");
    assert_eq!(stop_results[0]["status"], "stopped");

    let response = app.oneshot(post("/internal/tools/background-jobs/cancel", cancel_body)).await.unwrap();
    let second = json_body(response).await;
    assert_eq!(second["outcome"], "already_terminal");
    assert_eq!(second["stopSessionResults"].as_array().unwrap().len(), 0);
}

// Invariant from spec §8: token resolution is idempotent across the same
// home directory, independent of which crate asks.
#[test]
fn internal_api_token_is_stable_across_resolutions() {
    let dir = tempfile::tempdir().unwrap();
    let first = otto_api::token::resolve_internal_api_config(dir.path()).unwrap();
    let second = otto_api::token::resolve_internal_api_config(dir.path()).unwrap();
    assert_eq!(first, second);
}

// Cross-check that the standalone watchdog helper agrees with the HTTP
// surface's reading of notificationStatus for a below-threshold run.
#[test]
fn watchdog_helper_reports_not_requested_below_threshold() {
    let h = Harness::new();
    let job = Job::new(JobId::new(), "reminder", ScheduleKind::Oneshot, None, Some(0), None, None, None, 0, 0);
    let job_id = job.id;
    h.jobs.create_task(job).unwrap();
    let mut run = otto_core::JobRun::placeholder(RunId::new(), job_id, 1_000, 1_000);
    run.status = RunStatus::Failed;
    run.finished_at = Some(1_010);
    h.jobs.insert_run(run).unwrap();

    let config = WatchdogConfig { threshold: 3, ..WatchdogConfig::default() };
    let outcome = check_task_failures(&h.jobs, &h.outbound, Some(777), &config, 10_000);
    assert!(!outcome.should_alert);
    assert_eq!(outcome.notification_status, NotificationStatus::NotRequested);
}
