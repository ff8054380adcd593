//! Drains due outbound messages through the notification gate and a
//! [`MessageTransport`] (spec §4.F).

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use otto_core::outbound::{retry_delay_ms, suppressed_reason, SUPPRESSED_BY_POLICY_PREFIX};
use otto_core::{NewOutboundMessage, OutboundId, OutboundKind, OutboundMessage, Urgency};
use otto_gateway::MessageTransport;
use otto_policy::{resolve_effective_profile, resolve_gate_decision, GateAction};
use otto_storage::{JobsRepo, OutboundRepo, ProfileRepo};
use tracing::warn;

use crate::config::{RetryConfig, ERROR_MESSAGE_TRUNCATE_LEN, TEXT_CHUNK_LIMIT};

#[derive(Debug, Clone, Copy, Default)]
pub struct DrainOutcome {
    pub delivered: usize,
    pub retried: usize,
    pub failed: usize,
    pub digests_sent: usize,
}

pub struct Drainer<T: MessageTransport> {
    outbound: Arc<OutboundRepo>,
    profiles: Arc<ProfileRepo>,
    jobs: Option<Arc<JobsRepo>>,
    transport: Arc<T>,
    retry: RetryConfig,
    draining: AtomicBool,
}

impl<T: MessageTransport> Drainer<T> {
    pub fn new(
        outbound: Arc<OutboundRepo>,
        profiles: Arc<ProfileRepo>,
        jobs: Option<Arc<JobsRepo>>,
        transport: Arc<T>,
        retry: RetryConfig,
    ) -> Self {
        Self { outbound, profiles, jobs, transport, retry, draining: AtomicBool::new(false) }
    }

    /// Returns `None` if a drain was already in flight (reentry guard); the
    /// caller should simply skip this tick.
    pub async fn drain_due_messages(&self, now: i64) -> Option<DrainOutcome> {
        if self.draining.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            return None;
        }
        let outcome = self.drain_inner(now).await;
        self.draining.store(false, Ordering::SeqCst);
        Some(outcome)
    }

    async fn drain_inner(&self, now: i64) -> DrainOutcome {
        let due = self.outbound.list_due(now);
        let profile = resolve_effective_profile(&self.profiles.get());
        let gate_now = resolve_gate_decision(&profile, Urgency::Normal, now);

        let mut handled: HashSet<OutboundId> = HashSet::new();
        let mut outcome = DrainOutcome::default();

        let released_suppressed: Vec<&OutboundMessage> = due
            .iter()
            .filter(|m| m.error_message.as_deref().and_then(suppressed_reason).is_some())
            .collect();

        if !released_suppressed.is_empty() && gate_now.action == GateAction::DeliverNow {
            if let Some(jobs) = &self.jobs {
                outcome.digests_sent = self.send_digests(jobs, &released_suppressed, &profile, now).await;
                for message in &released_suppressed {
                    handled.insert(message.id);
                }
            }
        }

        for message in &due {
            if handled.contains(&message.id) {
                continue;
            }
            self.process_message(message, &profile, now, &mut outcome).await;
        }

        outcome
    }

    async fn send_digests(
        &self,
        jobs: &Arc<JobsRepo>,
        released: &[&OutboundMessage],
        profile: &otto_policy::EffectiveProfile,
        now: i64,
    ) -> usize {
        let since = profile.last_digest_at.unwrap_or(now - 24 * 60 * 60_000);
        let recent = jobs.list_recent_runs(since, 200);
        let recent: Vec<_> = recent
            .into_iter()
            .filter(|r| jobs.get_by_id(&r.job_id).map(|j| j.job_type != otto_core::HEARTBEAT_JOB_TYPE).unwrap_or(true))
            .collect();

        let mut by_chat: HashMap<i64, Vec<&OutboundMessage>> = HashMap::new();
        for message in released {
            by_chat.entry(message.chat_id).or_default().push(message);
        }

        let mut sent = 0;
        for (chat_id, messages) in by_chat {
            let digest_text = build_digest_text(&recent);
            let digest = NewOutboundMessage::text(chat_id, digest_text).into_record(OutboundId::new(), now);
            if self.transport.send(&digest).await.is_ok() {
                sent += 1;
                for message in messages {
                    let _ = self.outbound.mark_sent(message.id, message.attempt_count + 1, now);
                }
            }
        }
        let _ = self.profiles.set_last_digest_at(now, now);
        sent
    }

    async fn process_message(
        &self,
        message: &OutboundMessage,
        profile: &otto_policy::EffectiveProfile,
        now: i64,
        outcome: &mut DrainOutcome,
    ) {
        let urgency = message.priority.urgency();
        let gate = resolve_gate_decision(profile, urgency, now);
        if gate.action == GateAction::Hold {
            let next_attempt_at = gate.release_at.unwrap_or(now + self.retry.base_delay_ms);
            let error_message = format!("{SUPPRESSED_BY_POLICY_PREFIX}{}", gate.reason.as_str());
            let _ = self.outbound.mark_retry(message.id, message.attempt_count + 1, next_attempt_at, error_message, now);
            outcome.retried += 1;
            return;
        }

        match self.deliver(message).await {
            Ok(()) => {
                let _ = self.outbound.mark_sent(message.id, message.attempt_count + 1, now);
                cleanup_media(message);
                outcome.delivered += 1;
            }
            Err(e) => {
                let mut error_message = e.to_string();
                error_message.truncate(ERROR_MESSAGE_TRUNCATE_LEN);
                let next_attempt = message.attempt_count + 1;
                if next_attempt >= self.retry.max_attempts {
                    let _ = self.outbound.mark_failed(message.id, next_attempt, error_message, now);
                    cleanup_media(message);
                    outcome.failed += 1;
                } else {
                    let next_attempt_at = now + retry_delay_ms(next_attempt, self.retry.base_delay_ms, self.retry.max_delay_ms);
                    let _ = self.outbound.mark_retry(message.id, next_attempt, next_attempt_at, error_message, now);
                    outcome.retried += 1;
                }
            }
        }
    }

    async fn deliver(&self, message: &OutboundMessage) -> Result<(), otto_gateway::TransportError> {
        match message.kind {
            OutboundKind::Text => {
                for chunk in chunk_text(&message.content, TEXT_CHUNK_LIMIT) {
                    let mut piece = message.clone();
                    piece.content = chunk.to_string();
                    self.transport.send(&piece).await?;
                }
                Ok(())
            }
            OutboundKind::Document | OutboundKind::Photo => {
                if !message.has_required_media() {
                    return Err(otto_gateway::TransportError::DeliveryFailed("missing media_path".into()));
                }
                self.transport.send(message).await
            }
        }
    }
}

fn chunk_text(content: &str, limit: usize) -> Vec<&str> {
    if content.is_empty() {
        return vec![""];
    }
    let mut chunks = Vec::new();
    let mut rest = content;
    while !rest.is_empty() {
        let mut boundary = rest.len().min(limit);
        while !rest.is_char_boundary(boundary) {
            boundary -= 1;
        }
        chunks.push(&rest[..boundary]);
        rest = &rest[boundary..];
    }
    chunks
}

fn cleanup_media(message: &OutboundMessage) {
    if let Some(path) = &message.media_path {
        if let Err(e) = std::fs::remove_file(path) {
            warn!(path = %path, error = %e, "failed to clean up staged media file");
        }
    }
}

fn build_digest_text(recent: &[otto_core::JobRun]) -> String {
    use otto_core::RunStatus;
    let success = recent.iter().filter(|r| r.status == RunStatus::Success).count();
    let failed = recent.iter().filter(|r| r.status == RunStatus::Failed).count();
    let skipped = recent.iter().filter(|r| r.status == RunStatus::Skipped).count();
    format!("While you were in quiet hours: {success} succeeded, {failed} failed, {skipped} skipped.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use otto_core::{NewOutboundMessage, Priority, UserProfile};
    use otto_gateway::FakeMessageTransport;
    use otto_storage::Store;
    use tempfile::tempdir;

    fn drainer(transport: FakeMessageTransport) -> (Drainer<FakeMessageTransport>, Arc<OutboundRepo>, Arc<ProfileRepo>) {
        let dir = tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path()).unwrap());
        let outbound = Arc::new(OutboundRepo::new(store.clone()));
        let profiles = Arc::new(ProfileRepo::new(store.clone()));
        let jobs = Arc::new(JobsRepo::new(store));
        (
            Drainer::new(outbound.clone(), profiles.clone(), Some(jobs), Arc::new(transport), RetryConfig::default()),
            outbound,
            profiles,
        )
    }

    #[tokio::test]
    async fn due_text_message_is_delivered_and_marked_sent() {
        let (drainer, outbound, _profiles) = drainer(FakeMessageTransport::new());
        let (_, record) = outbound.enqueue_or_ignore_dedupe(NewOutboundMessage::text(1, "hi"), 0).unwrap();
        let record = record.unwrap();
        let outcome = drainer.drain_due_messages(0).await.unwrap();
        assert_eq!(outcome.delivered, 1);
        let stored = outbound.list_due(1_000_000);
        assert!(stored.iter().all(|m| m.id != record.id));
    }

    #[tokio::test]
    async fn quiet_hours_hold_marks_suppressed_retry() {
        let (drainer, outbound, profiles) = drainer(FakeMessageTransport::new());
        let mut profile = UserProfile::defaults(0);
        profile.timezone = Some("UTC".into());
        profile.quiet_hours_start = Some("00:00".into());
        profile.quiet_hours_end = Some("23:59".into());
        profile.quiet_mode = otto_core::QuietMode::CriticalOnly;
        profiles.upsert(profile).unwrap();
        outbound.enqueue_or_ignore_dedupe(NewOutboundMessage::text(1, "hi").with_priority(Priority::Normal), 0).unwrap();

        let outcome = drainer.drain_due_messages(30 * 60_000).await.unwrap();
        assert_eq!(outcome.retried, 1);
        assert_eq!(outcome.delivered, 0);
    }

    #[tokio::test]
    async fn delivery_failure_retries_until_max_attempts_then_fails() {
        let transport = FakeMessageTransport::new();
        transport.fail_next(10);
        let (drainer, outbound, _profiles) = drainer(transport);
        outbound.enqueue_or_ignore_dedupe(NewOutboundMessage::text(1, "hi"), 0).unwrap();

        let mut now = 0;
        for _ in 0..RetryConfig::default().max_attempts {
            drainer.drain_due_messages(now).await.unwrap();
            now += 60 * 60_000;
        }
        let remaining = outbound.list_due(now);
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn reentrant_drain_is_skipped() {
        let (drainer, _outbound, _profiles) = drainer(FakeMessageTransport::new());
        drainer.draining.store(true, Ordering::SeqCst);
        assert!(drainer.drain_due_messages(0).await.is_none());
    }
}
