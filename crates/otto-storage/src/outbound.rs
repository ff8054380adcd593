//! Repository for [`OutboundMessage`] records (spec §4.A, §4.F).

use std::sync::Arc;

use otto_core::{NewOutboundMessage, OutboundId, OutboundMessage};

use crate::error::StorageResult;
use crate::ops::StorageOp;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Enqueued,
    Duplicate,
}

pub struct OutboundRepo {
    store: Arc<Store>,
}

impl OutboundRepo {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Unconditional insert; callers that must honor `dedupe_key` uniqueness
    /// should use [`Self::enqueue_or_ignore_dedupe`] instead.
    pub fn enqueue(&self, new: NewOutboundMessage, now: i64) -> StorageResult<OutboundMessage> {
        let record = new.into_record(OutboundId::new(), now);
        self.store.mutate(StorageOp::EnqueueOutbound(Box::new(record.clone())), |_| record)
    }

    pub fn enqueue_or_ignore_dedupe(
        &self,
        new: NewOutboundMessage,
        now: i64,
    ) -> StorageResult<(EnqueueOutcome, Option<OutboundMessage>)> {
        let dedupe_key = new.dedupe_key.clone();
        let record = new.into_record(OutboundId::new(), now);
        self.store.mutate_computed(|s| {
            let duplicate = dedupe_key.as_ref().is_some_and(|k| s.dedupe_index.contains_key(k));
            let op = StorageOp::EnqueueOutboundOrIgnoreDedupe(Box::new(record.clone()));
            if duplicate {
                (op, (EnqueueOutcome::Duplicate, None))
            } else {
                (op, (EnqueueOutcome::Enqueued, Some(record.clone())))
            }
        })
    }

    pub fn list_due(&self, now: i64) -> Vec<OutboundMessage> {
        self.store.read(|s| {
            let mut due: Vec<OutboundMessage> = s.outbound.values().filter(|m| m.is_due_at(now)).cloned().collect();
            due.sort_by_key(|m| (m.next_attempt_at, m.created_at));
            due
        })
    }

    pub fn mark_sent(&self, id: OutboundId, attempt_count: u32, sent_at: i64) -> StorageResult<()> {
        self.store.mutate(StorageOp::MarkOutboundSent { id, attempt_count, sent_at }, |_| ())
    }

    pub fn mark_retry(
        &self,
        id: OutboundId,
        attempt_count: u32,
        next_attempt_at: i64,
        error_message: String,
        now: i64,
    ) -> StorageResult<()> {
        self.store.mutate(
            StorageOp::MarkOutboundRetry { id, attempt_count, next_attempt_at, error_message, updated_at: now },
            |_| (),
        )
    }

    pub fn mark_failed(
        &self,
        id: OutboundId,
        attempt_count: u32,
        error_message: String,
        failed_at: i64,
    ) -> StorageResult<()> {
        self.store.mutate(StorageOp::MarkOutboundFailed { id, attempt_count, error_message, failed_at }, |_| ())
    }
}
