//! Repository for the singleton [`UserProfile`] row (spec §4.A).

use std::sync::Arc;

use otto_core::UserProfile;

use crate::error::StorageResult;
use crate::ops::StorageOp;
use crate::store::Store;

pub struct ProfileRepo {
    store: Arc<Store>,
}

impl ProfileRepo {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn get(&self) -> UserProfile {
        self.store.read(|s| s.profile.clone())
    }

    pub fn upsert(&self, profile: UserProfile) -> StorageResult<()> {
        self.store.mutate(StorageOp::UpsertProfile(Box::new(profile)), |_| ())
    }

    pub fn set_mute_until(&self, mute_until: Option<i64>, now: i64) -> StorageResult<()> {
        self.store.mutate(StorageOp::SetMuteUntil { mute_until, updated_at: now }, |_| ())
    }

    pub fn set_last_digest_at(&self, last_digest_at: i64, now: i64) -> StorageResult<()> {
        self.store.mutate(StorageOp::SetLastDigestAt { last_digest_at, updated_at: now }, |_| ())
    }
}
