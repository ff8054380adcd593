//! Repository for [`SessionBinding`] records (spec §3, §4.A).

use std::sync::Arc;

use otto_core::SessionBinding;

use crate::error::StorageResult;
use crate::ops::StorageOp;
use crate::store::Store;

pub struct BindingsRepo {
    store: Arc<Store>,
}

impl BindingsRepo {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn get_by_binding_key(&self, binding_key: &str) -> Option<SessionBinding> {
        self.store.read(|s| s.bindings.get(binding_key).cloned())
    }

    pub fn upsert(&self, binding: SessionBinding) -> StorageResult<()> {
        self.store.mutate(StorageOp::UpsertBinding(Box::new(binding)), |_| ())
    }

    pub fn get_telegram_chat_id_by_session_id(&self, session_id: &str) -> Option<i64> {
        self.store.read(|s| s.session_to_chat.get(session_id).copied())
    }
}
