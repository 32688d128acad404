//! Directory of live encounters.
//!
//! Workers register on spawn and remove themselves once their encounter
//! reaches Cleanup or its last handle is dropped, so the directory only ever
//! lists encounters that still accept commands. Entries are weak and never
//! keep a worker alive on their own.

use std::collections::HashMap;
use std::sync::Arc;

use encounter_core::EncounterId;
use tokio::sync::RwLock;

use super::errors::{Result, RuntimeError};
use super::handle::{EncounterHandle, WeakEncounterHandle};

#[derive(Clone, Debug, Default)]
pub struct EncounterDirectory {
    entries: Arc<RwLock<HashMap<EncounterId, WeakEncounterHandle>>>,
}

impl EncounterDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn insert(&self, handle: &EncounterHandle) {
        let entry = handle.downgrade();
        self.entries.write().await.insert(entry.id(), entry);
    }

    pub(crate) async fn remove(&self, id: EncounterId) -> bool {
        self.entries.write().await.remove(&id).is_some()
    }

    /// Returns a handle while the encounter's worker is still running.
    pub async fn get(&self, id: EncounterId) -> Option<EncounterHandle> {
        self.entries
            .read()
            .await
            .get(&id)
            .and_then(WeakEncounterHandle::upgrade)
    }

    /// Like [`get`](Self::get), failing with
    /// [`RuntimeError::EncounterNotFound`].
    pub async fn require(&self, id: EncounterId) -> Result<EncounterHandle> {
        self.get(id).await.ok_or(RuntimeError::EncounterNotFound(id))
    }

    /// Registered ids in ascending order.
    pub async fn ids(&self) -> Vec<EncounterId> {
        let mut ids: Vec<_> = self.entries.read().await.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
