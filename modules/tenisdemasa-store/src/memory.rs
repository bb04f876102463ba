use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tenisdemasa_common::{IdentityKey, TournamentRecord};

use crate::error::{Result, StoreError};
use crate::TournamentStore;

/// Process-local store. Used when `DATABASE_URL=memory` and in tests.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<IdentityKey, TournamentRecord>>,
    upserts: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with records, as if a previous run had persisted them.
    pub fn with_records(records: impl IntoIterator<Item = TournamentRecord>) -> Self {
        let store = Self::new();
        if let Ok(mut map) = store.records.lock() {
            for record in records {
                map.insert(record.identity_key.clone(), record);
            }
        }
        store
    }

    /// All records, ordered by identity key.
    pub fn records(&self) -> Vec<TournamentRecord> {
        let mut all: Vec<TournamentRecord> = self
            .records
            .lock()
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        all.sort_by(|a, b| a.identity_key.cmp(&b.identity_key));
        all
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of successful upserts since creation.
    pub fn upsert_count(&self) -> u64 {
        self.upserts.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TournamentStore for MemoryStore {
    async fn get(&self, key: &IdentityKey) -> Result<Option<TournamentRecord>> {
        let map = self
            .records
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(map.get(key).cloned())
    }

    async fn upsert(&self, record: &TournamentRecord) -> Result<()> {
        let mut map = self
            .records
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let stored = match map.get(&record.identity_key) {
            Some(existing) => TournamentRecord {
                first_seen_at: existing.first_seen_at,
                ..record.clone()
            },
            None => record.clone(),
        };
        map.insert(stored.identity_key.clone(), stored);
        self.upserts.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
