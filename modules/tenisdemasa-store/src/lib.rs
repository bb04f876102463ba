//! Persisted tournament records.
//!
//! The watcher only needs two operations from storage: look a record up by its
//! identity key, and upsert it. Both backends below implement [`TournamentStore`].

pub mod error;
mod memory;
mod sqlite;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use tenisdemasa_common::{IdentityKey, TournamentRecord};

#[async_trait]
pub trait TournamentStore: Send + Sync {
    /// Fetch the persisted record for `key`, if any.
    async fn get(&self, key: &IdentityKey) -> Result<Option<TournamentRecord>>;

    /// Insert or update a record. `identity_key` and `first_seen_at` of an
    /// existing row are never overwritten.
    async fn upsert(&self, record: &TournamentRecord) -> Result<()>;
}
