use async_trait::async_trait;

use crate::notify::Notification;
use crate::stats::CycleStats;

/// Pluggable notification sink.
#[async_trait]
pub trait NotifyBackend: Send + Sync {
    /// Deliver one tournament notification.
    async fn send(&self, notification: &Notification) -> anyhow::Result<()>;

    /// Deliver a summary of a finished poll cycle.
    async fn send_digest(&self, stats: &CycleStats) -> anyhow::Result<()>;
}
