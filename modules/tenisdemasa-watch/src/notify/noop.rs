use async_trait::async_trait;
use tracing::info;

use super::backend::NotifyBackend;
use super::Notification;
use crate::stats::CycleStats;

/// Sink used when no webhook is configured: notifications only reach the log.
pub struct NoopBackend;

#[async_trait]
impl NotifyBackend for NoopBackend {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()> {
        let record = notification.record();
        info!(
            kind = notification.kind(),
            identity_key = %record.identity_key,
            title = record.title.as_str(),
            "No sink configured, notification not delivered"
        );
        Ok(())
    }

    async fn send_digest(&self, _stats: &CycleStats) -> anyhow::Result<()> {
        Ok(())
    }
}
