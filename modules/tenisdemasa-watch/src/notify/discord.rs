use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tenisdemasa_common::{NotifyFormat, TournamentRecord};
use tracing::warn;

use super::backend::NotifyBackend;
use super::Notification;
use crate::diff::FieldChange;
use crate::stats::CycleStats;

const COLOR_NEW: u32 = 0x2ECC71;
const COLOR_UPDATED: u32 = 0xE67E22;

// Discord rejects longer values.
const MAX_DESCRIPTION: usize = 4096;
const MAX_FIELD_VALUE: usize = 1024;
const MAX_CONTENT: usize = 2000;

const EMPTY: &str = "(gol)";

/// Discord incoming webhook sink.
pub struct DiscordWebhook {
    webhook_url: String,
    format: NotifyFormat,
    http: reqwest::Client,
}

impl DiscordWebhook {
    /// `timeout` bounds each request, so a stalled webhook cannot hold up
    /// the cycle.
    pub fn new(
        webhook_url: String,
        format: NotifyFormat,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            webhook_url,
            format,
            http,
        })
    }

    async fn post(&self, payload: Value) -> anyhow::Result<()> {
        let resp = self
            .http
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Discord webhook returned non-success");
            anyhow::bail!("Discord webhook returned {status}");
        }

        Ok(())
    }
}

#[async_trait]
impl NotifyBackend for DiscordWebhook {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()> {
        let payload = match self.format {
            NotifyFormat::Embed => embed_payload(notification),
            NotifyFormat::Content => content_payload(notification),
        };
        self.post(payload).await
    }

    async fn send_digest(&self, stats: &CycleStats) -> anyhow::Result<()> {
        self.post(digest_payload(stats)).await
    }
}

/// Rich `{"embeds": [...]}` payload.
pub fn embed_payload(notification: &Notification) -> Value {
    let record = notification.record();
    let (heading, color, fields) = match notification {
        Notification::Announced(_) => (
            "🏓 Turneu nou",
            COLOR_NEW,
            record_fields(record)
                .iter()
                .map(|(name, value)| field(name, value))
                .collect(),
        ),
        Notification::Updated { changes, .. } => {
            ("✏️ Turneu actualizat", COLOR_UPDATED, change_fields(changes))
        }
    };

    json!({
        "embeds": [{
            "title": heading,
            "description": truncate(display_title(record), MAX_DESCRIPTION),
            "url": record.forum_url,
            "color": color,
            "fields": fields,
        }]
    })
}

/// Plain `{"content": "..."}` payload.
pub fn content_payload(notification: &Notification) -> Value {
    let record = notification.record();
    let mut lines = Vec::new();

    match notification {
        Notification::Announced(_) => {
            lines.push(format!("🏓 **Turneu nou:** {}", display_title(record)));
            for (name, value) in record_fields(record) {
                lines.push(format!("{name}: {value}"));
            }
        }
        Notification::Updated { changes, .. } => {
            lines.push(format!("✏️ **Turneu actualizat:** {}", display_title(record)));
            for change in changes {
                lines.push(format!("{}: {}", change.field, before_after(change)));
            }
        }
    }
    lines.push(record.forum_url.clone());

    json!({ "content": truncate(&lines.join("\n"), MAX_CONTENT) })
}

/// Per-cycle summary, always as plain content.
pub fn digest_payload(stats: &CycleStats) -> Value {
    let text = match &stats.fetch_error {
        Some(err) => format!("⚠️ Ciclu eșuat: {err}"),
        None => format!("✅ Ciclu încheiat. {stats}"),
    };
    json!({ "content": truncate(&text, MAX_CONTENT) })
}

fn display_title(record: &TournamentRecord) -> &str {
    if record.title.is_empty() {
        record.identity_key.as_str()
    } else {
        &record.title
    }
}

fn record_fields(record: &TournamentRecord) -> Vec<(&'static str, String)> {
    let mut fields = Vec::new();
    if !record.location.is_empty() {
        fields.push(("Locație", record.location.to_string()));
    }
    if let Some(date) = record.scheduled_date {
        let when = match record.scheduled_time {
            Some(time) => format!("{} {}", date.format("%d.%m.%Y"), time.format("%H:%M")),
            None => date.format("%d.%m.%Y").to_string(),
        };
        fields.push(("Data", when));
    }
    if let Some(category) = &record.category {
        fields.push(("Categorie", category.clone()));
    }
    if let Some(author) = &record.author {
        fields.push(("Autor", author.clone()));
    }
    if let Some(maps) = &record.maps_url {
        fields.push(("Hartă", maps.clone()));
    }
    fields
}

fn change_fields(changes: &[FieldChange]) -> Vec<Value> {
    changes
        .iter()
        .map(|c| field(c.field.name(), &before_after(c)))
        .collect()
}

fn before_after(change: &FieldChange) -> String {
    format!(
        "{} → {}",
        change.before.as_deref().unwrap_or(EMPTY),
        change.after.as_deref().unwrap_or(EMPTY)
    )
}

fn field(name: &str, value: &str) -> Value {
    json!({ "name": name, "value": truncate(value, MAX_FIELD_VALUE), "inline": true })
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}
