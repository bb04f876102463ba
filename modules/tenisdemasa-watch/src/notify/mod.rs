//! Delivery of NEW / CHANGED notifications to webhook sinks.

pub mod backend;
pub mod discord;
pub mod noop;
pub mod subscriptions;

pub use backend::NotifyBackend;
pub use discord::DiscordWebhook;
pub use noop::NoopBackend;
pub use subscriptions::Subscriptions;

use std::collections::HashMap;

use tenisdemasa_common::TournamentRecord;
use tracing::{debug, warn};

use crate::diff::{Classification, FieldChange};
use crate::stats::CycleStats;

/// What gets sent for one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// First time this announcement was seen.
    Announced(TournamentRecord),
    /// A tracked field changed since the last observation.
    Updated {
        record: TournamentRecord,
        changes: Vec<FieldChange>,
    },
}

impl Notification {
    /// `None` for UNCHANGED records, which are never notified.
    pub fn for_classification(
        classification: &Classification,
        record: &TournamentRecord,
    ) -> Option<Self> {
        match classification {
            Classification::New => Some(Self::Announced(record.clone())),
            Classification::Changed(changes) => Some(Self::Updated {
                record: record.clone(),
                changes: changes.clone(),
            }),
            Classification::Unchanged => None,
        }
    }

    pub fn record(&self) -> &TournamentRecord {
        match self {
            Self::Announced(record) | Self::Updated { record, .. } => record,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Announced(_) => "new",
            Self::Updated { .. } => "updated",
        }
    }
}

/// Outcome of dispatching one notification.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub attempted: u64,
    pub delivered: u64,
    pub failed: u64,
}

enum Routing {
    /// Everything goes to the default sink.
    Default,
    /// Each record goes to the sinks subscribed to its city.
    Subscribed {
        subscriptions: Subscriptions,
        sinks: HashMap<String, Box<dyn NotifyBackend>>,
    },
}

/// Routes notifications to sinks. Delivery is best-effort: each sink is tried
/// once, in order, and a failure is logged without affecting the others.
pub struct Dispatcher {
    default_sink: Box<dyn NotifyBackend>,
    routing: Routing,
}

impl Dispatcher {
    /// All notifications go to `default_sink`.
    pub fn new(default_sink: Box<dyn NotifyBackend>) -> Self {
        Self {
            default_sink,
            routing: Routing::Default,
        }
    }

    /// Route by subscription. `sinks` maps each address named in
    /// `subscriptions` to its backend; addresses without a backend are skipped.
    /// The default sink still receives run digests.
    pub fn with_subscriptions(
        default_sink: Box<dyn NotifyBackend>,
        subscriptions: Subscriptions,
        sinks: HashMap<String, Box<dyn NotifyBackend>>,
    ) -> Self {
        for address in subscriptions.all_sinks() {
            if !sinks.contains_key(address) {
                warn!(sink = address, "Subscribed sink has no backend, it will be skipped");
            }
        }
        Self {
            default_sink,
            routing: Routing::Subscribed {
                subscriptions,
                sinks,
            },
        }
    }

    fn sinks_for<'a>(&'a self, record: &TournamentRecord) -> Vec<(&'a str, &'a dyn NotifyBackend)> {
        match &self.routing {
            Routing::Default => vec![("default", self.default_sink.as_ref())],
            Routing::Subscribed {
                subscriptions,
                sinks,
            } => subscriptions
                .sinks_for(&record.location)
                .into_iter()
                .filter_map(|address| {
                    sinks
                        .get_key_value(address)
                        .map(|(k, backend)| (k.as_str(), backend.as_ref()))
                })
                .collect(),
        }
    }

    /// Send `notification` to every sink it routes to, sequentially.
    pub async fn dispatch(&self, notification: &Notification) -> DispatchReport {
        let record = notification.record();
        let targets = self.sinks_for(record);
        let mut report = DispatchReport::default();

        if targets.is_empty() {
            debug!(identity_key = %record.identity_key, "No sink subscribed to this record");
        }

        for (name, sink) in targets {
            report.attempted += 1;
            match sink.send(notification).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        error = %e,
                        sink = redact_sink(name),
                        identity_key = %record.identity_key,
                        kind = notification.kind(),
                        "Failed to send notification"
                    );
                }
            }
        }

        report
    }

    /// Send the cycle summary to the default sink.
    pub async fn send_digest(&self, stats: &CycleStats) {
        if let Err(e) = self.default_sink.send_digest(stats).await {
            warn!(error = %e, "Failed to send digest notification");
        }
    }
}

/// Webhook URLs embed their secret token; only the host reaches the logs.
fn redact_sink(address: &str) -> String {
    match url::Url::parse(address) {
        Ok(url) => url.host_str().unwrap_or("unknown").to_string(),
        Err(_) => address.to_string(),
    }
}
