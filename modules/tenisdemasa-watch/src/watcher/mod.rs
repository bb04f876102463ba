//! The poll loop: fetch, extract, normalize, classify, notify, persist.

mod shutdown;

pub use shutdown::{shutdown_channel, ShutdownHandle, ShutdownSignal};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, Utc};
use tenisdemasa_common::{Config, ListingLayout};
use tenisdemasa_store::TournamentStore;
use tokio::sync::watch;
use tracing::{debug, error, info, info_span, warn, Instrument};
use url::Url;
use uuid::Uuid;

use crate::diff::{classify, lookup, record_to_persist};
use crate::extract::{extract_listing, Extraction, HtmlListing, RawItem};
use crate::fetch::PageSource;
use crate::normalize::normalize;
use crate::notify::{Dispatcher, Notification};
use crate::stats::CycleStats;

/// Where the orchestrator is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    Fetching,
    Processing,
    Waiting,
    Stopped,
}

impl fmt::Display for WatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Fetching => write!(f, "fetching"),
            Self::Processing => write!(f, "processing"),
            Self::Waiting => write!(f, "waiting"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// What the watcher polls and how often.
#[derive(Debug, Clone)]
pub struct WatchSettings {
    pub listing_url: Url,
    pub layout: ListingLayout,
    pub poll_interval: Duration,
    pub run_digest: bool,
}

impl WatchSettings {
    pub fn from_config(config: &Config) -> Result<Self, url::ParseError> {
        Ok(Self {
            listing_url: Url::parse(&config.listing_url)?,
            layout: config.listing_layout,
            poll_interval: config.poll_interval,
            run_digest: config.notify_run_digest,
        })
    }
}

pub struct Watcher {
    settings: WatchSettings,
    source: Box<dyn PageSource>,
    store: Arc<dyn TournamentStore>,
    dispatcher: Dispatcher,
    state: watch::Sender<WatchState>,
}

impl Watcher {
    pub fn new(
        settings: WatchSettings,
        source: Box<dyn PageSource>,
        store: Arc<dyn TournamentStore>,
        dispatcher: Dispatcher,
    ) -> Self {
        let (state, _) = watch::channel(WatchState::Idle);
        Self {
            settings,
            source,
            store,
            dispatcher,
            state,
        }
    }

    /// Observe state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<WatchState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> WatchState {
        *self.state.borrow()
    }

    fn set_state(&self, next: WatchState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            debug!(from = %prev, to = %next, "Watcher state");
        }
    }

    /// Poll until `shutdown` fires. Returns the number of cycles run.
    pub async fn run(&self, mut shutdown: ShutdownSignal) -> u64 {
        info!(
            url = %self.settings.listing_url,
            layout = ?self.settings.layout,
            interval_secs = self.settings.poll_interval.as_secs(),
            "Watcher starting"
        );
        let mut cycles = 0;

        while !shutdown.is_cancelled() {
            self.run_cycle(&shutdown).await;
            cycles += 1;

            if shutdown.is_cancelled() {
                break;
            }
            self.set_state(WatchState::Waiting);
            tokio::select! {
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
                _ = shutdown.cancelled() => break,
            }
        }

        self.set_state(WatchState::Stopped);
        info!(cycles, "Watcher stopped");
        cycles
    }

    /// Run a single cycle and stop.
    pub async fn run_once(&self, shutdown: &ShutdownSignal) -> CycleStats {
        let stats = self.run_cycle(shutdown).await;
        self.set_state(WatchState::Stopped);
        stats
    }

    /// One full fetch-to-persist pass over the listing.
    pub async fn run_cycle(&self, shutdown: &ShutdownSignal) -> CycleStats {
        let cycle_id = Uuid::new_v4();
        let span = info_span!("cycle", %cycle_id);
        async {
            let stats = self.cycle(shutdown).await;
            if stats.fetch_error.is_some() {
                warn!("Cycle aborted. {stats}");
            } else {
                info!("Cycle complete. {stats}");
            }
            if self.settings.run_digest {
                self.dispatcher.send_digest(&stats).await;
            }
            stats
        }
        .instrument(span)
        .await
    }

    async fn cycle(&self, shutdown: &ShutdownSignal) -> CycleStats {
        let mut stats = CycleStats::default();

        self.set_state(WatchState::Fetching);
        let html = match self.source.fetch(self.settings.listing_url.as_str()).await {
            Ok(html) => html,
            Err(e) => {
                error!(error = %e, url = %self.settings.listing_url, "Failed to fetch listing");
                stats.fetch_error = Some(e.to_string());
                return stats;
            }
        };

        self.set_state(WatchState::Processing);
        let extraction = parse_listing(&html, self.settings.layout, &self.settings.listing_url);
        stats.items_found = (extraction.items.len() + extraction.errors.len()) as u64;
        for err in &extraction.errors {
            warn!(error = %err, "Dropped listing item");
            stats.items_dropped += 1;
        }

        let today = Local::now().date_naive();
        let observed_at = Utc::now();
        for raw in &extraction.items {
            if shutdown.is_cancelled() {
                info!("Cancellation requested, stopping at item boundary");
                stats.cancelled = true;
                break;
            }
            self.process_item(raw, today, observed_at, &mut stats).await;
        }

        stats
    }

    /// Classify, notify and persist one item. Failures are logged and
    /// counted; they never end the cycle.
    async fn process_item(
        &self,
        raw: &RawItem,
        today: NaiveDate,
        observed_at: DateTime<Utc>,
        stats: &mut CycleStats,
    ) {
        let record = match normalize(raw, today, observed_at) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, listing_id = ?raw.listing_id, "Dropped listing item");
                stats.items_dropped += 1;
                return;
            }
        };

        let persisted = lookup(self.store.as_ref(), &record.identity_key).await;
        let classification = classify(&record, persisted.as_ref());
        stats.record(&classification);
        debug!(
            identity_key = %record.identity_key,
            listing_id = ?raw.listing_id,
            classification = classification.label(),
            "Classified item"
        );

        if let Some(notification) = Notification::for_classification(&classification, &record) {
            info!(
                identity_key = %record.identity_key,
                kind = notification.kind(),
                title = record.title.as_str(),
                changed = ?classification.changed_fields(),
                "Dispatching notification"
            );
            let report = self.dispatcher.dispatch(&notification).await;
            stats.notifications_delivered += report.delivered;
            stats.notifications_failed += report.failed;
        }

        let to_persist = record_to_persist(&classification, &record, persisted.as_ref());
        match self.store.upsert(&to_persist).await {
            Ok(()) => stats.upserts += 1,
            Err(e) => {
                stats.upsert_failures += 1;
                warn!(
                    error = %e,
                    identity_key = %record.identity_key,
                    "Failed to persist record, skipping until next cycle"
                );
            }
        }
    }
}

/// Parse and extract synchronously; the parsed document is not `Send` and
/// must not live across an await point.
fn parse_listing(html: &str, layout: ListingLayout, base: &Url) -> Extraction {
    let listing = HtmlListing::parse(html);
    extract_listing(&listing, layout, base)
}
