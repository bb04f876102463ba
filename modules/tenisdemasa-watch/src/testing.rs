//! Test doubles and fixtures. Compiled for unit tests and, via the
//! `test-support` feature, for integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tenisdemasa_common::{IdentityKey, Location, TournamentRecord};
use tenisdemasa_store::{StoreError, TournamentStore};

use crate::fetch::{FetchError, PageSource};
use crate::notify::{Notification, NotifyBackend};
use crate::stats::CycleStats;
use crate::watcher::ShutdownHandle;

// --- Page source ---

/// Serves a fixed page (or failure) that tests can swap between cycles.
#[derive(Clone)]
pub struct MockPageSource {
    page: Arc<Mutex<Result<String, String>>>,
    fetches: Arc<AtomicUsize>,
}

impl MockPageSource {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            page: Arc::new(Mutex::new(Ok(html.into()))),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        let source = Self::new(String::new());
        source.set_failure(message);
        source
    }

    pub fn set_page(&self, html: impl Into<String>) {
        *self.page.lock().unwrap() = Ok(html.into());
    }

    pub fn set_failure(&self, message: impl Into<String>) {
        *self.page.lock().unwrap() = Err(message.into());
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageSource for MockPageSource {
    async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.page.lock().unwrap().clone().map_err(FetchError::Other)
    }
}

// --- Sinks ---

/// Records everything it is asked to send.
#[derive(Clone, Default)]
pub struct RecordingSink {
    sent: Arc<Mutex<Vec<Notification>>>,
    digests: Arc<Mutex<Vec<CycleStats>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn digests(&self) -> Vec<CycleStats> {
        self.digests.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
        self.digests.lock().unwrap().clear();
    }
}

#[async_trait]
impl NotifyBackend for RecordingSink {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }

    async fn send_digest(&self, stats: &CycleStats) -> anyhow::Result<()> {
        self.digests.lock().unwrap().push(stats.clone());
        Ok(())
    }
}

/// Fails every delivery, counting attempts.
#[derive(Clone, Default)]
pub struct FailingSink {
    attempts: Arc<AtomicUsize>,
}

impl FailingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotifyBackend for FailingSink {
    async fn send(&self, _notification: &Notification) -> anyhow::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("webhook returned 500 Internal Server Error")
    }

    async fn send_digest(&self, _stats: &CycleStats) -> anyhow::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("webhook returned 500 Internal Server Error")
    }
}

/// Requests shutdown on its first delivery, then records like
/// [`RecordingSink`].
pub struct CancellingSink {
    handle: ShutdownHandle,
    inner: RecordingSink,
}

impl CancellingSink {
    pub fn new(handle: ShutdownHandle, inner: RecordingSink) -> Self {
        Self { handle, inner }
    }
}

#[async_trait]
impl NotifyBackend for CancellingSink {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()> {
        self.handle.trigger();
        self.inner.send(notification).await
    }

    async fn send_digest(&self, stats: &CycleStats) -> anyhow::Result<()> {
        self.inner.send_digest(stats).await
    }
}

// --- Store ---

/// A store whose every operation fails.
#[derive(Default)]
pub struct FailingStore;

#[async_trait]
impl TournamentStore for FailingStore {
    async fn get(&self, _key: &IdentityKey) -> tenisdemasa_store::Result<Option<TournamentRecord>> {
        Err(StoreError::Unavailable("database is locked".into()))
    }

    async fn upsert(&self, _record: &TournamentRecord) -> tenisdemasa_store::Result<()> {
        Err(StoreError::Unavailable("database is locked".into()))
    }
}

// --- Fixtures ---

/// A canonical record with only identity, title and timestamps filled in.
pub fn sample_record(id: u64, title: &str) -> TournamentRecord {
    let seen = Utc.with_ymd_and_hms(2025, 3, 20, 8, 0, 0).unwrap();
    TournamentRecord {
        identity_key: IdentityKey::from_stored(id.to_string()),
        forum_url: format!("https://www.tenisdemasa.ro/forum/node/{id}"),
        title: title.to_string(),
        category: None,
        location: Location::default(),
        scheduled_date: None,
        scheduled_time: None,
        author: None,
        created_at: None,
        reply_count: None,
        last_post_by: None,
        last_post_at: None,
        maps_url: None,
        first_seen_at: seen,
        last_seen_at: seen,
    }
}

/// One forum topic row.
#[derive(Debug, Clone)]
pub struct Topic {
    pub id: u64,
    pub title: String,
    pub category: String,
    pub author: String,
    pub replies: u32,
    pub last_post_by: String,
}

impl Topic {
    pub fn new(id: u64, title: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            category: "AmaTur: Turnee".to_string(),
            author: "organizator".to_string(),
            replies: 0,
            last_post_by: "organizator".to_string(),
        }
    }

    pub fn category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    pub fn replies(mut self, replies: u32) -> Self {
        self.replies = replies;
        self
    }

    pub fn last_post_by(mut self, name: &str) -> Self {
        self.last_post_by = name.to_string();
        self
    }
}

/// A forum listing page with one `tr.topic-item` row per topic.
pub fn forum_page(topics: &[Topic]) -> String {
    let rows: String = topics
        .iter()
        .map(|t| {
            format!(
                r#"<tr class="topic-item">
  <td>
    <a class="js-topic-prefix">{category}</a>
    <a class="topic-title" href="/forum/node/{id}">{title}</a>
    <div class="topic-info">de <a href="/member/1">{author}</a>, <span class="date">15.mar.2025, 10:00</span></div>
  </td>
  <td><div class="posts-count">{replies} răspunsuri</div></td>
  <td><div class="lastpost-by"><a href="/member/2">{last}</a></div><span class="post-date">16.mar.2025, 12:30</span></td>
</tr>
"#,
                id = t.id,
                title = t.title,
                category = t.category,
                author = t.author,
                replies = t.replies,
                last = t.last_post_by,
            )
        })
        .collect();
    format!("<html><body><table>\n{rows}</table></body></html>")
}
