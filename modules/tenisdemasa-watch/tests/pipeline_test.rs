//! End-to-end poll cycles against a mock page source, mostly over the
//! in-memory store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tenisdemasa_common::{IdentityKey, ListingLayout};
use tenisdemasa_store::{MemoryStore, SqliteStore, TournamentStore};
use tenisdemasa_watch::notify::{Dispatcher, Notification, NotifyBackend, Subscriptions};
use tenisdemasa_watch::testing::{
    forum_page, CancellingSink, FailingSink, FailingStore, MockPageSource, RecordingSink, Topic,
};
use tenisdemasa_watch::{shutdown_channel, TrackedField, WatchSettings, WatchState, Watcher};
use url::Url;

fn settings() -> WatchSettings {
    WatchSettings {
        listing_url: Url::parse("https://www.tenisdemasa.ro/forum/node/25?filter_sort=created")
            .unwrap(),
        layout: ListingLayout::ForumRow,
        poll_interval: Duration::from_millis(20),
        run_digest: false,
    }
}

fn two_topics() -> Vec<Topic> {
    vec![
        Topic::new(31245, "Cupa Sucevei, 22 martie 2025"),
        Topic::new(31300, "Open Iasi 05.04.2025 ora 09:30").category("AmaTur: Anunturi"),
    ]
}

struct Harness {
    source: MockPageSource,
    store: Arc<MemoryStore>,
    sink: RecordingSink,
    watcher: Watcher,
}

fn harness(page: String) -> Harness {
    let source = MockPageSource::new(page);
    let store = Arc::new(MemoryStore::new());
    let sink = RecordingSink::new();
    let watcher = Watcher::new(
        settings(),
        Box::new(source.clone()),
        store.clone(),
        Dispatcher::new(Box::new(sink.clone())),
    );
    Harness {
        source,
        store,
        sink,
        watcher,
    }
}

#[tokio::test]
async fn new_then_unchanged_then_changed() {
    let h = harness(forum_page(&two_topics()));
    let (_handle, signal) = shutdown_channel();

    // First sighting: both announced and stored.
    let stats = h.watcher.run_cycle(&signal).await;
    assert_eq!(stats.new, 2);
    assert_eq!(stats.upserts, 2);
    assert_eq!(h.sink.sent().len(), 2);
    assert!(h.sink.sent().iter().all(|n| matches!(n, Notification::Announced(_))));
    let keys: Vec<String> = h
        .store
        .records()
        .iter()
        .map(|r| r.identity_key.to_string())
        .collect();
    assert_eq!(keys, ["31245", "31300"]);

    // Identical content: nothing to say.
    h.sink.clear();
    let stats = h.watcher.run_cycle(&signal).await;
    assert_eq!(stats.unchanged, 2);
    assert_eq!(stats.new + stats.changed, 0);
    assert!(h.sink.sent().is_empty());

    // One category edited.
    let mut topics = two_topics();
    topics[0] = topics[0].clone().category("AmaTur: Rezultate");
    h.source.set_page(forum_page(&topics));
    let stats = h.watcher.run_cycle(&signal).await;
    assert_eq!(stats.changed, 1);
    assert_eq!(stats.unchanged, 1);

    let sent = h.sink.sent();
    assert_eq!(sent.len(), 1);
    let Notification::Updated { record, changes } = &sent[0] else {
        panic!("expected an update notification");
    };
    assert_eq!(record.identity_key, IdentityKey::from_stored("31245"));
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].field, TrackedField::Category);
    assert_eq!(changes[0].before.as_deref(), Some("Turnee"));
    assert_eq!(changes[0].after.as_deref(), Some("Rezultate"));

    let stored = h
        .store
        .get(&IdentityKey::from_stored("31245"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.category.as_deref(), Some("Rezultate"));
}

#[tokio::test]
async fn untracked_noise_is_refreshed_silently() {
    let h = harness(forum_page(&two_topics()));
    let (_handle, signal) = shutdown_channel();
    h.watcher.run_cycle(&signal).await;
    let first = h.store.get(&IdentityKey::from_stored("31300")).await.unwrap().unwrap();
    h.sink.clear();

    let mut topics = two_topics();
    topics[1] = topics[1].clone().replies(17);
    h.source.set_page(forum_page(&topics));
    let stats = h.watcher.run_cycle(&signal).await;

    assert_eq!(stats.unchanged, 2);
    assert!(h.sink.sent().is_empty());
    let second = h.store.get(&IdentityKey::from_stored("31300")).await.unwrap().unwrap();
    assert_eq!(second.first_seen_at, first.first_seen_at);
    assert!(second.last_seen_at >= first.last_seen_at);
    assert_eq!(h.store.len(), 2);
}

#[tokio::test]
async fn parsed_fields_reach_the_store() {
    let h = harness(forum_page(&two_topics()));
    let (_handle, signal) = shutdown_channel();
    h.watcher.run_cycle(&signal).await;

    let iasi = h.store.get(&IdentityKey::from_stored("31300")).await.unwrap().unwrap();
    assert_eq!(iasi.forum_url, "https://www.tenisdemasa.ro/forum/node/31300");
    assert_eq!(iasi.category.as_deref(), Some("Anunturi"));
    assert_eq!(iasi.location.city.as_deref(), Some("Iasi"));
    assert_eq!(iasi.scheduled_date.map(|d| d.to_string()).as_deref(), Some("2025-04-05"));
    assert_eq!(iasi.scheduled_time.map(|t| t.to_string()).as_deref(), Some("09:30:00"));
    assert_eq!(iasi.reply_count, Some(0));
    assert_eq!(iasi.last_post_by.as_deref(), Some("organizator"));
}

#[tokio::test]
async fn failing_sink_does_not_stop_other_sinks_or_records() {
    let failing = FailingSink::new();
    let recording = RecordingSink::new();
    let subscriptions = Subscriptions::from_entries([("*", vec!["broken".into(), "ok".into()])]);
    let mut sinks: HashMap<String, Box<dyn NotifyBackend>> = HashMap::new();
    sinks.insert("broken".into(), Box::new(failing.clone()));
    sinks.insert("ok".into(), Box::new(recording.clone()));

    let store = Arc::new(MemoryStore::new());
    let watcher = Watcher::new(
        settings(),
        Box::new(MockPageSource::new(forum_page(&two_topics()))),
        store.clone(),
        Dispatcher::with_subscriptions(Box::new(RecordingSink::new()), subscriptions, sinks),
    );
    let (_handle, signal) = shutdown_channel();
    let stats = watcher.run_cycle(&signal).await;

    assert_eq!(failing.attempts(), 2);
    assert_eq!(recording.sent().len(), 2);
    assert_eq!(stats.notifications_failed, 2);
    assert_eq!(stats.notifications_delivered, 2);
    // Failed delivery is not retried, and the records are still persisted.
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn fetch_failure_aborts_only_the_cycle() {
    let h = harness(String::new());
    h.source.set_failure("503 Service Unavailable");
    let (_handle, signal) = shutdown_channel();

    let stats = h.watcher.run_cycle(&signal).await;
    assert!(stats.fetch_error.is_some());
    assert_eq!(stats.processed(), 0);
    assert!(h.store.is_empty());

    h.source.set_page(forum_page(&two_topics()));
    let stats = h.watcher.run_cycle(&signal).await;
    assert_eq!(stats.fetch_error, None);
    assert_eq!(stats.new, 2);
}

#[tokio::test]
async fn store_failures_are_isolated_per_item() {
    let sink = RecordingSink::new();
    let watcher = Watcher::new(
        settings(),
        Box::new(MockPageSource::new(forum_page(&two_topics()))),
        Arc::new(FailingStore),
        Dispatcher::new(Box::new(sink.clone())),
    );
    let (_handle, signal) = shutdown_channel();
    let stats = watcher.run_cycle(&signal).await;

    // A failed lookup counts as absent, so both are NEW; persistence is skipped.
    assert_eq!(stats.new, 2);
    assert_eq!(stats.upsert_failures, 2);
    assert_eq!(stats.upserts, 0);
    assert_eq!(sink.sent().len(), 2);
}

#[tokio::test]
async fn items_without_links_are_dropped() {
    let mut page = forum_page(&two_topics());
    page = page.replace(
        "</table>",
        r#"<tr class="topic-item"><td><span>Anunt fara link</span></td></tr></table>"#,
    );
    let h = harness(page);
    let (_handle, signal) = shutdown_channel();
    let stats = h.watcher.run_cycle(&signal).await;

    assert_eq!(stats.items_found, 3);
    assert_eq!(stats.items_dropped, 1);
    assert_eq!(stats.new, 2);
}

#[tokio::test]
async fn cancellation_reaches_stopped() {
    let h = harness(forum_page(&two_topics()));
    let mut states = h.watcher.subscribe_state();
    let (handle, signal) = shutdown_channel();

    let watcher = Arc::new(h.watcher);
    let runner = {
        let watcher = watcher.clone();
        tokio::spawn(async move { watcher.run(signal).await })
    };

    // Let at least one cycle finish, then cancel during the wait.
    tokio::time::timeout(Duration::from_secs(5), async {
        while *states.borrow_and_update() != WatchState::Waiting {
            states.changed().await.unwrap();
        }
    })
    .await
    .expect("watcher should reach the wait phase");
    handle.trigger();

    let cycles = tokio::time::timeout(Duration::from_secs(5), runner)
        .await
        .expect("watcher should stop")
        .unwrap();
    assert!(cycles >= 1);
    assert_eq!(watcher.state(), WatchState::Stopped);
    assert!(h.source.fetch_count() >= 1);
    assert_eq!(h.store.len(), 2);
}

#[tokio::test]
async fn cancellation_mid_cycle_stops_at_next_item() {
    let topics = vec![
        Topic::new(31245, "Cupa Sucevei, 22 martie 2025"),
        Topic::new(31300, "Open Iasi 05.04.2025"),
        Topic::new(31310, "Memorialul Bacau 12.04.2025"),
    ];
    let (handle, signal) = shutdown_channel();
    let recording = RecordingSink::new();
    let store = Arc::new(MemoryStore::new());
    let watcher = Watcher::new(
        settings(),
        Box::new(MockPageSource::new(forum_page(&topics))),
        store.clone(),
        Dispatcher::new(Box::new(CancellingSink::new(handle, recording.clone()))),
    );

    let stats = watcher.run_cycle(&signal).await;

    // The item in flight finishes, including its upsert; the rest wait.
    assert!(stats.cancelled);
    assert_eq!(stats.items_found, 3);
    assert_eq!(stats.processed(), 1);
    assert_eq!(stats.upserts, 1);
    assert_eq!(recording.sent().len(), 1);
    assert_eq!(store.len(), 1);
    assert!(store.get(&IdentityKey::from_stored("31245")).await.unwrap().is_some());
}

#[tokio::test]
async fn sqlite_store_round_trips_across_cycles() {
    let store = Arc::new(SqliteStore::connect("sqlite::memory:").await.unwrap());
    let sink = RecordingSink::new();
    let watcher = Watcher::new(
        settings(),
        Box::new(MockPageSource::new(forum_page(&two_topics()))),
        store.clone(),
        Dispatcher::new(Box::new(sink.clone())),
    );
    let (_handle, signal) = shutdown_channel();

    let stats = watcher.run_cycle(&signal).await;
    assert_eq!(stats.new, 2);
    assert_eq!(stats.upserts, 2);
    assert_eq!(store.count().await.unwrap(), 2);

    // Dates and times read back from SQLite compare equal to fresh parses.
    sink.clear();
    let stats = watcher.run_cycle(&signal).await;
    assert_eq!(stats.unchanged, 2);
    assert_eq!(stats.new + stats.changed, 0);
    assert!(sink.sent().is_empty());

    let iasi = store.get(&IdentityKey::from_stored("31300")).await.unwrap().unwrap();
    assert_eq!(iasi.scheduled_date.map(|d| d.to_string()).as_deref(), Some("2025-04-05"));
    assert_eq!(iasi.scheduled_time.map(|t| t.to_string()).as_deref(), Some("09:30:00"));
    assert_eq!(
        iasi.created_at.map(|t| t.to_string()).as_deref(),
        Some("2025-03-15 10:00:00")
    );
    assert!(iasi.last_seen_at >= iasi.first_seen_at);
}
