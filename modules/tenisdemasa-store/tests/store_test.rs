//! Behaviour shared by both store backends: get/upsert round trips,
//! identity immutability, and first-seen preservation.

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use tenisdemasa_common::{IdentityKey, Location, TournamentRecord};
use tenisdemasa_store::{MemoryStore, SqliteStore, TournamentStore};

fn record(id: &str, title: &str, seen_hour: u32) -> TournamentRecord {
    let seen = Utc.with_ymd_and_hms(2025, 3, 20, seen_hour, 0, 0).unwrap();
    TournamentRecord {
        identity_key: IdentityKey::from_stored(id),
        forum_url: format!("https://www.tenisdemasa.ro/forum/node/{id}"),
        title: title.to_string(),
        category: Some("Turnee".to_string()),
        location: Location::new(Some("Suceava".into()), Some("Sala Polivalenta".into())),
        scheduled_date: NaiveDate::from_ymd_opt(2025, 3, 22),
        scheduled_time: NaiveTime::from_hms_opt(10, 0, 0),
        author: Some("organizator".to_string()),
        created_at: NaiveDate::from_ymd_opt(2025, 3, 15).and_then(|d| d.and_hms_opt(0, 3, 0)),
        reply_count: Some(4),
        last_post_by: Some("jucator".to_string()),
        last_post_at: None,
        maps_url: None,
        first_seen_at: seen,
        last_seen_at: seen,
    }
}

async fn sqlite() -> SqliteStore {
    SqliteStore::connect("sqlite::memory:").await.unwrap()
}

async fn exercise_round_trip(store: &dyn TournamentStore) {
    let key = IdentityKey::from_stored("31245");
    assert!(store.get(&key).await.unwrap().is_none());

    let original = record("31245", "Cupa Sucevei 22 martie 2025", 8);
    store.upsert(&original).await.unwrap();

    let loaded = store.get(&key).await.unwrap().unwrap();
    assert_eq!(loaded, original);
}

async fn exercise_update_keeps_first_seen(store: &dyn TournamentStore) {
    let first = record("7", "Cupa Iasi", 8);
    store.upsert(&first).await.unwrap();

    let mut later = record("7", "Cupa Iasi - amanat", 9);
    later.first_seen_at = later.last_seen_at;
    store.upsert(&later).await.unwrap();

    let loaded = store.get(&IdentityKey::from_stored("7")).await.unwrap().unwrap();
    assert_eq!(loaded.title, "Cupa Iasi - amanat");
    assert_eq!(loaded.first_seen_at, first.first_seen_at);
    assert_eq!(loaded.last_seen_at, later.last_seen_at);
}

#[tokio::test]
async fn memory_round_trip() {
    exercise_round_trip(&MemoryStore::new()).await;
}

#[tokio::test]
async fn memory_update_keeps_first_seen() {
    let store = MemoryStore::new();
    exercise_update_keeps_first_seen(&store).await;
    assert_eq!(store.len(), 1);
    assert_eq!(store.upsert_count(), 2);
}

#[tokio::test]
async fn sqlite_round_trip() {
    exercise_round_trip(&sqlite().await).await;
}

#[tokio::test]
async fn sqlite_update_keeps_first_seen() {
    let store = sqlite().await;
    exercise_update_keeps_first_seen(&store).await;
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn sqlite_optional_fields_survive_as_absent() {
    let store = sqlite().await;
    let mut sparse = record("99", "Anunt", 8);
    sparse.category = None;
    sparse.location = Location::default();
    sparse.scheduled_date = None;
    sparse.scheduled_time = None;
    sparse.reply_count = None;
    store.upsert(&sparse).await.unwrap();

    let loaded = store.get(&IdentityKey::from_stored("99")).await.unwrap().unwrap();
    assert!(loaded.location.is_empty());
    assert_eq!(loaded.category, None);
    assert_eq!(loaded.reply_count, None);
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let store = sqlite().await;
    store.migrate().await.unwrap();
    store.upsert(&record("1", "A", 8)).await.unwrap();
    store.migrate().await.unwrap();
    assert_eq!(store.count().await.unwrap(), 1);
}
