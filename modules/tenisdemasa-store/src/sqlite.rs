// SQLite persistence for tournament records.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::info;

use tenisdemasa_common::{IdentityKey, Location, TournamentRecord};

use crate::error::{Result, StoreError};
use crate::TournamentStore;

pub struct SqliteStore {
    pool: SqlitePool,
}

/// A row from the tournaments table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct StoredTournament {
    identity_key: String,
    forum_url: String,
    title: String,
    category: Option<String>,
    city: Option<String>,
    venue: Option<String>,
    scheduled_date: Option<NaiveDate>,
    scheduled_time: Option<NaiveTime>,
    author: Option<String>,
    created_at: Option<NaiveDateTime>,
    reply_count: Option<i64>,
    last_post_by: Option<String>,
    last_post_at: Option<NaiveDateTime>,
    maps_url: Option<String>,
    first_seen_at: DateTime<Utc>,
    last_seen_at: DateTime<Utc>,
}

impl StoredTournament {
    fn into_record(self) -> Result<TournamentRecord> {
        if self.forum_url.trim().is_empty() {
            return Err(StoreError::Malformed {
                key: self.identity_key,
                reason: "empty forum_url".to_string(),
            });
        }
        Ok(TournamentRecord {
            identity_key: IdentityKey::from_stored(self.identity_key),
            forum_url: self.forum_url,
            title: self.title,
            category: self.category,
            location: Location::new(self.city, self.venue),
            scheduled_date: self.scheduled_date,
            scheduled_time: self.scheduled_time,
            author: self.author,
            created_at: self.created_at,
            reply_count: self.reply_count.and_then(|n| u32::try_from(n).ok()),
            last_post_by: self.last_post_by,
            last_post_at: self.last_post_at,
            maps_url: self.maps_url,
            first_seen_at: self.first_seen_at,
            last_seen_at: self.last_seen_at,
        })
    }
}

impl SqliteStore {
    /// Open (creating if needed) the database at `url` and run migrations.
    ///
    /// The pool holds a single connection: there is one writer, and an
    /// in-memory database only lives as long as its connection.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await?;
        let store = Self::new(pool);
        store.migrate().await?;
        info!("Tournament store ready");
        Ok(store)
    }

    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Total number of persisted records.
    pub async fn count(&self) -> Result<i64> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tournaments")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}

#[async_trait]
impl TournamentStore for SqliteStore {
    async fn get(&self, key: &IdentityKey) -> Result<Option<TournamentRecord>> {
        let row = sqlx::query_as::<_, StoredTournament>(
            r#"
            SELECT * FROM tournaments
            WHERE identity_key = ?1
            "#,
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(StoredTournament::into_record).transpose()
    }

    async fn upsert(&self, record: &TournamentRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tournaments
                (identity_key, forum_url, title, category, city, venue,
                 scheduled_date, scheduled_time, author, created_at, reply_count,
                 last_post_by, last_post_at, maps_url, first_seen_at, last_seen_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            ON CONFLICT (identity_key) DO UPDATE SET
                forum_url      = excluded.forum_url,
                title          = excluded.title,
                category       = excluded.category,
                city           = excluded.city,
                venue          = excluded.venue,
                scheduled_date = excluded.scheduled_date,
                scheduled_time = excluded.scheduled_time,
                author         = excluded.author,
                created_at     = excluded.created_at,
                reply_count    = excluded.reply_count,
                last_post_by   = excluded.last_post_by,
                last_post_at   = excluded.last_post_at,
                maps_url       = excluded.maps_url,
                last_seen_at   = excluded.last_seen_at
            "#,
        )
        .bind(record.identity_key.as_str())
        .bind(&record.forum_url)
        .bind(&record.title)
        .bind(&record.category)
        .bind(&record.location.city)
        .bind(&record.location.venue)
        .bind(record.scheduled_date)
        .bind(record.scheduled_time)
        .bind(&record.author)
        .bind(record.created_at)
        .bind(record.reply_count.map(i64::from))
        .bind(&record.last_post_by)
        .bind(record.last_post_at)
        .bind(&record.maps_url)
        .bind(record.first_seen_at)
        .bind(record.last_seen_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
