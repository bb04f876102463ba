use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

// --- Identity ---

/// Stable natural key of an announcement.
///
/// Canonical form is the trailing numeric topic id of the forum URL
/// (`.../node/31245` or `.../topic/31245-cupa-x` both give `31245`). URLs
/// without a numeric trailing segment fall back to the normalized URL itself:
/// lowercased scheme and host, no fragment, no trailing slash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityKey(String);

impl IdentityKey {
    /// Derive the key from an absolute http(s) URL. Returns `None` when the
    /// URL cannot be parsed, so the announcement cannot be tracked.
    pub fn from_url(raw: &str) -> Option<Self> {
        let mut url = Url::parse(raw.trim()).ok()?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return None;
        }

        if let Some(id) = trailing_numeric_id(&url) {
            return Some(Self(id.to_string()));
        }

        url.set_fragment(None);
        let path = url.path().trim_end_matches('/').to_string();
        url.set_path(&path);
        Some(Self(url.as_str().trim_end_matches('/').to_string()))
    }

    /// Rehydrate a key that was already canonicalized (e.g. read back from storage).
    pub fn from_stored(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn trailing_numeric_id(url: &Url) -> Option<u64> {
    let segment = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let digits_len = segment.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits_len == 0 {
        return None;
    }
    let rest = &segment[digits_len..];
    if !rest.is_empty() && !rest.starts_with('-') {
        return None;
    }
    segment[..digits_len].parse().ok()
}

// --- Location ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub city: Option<String>,
    pub venue: Option<String>,
}

impl Location {
    pub fn new(city: Option<String>, venue: Option<String>) -> Self {
        Self {
            city: city.filter(|s| !s.is_empty()),
            venue: venue.filter(|s| !s.is_empty()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.city.is_none() && self.venue.is_none()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.city, &self.venue) {
            (Some(city), Some(venue)) => write!(f, "{city} ({venue})"),
            (Some(city), None) => f.write_str(city),
            (None, Some(venue)) => f.write_str(venue),
            (None, None) => Ok(()),
        }
    }
}

// --- Records ---

/// One observed tournament announcement, in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TournamentRecord {
    pub identity_key: IdentityKey,
    pub forum_url: String,
    pub title: String,
    pub category: Option<String>,
    pub location: Location,
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_time: Option<NaiveTime>,
    pub author: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub reply_count: Option<u32>,
    pub last_post_by: Option<String>,
    pub last_post_at: Option<NaiveDateTime>,
    pub maps_url: Option<String>,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

impl TournamentRecord {
    /// Fold a fresh observation into this persisted record. Identity and
    /// `first_seen_at` are kept; every observed field is taken from `observed`.
    pub fn apply_observation(&self, observed: &TournamentRecord) -> TournamentRecord {
        TournamentRecord {
            identity_key: self.identity_key.clone(),
            first_seen_at: self.first_seen_at,
            ..observed.clone()
        }
    }

    /// Same record with only `last_seen_at` advanced.
    pub fn seen_at(&self, at: DateTime<Utc>) -> TournamentRecord {
        TournamentRecord {
            last_seen_at: at,
            ..self.clone()
        }
    }
}

impl fmt::Display for TournamentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.title, self.forum_url)?;
        if let Some(category) = &self.category {
            write!(f, " [{category}]")?;
        }
        Ok(())
    }
}
