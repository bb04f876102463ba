//! Pure text transforms from raw bundles to canonical records.
//!
//! Nothing here performs I/O, and every function returns a value for any
//! input: a pattern that does not match leaves its field empty.

pub mod datetime;
pub mod diacritics;
pub mod location;

pub use datetime::{extract_schedule, parse_timestamp, DateRule, Schedule, DATE_RULES};
pub use diacritics::fold_diacritics;
pub use location::{
    extract_location, extract_location_with, LocationRule, LOCATION_BLOCK_RULES, LOCATION_RULES,
};

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use tenisdemasa_common::{IdentityKey, Location, TournamentRecord};

use crate::extract::{ExtractionError, LocationOrigin, RawItem};

static RE_CATEGORY_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*AmaTur:\s*").unwrap());

/// Build the canonical record for one raw bundle observed at `observed_at`.
///
/// `today` resolves relative dates (`Astăzi`, `Ieri`). Fails only when the
/// bundle has no link or no identity key can be derived from it; such an
/// item never reaches change detection.
pub fn normalize(
    raw: &RawItem,
    today: NaiveDate,
    observed_at: DateTime<Utc>,
) -> Result<TournamentRecord, ExtractionError> {
    let link = raw
        .link
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .ok_or(ExtractionError::MissingLink { index: 0 })?;
    let identity_key = IdentityKey::from_url(link).ok_or_else(|| ExtractionError::NoIdentity {
        link: link.to_string(),
    })?;

    let title = raw.title.clone().unwrap_or_default();
    let schedule = extract_schedule(&title, today);

    Ok(TournamentRecord {
        identity_key,
        forum_url: link.to_string(),
        category: raw.category.as_deref().and_then(clean_category),
        location: normalize_location(raw),
        scheduled_date: schedule.date,
        scheduled_time: schedule.time,
        author: non_empty(raw.author.as_deref()),
        created_at: raw
            .created_text
            .as_deref()
            .and_then(|t| parse_timestamp(t, today)),
        reply_count: raw.replies_text.as_deref().and_then(parse_reply_count),
        last_post_by: non_empty(raw.last_post_by.as_deref()),
        last_post_at: raw
            .last_post_text
            .as_deref()
            .and_then(|t| parse_timestamp(t, today)),
        maps_url: non_empty(raw.maps_url.as_deref()),
        first_seen_at: observed_at,
        last_seen_at: observed_at,
        title,
    })
}

fn normalize_location(raw: &RawItem) -> Location {
    match (&raw.location_text, raw.location_origin) {
        (None, _) => Location::default(),
        (Some(text), LocationOrigin::Block) => extract_location_with(text, &LOCATION_BLOCK_RULES),
        (Some(text), LocationOrigin::Title) => extract_location(text),
    }
}

/// Strip the `AmaTur:` topic prefix the forum puts in front of categories.
pub fn clean_category(raw: &str) -> Option<String> {
    let cleaned = RE_CATEGORY_PREFIX.replace(raw, "");
    non_empty(Some(&*cleaned))
}

/// Leading integer of a reply-count string such as `12 răspunsuri` or `1.204`.
pub fn parse_reply_count(raw: &str) -> Option<u32> {
    let token = raw.split_whitespace().next()?;
    let digits: String = token
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
