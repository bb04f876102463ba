//! Change detection against the persisted store.

use std::fmt;

use tenisdemasa_common::{IdentityKey, TournamentRecord};
use tenisdemasa_store::TournamentStore;
use tracing::warn;

/// Fields whose change makes a record CHANGED. Everything else (reply count,
/// last post time, author, ...) is refreshed silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackedField {
    Title,
    Category,
    Location,
    ScheduledDate,
    ScheduledTime,
    LastPostBy,
}

pub const TRACKED_FIELDS: [TrackedField; 6] = [
    TrackedField::Title,
    TrackedField::Category,
    TrackedField::Location,
    TrackedField::ScheduledDate,
    TrackedField::ScheduledTime,
    TrackedField::LastPostBy,
];

impl TrackedField {
    pub fn name(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Category => "category",
            Self::Location => "location",
            Self::ScheduledDate => "scheduled_date",
            Self::ScheduledTime => "scheduled_time",
            Self::LastPostBy => "last_post_by",
        }
    }

    /// Exact, case-sensitive inequality.
    fn differs(self, a: &TournamentRecord, b: &TournamentRecord) -> bool {
        match self {
            Self::Title => a.title != b.title,
            Self::Category => a.category != b.category,
            Self::Location => a.location != b.location,
            Self::ScheduledDate => a.scheduled_date != b.scheduled_date,
            Self::ScheduledTime => a.scheduled_time != b.scheduled_time,
            Self::LastPostBy => a.last_post_by != b.last_post_by,
        }
    }

    /// Human-readable value for notifications.
    fn display(self, r: &TournamentRecord) -> Option<String> {
        match self {
            Self::Title => Some(r.title.clone()).filter(|t| !t.is_empty()),
            Self::Category => r.category.clone(),
            Self::Location => (!r.location.is_empty()).then(|| r.location.to_string()),
            Self::ScheduledDate => r.scheduled_date.map(|d| d.format("%d.%m.%Y").to_string()),
            Self::ScheduledTime => r.scheduled_time.map(|t| t.format("%H:%M").to_string()),
            Self::LastPostBy => r.last_post_by.clone(),
        }
    }
}

impl fmt::Display for TrackedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One tracked field that differs between the persisted and the observed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: TrackedField,
    pub before: Option<String>,
    pub after: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    New,
    Changed(Vec<FieldChange>),
    Unchanged,
}

impl Classification {
    pub fn changed_fields(&self) -> Vec<TrackedField> {
        match self {
            Self::Changed(changes) => changes.iter().map(|c| c.field).collect(),
            _ => Vec::new(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Changed(_) => "changed",
            Self::Unchanged => "unchanged",
        }
    }
}

/// Classify an observed record against what the store holds for its key.
pub fn classify(observed: &TournamentRecord, persisted: Option<&TournamentRecord>) -> Classification {
    let Some(persisted) = persisted else {
        return Classification::New;
    };

    let changes: Vec<FieldChange> = TRACKED_FIELDS
        .iter()
        .filter(|field| field.differs(persisted, observed))
        .map(|&field| FieldChange {
            field,
            before: field.display(persisted),
            after: field.display(observed),
        })
        .collect();

    if changes.is_empty() {
        Classification::Unchanged
    } else {
        Classification::Changed(changes)
    }
}

/// Look up the persisted record for `key`. A failed lookup or a record stored
/// under a different key counts as absent, so the observation is treated as new.
pub async fn lookup(store: &dyn TournamentStore, key: &IdentityKey) -> Option<TournamentRecord> {
    match store.get(key).await {
        Ok(Some(record)) if record.identity_key == *key => Some(record),
        Ok(Some(record)) => {
            warn!(
                identity_key = %key,
                stored_key = %record.identity_key,
                "Store returned a record for a different key, treating as new"
            );
            None
        }
        Ok(None) => None,
        Err(e) => {
            warn!(identity_key = %key, error = %e, "Store lookup failed, treating as new");
            None
        }
    }
}

/// The record to write back after classification.
///
/// NEW stores the observation, CHANGED folds it into the persisted record,
/// UNCHANGED only advances `last_seen_at`.
pub fn record_to_persist(
    classification: &Classification,
    observed: &TournamentRecord,
    persisted: Option<&TournamentRecord>,
) -> TournamentRecord {
    match (classification, persisted) {
        (Classification::Changed(_), Some(persisted)) => persisted.apply_observation(observed),
        (Classification::Unchanged, Some(persisted)) => persisted.seen_at(observed.last_seen_at),
        _ => observed.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use tenisdemasa_common::Location;
    use tenisdemasa_store::{MemoryStore, StoreError};

    fn record() -> TournamentRecord {
        let seen = Utc.with_ymd_and_hms(2025, 3, 20, 8, 0, 0).unwrap();
        TournamentRecord {
            identity_key: IdentityKey::from_stored("31245"),
            forum_url: "https://www.tenisdemasa.ro/forum/node/31245".into(),
            title: "Cupa Sucevei".into(),
            category: Some("Turnee".into()),
            location: Location::new(Some("Suceava".into()), None),
            scheduled_date: NaiveDate::from_ymd_opt(2025, 3, 22),
            scheduled_time: None,
            author: Some("organizator".into()),
            created_at: None,
            reply_count: Some(3),
            last_post_by: Some("jucator".into()),
            last_post_at: None,
            maps_url: None,
            first_seen_at: seen,
            last_seen_at: seen,
        }
    }

    #[test]
    fn absent_is_new() {
        assert_eq!(classify(&record(), None), Classification::New);
    }

    #[test]
    fn identical_tracked_fields_are_unchanged() {
        let persisted = record();
        let mut observed = record();
        observed.reply_count = Some(10);
        observed.author = Some("altcineva".into());
        observed.last_seen_at = observed.last_seen_at + Duration::minutes(1);
        assert_eq!(classify(&observed, Some(&persisted)), Classification::Unchanged);
    }

    #[test]
    fn category_change_is_reported_alone() {
        let persisted = record();
        let mut observed = record();
        observed.category = Some("Rezultate".into());

        let c = classify(&observed, Some(&persisted));
        assert_eq!(c.changed_fields(), vec![TrackedField::Category]);
        let Classification::Changed(changes) = c else { panic!("expected changed") };
        assert_eq!(changes[0].before.as_deref(), Some("Turnee"));
        assert_eq!(changes[0].after.as_deref(), Some("Rezultate"));
    }

    #[test]
    fn comparison_is_case_sensitive() {
        let persisted = record();
        let mut observed = record();
        observed.title = "CUPA SUCEVEI".into();
        assert_eq!(classify(&observed, Some(&persisted)).changed_fields(), vec![TrackedField::Title]);
    }

    #[test]
    fn multiple_fields_in_fixed_order() {
        let persisted = record();
        let mut observed = record();
        observed.last_post_by = None;
        observed.scheduled_date = NaiveDate::from_ymd_opt(2025, 3, 29);
        observed.location = Location::new(Some("Suceava".into()), Some("Sala Polivalenta".into()));

        let c = classify(&observed, Some(&persisted));
        assert_eq!(
            c.changed_fields(),
            vec![TrackedField::Location, TrackedField::ScheduledDate, TrackedField::LastPostBy]
        );
        let Classification::Changed(changes) = c else { panic!("expected changed") };
        assert_eq!(changes[1].after.as_deref(), Some("29.03.2025"));
        assert_eq!(changes[2].after, None);
    }

    #[test]
    fn persisted_record_keeps_identity_and_first_seen() {
        let persisted = record();
        let mut observed = record();
        observed.category = Some("Rezultate".into());
        observed.first_seen_at = persisted.first_seen_at + Duration::days(2);
        observed.last_seen_at = observed.first_seen_at;

        let c = classify(&observed, Some(&persisted));
        let out = record_to_persist(&c, &observed, Some(&persisted));
        assert_eq!(out.first_seen_at, persisted.first_seen_at);
        assert_eq!(out.last_seen_at, observed.last_seen_at);
        assert_eq!(out.category.as_deref(), Some("Rezultate"));
    }

    #[test]
    fn unchanged_only_advances_last_seen() {
        let persisted = record();
        let mut observed = record();
        observed.reply_count = Some(99);
        observed.last_seen_at = persisted.last_seen_at + Duration::minutes(1);

        let out = record_to_persist(&Classification::Unchanged, &observed, Some(&persisted));
        assert_eq!(out.reply_count, Some(3));
        assert_eq!(out.last_seen_at, observed.last_seen_at);
    }

    #[tokio::test]
    async fn lookup_finds_persisted() {
        let store = MemoryStore::with_records([record()]);
        let found = lookup(&store, &IdentityKey::from_stored("31245")).await;
        assert_eq!(found, Some(record()));
        assert_eq!(lookup(&store, &IdentityKey::from_stored("1")).await, None);
    }

    struct BrokenStore;

    #[async_trait::async_trait]
    impl TournamentStore for BrokenStore {
        async fn get(&self, _key: &IdentityKey) -> tenisdemasa_store::Result<Option<TournamentRecord>> {
            Err(StoreError::Unavailable("disk full".into()))
        }
        async fn upsert(&self, _record: &TournamentRecord) -> tenisdemasa_store::Result<()> {
            Err(StoreError::Unavailable("disk full".into()))
        }
    }

    struct MislabelledStore;

    #[async_trait::async_trait]
    impl TournamentStore for MislabelledStore {
        async fn get(&self, _key: &IdentityKey) -> tenisdemasa_store::Result<Option<TournamentRecord>> {
            Ok(Some(record()))
        }
        async fn upsert(&self, _record: &TournamentRecord) -> tenisdemasa_store::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn failed_or_malformed_lookup_is_absent() {
        let key = IdentityKey::from_stored("777");
        assert_eq!(lookup(&BrokenStore, &key).await, None);
        assert_eq!(lookup(&MislabelledStore, &key).await, None);
    }
}
