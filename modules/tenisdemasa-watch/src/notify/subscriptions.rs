use std::collections::BTreeMap;
use std::path::Path;

use tenisdemasa_common::{ConfigError, Location};

use crate::normalize::fold_diacritics;

const CATCH_ALL: &str = "*";

/// Which sinks want notifications for which places.
///
/// Loaded from a JSON object mapping a place name to a list of sink addresses
/// (webhook URLs). Place names match a record's city after diacritic folding
/// and lowercasing; `"*"` receives every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subscriptions {
    by_place: BTreeMap<String, Vec<String>>,
    catch_all: Vec<String>,
}

impl Subscriptions {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Subscriptions(format!("{}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let parsed: BTreeMap<String, Vec<String>> =
            serde_json::from_str(raw).map_err(|e| ConfigError::Subscriptions(e.to_string()))?;
        Ok(Self::from_entries(parsed))
    }

    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<String>)>,
        S: AsRef<str>,
    {
        let mut subs = Self::default();
        for (place, sinks) in entries {
            let sinks = sinks
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty());
            let place = place.as_ref().trim();
            if place == CATCH_ALL {
                subs.catch_all.extend(sinks);
            } else {
                subs.by_place.entry(place_key(place)).or_default().extend(sinks);
            }
        }
        subs
    }

    /// Every sink address mentioned anywhere, deduplicated.
    pub fn all_sinks(&self) -> Vec<&str> {
        dedup(self.by_place.values().flatten().chain(&self.catch_all))
    }

    /// Sinks subscribed to `location`, in file order, each at most once.
    pub fn sinks_for(&self, location: &Location) -> Vec<&str> {
        let place_sinks = location
            .city
            .as_deref()
            .and_then(|city| self.by_place.get(&place_key(city)))
            .into_iter()
            .flatten();
        dedup(place_sinks.chain(&self.catch_all))
    }

    pub fn is_empty(&self) -> bool {
        self.by_place.is_empty() && self.catch_all.is_empty()
    }
}

fn place_key(place: &str) -> String {
    fold_diacritics(place)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn dedup<'a>(sinks: impl Iterator<Item = &'a String>) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::new();
    for sink in sinks {
        if !out.contains(&sink.as_str()) {
            out.push(sink);
        }
    }
    out
}
