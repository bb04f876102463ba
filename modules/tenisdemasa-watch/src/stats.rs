use std::fmt;

use crate::diff::Classification;

/// Counters for one poll cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleStats {
    pub items_found: u64,
    pub items_dropped: u64,
    pub new: u64,
    pub changed: u64,
    pub unchanged: u64,
    pub notifications_delivered: u64,
    pub notifications_failed: u64,
    pub upserts: u64,
    pub upsert_failures: u64,
    /// Set when the page could not be fetched and the cycle was aborted.
    pub fetch_error: Option<String>,
    /// Set when cancellation stopped the cycle at an item boundary.
    pub cancelled: bool,
}

impl CycleStats {
    pub fn record(&mut self, classification: &Classification) {
        match classification {
            Classification::New => self.new += 1,
            Classification::Changed(_) => self.changed += 1,
            Classification::Unchanged => self.unchanged += 1,
        }
    }

    pub fn processed(&self) -> u64 {
        self.new + self.changed + self.unchanged
    }
}

impl fmt::Display for CycleStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(err) = &self.fetch_error {
            return write!(f, "Fetch failed: {err}");
        }
        write!(
            f,
            "Items: {} found, {} dropped. New: {}, changed: {}, unchanged: {}. \
             Notifications: {} delivered, {} failed. Upserts: {} ok, {} failed",
            self.items_found,
            self.items_dropped,
            self.new,
            self.changed,
            self.unchanged,
            self.notifications_delivered,
            self.notifications_failed,
            self.upserts,
            self.upsert_failures,
        )?;
        if self.cancelled {
            f.write_str(" (cancelled)")?;
        }
        Ok(())
    }
}
