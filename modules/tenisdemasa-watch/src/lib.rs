pub mod diff;
pub mod extract;
pub mod fetch;
pub mod normalize;
pub mod notify;
pub mod stats;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod watcher;

pub use diff::{classify, Classification, FieldChange, TrackedField, TRACKED_FIELDS};
pub use stats::CycleStats;
pub use watcher::{shutdown_channel, ShutdownHandle, ShutdownSignal, WatchSettings, WatchState, Watcher};
