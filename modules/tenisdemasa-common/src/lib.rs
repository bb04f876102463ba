pub mod types;
pub mod config;
pub mod error;

pub use types::*;
pub use config::{Config, FetchMode, ListingLayout, NotifyFormat};
pub use error::ConfigError;
