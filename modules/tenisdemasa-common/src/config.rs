use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::error::ConfigError;

const DEFAULT_LISTING_URL: &str =
    "https://www.tenisdemasa.ro/forum/node/25?filter_sort=created&filter_time=time_today";
const DEFAULT_DATABASE_URL: &str = "sqlite://tournaments.db?mode=rwc";

/// Which page layout the listing uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingLayout {
    /// Card listing: `#load_data .l1.lx` blocks with title, location and link blocks.
    Card,
    /// Forum topic table: one `tr.topic-item` row per announcement.
    ForumRow,
}

impl FromStr for ListingLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "card" => Ok(Self::Card),
            "forum-row" | "forum_row" | "forum" => Ok(Self::ForumRow),
            other => Err(format!("unknown layout '{other}' (expected card or forum-row)")),
        }
    }
}

/// How the listing page is retrieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchMode {
    /// Plain HTTP GET.
    Direct,
    /// Rendered through a Browserless `/content` endpoint.
    Browserless { url: String, token: Option<String> },
}

/// Shape of the webhook payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyFormat {
    /// `{"embeds": [...]}` with title, fields and color.
    Embed,
    /// `{"content": "..."}`.
    Content,
}

impl FromStr for NotifyFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "embed" | "embeds" | "rich" => Ok(Self::Embed),
            "content" | "simple" | "text" => Ok(Self::Content),
            other => Err(format!("unknown format '{other}' (expected embed or content)")),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Listing
    pub listing_url: String,
    pub listing_layout: ListingLayout,
    pub fetch_mode: FetchMode,
    pub user_agent: String,
    pub http_timeout: Duration,

    // Scheduling
    pub poll_interval: Duration,

    // Storage
    pub database_url: String,

    // Notifications
    pub discord_webhook_url: Option<String>,
    pub subscriptions_path: Option<PathBuf>,
    pub notify_format: NotifyFormat,
    pub notify_run_digest: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let fetch_mode = match optional_env("FETCH_MODE")
            .unwrap_or_else(|| "direct".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "direct" => FetchMode::Direct,
            "browserless" => FetchMode::Browserless {
                url: required_env("BROWSERLESS_URL")?,
                token: optional_env("BROWSERLESS_TOKEN"),
            },
            other => {
                return Err(ConfigError::Invalid {
                    key: "FETCH_MODE",
                    reason: format!("unknown mode '{other}' (expected direct or browserless)"),
                })
            }
        };

        Ok(Self {
            listing_url: optional_env("LISTING_URL")
                .unwrap_or_else(|| DEFAULT_LISTING_URL.to_string()),
            listing_layout: parsed_env("LISTING_LAYOUT", ListingLayout::ForumRow)?,
            fetch_mode,
            user_agent: optional_env("USER_AGENT").unwrap_or_else(|| {
                format!("tenisdemasa-watch/{}", env!("CARGO_PKG_VERSION"))
            }),
            http_timeout: Duration::from_secs(parsed_env("HTTP_TIMEOUT_SECS", 30u64)?),
            poll_interval: Duration::from_secs(parsed_env("POLL_INTERVAL_SECS", 60u64)?),
            database_url: optional_env("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            discord_webhook_url: optional_env("DISCORD_WEBHOOK_URL"),
            subscriptions_path: optional_env("SUBSCRIPTIONS_PATH").map(PathBuf::from),
            notify_format: parsed_env("NOTIFY_FORMAT", NotifyFormat::Embed)?,
            notify_run_digest: parse_bool("NOTIFY_RUN_DIGEST", optional_env("NOTIFY_RUN_DIGEST"))?,
        })
    }

    /// Log the effective configuration with credentials and webhook URLs masked.
    pub fn log_redacted(&self) {
        let fetch = match &self.fetch_mode {
            FetchMode::Direct => "direct".to_string(),
            FetchMode::Browserless { url, token } => format!(
                "browserless({url}, token={})",
                if token.is_some() { "set" } else { "unset" }
            ),
        };
        info!(
            listing_url = self.listing_url.as_str(),
            layout = ?self.listing_layout,
            fetch = fetch.as_str(),
            poll_interval_secs = self.poll_interval.as_secs(),
            http_timeout_secs = self.http_timeout.as_secs(),
            database_url = redact_url(&self.database_url).as_str(),
            discord_webhook = if self.discord_webhook_url.is_some() { "set" } else { "unset" },
            subscriptions = ?self.subscriptions_path,
            notify_format = ?self.notify_format,
            notify_run_digest = self.notify_run_digest,
            "Loaded configuration"
        );
    }
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn required_env(key: &'static str) -> Result<String, ConfigError> {
    optional_env(key).ok_or(ConfigError::Missing(key))
}

fn parsed_env<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional_env(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
    }
}

fn parse_bool(key: &'static str, raw: Option<String>) -> Result<bool, ConfigError> {
    match raw.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                key,
                reason: format!("'{v}' is not a boolean"),
            }),
        },
    }
}

/// Strip userinfo from a URL-like string so passwords never reach the logs.
fn redact_url(raw: &str) -> String {
    match (raw.find("://"), raw.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &raw[..scheme_end], &raw[at..])
        }
        _ => raw.to_string(),
    }
}
