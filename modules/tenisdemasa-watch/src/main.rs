use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use browserless_client::BrowserlessClient;
use tenisdemasa_common::{Config, FetchMode};
use tenisdemasa_store::{MemoryStore, SqliteStore, TournamentStore};
use tenisdemasa_watch::{
    extract::item_selector,
    fetch::{BrowserlessPageSource, HttpPageSource, PageSource},
    notify::{DiscordWebhook, Dispatcher, NoopBackend, NotifyBackend, Subscriptions},
    shutdown_channel, ShutdownHandle, WatchSettings, Watcher,
};

#[derive(Parser)]
#[command(name = "tenisdemasa-watch", about = "Watches a tournament listing and notifies on new or changed announcements")]
struct Cli {
    /// Run a single poll cycle and exit
    #[arg(long)]
    once: bool,

    /// Load environment variables from this file instead of ./.env
    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("Failed to load env file {}", path.display()))?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }

    init_tracing()?;
    info!("Tournament watcher starting...");

    let config = Config::from_env()?;
    config.log_redacted();

    let settings = WatchSettings::from_config(&config)
        .with_context(|| format!("Invalid LISTING_URL '{}'", config.listing_url))?;
    let store = open_store(&config.database_url).await?;
    let source = build_source(&config)?;
    let dispatcher = build_dispatcher(&config)?;

    let watcher = Watcher::new(settings, source, store, dispatcher);
    let (handle, signal) = shutdown_channel();

    if cli.once {
        let stats = watcher.run_once(&signal).await;
        info!("Single run complete. {stats}");
        return Ok(());
    }

    tokio::spawn(forward_signals(handle));
    let cycles = watcher.run(signal).await;
    info!(cycles, "Tournament watcher exited");
    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("tenisdemasa=info".parse()?);
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

async fn open_store(database_url: &str) -> Result<Arc<dyn TournamentStore>> {
    if database_url.eq_ignore_ascii_case("memory") {
        warn!("Using in-memory store, state is lost on exit");
        return Ok(Arc::new(MemoryStore::new()));
    }
    let store = SqliteStore::connect(database_url)
        .await
        .context("Failed to open tournament store")?;
    Ok(Arc::new(store))
}

fn build_source(config: &Config) -> Result<Box<dyn PageSource>> {
    let source: Box<dyn PageSource> = match &config.fetch_mode {
        FetchMode::Direct => Box::new(HttpPageSource::new(&config.user_agent, config.http_timeout)?),
        FetchMode::Browserless { url, token } => {
            let client = BrowserlessClient::new(url, token.as_deref(), config.http_timeout)?;
            info!("Fetching through Browserless");
            Box::new(BrowserlessPageSource::new(
                client,
                item_selector(config.listing_layout),
            ))
        }
    };
    Ok(source)
}

fn build_dispatcher(config: &Config) -> Result<Dispatcher> {
    let default_sink: Box<dyn NotifyBackend> = match &config.discord_webhook_url {
        Some(url) => {
            info!("Discord notifications enabled");
            Box::new(DiscordWebhook::new(
                url.clone(),
                config.notify_format,
                config.http_timeout,
            )?)
        }
        None => {
            info!("No DISCORD_WEBHOOK_URL set, notifications are only logged");
            Box::new(NoopBackend)
        }
    };

    let Some(path) = &config.subscriptions_path else {
        return Ok(Dispatcher::new(default_sink));
    };

    let subscriptions = Subscriptions::load(path)?;
    let sinks: HashMap<String, Box<dyn NotifyBackend>> = subscriptions
        .all_sinks()
        .into_iter()
        .map(|address| {
            let backend: Box<dyn NotifyBackend> = Box::new(DiscordWebhook::new(
                address.to_string(),
                config.notify_format,
                config.http_timeout,
            )?);
            Ok((address.to_string(), backend))
        })
        .collect::<Result<_>>()?;
    info!(
        sinks = sinks.len(),
        path = %path.display(),
        "Routing notifications by subscription"
    );
    Ok(Dispatcher::with_subscriptions(default_sink, subscriptions, sinks))
}

/// Trigger shutdown on SIGINT or SIGTERM.
async fn forward_signals(handle: ShutdownHandle) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("Shutdown requested, finishing current item");
    handle.trigger();
}
