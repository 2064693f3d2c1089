pub mod cli;
pub mod core;
pub mod delivery;
pub mod dispatch;
pub mod providers;
pub mod render;
pub mod server;

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::config::{AppConfig, PostStyle};
use crate::core::{QuoteFetcher, ResolvedIds};
use crate::delivery::discord::DiscordClient;
use crate::dispatch::{Dispatcher, Schedule};
use crate::providers::CoinGeckoProvider;

pub enum AppCommand {
    Run,
    Preview { banner_path: Option<PathBuf> },
    Resolve,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("coinpulse starting...");

    let config = AppConfig::resolve(config_path)?;
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Run => run_bot(config).await,
        AppCommand::Preview { banner_path } => preview(&config, banner_path).await,
        AppCommand::Resolve => {
            let fetcher = build_fetcher(&config)?;
            let pb = cli::ui::new_spinner("Resolving provider ids...");
            let resolved = fetcher.resolve(&config.assets).await;
            pb.finish_and_clear();
            println!("{}", cli::preview::resolved_table(&config.assets, &resolved));
            Ok(())
        }
    }
}

/// CoinGecko backed fetcher with the configured retry, TTL and change source.
pub fn build_fetcher(config: &AppConfig) -> Result<QuoteFetcher> {
    let provider = CoinGeckoProvider::new(&config.providers.coingecko)?;
    let ttl = config.resolver.ttl_secs.map(Duration::from_secs);
    Ok(QuoteFetcher::new(
        Arc::new(provider),
        ResolvedIds::new(ttl),
        config.retry,
        config.change_source,
    ))
}

async fn banner_logo(config: &AppConfig) -> Option<Vec<u8>> {
    if config.post_style != PostStyle::Banner {
        return None;
    }
    render::init_fonts();
    let url = config.branding.logo_url.as_deref()?;
    render::fetch_logo(url, &config.retry).await
}

async fn preview(config: &AppConfig, banner_path: Option<PathBuf>) -> Result<()> {
    let fetcher = build_fetcher(config)?;
    let logo = match (&banner_path, config.branding.logo_url.as_deref()) {
        (Some(_), Some(url)) => render::fetch_logo(url, &config.retry).await,
        _ => None,
    };

    cli::preview::run(
        &config.assets,
        &fetcher,
        &config.format,
        &config.branding.title,
        &config.branding.subtitle,
        logo.as_deref(),
        banner_path.as_deref(),
    )
    .await
}

async fn run_bot(config: AppConfig) -> Result<()> {
    let started = Instant::now();

    let token = config
        .providers
        .discord
        .token
        .clone()
        .filter(|t| !t.trim().is_empty())
        .context("DISCORD_TOKEN is not set; refusing to start")?;
    if config.channels.is_empty() {
        warn!("No channels configured; summaries will be built but not posted");
    }

    let fetcher = build_fetcher(&config)?;
    let sink = DiscordClient::new(&config.providers.discord.base_url, &token)?;
    let logo = banner_logo(&config).await;
    let dispatcher = Arc::new(Dispatcher::new(&config, fetcher, Arc::new(sink)).with_logo(logo));

    let resolved = dispatcher.fetcher().resolve(dispatcher.assets()).await;
    info!(count = resolved.len(), "Provider ids resolved");

    let cancel = CancellationToken::new();
    let listener = server::bind(config.server.port).await?;
    let server_task = tokio::spawn(server::serve(listener, started, cancel.clone()));

    let schedule = Schedule::every_hours(config.schedule.every_hours);
    let scheduler = tokio::spawn(Arc::clone(&dispatcher).run(schedule, cancel.clone()));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown requested");
    cancel.cancel();

    scheduler.await.context("Scheduler task panicked")?;
    server_task.await.context("Health server task panicked")?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_requires_token() {
        let mut config = AppConfig::default();
        config.channels = vec!["1".to_string()];

        let err = run_bot(config.clone()).await.unwrap_err();
        assert!(err.to_string().contains("DISCORD_TOKEN is not set"));

        config.providers.discord.token = Some("   ".to_string());
        let err = run_bot(config).await.unwrap_err();
        assert!(err.to_string().contains("DISCORD_TOKEN is not set"));
    }
}
