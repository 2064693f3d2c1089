//! Cycle runner: resolve, fetch, format, render, deliver

pub mod schedule;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::core::asset::TrackedAsset;
use crate::core::config::{AppConfig, BrandingConfig, PostStyle};
use crate::core::fetcher::QuoteFetcher;
use crate::core::format::{FormatPolicy, FormattedRow, build_rows};
use crate::delivery::compose::{self, PostContext};
use crate::delivery::{ChatSink, Post};
use crate::render::{BannerInput, BannerRenderer, PngRenderer};
pub use schedule::Schedule;

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Completed {
        rows: usize,
        delivered: usize,
        failed: usize,
    },
    /// Quotes could not be fetched; nothing was sent
    Failed { error: String },
    /// Another cycle was still running
    Skipped,
}

pub struct Dispatcher {
    assets: Vec<TrackedAsset>,
    channels: Vec<String>,
    style: PostStyle,
    branding: BrandingConfig,
    policy: FormatPolicy,
    fetcher: QuoteFetcher,
    sink: Arc<dyn ChatSink>,
    renderer: Arc<dyn BannerRenderer>,
    logo: Option<Vec<u8>>,
    cycle_guard: Mutex<()>,
}

impl Dispatcher {
    pub fn new(config: &AppConfig, fetcher: QuoteFetcher, sink: Arc<dyn ChatSink>) -> Self {
        Dispatcher {
            assets: config.assets.clone(),
            channels: config.channels.clone(),
            style: config.post_style,
            branding: config.branding.clone(),
            policy: config.format,
            fetcher,
            sink,
            renderer: Arc::new(PngRenderer),
            logo: None,
            cycle_guard: Mutex::new(()),
        }
    }

    pub fn with_logo(mut self, logo: Option<Vec<u8>>) -> Self {
        self.logo = logo;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn BannerRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn assets(&self) -> &[TrackedAsset] {
        &self.assets
    }

    pub fn fetcher(&self) -> &QuoteFetcher {
        &self.fetcher
    }

    /// Fetches quotes and formats them without delivering anything.
    pub async fn snapshot_rows(&self) -> anyhow::Result<Vec<FormattedRow>> {
        let snapshot = self.fetcher.fetch(&self.assets).await?;
        Ok(build_rows(&self.assets, &snapshot))
    }

    /// Builds the post for the configured style. A banner that fails to
    /// render downgrades to the plain embed post.
    pub async fn compose(&self, rows: &[FormattedRow], timestamp: DateTime<Utc>) -> Post {
        let ctx = PostContext {
            branding: &self.branding,
            policy: &self.policy,
            timestamp,
        };
        match self.style {
            PostStyle::Text => compose::text_post(rows, &ctx),
            PostStyle::Embeds => compose::embed_post(rows, &ctx),
            PostStyle::Banner => {
                let input = BannerInput {
                    title: &self.branding.title,
                    subtitle: &self.branding.subtitle,
                    rows,
                    policy: &self.policy,
                    logo_png: self.logo.as_deref(),
                };
                match self.renderer.render(&input).await {
                    Ok(png) => compose::banner_post(rows, &ctx, png),
                    Err(e) => {
                        warn!(error = %e, "Banner render failed, sending embeds only");
                        compose::embed_post(rows, &ctx)
                    }
                }
            }
        }
    }

    async fn deliver(&self, post: &Post) -> (usize, usize) {
        let sends = self.channels.iter().map(|channel| async move {
            let result = self.sink.send(channel, post).await;
            if let Err(e) = &result {
                error!(%channel, error = %e, "Couldn't send to channel");
            }
            result.is_ok()
        });

        let results = join_all(sends).await;
        let delivered = results.iter().filter(|ok| **ok).count();
        (delivered, results.len() - delivered)
    }

    /// Runs one full cycle. Skips immediately if a previous cycle still holds
    /// the guard.
    #[instrument(name = "Cycle", skip(self))]
    pub async fn run_cycle(&self) -> CycleOutcome {
        let Ok(_guard) = self.cycle_guard.try_lock() else {
            warn!("Previous cycle still running, skipping this one");
            return CycleOutcome::Skipped;
        };

        let rows = match self.snapshot_rows().await {
            Ok(rows) => rows,
            Err(e) => {
                error!(error = %format!("{e:#}"), "Price fetch failed, skipping cycle");
                return CycleOutcome::Failed {
                    error: format!("{e:#}"),
                };
            }
        };

        let post = self.compose(&rows, Utc::now()).await;
        let (delivered, failed) = self.deliver(&post).await;
        info!(rows = rows.len(), delivered, failed, "Cycle finished");

        CycleOutcome::Completed {
            rows: rows.len(),
            delivered,
            failed,
        }
    }

    /// Startup cycle, then one spawned cycle per schedule tick until
    /// `cancel` fires.
    pub async fn run(self: Arc<Self>, schedule: Schedule, cancel: CancellationToken) {
        self.run_cycle().await;

        let mut last_fire = Utc::now();
        loop {
            // Never earlier than the tick just fired, so an early wakeup can't fire twice
            let now = Utc::now().max(last_fire);
            let next = schedule.next_after(now);
            info!(next = %next, "Next cycle scheduled");
            let wait = schedule.delay_from(now);

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Scheduler stopped");
                    break;
                }
                _ = tokio::time::sleep(wait) => {}
            }

            let dispatcher = Arc::clone(&self);
            tokio::spawn(async move {
                dispatcher.run_cycle().await;
            });
            last_fire = next;
        }
    }
}
