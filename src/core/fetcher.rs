//! Batched quote fetching for the tracked assets

use crate::core::asset::TrackedAsset;
use crate::core::price::{PriceProvider, QuoteMap, change_from_series};
use crate::core::resolver::{ResolvedIds, resolve_ids};
use crate::core::retry::RetryPolicy;
use anyhow::{Context, Result};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Where the 24h change figure comes from.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum ChangeSource {
    /// The provider's own `usd_24h_change` field
    #[default]
    Native,
    /// First-to-last change over the provider's price series
    History { days: u32 },
}

/// Quotes of one cycle together with the mapping used to request them.
#[derive(Debug, Clone, Default)]
pub struct MarketSnapshot {
    pub ids: HashMap<String, String>,
    pub quotes: QuoteMap,
}

pub struct QuoteFetcher {
    provider: Arc<dyn PriceProvider>,
    resolved: ResolvedIds,
    retry: RetryPolicy,
    change_source: ChangeSource,
}

impl QuoteFetcher {
    pub fn new(
        provider: Arc<dyn PriceProvider>,
        resolved: ResolvedIds,
        retry: RetryPolicy,
        change_source: ChangeSource,
    ) -> Self {
        Self {
            provider,
            resolved,
            retry,
            change_source,
        }
    }

    pub fn resolved(&self) -> &ResolvedIds {
        &self.resolved
    }

    pub async fn resolve(&self, assets: &[TrackedAsset]) -> HashMap<String, String> {
        resolve_ids(self.provider.as_ref(), assets, &self.resolved).await
    }

    /// Fetches quotes for every resolved asset in one batched request,
    /// resolving identifiers first when the mapping is empty or expired.
    #[instrument(name = "FetchQuotes", skip_all)]
    pub async fn fetch(&self, assets: &[TrackedAsset]) -> Result<MarketSnapshot> {
        if self.resolved.is_stale().await {
            self.resolve(assets).await;
        }
        let ids = self.resolved.snapshot().await;

        let mut request: Vec<String> = Vec::new();
        for asset in assets {
            if let Some(id) = ids.get(&asset.symbol) {
                if !request.contains(id) {
                    request.push(id.clone());
                }
            }
        }
        debug!(?request, "Requesting quotes");

        let provider = self.provider.as_ref();
        let request_ref = &request;
        let mut quotes = self
            .retry
            .run(move || async move { provider.fetch_quotes(request_ref).await })
            .await
            .context("Quote fetch failed after retries")?;

        if let ChangeSource::History { days } = self.change_source {
            self.apply_history(&mut quotes, days).await;
        }

        Ok(MarketSnapshot { ids, quotes })
    }

    async fn apply_history(&self, quotes: &mut QuoteMap, days: u32) {
        let provider = self.provider.as_ref();
        let ids: Vec<String> = quotes.keys().cloned().collect();
        let lookups = ids.into_iter().map(|id| async move {
            let series = provider.fetch_history(&id, days).await;
            (id, series)
        });

        for (id, series) in join_all(lookups).await {
            match series {
                Ok(points) => match change_from_series(&points) {
                    Some(change) => {
                        if let Some(quote) = quotes.get_mut(&id) {
                            quote.change_24h_pct = change;
                        }
                    }
                    None => debug!(%id, "Series too short, keeping native change"),
                },
                Err(e) => warn!(%id, error = %e, "History lookup failed, keeping native change"),
            }
        }
    }
}
