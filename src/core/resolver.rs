//! Symbol to provider identifier resolution

use crate::core::asset::{TrackedAsset, candidate_union};
use crate::core::price::{CoinListing, PriceProvider};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

#[derive(Default)]
struct ResolvedState {
    ids: HashMap<String, String>,
    resolved_at: Option<Instant>,
}

/// Resolved `symbol -> provider id` mapping shared across cycles
///
/// Entries are only ever added or overwritten. With a TTL the whole mapping
/// is reported stale once it is older than the TTL, which makes the next
/// cycle resolve again.
#[derive(Clone)]
pub struct ResolvedIds {
    inner: Arc<RwLock<ResolvedState>>,
    ttl: Option<Duration>,
}

impl ResolvedIds {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ResolvedState::default())),
            ttl,
        }
    }

    pub async fn snapshot(&self) -> HashMap<String, String> {
        self.inner.read().await.ids.clone()
    }

    /// True when nothing has been resolved yet or the TTL has elapsed.
    pub async fn is_stale(&self) -> bool {
        let state = self.inner.read().await;
        if state.ids.is_empty() {
            return true;
        }
        match (self.ttl, state.resolved_at) {
            (Some(ttl), Some(at)) => at.elapsed() >= ttl,
            _ => false,
        }
    }

    pub(crate) async fn merge(&self, resolved: HashMap<String, String>) {
        let mut state = self.inner.write().await;
        state.ids.extend(resolved);
        state.resolved_at = Some(Instant::now());
    }
}

impl Default for ResolvedIds {
    fn default() -> Self {
        Self::new(None)
    }
}

fn match_listing<'a>(asset: &TrackedAsset, listings: &'a [CoinListing]) -> Option<&'a str> {
    let name = asset.display_name.to_lowercase();
    let symbol = asset.symbol.to_lowercase();
    listings
        .iter()
        .find(|c| c.name.to_lowercase() == name)
        .or_else(|| listings.iter().find(|c| c.symbol.to_lowercase() == symbol))
        .map(|c| c.id.as_str())
}

/// Resolves every tracked symbol and merges the result into `state`.
///
/// Never fails: a symbol that cannot be confirmed against the provider ends up
/// mapped to its first candidate.
#[instrument(name = "ResolveIds", skip_all, fields(assets = assets.len()))]
pub async fn resolve_ids(
    provider: &dyn PriceProvider,
    assets: &[TrackedAsset],
    state: &ResolvedIds,
) -> HashMap<String, String> {
    let mut resolved: HashMap<String, String> = HashMap::new();

    let candidates = candidate_union(assets);
    match provider.fetch_quotes(&candidates).await {
        Ok(quotes) => {
            for asset in assets {
                if let Some(id) = asset.candidate_ids.iter().find(|id| quotes.contains_key(*id)) {
                    resolved.insert(asset.symbol.clone(), id.clone());
                }
            }
        }
        Err(e) => warn!(error = %e, "Candidate lookup failed, falling back to catalog"),
    }

    let unresolved: Vec<&TrackedAsset> = assets
        .iter()
        .filter(|a| !resolved.contains_key(&a.symbol))
        .collect();

    if !unresolved.is_empty() {
        debug!(count = unresolved.len(), "Resolving remaining symbols from catalog");
        match provider.list_coins().await {
            Ok(listings) => {
                for asset in unresolved {
                    let id = match_listing(asset, &listings).unwrap_or_else(|| asset.fallback_id());
                    resolved.insert(asset.symbol.clone(), id.to_string());
                }
            }
            Err(e) => {
                warn!(error = %e, "Catalog lookup failed, using first candidates");
                for asset in unresolved {
                    resolved.insert(asset.symbol.clone(), asset.fallback_id().to_string());
                }
            }
        }
    }

    info!(?resolved, "Resolved provider identifiers");
    state.merge(resolved.clone()).await;
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::price::{PricePoint, Quote, QuoteMap};
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockProvider {
        priced: Vec<&'static str>,
        listings: Option<Vec<CoinListing>>,
        fail_quotes: bool,
        list_calls: AtomicUsize,
    }

    impl MockProvider {
        fn new(priced: Vec<&'static str>) -> Self {
            Self {
                priced,
                listings: Some(Vec::new()),
                fail_quotes: false,
                list_calls: AtomicUsize::new(0),
            }
        }
    }

    fn listing(id: &str, symbol: &str, name: &str) -> CoinListing {
        CoinListing {
            id: id.to_string(),
            symbol: symbol.to_string(),
            name: name.to_string(),
        }
    }

    #[async_trait]
    impl PriceProvider for MockProvider {
        async fn fetch_quotes(&self, ids: &[String]) -> Result<QuoteMap> {
            if self.fail_quotes {
                return Err(anyhow!("network down"));
            }
            Ok(ids
                .iter()
                .filter(|id| self.priced.contains(&id.as_str()))
                .map(|id| {
                    (
                        id.clone(),
                        Quote {
                            provider_id: id.clone(),
                            price_usd: 1.0,
                            change_24h_pct: 0.0,
                        },
                    )
                })
                .collect())
        }

        async fn list_coins(&self) -> Result<Vec<CoinListing>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            self.listings.clone().ok_or_else(|| anyhow!("catalog down"))
        }

        async fn fetch_history(&self, _id: &str, _days: u32) -> Result<Vec<PricePoint>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_first_priced_candidate_wins() {
        let provider = MockProvider::new(vec!["dogs-2"]);
        let assets = vec![TrackedAsset::new("DOGS", "Dogs", &["dogs", "dogs-2"])];
        let state = ResolvedIds::default();

        let resolved = resolve_ids(&provider, &assets, &state).await;

        assert_eq!(resolved["DOGS"], "dogs-2");
        assert_eq!(state.snapshot().await["DOGS"], "dogs-2");
        assert_eq!(provider.list_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_candidate_order_is_preference_order() {
        let provider = MockProvider::new(vec!["the-open-network", "toncoin"]);
        let assets = vec![TrackedAsset::new(
            "TON",
            "Toncoin",
            &["the-open-network", "toncoin"],
        )];
        let resolved = resolve_ids(&provider, &assets, &ResolvedIds::default()).await;
        assert_eq!(resolved["TON"], "the-open-network");
    }

    #[tokio::test]
    async fn test_catalog_matches_name_before_symbol() {
        let mut provider = MockProvider::new(vec![]);
        provider.listings = Some(vec![
            listing("not-by-symbol", "not", "Something Else"),
            listing("notcoin-real", "xyz", "NOTCOIN"),
        ]);
        let assets = vec![TrackedAsset::new("NOT", "Notcoin", &["notcoin"])];

        let resolved = resolve_ids(&provider, &assets, &ResolvedIds::default()).await;
        assert_eq!(resolved["NOT"], "notcoin-real");
    }

    #[tokio::test]
    async fn test_catalog_symbol_match_and_fallback() {
        let mut provider = MockProvider::new(vec![]);
        provider.fail_quotes = true;
        provider.listings = Some(vec![listing("solana-x", "SOL", "Not Solana")]);
        let assets = vec![
            TrackedAsset::new("SOL", "Solana", &["solana"]),
            TrackedAsset::new("ZZZ", "Unknown", &["zzz-1", "zzz-2"]),
        ];

        let resolved = resolve_ids(&provider, &assets, &ResolvedIds::default()).await;
        assert_eq!(resolved["SOL"], "solana-x");
        assert_eq!(resolved["ZZZ"], "zzz-1");
    }

    #[tokio::test]
    async fn test_everything_down_falls_back_to_first_candidate() {
        let mut provider = MockProvider::new(vec![]);
        provider.fail_quotes = true;
        provider.listings = None;
        let assets = vec![
            TrackedAsset::new("DOGS", "Dogs", &["dogs", "dogs-2"]),
            TrackedAsset::new("BTC", "Bitcoin", &["bitcoin"]),
        ];
        let state = ResolvedIds::default();

        let resolved = resolve_ids(&provider, &assets, &state).await;

        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved["DOGS"], "dogs");
        assert_eq!(resolved["BTC"], "bitcoin");
        assert!(!state.is_stale().await);
    }

    #[tokio::test]
    async fn test_state_staleness_with_ttl() {
        let state = ResolvedIds::new(Some(Duration::from_millis(10)));
        assert!(state.is_stale().await);

        state
            .merge(HashMap::from([("BTC".to_string(), "bitcoin".to_string())]))
            .await;
        assert!(!state.is_stale().await);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(state.is_stale().await);
        // Stale entries remain readable until overwritten
        assert_eq!(state.snapshot().await["BTC"], "bitcoin");
    }
}
