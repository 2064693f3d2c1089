//! Pricing abstractions and core types

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Current USD price and 24h change for one provider identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub provider_id: String,
    pub price_usd: f64,
    pub change_24h_pct: f64,
}

/// Quotes keyed by provider identifier.
pub type QuoteMap = HashMap<String, Quote>;

/// One entry of the provider's full coin catalog.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CoinListing {
    pub id: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub timestamp_ms: i64,
    pub price: f64,
}

/// Percent change between the first and the last point of a series.
pub fn change_from_series(points: &[PricePoint]) -> Option<f64> {
    let first = points.first()?.price;
    let last = points.last()?.price;
    if first > 0.0 {
        Some((last - first) / first * 100.0)
    } else {
        None
    }
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Batched quote lookup. Identifiers without a price are left out of the
    /// returned map rather than reported as errors.
    async fn fetch_quotes(&self, ids: &[String]) -> Result<QuoteMap>;

    async fn list_coins(&self) -> Result<Vec<CoinListing>>;

    async fn fetch_history(&self, id: &str, days: u32) -> Result<Vec<PricePoint>>;
}
