use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::config::CoinGeckoConfig;
use crate::core::price::{CoinListing, PricePoint, PriceProvider, Quote, QuoteMap};

pub struct CoinGeckoProvider {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
    catalog_timeout: Duration,
}

impl CoinGeckoProvider {
    pub fn new(config: &CoinGeckoConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder()
            .user_agent("coinpulse/0.1")
            .default_headers(headers)
            .build()?;

        Ok(CoinGeckoProvider {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            timeout: Duration::from_secs(config.timeout_secs),
            catalog_timeout: Duration::from_secs(config.catalog_timeout_secs),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<T> {
        debug!("Requesting {} {:?}", url, query);
        let response = self
            .client
            .get(url)
            .query(query)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} URL: {}", e, url))?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {} for URL: {}", response.status(), url));
        }

        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response from {}: {}", url, e))
    }
}

#[derive(Deserialize, Debug)]
struct SimplePrice {
    usd: Option<f64>,
    usd_24h_change: Option<f64>,
}

#[derive(Deserialize, Debug)]
struct MarketChart {
    #[serde(default)]
    prices: Vec<(f64, f64)>,
}

#[async_trait]
impl PriceProvider for CoinGeckoProvider {
    #[instrument(name = "CoinGeckoQuotes", skip(self), fields(count = ids.len()))]
    async fn fetch_quotes(&self, ids: &[String]) -> Result<QuoteMap> {
        if ids.is_empty() {
            return Ok(QuoteMap::new());
        }
        let url = format!("{}/simple/price", self.base_url);
        let joined = ids.join(",");
        let data: HashMap<String, SimplePrice> = self
            .get_json(
                &url,
                &[
                    ("ids", joined.as_str()),
                    ("vs_currencies", "usd"),
                    ("include_24hr_change", "true"),
                ],
                self.timeout,
            )
            .await?;

        let quotes = data
            .into_iter()
            .filter_map(|(id, entry)| {
                let price_usd = entry.usd?;
                Some((
                    id.clone(),
                    Quote {
                        provider_id: id,
                        price_usd,
                        change_24h_pct: entry.usd_24h_change.unwrap_or(0.0),
                    },
                ))
            })
            .collect();
        Ok(quotes)
    }

    #[instrument(name = "CoinGeckoCatalog", skip(self))]
    async fn list_coins(&self) -> Result<Vec<CoinListing>> {
        let url = format!("{}/coins/list", self.base_url);
        self.get_json(&url, &[], self.catalog_timeout).await
    }

    #[instrument(name = "CoinGeckoHistory", skip(self))]
    async fn fetch_history(&self, id: &str, days: u32) -> Result<Vec<PricePoint>> {
        let url = format!("{}/coins/{}/market_chart", self.base_url, id);
        let days = days.to_string();
        let chart: MarketChart = self
            .get_json(
                &url,
                &[("vs_currency", "usd"), ("days", days.as_str())],
                self.timeout,
            )
            .await?;

        Ok(chart
            .prices
            .into_iter()
            .map(|(ts, price)| PricePoint {
                timestamp_ms: ts as i64,
                price,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> CoinGeckoProvider {
        CoinGeckoProvider::new(&CoinGeckoConfig {
            base_url: server.uri(),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_successful_quote_fetch() {
        let mock_server = MockServer::start().await;
        let mock_response = r#"{
            "bitcoin": {"usd": 65000.5, "usd_24h_change": 1.25},
            "tether": {"usd": 1.0},
            "dogs": {}
        }"#;

        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .and(query_param("ids", "bitcoin,tether,dogs"))
            .and(query_param("vs_currencies", "usd"))
            .and(query_param("include_24hr_change", "true"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server);
        let ids = vec!["bitcoin".to_string(), "tether".to_string(), "dogs".to_string()];
        let quotes = provider.fetch_quotes(&ids).await.unwrap();

        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes["bitcoin"].price_usd, 65000.5);
        assert_eq!(quotes["bitcoin"].change_24h_pct, 1.25);
        assert_eq!(quotes["tether"].change_24h_pct, 0.0);
        assert!(!quotes.contains_key("dogs"));
    }

    #[tokio::test]
    async fn test_empty_id_list_skips_request() {
        let mock_server = MockServer::start().await;
        let provider = provider_for(&mock_server);
        let quotes = provider.fetch_quotes(&[]).await.unwrap();
        assert!(quotes.is_empty());
        assert!(mock_server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_quote_api_error_response() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server);
        let result = provider.fetch_quotes(&["bitcoin".to_string()]).await;
        let err = result.unwrap_err().to_string();
        assert!(err.starts_with("HTTP error: 429 Too Many Requests"), "{err}");
    }

    #[tokio::test]
    async fn test_quote_api_malformed_response() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[1, 2, 3]"))
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server);
        let result = provider.fetch_quotes(&["bitcoin".to_string()]).await;
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse JSON response")
        );
    }

    #[tokio::test]
    async fn test_list_coins() {
        let mock_server = MockServer::start().await;
        let mock_response = r#"[
            {"id": "the-open-network", "symbol": "ton", "name": "Toncoin"},
            {"id": "dogs-2", "symbol": "dogs", "name": "Dogs"},
            {"id": "weird"}
        ]"#;
        Mock::given(method("GET"))
            .and(path("/coins/list"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server);
        let coins = provider.list_coins().await.unwrap();
        assert_eq!(coins.len(), 3);
        assert_eq!(coins[1].id, "dogs-2");
        assert_eq!(coins[1].name, "Dogs");
        assert_eq!(coins[2].symbol, "");
    }

    #[tokio::test]
    async fn test_fetch_history() {
        let mock_server = MockServer::start().await;
        let mock_response = r#"{
            "prices": [[1700000000000, 100.0], [1700003600000, 104.5]],
            "market_caps": [],
            "total_volumes": []
        }"#;
        Mock::given(method("GET"))
            .and(path("/coins/bitcoin/market_chart"))
            .and(query_param("vs_currency", "usd"))
            .and(query_param("days", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server);
        let points = provider.fetch_history("bitcoin", 1).await.unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].timestamp_ms, 1_700_000_000_000);
        assert_eq!(points[1].price, 104.5);
    }
}
