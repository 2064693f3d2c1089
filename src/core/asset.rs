//! Tracked assets and the default symbol table

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TrackedAsset {
    pub symbol: String,
    #[serde(alias = "name")]
    pub display_name: String,
    /// Provider identifiers in order of preference. The first one doubles as
    /// the last-resort fallback when nothing else can be confirmed.
    #[serde(alias = "candidates")]
    pub candidate_ids: Vec<String>,
}

impl TrackedAsset {
    pub fn new(symbol: &str, display_name: &str, candidate_ids: &[&str]) -> Self {
        TrackedAsset {
            symbol: symbol.to_string(),
            display_name: display_name.to_string(),
            candidate_ids: candidate_ids.iter().map(|id| id.to_string()).collect(),
        }
    }

    /// Identifier used when no provider confirmation succeeded.
    pub fn fallback_id(&self) -> &str {
        self.candidate_ids
            .first()
            .map_or(self.symbol.as_str(), String::as_str)
    }
}

pub fn default_assets() -> Vec<TrackedAsset> {
    vec![
        TrackedAsset::new("BTC", "Bitcoin", &["bitcoin"]),
        TrackedAsset::new("USDT", "Tether", &["tether"]),
        TrackedAsset::new("ETH", "Ethereum", &["ethereum"]),
        // CoinGecko lists Toncoin under its network name
        TrackedAsset::new("TON", "Toncoin", &["the-open-network", "toncoin"]),
        TrackedAsset::new("NOT", "Notcoin", &["notcoin"]),
        TrackedAsset::new("DOGS", "Dogs", &["dogs", "dogs-2"]),
        TrackedAsset::new("SOL", "Solana", &["solana"]),
    ]
}

/// Deduplicated union of all candidate identifiers, first occurrence wins.
pub fn candidate_union(assets: &[TrackedAsset]) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for id in assets.iter().flat_map(|a| a.candidate_ids.iter()) {
        if !ids.contains(id) {
            ids.push(id.clone());
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_union_preserves_order_and_dedups() {
        let assets = vec![
            TrackedAsset::new("A", "Alpha", &["alpha", "shared"]),
            TrackedAsset::new("B", "Beta", &["shared", "beta"]),
        ];
        assert_eq!(candidate_union(&assets), vec!["alpha", "shared", "beta"]);
    }

    #[test]
    fn test_fallback_id() {
        let asset = TrackedAsset::new("DOGS", "Dogs", &["dogs", "dogs-2"]);
        assert_eq!(asset.fallback_id(), "dogs");

        let empty = TrackedAsset::new("XYZ", "Nothing", &[]);
        assert_eq!(empty.fallback_id(), "XYZ");
    }

    #[test]
    fn test_asset_yaml_aliases() {
        let yaml = r#"
symbol: TON
name: Toncoin
candidates: [the-open-network, toncoin]
"#;
        let asset: TrackedAsset = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(asset, default_assets()[3]);
    }
}
