//! Market data providers

pub mod coingecko;

pub use coingecko::CoinGeckoProvider;
