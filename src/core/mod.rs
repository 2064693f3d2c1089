//! Core business logic: assets, quotes, resolution and formatting

pub mod asset;
pub mod config;
pub mod fetcher;
pub mod format;
pub mod log;
pub mod price;
pub mod resolver;
pub mod retry;

// Re-export main types for cleaner imports
pub use asset::TrackedAsset;
pub use fetcher::{ChangeSource, MarketSnapshot, QuoteFetcher};
pub use format::{FormatPolicy, FormattedRow};
pub use price::{CoinListing, PricePoint, PriceProvider, Quote, QuoteMap};
pub use resolver::ResolvedIds;
pub use retry::RetryPolicy;
