use crate::core::asset::{TrackedAsset, default_assets};
use crate::core::fetcher::ChangeSource;
use crate::core::format::FormatPolicy;
use crate::core::retry::RetryPolicy;
use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_COINGECKO_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_DISCORD_URL: &str = "https://discord.com/api/v10";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PostStyle {
    Text,
    #[default]
    Embeds,
    Banner,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CoinGeckoConfig {
    #[serde(default = "default_coingecko_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_catalog_timeout_secs")]
    pub catalog_timeout_secs: u64,
}

fn default_coingecko_url() -> String {
    DEFAULT_COINGECKO_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_catalog_timeout_secs() -> u64 {
    20
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        CoinGeckoConfig {
            base_url: default_coingecko_url(),
            timeout_secs: default_timeout_secs(),
            catalog_timeout_secs: default_catalog_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DiscordConfig {
    #[serde(default = "default_discord_url")]
    pub base_url: String,
    /// Bot token; `DISCORD_TOKEN` takes precedence
    pub token: Option<String>,
}

fn default_discord_url() -> String {
    DEFAULT_DISCORD_URL.to_string()
}

impl Default for DiscordConfig {
    fn default() -> Self {
        DiscordConfig {
            base_url: default_discord_url(),
            token: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub coingecko: CoinGeckoConfig,
    #[serde(default)]
    pub discord: DiscordConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy)]
pub struct ScheduleConfig {
    /// Fires at UTC hours divisible by this value, like `0 */N * * *`
    pub every_hours: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig { every_hours: 6 }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig { port: DEFAULT_PORT }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default)]
pub struct ResolverConfig {
    pub ttl_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BrandingConfig {
    pub title: String,
    pub subtitle: String,
    /// PNG drawn into the banner
    pub logo_url: Option<String>,
    /// Image shown as the thumbnail of the buzz embed
    pub thumbnail_url: Option<String>,
}

impl Default for BrandingConfig {
    fn default() -> Self {
        BrandingConfig {
            title: "💎 Crypto Market — USD 💎".to_string(),
            subtitle: "Key coins performance (24h).".to_string(),
            logo_url: None,
            thumbnail_url: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_assets")]
    pub assets: Vec<TrackedAsset>,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub post_style: PostStyle,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub format: FormatPolicy,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub change_source: ChangeSource,
    #[serde(default)]
    pub branding: BrandingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            assets: default_assets(),
            channels: Vec::new(),
            post_style: PostStyle::default(),
            schedule: ScheduleConfig::default(),
            providers: ProvidersConfig::default(),
            server: ServerConfig::default(),
            format: FormatPolicy::default(),
            retry: RetryPolicy::default(),
            resolver: ResolverConfig::default(),
            change_source: ChangeSource::default(),
            branding: BrandingConfig::default(),
        }
    }
}

/// Splits a comma separated channel list, dropping blanks.
pub fn parse_channel_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

impl AppConfig {
    /// Loads the config file at the default location, if any, then applies
    /// environment overrides.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        let config = if config_path.exists() {
            Self::load_from_path(&config_path)?
        } else {
            debug!("No config file at {}, using defaults", config_path.display());
            AppConfig::default()
        };
        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "coinpulse", "coinpulse")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Explicit path when given, default location otherwise.
    pub fn resolve(config_path: Option<&str>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_path(path)?.with_env_overrides(|key| std::env::var(key).ok()),
            None => Self::load(),
        }
    }

    /// Applies `DISCORD_TOKEN`, `CHANNEL_IDS` and `PORT` from `lookup`.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(token) = lookup("DISCORD_TOKEN").filter(|t| !t.trim().is_empty()) {
            self.providers.discord.token = Some(token.trim().to_string());
        }
        if let Some(raw) = lookup("CHANNEL_IDS") {
            let channels = parse_channel_ids(&raw);
            if !channels.is_empty() {
                self.channels = channels;
            }
        }
        if let Some(port) = lookup("PORT").filter(|p| !p.trim().is_empty()) {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid PORT value: {port}"))?;
        }
        if self.schedule.every_hours == 0 || self.schedule.every_hours > 24 {
            bail!(
                "schedule.every_hours must be between 1 and 24, got {}",
                self.schedule.every_hours
            );
        }
        Ok(self)
    }
}
