// src/config.rs
//! Runtime configuration: TOML file with env overrides for secrets.
//!
//! Load order:
//! 1) $WILDFIRE_CONFIG_PATH
//! 2) config/wildfire.toml
//! 3) built-in defaults
//!
//! API keys and social credentials are never read from the TOML file alone;
//! the matching env vars, when set, always win.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::sources::FanoutPolicy;

const ENV_PATH: &str = "WILDFIRE_CONFIG_PATH";
const DEFAULT_PATH: &str = "config/wildfire.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub fires: FiresConfig,
    pub incidents: IncidentsConfig,
    pub air: AirConfig,
    pub news: NewsConfig,
    pub social: SocialConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 4000 }
    }
}

/// Geographic window passed to the telemetry API as `west,south,east,north`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    /// The state of California.
    pub fn california() -> Self {
        Self {
            west: -124.409,
            south: 32.534,
            east: -114.131,
            north: 42.009,
        }
    }

    pub fn as_area(&self) -> String {
        format!("{},{},{},{}", self.west, self.south, self.east, self.north)
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::california()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FiresConfig {
    pub base_url: String,
    /// Env: FIRMS_API_KEY.
    pub api_key: String,
    /// Satellite products merged per fetch.
    pub sources: Vec<String>,
    pub bbox: BoundingBox,
    /// How many days of detections each request covers.
    pub day_range: u32,
    pub fanout: FanoutPolicy,
    pub poll_interval_secs: u64,
}

impl Default for FiresConfig {
    fn default() -> Self {
        Self {
            base_url: "https://firms.modaps.eosdis.nasa.gov/api/area/csv".into(),
            api_key: String::new(),
            sources: vec![
                "VIIRS_SNPP_NRT".into(),
                "MODIS_NRT".into(),
                "MODIS_SP".into(),
                "VIIRS_NOAA21_NRT".into(),
            ],
            bbox: BoundingBox::california(),
            day_range: 8,
            fanout: FanoutPolicy::default(),
            poll_interval_secs: 15 * 60,
        }
    }
}

impl FiresConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IncidentsConfig {
    /// Public incident page to scrape.
    pub page_url: String,
    /// CORS relay; the page URL rides in its `url` query parameter.
    pub relay_url: String,
    /// Stats snapshots younger than this are served without a re-scrape.
    pub max_age_secs: u64,
}

impl Default for IncidentsConfig {
    fn default() -> Self {
        Self {
            page_url: "https://www.fire.ca.gov/incidents/".into(),
            relay_url: "https://api.allorigins.win/raw".into(),
            max_age_secs: 300,
        }
    }
}

impl IncidentsConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AirConfig {
    pub base_url: String,
    /// Env: OPENWEATHER_API_KEY.
    pub api_key: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for AirConfig {
    fn default() -> Self {
        // Downtown Los Angeles.
        Self {
            base_url: "https://api.openweathermap.org/data/2.5".into(),
            api_key: String::new(),
            latitude: 34.0522,
            longitude: -118.2437,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    pub base_url: String,
    /// Env: NEWS_API_KEY.
    pub api_key: String,
    pub query: String,
    pub domains: Vec<String>,
    /// Trusted source ids sent upstream.
    pub sources: Vec<String>,
    /// Articles per served page.
    pub page_size: usize,
    /// Articles requested upstream per refresh.
    pub fetch_size: usize,
    pub cache_ttl_secs: u64,
    /// Articles older than this many days are dropped.
    pub recency_window_days: i64,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://newsapi.org/v2".into(),
            api_key: String::new(),
            query: "(wildfire OR fire OR \"cal fire\" OR evacuation) AND (\"los angeles\" OR \"LA\" OR \"southern california\" OR \"pacific palisades\" OR \"brentwood\")".into(),
            domains: vec![
                "bbc.com".into(),
                "cnn.com".into(),
                "nytimes.com".into(),
                "washingtonpost.com".into(),
                "latimes.com".into(),
                "apnews.com".into(),
                "reuters.com".into(),
            ],
            sources: vec![
                "bbc-news".into(),
                "cnn".into(),
                "the-washington-post".into(),
                "the-new-york-times".into(),
                "associated-press".into(),
                "reuters".into(),
                "los-angeles-times".into(),
                "abc-news".into(),
                "cbs-news".into(),
                "nbc-news".into(),
            ],
            page_size: 3,
            fetch_size: 20,
            cache_ttl_secs: 6 * 3600,
            recency_window_days: 7,
        }
    }
}

impl NewsConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SocialConfig {
    pub service_url: String,
    /// Env: BSKY_IDENTIFIER.
    pub identifier: String,
    /// Env: BSKY_APP_PASSWORD.
    pub password: String,
    /// Handles of the monitored emergency accounts.
    pub accounts: Vec<String>,
    pub cache_ttl_secs: u64,
    /// Posts kept after merging all accounts, newest first.
    pub max_posts: usize,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            service_url: "https://bsky.social".into(),
            identifier: String::new(),
            password: String::new(),
            accounts: vec![
                "calfire.bsky.social".into(),
                "governor.ca.gov".into(),
                "lapd.bsky.social".into(),
                "lafd.bsky.social".into(),
                "nws.bsky.social".into(),
            ],
            cache_ttl_secs: 300,
            max_posts: 10,
        }
    }
}

impl SocialConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn has_credentials(&self) -> bool {
        !self.identifier.is_empty() && !self.password.is_empty()
    }
}

impl AppConfig {
    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $WILDFIRE_CONFIG_PATH
    /// 2) config/wildfire.toml
    /// 3) built-in defaults
    pub fn load() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("WILDFIRE_CONFIG_PATH points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let default_p = PathBuf::from(DEFAULT_PATH);
            if default_p.exists() {
                Self::load_from(&default_p)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env();
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing config TOML")
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("PORT") {
            if let Ok(p) = v.parse() {
                self.server.port = p;
            }
        }
        if let Ok(v) = std::env::var("FIRMS_API_KEY") {
            self.fires.api_key = v;
        }
        if let Ok(v) = std::env::var("OPENWEATHER_API_KEY") {
            self.air.api_key = v;
        }
        if let Ok(v) = std::env::var("NEWS_API_KEY") {
            self.news.api_key = v;
        }
        if let Ok(v) = std::env::var("BSKY_IDENTIFIER") {
            self.social.identifier = v;
        }
        if let Ok(v) = std::env::var("BSKY_APP_PASSWORD") {
            self.social.password = v;
        }
    }
}
