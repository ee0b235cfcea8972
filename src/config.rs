//! Run configuration.
//!
//! All process-wide state (feed list, cutoff date, store path, extraction
//! model settings) lives in an explicit [`Config`] passed into the pipeline
//! at construction, never in ambient globals. The config is read from a YAML
//! file; every field has a default, so a missing file yields a usable
//! configuration while a malformed one is a fatal startup error.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::error::Error;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Ordered list of feed URLs to poll.
    #[serde(default = "default_feeds")]
    pub feeds: Vec<String>,
    /// Minimum published date (`YYYY-MM-DD`) for an article to be kept.
    #[serde(default = "default_cutoff_date")]
    pub cutoff_date: String,
    /// Path of the JSON store document.
    #[serde(default = "default_data_path")]
    pub data_path: String,
    /// Base URL of the OpenAI-compatible extraction API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Model name sent with extraction requests.
    #[serde(default = "default_model")]
    pub model: String,
    /// Timeout applied to every network call, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// When false, article bodies are not fetched and the extraction service
    /// works from feed metadata alone.
    #[serde(default = "default_fetch_bodies")]
    pub fetch_bodies: bool,
}

fn default_feeds() -> Vec<String> {
    [
        "https://www.fooddive.com/rss/",
        "https://www.bevnet.com/feed",
        "https://www.nosh.com/feed",
        "https://www.prnewswire.com/rss/consumer-products-latest-news.rss",
        "https://www.globenewswire.com/RssFeed/subjectcode/8",
        "https://www.glossy.co/feed/",
        "https://www.beautymatter.com/feed",
        "https://www.marketingdive.com/feeds/news/",
        "https://adage.com/section/rss",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn default_cutoff_date() -> String {
    "2025-11-01".to_string()
}

fn default_data_path() -> String {
    "data.json".to_string()
}

fn default_api_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_fetch_bodies() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        // serde's field defaults are the single source of truth.
        serde_yaml::from_str("{}").expect("empty config must deserialize")
    }
}

impl Config {
    /// Load configuration from a YAML file.
    ///
    /// A missing file yields the defaults. A file that exists but does not
    /// parse is a configuration error and aborts the run.
    pub fn load(path: &str) -> Result<Self, Box<dyn Error>> {
        if !Path::new(path).exists() {
            warn!(%path, "Config file not found; using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&raw)
            .map_err(|e| format!("invalid config file {path}: {e}"))?;
        info!(%path, feeds = config.feeds.len(), cutoff = %config.cutoff_date, "Loaded configuration");
        Ok(config)
    }

    /// The cutoff as a comparable instant (midnight of the configured date).
    ///
    /// An unparseable cutoff is a configuration error, resolved before any
    /// feed is touched.
    pub fn cutoff(&self) -> Result<NaiveDateTime, Box<dyn Error>> {
        let date = NaiveDate::parse_from_str(&self.cutoff_date, "%Y-%m-%d")
            .map_err(|e| format!("invalid cutoff_date {:?}: {e}", self.cutoff_date))?;
        Ok(date.and_hms_opt(0, 0, 0).expect("midnight is valid"))
    }
}
