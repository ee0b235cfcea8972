//! Feed ingestion.
//!
//! Each configured source is a URL to an RSS/Atom resource. Retrieval is a
//! plain HTTP GET with a fixed timeout; parsing is delegated to `feed-rs`.
//! A source that fails to fetch or parse contributes zero entries for this
//! run, logged and otherwise ignored. Each pass re-fetches from scratch.

use crate::models::FeedItem;
use crate::pipeline::FeedSource;
use feed_rs::model::Feed;
use reqwest::Client;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

pub struct FeedClient {
    client: Client,
}

impl FeedClient {
    pub fn new(timeout: Duration) -> Result<Self, Box<dyn Error>> {
        let client = Client::builder()
            .user_agent(concat!("outreach_radar/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl FeedSource for FeedClient {
    #[instrument(level = "info", skip(self))]
    async fn fetch_entries(&self, feed_url: &str) -> Vec<FeedItem> {
        let response = match self.client.get(feed_url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(feed = %feed_url, error = %e, "Feed fetch failed; source yields no entries");
                return Vec::new();
            }
        };
        if !response.status().is_success() {
            warn!(feed = %feed_url, status = %response.status(), "Feed fetch returned an error status");
            return Vec::new();
        }
        let bytes = match response.bytes().await {
            Ok(b) => b,
            Err(e) => {
                warn!(feed = %feed_url, error = %e, "Failed reading feed response body");
                return Vec::new();
            }
        };
        let feed = match feed_rs::parser::parse(bytes.as_ref()) {
            Ok(f) => f,
            Err(e) => {
                warn!(feed = %feed_url, error = %e, "Feed did not parse; source yields no entries");
                return Vec::new();
            }
        };
        let entries = entries_from_feed(feed_url, feed);
        info!(feed = %feed_url, count = entries.len(), "Parsed feed");
        entries
    }
}

/// Flatten a parsed feed into candidate metadata records.
///
/// Per entry: title (empty when absent), link (a link is mandatory; entries
/// without one are skipped entirely), source name (feed title, `"Unknown"`
/// fallback), raw published date (prefer `published`, else `updated`, else
/// absent), summary. Relative links are resolved against the feed URL.
fn entries_from_feed(feed_url: &str, feed: Feed) -> Vec<FeedItem> {
    let source = feed
        .title
        .map(|t| t.content)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Unknown".to_string());
    let base = Url::parse(feed_url).ok();

    let mut items = Vec::new();
    for entry in feed.entries {
        let Some(link) = entry.links.first().map(|l| l.href.clone()) else {
            debug!(feed = %feed_url, "Entry has no link; skipping");
            continue;
        };
        if link.trim().is_empty() {
            debug!(feed = %feed_url, "Entry link is empty; skipping");
            continue;
        }
        let link = resolve_link(base.as_ref(), &link);

        let published_raw = entry
            .published
            .or(entry.updated)
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_default();

        items.push(FeedItem {
            title: entry.title.map(|t| t.content).unwrap_or_default(),
            link,
            source: source.clone(),
            published_raw,
            summary: entry.summary.map(|t| t.content).unwrap_or_default(),
        });
    }
    items
}

/// Already-absolute links pass through; relative ones are joined onto the
/// feed URL; anything unresolvable is kept verbatim.
fn resolve_link(base: Option<&Url>, href: &str) -> String {
    if Url::parse(href).is_ok() {
        return href.to_string();
    }
    if let Some(base) = base {
        if let Ok(resolved) = base.join(href) {
            return resolved.to_string();
        }
    }
    href.to_string()
}
