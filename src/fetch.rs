//! Best-effort article body retrieval.
//!
//! The extraction service works better with the article text than with feed
//! metadata alone, but the body is strictly optional: any failure here
//! degrades to an empty string and never costs the entry.

use crate::pipeline::BodyFetcher;
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use std::error::Error;
use std::time::Duration;
use tracing::{debug, instrument, warn};

static HEADLINE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1").expect("static selector"));
static PARAGRAPH_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p").expect("static selector"));

pub struct HttpBodyFetcher {
    client: Client,
    enabled: bool,
}

impl HttpBodyFetcher {
    pub fn new(timeout: Duration, enabled: bool) -> Result<Self, Box<dyn Error>> {
        let client = Client::builder()
            .user_agent(concat!("outreach_radar/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { client, enabled })
    }
}

impl BodyFetcher for HttpBodyFetcher {
    #[instrument(level = "info", skip(self))]
    async fn fetch_body(&self, url: &str) -> String {
        if !self.enabled {
            return String::new();
        }
        let html = match self.client.get(url).send().await {
            Ok(r) if r.status().is_success() => match r.text().await {
                Ok(t) => t,
                Err(e) => {
                    warn!(%url, error = %e, "Failed reading article body; continuing without it");
                    return String::new();
                }
            },
            Ok(r) => {
                warn!(%url, status = %r.status(), "Article fetch returned an error status; continuing without a body");
                return String::new();
            }
            Err(e) => {
                warn!(%url, error = %e, "Article fetch failed; continuing without a body");
                return String::new();
            }
        };
        let text = extract_text(&html);
        debug!(%url, bytes = text.len(), "Extracted article text");
        text
    }
}

/// Pull the visible headline and paragraph text out of an HTML document.
fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut content = String::new();
    for element in document
        .select(&HEADLINE_SELECTOR)
        .chain(document.select(&PARAGRAPH_SELECTOR))
    {
        let text = element.text().collect::<Vec<_>>().join(" ");
        let text = text.trim();
        if !text.is_empty() {
            content.push_str(text);
            content.push('\n');
        }
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_keeps_headline_and_paragraphs() {
        let html = r#"
            <html><head><title>ignored</title><script>var x = 1;</script></head>
            <body>
              <h1>Cereal maker debuts retro flavor</h1>
              <nav><span>Home</span></nav>
              <p>The launch targets <b>nostalgic</b> millennials.</p>
              <p>Sampling begins next month.</p>
            </body></html>"#;
        let text = extract_text(html);
        assert!(text.starts_with("Cereal maker debuts retro flavor\n"));
        assert!(text.contains("The launch targets nostalgic millennials."));
        assert!(text.contains("Sampling begins next month."));
        assert!(!text.contains("var x"));
        assert!(!text.contains("Home"));
    }

    #[test]
    fn test_extract_text_empty_document() {
        assert_eq!(extract_text(""), "");
        assert_eq!(extract_text("<html><body></body></html>"), "");
    }

    #[tokio::test]
    async fn test_disabled_fetcher_returns_empty() {
        let fetcher = HttpBodyFetcher::new(Duration::from_secs(1), false).unwrap();
        assert_eq!(fetcher.fetch_body("https://example.com/article").await, "");
    }
}
