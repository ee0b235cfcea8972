//! The merge pipeline: fetch new, enrich, merge, filter by cutoff, sort, save.
//!
//! This is the one piece of real logic in the system. Feeds are processed one
//! at a time, entries within a feed one at a time, with every network call
//! awaited in-line. There is no concurrency and no retry at this layer; a
//! failed call only costs the affected unit of work for this run.
//!
//! Per-entry decisions, in order, each a hard skip:
//! 1. missing link,
//! 2. unparseable or absent published date,
//! 3. published before the cutoff,
//! 4. identifier already tracked (not re-enriched, not re-fetched),
//! 5. otherwise: best-effort body fetch, extraction call (failure logs and
//!    skips without persisting a partial record), field reconciliation, merge.
//!
//! After all sources the whole collection is re-validated against the cutoff
//! (so tightening the cutoff between runs retroactively prunes stored
//! articles), sorted by published date descending, and saved.
//!
//! The three external capabilities are trait seams so tests can substitute
//! deterministic fakes for live network behavior.

use crate::config::Config;
use crate::dates::normalize_published;
use crate::ident::article_id;
use crate::models::{Article, FeedItem};
use crate::store::Store;
use std::collections::HashSet;
use std::error::Error;
use tracing::{debug, info, instrument, warn};

/// Enumerates candidate entries for one configured feed source.
///
/// A failed fetch or parse yields zero entries, never an error: one broken
/// source must not cost the rest of the run.
pub trait FeedSource {
    async fn fetch_entries(&self, feed_url: &str) -> Vec<FeedItem>;
}

/// Best-effort retrieval of an article's raw body text.
///
/// Any failure degrades to an empty string; the extraction service is still
/// invoked with metadata alone.
pub trait BodyFetcher {
    async fn fetch_body(&self, url: &str) -> String;
}

/// Converts article metadata plus optional body text into a structured
/// [`Article`]. An error means the entry is skipped for this run and remains
/// eligible on the next one, since nothing was persisted.
pub trait ExtractionService {
    async fn extract(&self, item: &FeedItem, body: &str) -> Result<Article, Box<dyn Error>>;
}

pub struct MergePipeline<F, B, E> {
    config: Config,
    store: Store,
    feeds: F,
    bodies: B,
    extractor: E,
}

impl<F, B, E> MergePipeline<F, B, E>
where
    F: FeedSource,
    B: BodyFetcher,
    E: ExtractionService,
{
    pub fn new(config: Config, store: Store, feeds: F, bodies: B, extractor: E) -> Self {
        Self {
            config,
            store,
            feeds,
            bodies,
            extractor,
        }
    }

    /// Run one full pass over every configured feed.
    ///
    /// Returns the number of newly tracked articles.
    #[instrument(level = "info", skip_all)]
    pub async fn run(&self) -> Result<usize, Box<dyn Error>> {
        let cutoff = self.config.cutoff()?;
        let mut collection = self.store.load().await;
        let mut seen: HashSet<String> =
            collection.articles.iter().map(|a| a.id.clone()).collect();
        let mut added = 0usize;

        for feed_url in &self.config.feeds {
            let entries = self.feeds.fetch_entries(feed_url).await;
            info!(feed = %feed_url, count = entries.len(), "Ingested feed entries");

            for item in entries {
                if item.link.is_empty() {
                    debug!(feed = %feed_url, "Entry has no link; skipping");
                    continue;
                }
                let Some(published) = normalize_published(&item.published_raw) else {
                    debug!(url = %item.link, raw = %item.published_raw, "Unparseable published date; skipping");
                    continue;
                };
                if published < cutoff {
                    debug!(url = %item.link, %published, "Published before cutoff; skipping");
                    continue;
                }
                let id = article_id(&item.link, Some(&published));
                if seen.contains(&id) {
                    debug!(%id, url = %item.link, "Already tracked; skipping");
                    continue;
                }

                let body = self.bodies.fetch_body(&item.link).await;
                match self.extractor.extract(&item, &body).await {
                    Ok(mut article) => {
                        article.reconcile(&item, &id, &published);
                        seen.insert(id);
                        collection.articles.push(article);
                        added += 1;
                        info!(url = %item.link, "Tracked new article");
                    }
                    Err(e) => {
                        warn!(url = %item.link, error = %e, "Extraction failed; skipping entry");
                    }
                }
            }
        }

        // Re-validate the whole collection, previously stored entries
        // included, so a cutoff change retroactively prunes.
        let before = collection.articles.len();
        collection
            .articles
            .retain(|a| a.published_instant().is_some_and(|d| d >= cutoff));
        let dropped = before - collection.articles.len();
        if dropped > 0 {
            info!(dropped, "Pruned articles outside the cutoff window");
        }

        // Newest first; the stable sort keeps stored order for equal dates.
        collection.articles.sort_by(|a, b| {
            let ka = a.published_instant().unwrap_or(cutoff);
            let kb = b.published_instant().unwrap_or(cutoff);
            kb.cmp(&ka)
        });

        self.store.save(&collection).await?;
        info!(added, total = collection.articles.len(), "Merge pipeline complete");
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArticleCollection, Stakeholder};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    struct FakeFeeds {
        by_url: HashMap<String, Vec<FeedItem>>,
    }

    impl FeedSource for FakeFeeds {
        async fn fetch_entries(&self, feed_url: &str) -> Vec<FeedItem> {
            self.by_url.get(feed_url).cloned().unwrap_or_default()
        }
    }

    struct FakeBodies {
        body: String,
        requested: Rc<RefCell<Vec<String>>>,
    }

    impl BodyFetcher for FakeBodies {
        async fn fetch_body(&self, url: &str) -> String {
            self.requested.borrow_mut().push(url.to_string());
            self.body.clone()
        }
    }

    struct FakeExtractor {
        /// Links the service should fail on.
        fail_links: Vec<String>,
        /// (link, body) pairs actually sent to the service.
        calls: Rc<RefCell<Vec<(String, String)>>>,
    }

    impl ExtractionService for FakeExtractor {
        async fn extract(&self, item: &FeedItem, body: &str) -> Result<Article, Box<dyn Error>> {
            self.calls
                .borrow_mut()
                .push((item.link.clone(), body.to_string()));
            if self.fail_links.contains(&item.link) {
                return Err("response was not a single JSON object".into());
            }
            Ok(Article {
                id: "spoofed-by-service".to_string(),
                title: item.title.clone(),
                summary: "extracted summary".to_string(),
                categories: vec!["food_and_beverage".to_string()],
                stakeholders: vec![Stakeholder {
                    full_name: "Dana Reyes".to_string(),
                    role_type: "brand_marketing".to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            })
        }
    }

    struct Fixture {
        config: Config,
        bodies_requested: Rc<RefCell<Vec<String>>>,
        extractor_calls: Rc<RefCell<Vec<(String, String)>>>,
    }

    impl Fixture {
        fn new(tag: &str, cutoff: &str) -> Self {
            let data_path = std::env::temp_dir()
                .join(format!("outreach_radar_pipeline_{tag}_{}.json", std::process::id()));
            let _ = std::fs::remove_file(&data_path);
            let config = Config {
                feeds: vec!["https://feeds.test/one".to_string()],
                cutoff_date: cutoff.to_string(),
                data_path: data_path.to_string_lossy().into_owned(),
                ..Config::default()
            };
            Self {
                config,
                bodies_requested: Rc::new(RefCell::new(Vec::new())),
                extractor_calls: Rc::new(RefCell::new(Vec::new())),
            }
        }

        fn pipeline(
            &self,
            entries: Vec<FeedItem>,
            fail_links: Vec<String>,
        ) -> MergePipeline<FakeFeeds, FakeBodies, FakeExtractor> {
            let mut by_url = HashMap::new();
            by_url.insert("https://feeds.test/one".to_string(), entries);
            MergePipeline::new(
                self.config.clone(),
                Store::new(self.config.data_path.clone()),
                FakeFeeds { by_url },
                FakeBodies {
                    body: "article body text".to_string(),
                    requested: self.bodies_requested.clone(),
                },
                FakeExtractor {
                    fail_links,
                    calls: self.extractor_calls.clone(),
                },
            )
        }

        async fn stored(&self) -> ArticleCollection {
            Store::new(self.config.data_path.clone()).load().await
        }

        fn cleanup(&self) {
            let _ = std::fs::remove_file(&self.config.data_path);
        }
    }

    fn entry(link: &str, published_raw: &str) -> FeedItem {
        FeedItem {
            title: format!("Title for {link}"),
            link: link.to_string(),
            source: "Test Feed".to_string(),
            published_raw: published_raw.to_string(),
            summary: "feed summary".to_string(),
        }
    }

    #[tokio::test]
    async fn test_new_entries_are_enriched_and_saved() {
        let fx = Fixture::new("basic", "2025-11-01");
        let added = fx
            .pipeline(
                vec![
                    entry("https://x/a", "2025-11-05T10:00:00"),
                    entry("https://x/b", "Wed, 12 Nov 2025 08:00:00 GMT"),
                ],
                vec![],
            )
            .run()
            .await
            .unwrap();

        assert_eq!(added, 2);
        let stored = fx.stored().await;
        assert_eq!(stored.articles.len(), 2);
        // Sorted newest first regardless of discovery order.
        assert_eq!(stored.articles[0].url, "https://x/b");
        assert_eq!(stored.articles[0].published_at, "2025-11-12");
        assert_eq!(stored.articles[1].url, "https://x/a");
        // Enrichment kept, reconciliation filled the locally known fields.
        assert_eq!(stored.articles[0].source, "Test Feed");
        assert_eq!(stored.articles[0].summary, "extracted summary");
        assert_eq!(stored.articles[0].stakeholders.len(), 1);
        fx.cleanup();
    }

    #[tokio::test]
    async fn test_service_id_is_replaced_with_computed_identifier() {
        let fx = Fixture::new("ident", "2025-11-01");
        fx.pipeline(vec![entry("https://x/a", "2025-11-05T10:00:00")], vec![])
            .run()
            .await
            .unwrap();

        let stored = fx.stored().await;
        let expected = article_id(
            "https://x/a",
            Some(&normalize_published("2025-11-05T10:00:00").unwrap()),
        );
        assert_eq!(stored.articles[0].id, expected);
        assert_ne!(stored.articles[0].id, "spoofed-by-service");
        fx.cleanup();
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let fx = Fixture::new("idempotent", "2025-11-01");
        let entries = vec![
            entry("https://x/a", "2025-11-05T10:00:00"),
            entry("https://x/b", "2025-11-06T10:00:00"),
        ];

        let first = fx.pipeline(entries.clone(), vec![]).run().await.unwrap();
        let after_first = fx.stored().await;
        let second = fx.pipeline(entries, vec![]).run().await.unwrap();
        let after_second = fx.stored().await;

        assert_eq!(first, 2);
        assert_eq!(second, 0);
        assert_eq!(after_first, after_second);
        // Known entries were not re-enriched or re-fetched.
        assert_eq!(fx.extractor_calls.borrow().len(), 2);
        assert_eq!(fx.bodies_requested.borrow().len(), 2);
        fx.cleanup();
    }

    #[tokio::test]
    async fn test_cutoff_excludes_older_entries() {
        let fx = Fixture::new("cutoff", "2025-11-01");
        let added = fx
            .pipeline(
                vec![
                    entry("https://x/old", "2025-10-31T23:59:59"),
                    entry("https://x/edge", "2025-11-01"),
                ],
                vec![],
            )
            .run()
            .await
            .unwrap();

        assert_eq!(added, 1);
        let stored = fx.stored().await;
        assert_eq!(stored.articles.len(), 1);
        assert_eq!(stored.articles[0].url, "https://x/edge");
        // The too-old entry never reached the extraction service.
        assert_eq!(fx.extractor_calls.borrow().len(), 1);
        fx.cleanup();
    }

    #[tokio::test]
    async fn test_cutoff_tightening_prunes_stored_articles() {
        let fx = Fixture::new("prune", "2025-11-01");
        fx.pipeline(vec![entry("https://x/a", "2025-11-01")], vec![])
            .run()
            .await
            .unwrap();
        assert_eq!(fx.stored().await.articles.len(), 1);

        // Same store, tightened cutoff, no new entries.
        let mut tightened = Fixture::new("prune_tight", "2025-12-01");
        tightened.config.data_path = fx.config.data_path.clone();
        tightened.pipeline(vec![], vec![]).run().await.unwrap();

        assert!(fx.stored().await.articles.is_empty());
        fx.cleanup();
    }

    #[tokio::test]
    async fn test_entry_without_link_is_never_added() {
        let fx = Fixture::new("nolink", "2025-11-01");
        let mut no_link = entry("", "2025-11-05T10:00:00");
        no_link.title = "Well formed otherwise".to_string();
        let added = fx.pipeline(vec![no_link], vec![]).run().await.unwrap();

        assert_eq!(added, 0);
        assert!(fx.stored().await.articles.is_empty());
        assert!(fx.extractor_calls.borrow().is_empty());
        fx.cleanup();
    }

    #[tokio::test]
    async fn test_entry_with_bad_date_is_skipped() {
        let fx = Fixture::new("baddate", "2025-11-01");
        let added = fx
            .pipeline(
                vec![
                    entry("https://x/undated", ""),
                    entry("https://x/garbled", "sometime last week"),
                ],
                vec![],
            )
            .run()
            .await
            .unwrap();

        assert_eq!(added, 0);
        assert!(fx.extractor_calls.borrow().is_empty());
        fx.cleanup();
    }

    #[tokio::test]
    async fn test_extraction_failure_drops_entry_until_next_run() {
        let fx = Fixture::new("extract_fail", "2025-11-01");
        let entries = vec![
            entry("https://x/good", "2025-11-05T10:00:00"),
            entry("https://x/bad", "2025-11-06T10:00:00"),
        ];

        let added = fx
            .pipeline(entries.clone(), vec!["https://x/bad".to_string()])
            .run()
            .await
            .unwrap();
        assert_eq!(added, 1);
        let stored = fx.stored().await;
        assert_eq!(stored.articles.len(), 1);
        assert_eq!(stored.articles[0].url, "https://x/good");

        // Nothing was persisted for the failed entry, so a later run with a
        // healthy service picks it up.
        let added = fx.pipeline(entries, vec![]).run().await.unwrap();
        assert_eq!(added, 1);
        assert_eq!(fx.stored().await.articles.len(), 2);
        fx.cleanup();
    }

    #[tokio::test]
    async fn test_empty_body_still_enriches() {
        let fx = Fixture::new("nobody", "2025-11-01");
        let mut pipeline =
            fx.pipeline(vec![entry("https://x/a", "2025-11-05T10:00:00")], vec![]);
        pipeline.bodies.body = String::new();

        let added = pipeline.run().await.unwrap();
        assert_eq!(added, 1);
        let calls = fx.extractor_calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, "");
        fx.cleanup();
    }

    #[tokio::test]
    async fn test_equal_dates_keep_stored_order_across_runs() {
        let fx = Fixture::new("ties", "2025-11-01");
        let entries = vec![
            entry("https://x/first", "2025-11-05"),
            entry("https://x/second", "2025-11-05"),
        ];
        fx.pipeline(entries.clone(), vec![]).run().await.unwrap();
        let once = fx.stored().await;
        fx.pipeline(entries, vec![]).run().await.unwrap();
        let twice = fx.stored().await;

        assert_eq!(once.articles[0].url, "https://x/first");
        assert_eq!(once, twice);
        fx.cleanup();
    }
}
