//! # Outreach Radar
//!
//! A news-monitoring pipeline that polls consumer-brands RSS feeds,
//! deduplicates articles against a local JSON store, and enriches each new
//! article through an OpenAI-compatible LLM API with structured marketing
//! data: stakeholders, campaign tags, and outreach templates.
//!
//! ## Usage
//!
//! ```sh
//! OPENAI_API_KEY=sk-... outreach_radar --config config.yaml
//! ```
//!
//! ## Architecture
//!
//! Each run is one pass of the merge pipeline:
//! 1. **Load**: read the persisted article collection (tolerant of a missing
//!    or corrupt store file)
//! 2. **Ingest**: enumerate entries from every configured feed, in order
//! 3. **Decide**: skip entries without a link, without a parseable date,
//!    below the cutoff, or already tracked
//! 4. **Enrich**: fetch the article body (best-effort) and call the
//!    extraction service; a failed call skips the entry for this run
//! 5. **Merge, filter, sort, save**: re-validate the whole collection
//!    against the cutoff, sort newest first, overwrite the store
//!
//! Everything runs sequentially; a failed network call only costs the
//! affected feed or entry.

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod dates;
mod feeds;
mod fetch;
mod ident;
mod models;
mod pipeline;
mod store;
mod utils;

use api::Extractor;
use cli::Cli;
use config::Config;
use feeds::FeedClient;
use fetch::HttpBodyFetcher;
use pipeline::MergePipeline;
use store::Store;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("outreach_radar starting up");

    let args = Cli::parse();
    debug!(?args.config, ?args.data_path, "Parsed CLI arguments");

    // The extraction credential is required before any feed is touched.
    let Some(api_key) = args.api_key else {
        error!("OPENAI_API_KEY is not set (use --api-key or the environment); cannot call the extraction service");
        return Err("missing required credential: OPENAI_API_KEY".into());
    };

    let mut config = Config::load(&args.config)?;
    if let Some(data_path) = args.data_path {
        config.data_path = data_path;
    }
    // Surface an invalid cutoff now rather than mid-run.
    let cutoff = config.cutoff()?;
    info!(%cutoff, feeds = config.feeds.len(), store = %config.data_path, "Configuration ready");

    let timeout = std::time::Duration::from_secs(config.request_timeout_secs);
    let store = Store::new(config.data_path.clone());
    let feeds = FeedClient::new(timeout)?;
    let bodies = HttpBodyFetcher::new(timeout, config.fetch_bodies)?;
    let extractor = Extractor::new(&config, &api_key)?;

    let pipeline = MergePipeline::new(config, store, feeds, bodies, extractor);
    let added = pipeline.run().await?;

    println!("Fetched {added} new article(s).");

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
