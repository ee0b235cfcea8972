//! JSON store for the tracked-article collection.
//!
//! The whole collection lives in one JSON document with a top-level
//! `articles` list. Loads are tolerant: a missing or corrupt file is treated
//! as an empty collection so a damaged store never aborts a run. Saves are
//! full-document overwrites, pretty-printed UTF-8 with non-ASCII characters
//! preserved verbatim. There is no locking and no partial write; a single
//! process at a time is assumed.

use crate::models::ArticleCollection;
use crate::utils::ensure_writable_dir;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, instrument, warn};

pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the persisted collection.
    ///
    /// Absent file → empty collection. Unreadable or invalid content → empty
    /// collection, with a warning; the previous document is only replaced
    /// once the run saves.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    pub async fn load(&self) -> ArticleCollection {
        match fs::read_to_string(&self.path).await {
            Ok(raw) => match serde_json::from_str::<ArticleCollection>(&raw) {
                Ok(collection) => {
                    info!(count = collection.articles.len(), "Loaded article store");
                    collection
                }
                Err(e) => {
                    warn!(error = %e, "Store file is not a valid collection; starting empty");
                    ArticleCollection::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No store file yet; starting empty");
                ArticleCollection::default()
            }
            Err(e) => {
                warn!(error = %e, "Failed to read store file; starting empty");
                ArticleCollection::default()
            }
        }
    }

    /// Overwrite the persisted document with the given collection.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    pub async fn save(&self, collection: &ArticleCollection) -> Result<(), Box<dyn Error>> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                ensure_writable_dir(&parent.to_string_lossy()).await?;
            }
        }
        let json = serde_json::to_string_pretty(collection)?;
        fs::write(&self.path, json).await?;
        info!(count = collection.articles.len(), "Wrote article store");
        Ok(())
    }
}
