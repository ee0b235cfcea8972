//! Data models for tracked articles and their extracted outreach metadata.
//!
//! This module defines the core data structures used throughout the application:
//! - [`FeedItem`]: Candidate article metadata as ingested from a feed
//! - [`Article`]: A tracked article enriched with extracted outreach data
//! - [`ArticleCollection`]: The persisted document holding all tracked articles
//! - [`Stakeholder`] and [`OutreachTemplate`]: extracted outreach entities
//!
//! Every persisted field carries `#[serde(default)]` so that documents written
//! by older runs, or partial objects returned by the extraction service, always
//! materialize with a typed default instead of failing deserialization. Schema
//! evolution is handled by this default-filling, not by versioned migration.

use crate::dates::normalize_published;
use chrono::NaiveDateTime;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Candidate article metadata produced by the feed ingestor.
///
/// This is the unenriched form: one feed entry, normalized to the handful of
/// fields the pipeline needs to decide whether the article is new and worth
/// sending to the extraction service.
#[derive(Debug, Clone)]
pub struct FeedItem {
    /// Entry title, empty string when the feed omitted it.
    pub title: String,
    /// Absolute article URL. An entry without a link never becomes a `FeedItem`.
    pub link: String,
    /// Title of the parent feed, or `"Unknown"`.
    pub source: String,
    /// Raw published-date string as found in the feed (prefer `published`,
    /// else `updated`); empty when absent. Parsing is the date normalizer's job.
    pub published_raw: String,
    /// Entry summary/description, empty string when absent.
    pub summary: String,
}

/// The persisted document: a single top-level `articles` list.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ArticleCollection {
    #[serde(default)]
    pub articles: Vec<Article>,
}

/// A tracked article with extracted marketing/outreach metadata.
///
/// Created the first time its identifier is seen and successfully enriched;
/// never updated in place afterwards; removed only by falling outside the
/// cutoff window on a later run.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Article {
    /// Stable identifier derived from (url, published instant). Always
    /// overwritten with the locally computed value after extraction.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    /// Name of the feed the article was discovered in.
    #[serde(default)]
    pub source: String,
    /// ISO-8601 calendar date (`YYYY-MM-DD`), no time component.
    #[serde(default)]
    pub published_at: String,
    #[serde(default)]
    pub summary: String,
    /// Values from {food_and_beverage, beauty_and_personal_care,
    /// health_and_wellness, other_cpg}.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Values from {product_launch, sampling_program, experiential_activation,
    /// promotion_or_discount, announcement, other}.
    #[serde(default)]
    pub campaign_types: Vec<String>,
    #[serde(default)]
    pub demo_tags: Vec<String>,
    #[serde(default)]
    pub psych_tags: Vec<String>,
    #[serde(default)]
    pub stakeholders: Vec<Stakeholder>,
    #[serde(default)]
    pub outreach_templates: Vec<OutreachTemplate>,
}

/// A marketing/brand/PR decision-maker extracted from an article.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Stakeholder {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub role_type: String,
    #[serde(default)]
    pub linkedin_url: String,
    /// Empty unless explicitly present in the source text.
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub email_status: String,
    /// Confidence in the email, 0.0 to 1.0.
    #[serde(default)]
    pub email_confidence: f64,
}

/// A pre-drafted contact message referencing a stakeholder by name.
///
/// The reference is soft: nothing enforces that `stakeholder_full_name`
/// matches an entry in the article's stakeholder list.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct OutreachTemplate {
    #[serde(default)]
    pub stakeholder_full_name: String,
    #[serde(default)]
    pub email_subject: String,
    #[serde(default)]
    pub email_body: String,
    #[serde(default)]
    pub linkedin_message: String,
}

impl Article {
    /// Reconcile extraction-service output with locally known metadata.
    ///
    /// The service-supplied `id` is untrusted and always replaced with the
    /// locally computed identifier. `url`, `source` and `published_at` are
    /// filled from the feed entry when the service left them blank, as are the
    /// title and summary. List fields are deduplicated: stakeholders by full
    /// name, templates by the stakeholder they reference, tags by value.
    pub fn reconcile(&mut self, item: &FeedItem, id: &str, published: &NaiveDateTime) {
        self.id = id.to_string();
        if self.url.is_empty() {
            self.url = item.link.clone();
        }
        if self.source.is_empty() {
            self.source = item.source.clone();
        }
        if self.published_at.is_empty() {
            self.published_at = published.date().to_string();
        }
        if self.title.is_empty() {
            self.title = item.title.clone();
        }
        if self.summary.is_empty() {
            self.summary = item.summary.clone();
        }

        self.stakeholders = std::mem::take(&mut self.stakeholders)
            .into_iter()
            .unique_by(|s| s.full_name.clone())
            .collect();
        self.outreach_templates = std::mem::take(&mut self.outreach_templates)
            .into_iter()
            .unique_by(|t| t.stakeholder_full_name.clone())
            .collect();
        for tags in [
            &mut self.categories,
            &mut self.campaign_types,
            &mut self.demo_tags,
            &mut self.psych_tags,
        ] {
            *tags = std::mem::take(tags).into_iter().unique().collect();
        }
    }

    /// Parse the stored published date with the same semantics the ingestion
    /// path uses. `None` means the article fails the cutoff filter.
    pub fn published_instant(&self) -> Option<NaiveDateTime> {
        normalize_published(&self.published_at)
    }
}
