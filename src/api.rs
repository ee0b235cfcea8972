//! Extraction-service client with exponential backoff retry logic.
//!
//! The extraction service is an OpenAI-compatible chat-completions API that
//! turns article metadata (plus optional body text) into a structured
//! [`Article`]. The module is built around a trait-based design:
//! - [`AskAsync`]: core trait defining one async request/response exchange
//! - [`ChatClient`]: the reqwest transport implementing it
//! - [`RetryAsk`]: decorator adding retry logic to any `AskAsync` implementation
//! - [`Extractor`]: the pipeline-facing service that prompts, parses, and
//!   re-asks once on a truncated response
//!
//! # Retry Strategy
//!
//! - Maximum 5 retry attempts
//! - Exponential backoff starting at 1 second
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd
//!
//! The pipeline layer itself never retries; everything here is below it, so
//! a request that exhausts its retries still only costs one entry for the run.

use crate::config::Config;
use crate::models::{Article, FeedItem};
use crate::pipeline::ExtractionService;
use crate::utils::{looks_truncated, truncate_for_log};
use rand::{Rng, rng};
use std::error::Error;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Trait for one async exchange with the extraction service.
///
/// The abstraction exists for the decorators: retry logic wraps any
/// implementation without caring about the transport underneath.
pub trait AskAsync {
    /// The type of response returned by the service.
    type Response;

    /// Send text to the service and receive a response.
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>>;
}

/// Wrapper that adds exponential backoff retry logic to any [`AskAsync`]
/// implementation.
///
/// This decorator transparently retries transient failures (rate limiting,
/// network issues, temporary server errors). The delay between retries is
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryAsk<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync + fmt::Debug,
{
    type Response = T::Response;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(text).await {
                Ok(resp) => {
                    return Ok(resp);
                }
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                            elapsed_ms_total = total_dt.as_millis() as u128,
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    // backoff calc
                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                        elapsed_ms_total = total_dt.as_millis() as u128,
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// reqwest transport for an OpenAI-compatible chat-completions endpoint.
pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ChatClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout: StdDuration,
    ) -> Result<Self, Box<dyn Error>> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl AskAsync for ChatClient {
    type Response = String;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, text: &str) -> Result<String, Box<dyn Error>> {
        let t0 = Instant::now();
        let payload = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": text },
            ],
            "temperature": 0.2,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, body = %truncate_for_log(&body, 300), "Extraction API returned an error status");
            return Err(format!("extraction API error: HTTP {status}").into());
        }

        let value: serde_json::Value = response.json().await?;
        let content = value["choices"][0]["message"]["content"]
            .as_str()
            .ok_or("extraction API response had no message content")?;

        info!(
            elapsed_ms = t0.elapsed().as_millis() as u128,
            bytes = content.len(),
            "Chat completion succeeded"
        );
        Ok(content.to_string())
    }
}

const SYSTEM_PROMPT: &str = "\
You analyze consumer-brands news articles for a marketing outreach team. \
Respond with exactly one JSON object and nothing else, following this schema: \
{\"id\": string, \"title\": string, \"url\": string, \"source\": string, \
\"published_at\": \"YYYY-MM-DD\", \"summary\": string, \
\"categories\": [string], \"campaign_types\": [string], \
\"demo_tags\": [string], \"psych_tags\": [string], \
\"stakeholders\": [{\"full_name\": string, \"title\": string, \
\"company_name\": string, \"role_type\": string, \"linkedin_url\": string, \
\"email\": string, \"email_status\": string, \"email_confidence\": number}], \
\"outreach_templates\": [{\"stakeholder_full_name\": string, \
\"email_subject\": string, \"email_body\": string, \"linkedin_message\": string}]}. \
Rules: categories values must come only from food_and_beverage, \
beauty_and_personal_care, health_and_wellness, other_cpg. campaign_types \
values must come only from product_launch, sampling_program, \
experiential_activation, promotion_or_discount, announcement, other. \
demo_tags and psych_tags are short lowercase tokens describing the target \
demographic and psychographic. Stakeholders are limited to marketing, brand, \
and PR decision-makers named in the text. Leave email empty unless an email \
address appears verbatim in the text; never invent one, and set \
email_confidence between 0 and 1. Write one outreach template per \
stakeholder, referencing them by full_name. Use empty strings for unknown \
scalar fields and empty lists for unknown list fields.";

/// Render article metadata and optional body into the user message.
fn build_prompt(item: &FeedItem, body: &str) -> String {
    let mut prompt = format!(
        "Article metadata:\nTitle: {}\nURL: {}\nSource: {}\nPublished: {}\nFeed summary: {}\n",
        item.title, item.link, item.source, item.published_raw, item.summary
    );
    if body.trim().is_empty() {
        prompt.push_str("\nArticle body: (not available; work from the metadata above)\n");
    } else {
        prompt.push_str("\nArticle body:\n");
        prompt.push_str(body);
        prompt.push('\n');
    }
    prompt
}

/// Locate the outermost `{...}` span in a response.
///
/// Models wrap their object in code fences or prose often enough that taking
/// the first `{` through the last `}` is the practical recovery.
fn json_object_span(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&response[start..=end])
}

/// Parse a service response into an [`Article`].
///
/// Absent fields materialize as typed defaults; anything that is not a single
/// JSON object is an error and the caller skips the entry.
fn parse_article(response: &str) -> Result<Article, serde_json::Error> {
    let span = json_object_span(response).unwrap_or(response);
    serde_json::from_str(span)
}

/// Pipeline-facing extraction service: prompt, ask with backoff, parse.
pub struct Extractor {
    api: RetryAsk<ChatClient>,
}

impl Extractor {
    pub fn new(config: &Config, api_key: &str) -> Result<Self, Box<dyn Error>> {
        let client = ChatClient::new(
            &config.api_base_url,
            api_key,
            &config.model,
            StdDuration::from_secs(config.request_timeout_secs),
        )?;
        Ok(Self {
            api: RetryAsk::new(client, 5, StdDuration::from_secs(1)),
        })
    }
}

impl ExtractionService for Extractor {
    #[instrument(level = "info", skip_all, fields(url = %item.link))]
    async fn extract(&self, item: &FeedItem, body: &str) -> Result<Article, Box<dyn Error>> {
        let prompt = build_prompt(item, body);
        let response = self.api.ask(&prompt).await?;

        match parse_article(&response) {
            Ok(article) => Ok(article),
            // A truncated response (token limit) is worth one re-ask.
            Err(e) if looks_truncated(&e) => {
                warn!(error = %e, "EOF while parsing extraction response; re-asking once");
                let response = self.api.ask(&prompt).await?;
                parse_article(&response).map_err(|e2| {
                    warn!(
                        error = %e2,
                        response_preview = %truncate_for_log(&response, 300),
                        "Re-ask still not a single JSON object; skipping article"
                    );
                    Box::new(e2) as Box<dyn Error>
                })
            }
            Err(e) => {
                warn!(
                    error = %e,
                    response_preview = %truncate_for_log(&response, 300),
                    "Extraction response was not a single JSON object; skipping article"
                );
                Err(Box::new(e))
            }
        }
    }
}
