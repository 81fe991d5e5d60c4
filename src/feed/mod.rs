//! Feed fetching and normalization.
//!
//! Retrieves the configured RSS 2.0 or Atom document and reduces it to the
//! single newest entry as a [`FeedItem`]. Results are kept in a [`FeedCache`]
//! for a short freshness window so that back-to-back triggers do not hammer
//! the feed server.

use crate::config::FeedConfig;
use crate::error::{Error, FeedError, Result};
use crate::types::FeedItem;
use crate::utils::{DEFAULT_SUMMARY_CHARS, display_text, truncate_chars};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

mod cache;

pub use cache::{Clock, FeedCache, ManualClock, SystemClock};

/// Anything that can produce the newest feed item
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch (or serve from cache) the first entry of the feed
    ///
    /// # Errors
    ///
    /// - [`FeedError::Fetch`] when the request fails or the server answers non-2xx
    /// - [`FeedError::Empty`] when the document has no entries
    /// - [`FeedError::Parse`] when the document is neither RSS nor Atom
    async fn fetch_newest(&self) -> Result<FeedItem>;
}

/// HTTP feed fetcher backed by `reqwest`
pub struct FeedFetcher {
    /// HTTP client for fetching the feed
    http_client: reqwest::Client,

    /// Feed URL
    url: String,

    /// Most recent fetch
    cache: FeedCache,
}

impl FeedFetcher {
    /// Create a fetcher for `config.url`
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &FeedConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            url: config.url.clone(),
            cache: FeedCache::new(config.cache_ttl, clock),
        })
    }

    /// Feed URL this fetcher reads
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Forget the cached item so the next call hits the network
    pub async fn invalidate(&self) {
        self.cache.clear().await;
    }

    async fn fetch_document(&self) -> Result<String> {
        debug!(url = %self.url, "fetching feed");

        let response = self
            .http_client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FeedError::Fetch {
                url: self.url.clone(),
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            })?;

        // Check HTTP status before trying to parse the response body
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Fetch {
                url: self.url.clone(),
                status: Some(status.as_u16()),
                message: format!("HTTP {}", status.as_u16()),
            }
            .into());
        }

        let content = response.text().await.map_err(|e| FeedError::Fetch {
            url: self.url.clone(),
            status: Some(status.as_u16()),
            message: format!("failed to read body: {}", e),
        })?;

        Ok(content)
    }
}

#[async_trait]
impl FeedSource for FeedFetcher {
    async fn fetch_newest(&self) -> Result<FeedItem> {
        if let Some(item) = self.cache.get().await {
            debug!(novelty_marker = %item.novelty_marker, "serving feed item from cache");
            return Ok(item);
        }

        let content = self.fetch_document().await?;
        let item = parse_newest(&content, &self.url)?;
        self.cache.put(item.clone()).await;

        Ok(item)
    }
}

/// Extract the first entry of an RSS 2.0 or Atom document
///
/// RSS is tried first; Atom only when the document is not RSS.
pub fn parse_newest(content: &str, url: &str) -> Result<FeedItem> {
    match content.parse::<rss::Channel>() {
        Ok(channel) => {
            debug!("parsed as RSS, found {} items", channel.items().len());
            channel
                .items()
                .first()
                .map(rss_item)
                .ok_or_else(|| FeedError::Empty { url: url.to_string() }.into())
        }
        Err(rss_err) => {
            debug!("failed to parse as RSS: {}, trying Atom", rss_err);
            match atom_syndication::Feed::read_from(content.as_bytes()) {
                Ok(feed) => {
                    debug!("parsed as Atom, found {} entries", feed.entries().len());
                    feed.entries()
                        .first()
                        .map(atom_entry)
                        .ok_or_else(|| FeedError::Empty { url: url.to_string() }.into())
                }
                Err(atom_err) => Err(FeedError::Parse(format!(
                    "not RSS ({}) or Atom ({})",
                    rss_err, atom_err
                ))
                .into()),
            }
        }
    }
}

/// Pick the identity of a feed entry: guid, else link, else title
///
/// Blank values count as absent. Returns an empty string only when all three
/// are missing.
pub fn novelty_marker(guid: Option<&str>, link: Option<&str>, title: Option<&str>) -> String {
    [guid, link, title]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// Markup-free title cut to the display limit; the novelty marker keeps the raw one.
fn display_title(raw: &str) -> Option<String> {
    Some(truncate_chars(&display_text(raw), DEFAULT_SUMMARY_CHARS)).filter(|t| !t.is_empty())
}

fn rss_item(item: &rss::Item) -> FeedItem {
    let title = item.title().and_then(display_title);

    FeedItem {
        title,
        link: non_blank(item.link()),
        description_html: item
            .description()
            .or_else(|| item.content())
            .map(str::to_string),
        published_at: non_blank(item.pub_date()),
        novelty_marker: novelty_marker(
            item.guid().map(|g| g.value()),
            item.link(),
            item.title(),
        ),
    }
}

fn atom_entry(entry: &atom_syndication::Entry) -> FeedItem {
    let raw_title = entry.title().as_str();
    let title = display_title(raw_title);

    // Prefer the alternate link, fall back to whatever comes first
    let link = entry
        .links()
        .iter()
        .find(|link| link.rel() == "alternate")
        .or_else(|| entry.links().first())
        .map(|link| link.href());

    let description_html = entry.summary().map(|s| s.as_str().to_string()).or_else(|| {
        entry
            .content()
            .and_then(|c| c.value().map(|v| v.to_string()))
    });

    // atom_syndication parses timestamps and drops the source text, so this
    // is the RFC 3339 rendering of the parsed value rather than the raw string
    let published_at = entry
        .published()
        .unwrap_or_else(|| entry.updated())
        .to_rfc3339();

    FeedItem {
        title,
        link: non_blank(link),
        description_html,
        published_at: Some(published_at),
        novelty_marker: novelty_marker(Some(entry.id()), link, Some(raw_title)),
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
