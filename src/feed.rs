//! Google News search RSS fetcher.
//!
//! Builds a search feed URL restricted to the last 24 hours, fetches it, and
//! parses each `<item>` into an [`Article`]. Fetch failures never propagate:
//! callers get an empty article list plus a message they can show the user.
//!
//! # URL Pattern
//!
//! ```text
//! https://news.google.com/rss/search?q=when:24h+<topic>&hl=en-<CC>&gl=<CC>&ceid=<CC>:en
//! ```
//!
//! The `"Top Stories"` category maps to an empty topic, which returns the
//! region's general headlines.

use crate::config::Settings;
use crate::models::{Article, Country};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// Topic value that stands for "no search term".
pub const TOP_STORIES: &str = "Top Stories";

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("feed returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("invalid RSS: {0}")]
    Parse(#[from] rss::Error),
}

/// Result of one feed fetch. `error` is set when the fetch failed, in which
/// case `articles` is empty.
#[derive(Debug, Default, Clone)]
pub struct FetchedFeed {
    pub articles: Vec<Article>,
    pub error: Option<String>,
}

impl FetchedFeed {
    /// An empty result carrying a user-facing failure message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            articles: Vec::new(),
            error: Some(message.into()),
        }
    }
}

/// A source of news headlines for a topic and region.
pub trait NewsFeed {
    async fn fetch(&self, topic: &str, country: Country) -> FetchedFeed;
}

/// Build the search feed URL for `topic` in `country`.
///
/// The topic is percent-encoded; [`TOP_STORIES`] and blank topics produce an
/// empty search segment.
pub fn build_feed_url(endpoint: &str, topic: &str, country: Country) -> String {
    let topic = topic.trim();
    let search = if topic.is_empty() || topic == TOP_STORIES {
        String::new()
    } else {
        urlencoding::encode(topic).into_owned()
    };
    let cc = country.code();
    format!("{endpoint}?q=when:24h+{search}&hl=en-{cc}&gl={cc}&ceid={cc}:en")
}

/// Parse an RSS document into articles, in feed order.
///
/// Items missing a title or link are skipped, and repeated links keep their
/// first occurrence. Missing `source` becomes `"Unknown"`; a missing or
/// unparseable `pubDate` becomes `now`.
pub fn parse_feed(xml: &[u8], now: DateTime<Utc>) -> Result<Vec<Article>, FeedError> {
    let channel = rss::Channel::read_from(xml)?;

    let articles = channel
        .items()
        .iter()
        .filter_map(|item| {
            let (Some(title), Some(link)) = (item.title(), item.link()) else {
                debug!(?item, "Skipping feed item without title or link");
                return None;
            };
            let source = item
                .source()
                .and_then(|s| s.title())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or("Unknown");
            let published_date = match item.pub_date() {
                Some(raw) => match DateTime::parse_from_rfc2822(raw.trim()) {
                    Ok(dt) => dt.with_timezone(&Utc),
                    Err(e) => {
                        warn!(%link, pub_date = raw, error = %e, "Unparseable pubDate; using fetch time");
                        now
                    }
                },
                None => now,
            };
            Some(Article {
                title: title.to_string(),
                link: link.trim().to_string(),
                source: source.to_string(),
                published_date,
            })
        })
        .unique_by(|a| a.link.clone())
        .collect();

    Ok(articles)
}

/// HTTP-backed [`NewsFeed`] for the Google News search endpoint.
#[derive(Debug, Clone)]
pub struct GoogleNewsFeed {
    client: Client,
    endpoint: String,
}

impl GoogleNewsFeed {
    /// Build the HTTP client with the configured user agent and timeout.
    pub fn new(settings: &Settings) -> Result<Self, FeedError> {
        let client = Client::builder()
            .user_agent(settings.feed_user_agent.clone())
            .timeout(settings.feed_timeout())
            .build()?;
        Ok(Self {
            client,
            endpoint: settings.feed_endpoint.clone(),
        })
    }

    async fn try_fetch(&self, url: &str) -> Result<Vec<Article>, FeedError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status));
        }
        let body = response.bytes().await?;
        parse_feed(&body, Utc::now())
    }
}

impl NewsFeed for GoogleNewsFeed {
    #[instrument(level = "info", skip(self), fields(country = country.code()))]
    async fn fetch(&self, topic: &str, country: Country) -> FetchedFeed {
        let url = build_feed_url(&self.endpoint, topic, country);
        debug!(%url, "Fetching news feed");

        match self.try_fetch(&url).await {
            Ok(articles) => {
                info!(count = articles.len(), "Fetched news feed");
                FetchedFeed {
                    articles,
                    error: None,
                }
            }
            Err(e) => {
                error!(%url, error = %e, "News feed fetch failed");
                FetchedFeed::failed(format!("Failed to fetch Google News RSS: {e}"))
            }
        }
    }
}
