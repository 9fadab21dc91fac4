//! Test doubles for the feed, browser and model seams.

use crate::feed::{FetchedFeed, NewsFeed};
use crate::gateway::{GatewayError, ModelBackend};
use crate::models::{Article, ChatMessage, Country};
use crate::scraper::{BrowserLauncher, BrowserSession, PageControl, ScrapeError, ScrapeOptions};
use chrono::{TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn article(n: usize) -> Article {
    Article {
        title: format!("Headline {n}"),
        link: format!("https://news.test/articles/{n}"),
        source: "Test Wire".to_string(),
        published_date: Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap(),
    }
}

/// Feed that returns canned articles and records every request.
#[derive(Debug, Clone, Default)]
pub struct MockFeed {
    pub articles: Vec<Article>,
    pub error: Option<String>,
    pub requests: Arc<Mutex<Vec<(String, Country)>>>,
}

impl MockFeed {
    pub fn with_articles(n: usize) -> Self {
        Self {
            articles: (1..=n).map(article).collect(),
            ..Self::default()
        }
    }
}

impl NewsFeed for MockFeed {
    async fn fetch(&self, topic: &str, country: Country) -> FetchedFeed {
        self.requests
            .lock()
            .unwrap()
            .push((topic.to_string(), country));
        match &self.error {
            Some(e) => FetchedFeed::failed(e.clone()),
            None => FetchedFeed {
                articles: self.articles.clone(),
                error: None,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockPage {
    pub body: Result<String, String>,
    pub navigation_error: Option<String>,
    pub launch_error: Option<String>,
    pub controls: Vec<String>,
    pub click_error: bool,
}

impl Default for MockPage {
    fn default() -> Self {
        Self {
            body: Ok(String::new()),
            navigation_error: None,
            launch_error: None,
            controls: Vec::new(),
            click_error: false,
        }
    }
}

impl MockPage {
    pub fn with_body(body: &str) -> Self {
        Self {
            body: Ok(body.to_string()),
            ..Self::default()
        }
    }
}

/// Launcher whose sessions track how many are alive, so tests can assert
/// teardown.
#[derive(Debug, Clone)]
pub struct MockLauncher {
    pub page: MockPage,
    pub launches: Arc<AtomicUsize>,
    pub live: Arc<AtomicUsize>,
    pub clicked: Arc<Mutex<Vec<String>>>,
    pub visited: Arc<Mutex<Vec<String>>>,
    /// Keywords passed to `find_control`, in call order.
    pub searched: Arc<Mutex<Vec<String>>>,
}

impl MockLauncher {
    pub fn new(page: MockPage) -> Self {
        Self {
            page,
            launches: Arc::new(AtomicUsize::new(0)),
            live: Arc::new(AtomicUsize::new(0)),
            clicked: Arc::new(Mutex::new(Vec::new())),
            visited: Arc::new(Mutex::new(Vec::new())),
            searched: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Scrape options with the waits removed.
    pub fn options() -> ScrapeOptions {
        ScrapeOptions {
            consent_delay: Duration::ZERO,
            post_consent_delay: Duration::ZERO,
            ..ScrapeOptions::from_settings(&crate::config::Settings::default())
        }
    }
}

pub struct MockSession {
    page: MockPage,
    live: Arc<AtomicUsize>,
    clicked: Arc<Mutex<Vec<String>>>,
    visited: Arc<Mutex<Vec<String>>>,
    searched: Arc<Mutex<Vec<String>>>,
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl BrowserLauncher for MockLauncher {
    type Session = MockSession;

    fn launch(&self, _options: &ScrapeOptions) -> Result<MockSession, ScrapeError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = &self.page.launch_error {
            return Err(ScrapeError::Launch(e.clone()));
        }
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(MockSession {
            page: self.page.clone(),
            live: Arc::clone(&self.live),
            clicked: Arc::clone(&self.clicked),
            visited: Arc::clone(&self.visited),
            searched: Arc::clone(&self.searched),
        })
    }
}

impl BrowserSession for MockSession {
    fn navigate(&mut self, url: &str) -> Result<(), ScrapeError> {
        self.visited.lock().unwrap().push(url.to_string());
        match &self.page.navigation_error {
            Some(e) => Err(ScrapeError::Navigation(e.clone())),
            None => Ok(()),
        }
    }

    fn find_control(&mut self, keyword: &str) -> Result<Option<PageControl>, ScrapeError> {
        self.searched.lock().unwrap().push(keyword.to_string());
        Ok(self
            .page
            .controls
            .iter()
            .enumerate()
            .find(|(_, label)| label.to_lowercase().contains(keyword))
            .map(|(index, label)| PageControl {
                selector: format!("mock:{index}"),
                label: label.clone(),
            }))
    }

    fn click(&mut self, control: &PageControl) -> Result<(), ScrapeError> {
        if self.page.click_error {
            return Err(ScrapeError::Browser("element is not clickable".into()));
        }
        self.clicked.lock().unwrap().push(control.label.clone());
        Ok(())
    }

    fn body_text(&mut self, _timeout: Duration) -> Result<String, ScrapeError> {
        self.page.body.clone().map_err(ScrapeError::Browser)
    }
}

/// Model backend with a scripted reply queue. When the queue is empty it
/// answers `"mock reply"`.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    pub usable_models: Vec<String>,
    pub replies: Arc<Mutex<VecDeque<Result<String, GatewayError>>>>,
    pub probes: Arc<Mutex<Vec<String>>>,
    pub calls: Arc<Mutex<Vec<(String, Vec<ChatMessage>)>>>,
}

impl MockBackend {
    pub fn accepting(models: &[&str]) -> Self {
        Self {
            usable_models: models.iter().map(|m| m.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn push_reply(&self, reply: Result<String, GatewayError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl ModelBackend for MockBackend {
    async fn probe(&self, model: &str) -> Result<(), GatewayError> {
        self.probes.lock().unwrap().push(model.to_string());
        if self.usable_models.iter().any(|m| m == model) {
            Ok(())
        } else {
            Err(GatewayError::Api {
                status: 404,
                message: format!("models/{model} is not found"),
            })
        }
    }

    async fn generate(
        &self,
        model: &str,
        history: &[ChatMessage],
        _timeout: Duration,
    ) -> Result<String, GatewayError> {
        self.calls
            .lock()
            .unwrap()
            .push((model.to_string(), history.to_vec()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("mock reply".to_string()))
    }
}
