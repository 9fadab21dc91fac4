//! Article body scraping through a headless browser.
//!
//! Many news pages render their text client-side, so a plain HTTP GET is not
//! enough. Each scrape launches a fresh, isolated browser session:
//!
//! 1. **Launch** with a fixed desktop viewport and user agent
//! 2. **Navigate** to the article URL
//! 3. **Dismiss consent** overlays: for each keyword of a ranked list
//!    (`accept`, `agree`, `consent`) ask the page for the first matching
//!    control and click the first hit
//! 4. **Capture** the visible text of `<body>`
//! 5. **Classify** it: short or empty text means a paywall or bot wall
//!
//! The browser is owned by the session value and killed when it drops, so it
//! is torn down on every exit path. Outcomes, successful or not, are cached
//! per URL for one cache window.
//!
//! # Submodules
//!
//! - [`chrome`]: the `headless_chrome` implementation of [`BrowserLauncher`]

pub mod chrome;

use crate::cache::TtlCache;
use crate::config::Settings;
use crate::models::{ScrapeFailure, ScrapeOutcome};
use crate::utils::truncate_chars;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Characters of an error message kept in [`ScrapeFailure::Exception`].
pub const ERROR_EXCERPT_CHARS: usize = 150;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("browser launch failed: {0}")]
    Launch(String),
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("browser error: {0}")]
    Browser(String),
    #[error("scrape task failed: {0}")]
    Task(String),
}

/// Per-session browser and classification policy.
#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    pub window_width: u32,
    pub window_height: u32,
    pub user_agent: String,
    pub chrome_path: Option<PathBuf>,
    pub navigation_timeout: Duration,
    pub body_timeout: Duration,
    pub consent_delay: Duration,
    pub post_consent_delay: Duration,
    pub consent_keywords: Vec<String>,
    pub min_content_chars: usize,
}

impl ScrapeOptions {
    /// Copy the browser policy out of `settings`. Keywords are lowercased here.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            window_width: settings.window_width,
            window_height: settings.window_height,
            user_agent: settings.browser_user_agent.clone(),
            chrome_path: settings.chrome_path.clone(),
            navigation_timeout: Duration::from_secs(settings.navigation_timeout_secs),
            body_timeout: Duration::from_secs(settings.body_timeout_secs),
            consent_delay: Duration::from_millis(settings.consent_delay_ms),
            post_consent_delay: Duration::from_millis(settings.post_consent_delay_ms),
            consent_keywords: settings
                .consent_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
            min_content_chars: settings.min_content_chars,
        }
    }
}

/// A clickable element found on the page (`button`, `a`, or `role=button`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageControl {
    /// Backend-specific locator that finds this element again for a click.
    pub selector: String,
    /// The element's visible text, for logging.
    pub label: String,
}

/// Starts isolated browser sessions.
///
/// Launchers are shared with tokio's blocking thread pool, hence the
/// `Send + Sync + 'static` bound; the sessions they return stay on the thread
/// that launched them.
pub trait BrowserLauncher: Send + Sync + 'static {
    type Session: BrowserSession;

    fn launch(&self, options: &ScrapeOptions) -> Result<Self::Session, ScrapeError>;
}

/// One live browser. Dropping it must terminate the browser process.
pub trait BrowserSession {
    /// Load `url` and wait for navigation to finish.
    fn navigate(&mut self, url: &str) -> Result<(), ScrapeError>;

    /// The first control, in document order, whose text contains `keyword`
    /// case-insensitively. `keyword` is already lowercase.
    fn find_control(&mut self, keyword: &str) -> Result<Option<PageControl>, ScrapeError>;

    /// Click a control returned by [`BrowserSession::find_control`].
    fn click(&mut self, control: &PageControl) -> Result<(), ScrapeError>;

    /// Wait up to `timeout` for `<body>` and return its visible text.
    fn body_text(&mut self, timeout: Duration) -> Result<String, ScrapeError>;
}

/// Classify captured body text.
///
/// # Returns
///
/// [`ScrapeOutcome::Text`] with `text` unchanged when it has at least
/// `min_content_chars` characters, otherwise [`ScrapeFailure::TooShort`].
pub fn classify(text: String, min_content_chars: usize) -> ScrapeOutcome {
    if text.chars().count() < min_content_chars {
        ScrapeOutcome::Failed(ScrapeFailure::TooShort)
    } else {
        ScrapeOutcome::Text(text)
    }
}

fn exception(e: impl std::fmt::Display) -> ScrapeOutcome {
    let message = e.to_string();
    ScrapeOutcome::Failed(ScrapeFailure::Exception(
        truncate_chars(&message, ERROR_EXCERPT_CHARS).to_string(),
    ))
}

/// Find the consent control to click.
///
/// Keywords are tried in rank order, one page query each, and the first
/// keyword with a match wins even if a lower-ranked match comes earlier in
/// the document. Query errors skip that keyword.
pub fn find_consent_control<S: BrowserSession>(
    session: &mut S,
    keywords: &[String],
) -> Option<PageControl> {
    keywords.iter().find_map(|keyword| {
        match session.find_control(&keyword.to_lowercase()) {
            Ok(found) => found,
            Err(e) => {
                debug!(%keyword, error = %e, "Consent query failed");
                None
            }
        }
    })
}

/// Best-effort consent dismissal. Nothing here can fail the scrape.
fn dismiss_consent<S: BrowserSession>(session: &mut S, options: &ScrapeOptions) {
    std::thread::sleep(options.consent_delay);

    let Some(control) = find_consent_control(session, &options.consent_keywords) else {
        debug!("No consent control found");
        return;
    };

    match session.click(&control) {
        Ok(()) => {
            debug!(label = %control.label, "Dismissed consent overlay");
            std::thread::sleep(options.post_consent_delay);
        }
        Err(e) => debug!(label = %control.label, error = %e, "Consent click failed; continuing"),
    }
}

fn drive<L: BrowserLauncher>(
    launcher: &L,
    options: &ScrapeOptions,
    url: &str,
) -> Result<String, ScrapeError> {
    let mut session = launcher.launch(options)?;
    session.navigate(url)?;
    dismiss_consent(&mut session, options);
    session.body_text(options.body_timeout)
}

/// Run one full browser session for `url` on the current thread.
///
/// Never fails: launch, navigation and capture errors become
/// [`ScrapeFailure::Exception`] with the message cut to
/// [`ERROR_EXCERPT_CHARS`]. The session is dropped, and the browser with it,
/// before this returns.
pub fn scrape_blocking<L: BrowserLauncher>(
    launcher: &L,
    options: &ScrapeOptions,
    url: &str,
) -> ScrapeOutcome {
    match drive(launcher, options, url) {
        Ok(text) => {
            let outcome = classify(text, options.min_content_chars);
            if outcome.text().is_none() {
                warn!(%url, "Extracted text too short");
            }
            outcome
        }
        Err(e) => {
            warn!(%url, error = %e, "Scrape failed");
            exception(e)
        }
    }
}

/// Session-owned scraper with a per-URL outcome cache.
///
/// Each cache miss runs [`scrape_blocking`] on tokio's blocking pool so the
/// browser's synchronous DevTools calls never stall the runtime.
#[derive(Debug)]
pub struct Scraper<L> {
    launcher: Arc<L>,
    options: Arc<ScrapeOptions>,
    cache: TtlCache<String, ScrapeOutcome>,
}

impl<L: BrowserLauncher> Scraper<L> {
    /// Create a scraper whose outcomes stay cached for `cache_ttl`.
    pub fn new(launcher: L, options: ScrapeOptions, cache_ttl: Duration) -> Self {
        Self {
            launcher: Arc::new(launcher),
            options: Arc::new(options),
            cache: TtlCache::new(cache_ttl),
        }
    }

    /// Scrape `url`, reusing a cached outcome from the current window.
    #[instrument(level = "info", skip(self))]
    pub async fn scrape(&mut self, url: &str) -> ScrapeOutcome {
        let key = url.to_string();
        if let Some(hit) = self.cache.get(&key) {
            debug!("Scrape cache hit");
            return hit;
        }

        let launcher = Arc::clone(&self.launcher);
        let options = Arc::clone(&self.options);
        let owned_url = key.clone();
        let outcome = match tokio::task::spawn_blocking(move || {
            scrape_blocking(launcher.as_ref(), &options, &owned_url)
        })
        .await
        {
            Ok(outcome) => outcome,
            Err(e) => exception(ScrapeError::Task(e.to_string())),
        };

        info!(
            ok = outcome.text().is_some(),
            chars = outcome.text().map(|t| t.chars().count()).unwrap_or(0),
            "Scraped article"
        );
        self.cache.insert(key, outcome.clone());
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockLauncher, MockPage};
    use std::sync::atomic::Ordering;

    fn keywords() -> Vec<String> {
        vec!["accept".into(), "agree".into(), "consent".into()]
    }

    fn session_with(controls: &[&str]) -> (MockLauncher, crate::testing::MockSession) {
        let page = MockPage {
            controls: controls.iter().map(|c| c.to_string()).collect(),
            ..MockPage::default()
        };
        let launcher = MockLauncher::new(page);
        let session = launcher.launch(&MockLauncher::options()).unwrap();
        (launcher, session)
    }

    #[test]
    fn test_consent_match_is_case_insensitive() {
        let (_launcher, mut session) = session_with(&["Subscribe", "ACCEPT ALL COOKIES"]);
        let found = find_consent_control(&mut session, &keywords()).unwrap();
        assert_eq!(found.label, "ACCEPT ALL COOKIES");
    }

    #[test]
    fn test_consent_ranks_keywords_over_document_order() {
        let (_launcher, mut session) = session_with(&["I agree", "Manage consent", "Accept"]);
        assert_eq!(find_consent_control(&mut session, &keywords()).unwrap().label, "Accept");

        let (_launcher, mut session) = session_with(&["Manage consent", "Agree and close"]);
        assert_eq!(
            find_consent_control(&mut session, &keywords()).unwrap().label,
            "Agree and close"
        );
    }

    #[test]
    fn test_consent_queries_once_per_keyword_and_stops_at_first_hit() {
        let (launcher, mut session) = session_with(&["Home", "I agree", "Manage consent"]);
        find_consent_control(&mut session, &keywords()).unwrap();
        assert_eq!(*launcher.searched.lock().unwrap(), vec!["accept", "agree"]);

        let (launcher, mut session) = session_with(&["Home", "World"]);
        assert!(find_consent_control(&mut session, &keywords()).is_none());
        assert_eq!(launcher.searched.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_consent_keywords_lowercased_before_query() {
        let (launcher, mut session) = session_with(&["Accept"]);
        find_consent_control(&mut session, &["ACCEPT".to_string()]).unwrap();
        assert_eq!(*launcher.searched.lock().unwrap(), vec!["accept"]);
    }

    #[test]
    fn test_classify_threshold() {
        assert_eq!(classify(String::new(), 250), ScrapeOutcome::Failed(ScrapeFailure::TooShort));
        assert_eq!(classify("x".repeat(249), 250), ScrapeOutcome::Failed(ScrapeFailure::TooShort));
        let text = "y".repeat(250);
        assert_eq!(classify(text.clone(), 250), ScrapeOutcome::Text(text));
    }

    #[test]
    fn test_classify_counts_characters_not_bytes() {
        // 200 two-byte chars = 400 bytes, still too short.
        assert_eq!(classify("é".repeat(200), 250), ScrapeOutcome::Failed(ScrapeFailure::TooShort));
    }

    #[test]
    fn test_long_body_returned_verbatim_and_torn_down() {
        let body = format!("  Headline\n{}\n", "word ".repeat(100));
        let launcher = MockLauncher::new(MockPage::with_body(&body));
        let outcome = scrape_blocking(&launcher, &MockLauncher::options(), "https://news.test/a");
        assert_eq!(outcome, ScrapeOutcome::Text(body));
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 1);
        assert_eq!(launcher.live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_short_body_is_too_short_and_torn_down() {
        let launcher = MockLauncher::new(MockPage::with_body("Subscribe to continue reading."));
        let outcome = scrape_blocking(&launcher, &MockLauncher::options(), "https://news.test/a");
        assert_eq!(outcome, ScrapeOutcome::Failed(ScrapeFailure::TooShort));
        assert_eq!(launcher.live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_navigation_error_is_exception_and_torn_down() {
        let page = MockPage {
            navigation_error: Some("net::ERR_NAME_NOT_RESOLVED".into()),
            ..MockPage::with_body(&"z".repeat(300))
        };
        let launcher = MockLauncher::new(page);
        let outcome = scrape_blocking(&launcher, &MockLauncher::options(), "https://nowhere.test");
        match outcome {
            ScrapeOutcome::Failed(ScrapeFailure::Exception(msg)) => {
                assert!(msg.contains("ERR_NAME_NOT_RESOLVED"))
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 1);
        assert_eq!(launcher.live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_body_timeout_error_is_truncated() {
        let page = MockPage {
            body: Err("timeout ".repeat(100)),
            ..MockPage::default()
        };
        let launcher = MockLauncher::new(page);
        let outcome = scrape_blocking(&launcher, &MockLauncher::options(), "https://slow.test");
        let ScrapeOutcome::Failed(ScrapeFailure::Exception(msg)) = outcome else {
            panic!("expected exception");
        };
        assert_eq!(msg.chars().count(), ERROR_EXCERPT_CHARS);
        assert_eq!(launcher.live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_launch_failure_is_exception() {
        let page = MockPage {
            launch_error: Some("chrome not found".into()),
            ..MockPage::default()
        };
        let launcher = MockLauncher::new(page);
        let outcome = scrape_blocking(&launcher, &MockLauncher::options(), "https://news.test");
        assert!(matches!(outcome, ScrapeOutcome::Failed(ScrapeFailure::Exception(ref m)) if m.contains("chrome not found")));
        assert_eq!(launcher.live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_consent_control_clicked() {
        let page = MockPage {
            controls: vec!["Sign in".into(), "Accept all".into()],
            ..MockPage::with_body(&"a".repeat(400))
        };
        let launcher = MockLauncher::new(page);
        scrape_blocking(&launcher, &MockLauncher::options(), "https://news.test");
        assert_eq!(*launcher.clicked.lock().unwrap(), vec!["Accept all".to_string()]);
    }

    #[test]
    fn test_consent_click_failure_is_ignored() {
        let body = "b".repeat(400);
        let page = MockPage {
            controls: vec!["I Agree".into()],
            click_error: true,
            ..MockPage::with_body(&body)
        };
        let launcher = MockLauncher::new(page);
        let outcome = scrape_blocking(&launcher, &MockLauncher::options(), "https://news.test");
        assert_eq!(outcome, ScrapeOutcome::Text(body));
        assert!(launcher.clicked.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scraper_caches_success_per_url() {
        let launcher = MockLauncher::new(MockPage::with_body(&"c".repeat(300)));
        let launches = Arc::clone(&launcher.launches);
        let mut scraper = Scraper::new(launcher, MockLauncher::options(), Duration::from_secs(3600));

        let first = scraper.scrape("https://news.test/a").await;
        let second = scraper.scrape("https://news.test/a").await;
        assert_eq!(first, second);
        assert_eq!(launches.load(Ordering::SeqCst), 1);

        scraper.scrape("https://news.test/b").await;
        assert_eq!(launches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_scraper_caches_failures_too() {
        let launcher = MockLauncher::new(MockPage::with_body("tiny"));
        let launches = Arc::clone(&launcher.launches);
        let mut scraper = Scraper::new(launcher, MockLauncher::options(), Duration::from_secs(3600));

        assert_eq!(
            scraper.scrape("https://news.test/a").await,
            ScrapeOutcome::Failed(ScrapeFailure::TooShort)
        );
        scraper.scrape("https://news.test/a").await;
        assert_eq!(launches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_scraper_relaunches_after_window() {
        let launcher = MockLauncher::new(MockPage::with_body(&"c".repeat(300)));
        let launches = Arc::clone(&launcher.launches);
        let mut scraper = Scraper::new(launcher, MockLauncher::options(), Duration::ZERO);

        scraper.scrape("https://news.test/a").await;
        scraper.scrape("https://news.test/a").await;
        assert_eq!(launches.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_options_from_settings() {
        let settings = Settings {
            consent_keywords: vec!["ACCEPT".into()],
            ..Settings::default()
        };
        let options = ScrapeOptions::from_settings(&settings);
        assert_eq!(options.consent_keywords, vec!["accept"]);
        assert_eq!(options.body_timeout, Duration::from_secs(10));
        assert_eq!(options.consent_delay, Duration::from_secs(2));
        assert_eq!((options.window_width, options.window_height), (1920, 1080));
    }
}
