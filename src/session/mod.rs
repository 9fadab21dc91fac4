//! Per-session state and command dispatch.
//!
//! A [`Session`] is the explicit context every user action runs against. It
//! owns the user's preferences, the current headlines, the feed and scrape
//! caches, every analysis result, and the one chat session with its
//! transcript. Nothing here is shared between sessions.
//!
//! # Dispatch Rules
//!
//! - Changing the country or the effective topic re-fetches the feed
//!   (through a short-lived feed cache)
//! - Analysis actions scrape through the scraper's URL cache, so several
//!   kinds requested for one article share one browser launch
//! - The AI gateway is called on every action; model output is never cached
//!   as a substitute for a new call, only stored for display
//! - Each analysis kind is stored independently, keyed by article link
//! - `new-chat` clears both the chat session and the transcript
//!
//! # Submodules
//!
//! - [`commands`]: parsing input lines into [`Command`]

pub mod commands;

pub use commands::{Command, CommandError};

use crate::cache::TtlCache;
use crate::config::Settings;
use crate::feed::NewsFeed;
use crate::gateway::{AiGateway, ChatSession, ModelBackend};
use crate::models::{
    AnalysisKind, Article, Category, ChatMessage, ChatTranscript, Country, ScrapeOutcome,
    SummaryStyle,
};
use crate::outputs::markdown;
use crate::prompts;
use crate::scraper::{BrowserLauncher, Scraper};
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

/// The user's current choices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences {
    pub country: Country,
    pub category: Category,
    /// Free-text topic. Overrides the category when non-blank.
    pub search: String,
    pub style: SummaryStyle,
}

impl Preferences {
    /// The topic the feed is fetched for.
    pub fn topic(&self) -> &str {
        let search = self.search.trim();
        if search.is_empty() {
            self.category.label()
        } else {
            search
        }
    }
}

/// What the command loop should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    /// Print the Markdown and read the next command.
    Continue(String),
    /// Leave the loop.
    Quit,
}

/// Hands a URL to the system browser.
type LinkOpener = fn(&str) -> std::io::Result<()>;

fn open_in_browser(link: &str) -> std::io::Result<()> {
    open::that(link)
}

/// One user's dashboard: preferences, headlines, caches, results and chat.
///
/// Generic over the feed, the browser launcher and the model backend so the
/// whole controller runs against mocks in tests.
///
/// # Type Parameters
///
/// * `F` - Headline source ([`NewsFeed`])
/// * `L` - Browser launcher used by the scraper ([`BrowserLauncher`])
/// * `B` - Model backend behind the gateway ([`ModelBackend`])
pub struct Session<F, L, B> {
    feed: F,
    scraper: Scraper<L>,
    gateway: AiGateway<B>,
    prefs: Preferences,
    articles: Vec<Article>,
    display_limit: Option<usize>,
    default_display_limit: usize,
    feed_cache: TtlCache<(String, Country), Vec<Article>>,
    fetched_for: Option<(String, Country)>,
    feed_error: Option<String>,
    analyses: HashMap<(String, AnalysisKind), String>,
    questions: HashMap<String, String>,
    chat: ChatSession,
    transcript: ChatTranscript,
    link_opener: LinkOpener,
}

impl<F, L, B> Session<F, L, B>
where
    F: NewsFeed,
    L: BrowserLauncher,
    B: ModelBackend,
{
    /// Create a session with no headlines yet; call [`Session::start`] next.
    ///
    /// `settings` supplies the feed cache window and default display limit.
    pub fn new(
        feed: F,
        scraper: Scraper<L>,
        gateway: AiGateway<B>,
        prefs: Preferences,
        settings: &Settings,
    ) -> Self {
        Self {
            feed,
            scraper,
            gateway,
            prefs,
            articles: Vec::new(),
            display_limit: None,
            default_display_limit: settings.default_display_limit,
            feed_cache: TtlCache::new(settings.feed_cache_ttl()),
            fetched_for: None,
            feed_error: None,
            analyses: HashMap::new(),
            questions: HashMap::new(),
            chat: ChatSession::default(),
            transcript: ChatTranscript::default(),
            link_opener: open_in_browser,
        }
    }

    /// Replace how `open` hands links to the system browser.
    pub fn with_link_opener(mut self, opener: LinkOpener) -> Self {
        self.link_opener = opener;
        self
    }

    /// Current country, category, search and summary style.
    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    /// Headlines from the latest fetch, in feed order.
    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    /// Stored result of `kind` for the article at `link`.
    pub fn analysis(&self, link: &str, kind: AnalysisKind) -> Option<&str> {
        self.analyses
            .get(&(link.to_string(), kind))
            .map(String::as_str)
    }

    /// The chat as displayed, failures included.
    pub fn transcript(&self) -> &ChatTranscript {
        &self.transcript
    }

    /// The chat as sent to the model, successful turns only.
    pub fn chat_session(&self) -> &ChatSession {
        &self.chat
    }

    /// Initial feed fetch and headline list.
    pub async fn start(&mut self) -> String {
        self.ensure_feed().await;
        self.render_list()
    }

    /// Run one command and return what to print.
    ///
    /// Never fails: feed, scrape and model problems come back as Markdown
    /// notices in [`Flow::Continue`].
    pub async fn dispatch(&mut self, command: Command) -> Flow {
        debug!(?command, "Dispatching command");
        let text = match command {
            Command::SetCountry(country) => {
                self.prefs.country = country;
                self.after_feed_change().await
            }
            Command::SetCategory(category) => {
                self.prefs.category = category;
                let mut text = String::new();
                if !self.prefs.search.trim().is_empty() {
                    text.push_str("Note: a search is active and overrides the category. Use `search` to clear it.\n\n");
                }
                text.push_str(&self.after_feed_change().await);
                text
            }
            Command::Search(topic) => {
                self.prefs.search = topic.trim().to_string();
                self.after_feed_change().await
            }
            Command::SetStyle(style) => {
                self.prefs.style = style;
                format!("Summary style: {style}\n")
            }
            Command::Show(limit) => {
                self.ensure_feed().await;
                if let Some(n) = limit {
                    self.display_limit = Some(n);
                }
                self.render_list()
            }
            Command::Refresh => {
                self.fetched_for = None;
                self.after_feed_change().await
            }
            Command::Analyze { article, kind } => self.analyze(article, kind, None).await,
            Command::Ask { article, question } => {
                self.analyze(article, AnalysisKind::Qa, Some(question)).await
            }
            Command::Results(article) => self.results(article),
            Command::Open(article) => self.open(article),
            Command::Chat(message) => self.chat(&message).await,
            Command::NewChat => {
                self.chat = ChatSession::default();
                self.transcript.clear();
                info!("Chat reset");
                "Started a new chat.\n".to_string()
            }
            Command::Transcript => markdown::transcript(&self.transcript),
            Command::Countries => markdown::countries(),
            Command::Categories => markdown::categories(),
            Command::Status => markdown::status(&self.prefs, self.gateway.model()),
            Command::Help => markdown::help().to_string(),
            Command::Quit => return Flow::Quit,
        };
        Flow::Continue(text)
    }

    async fn after_feed_change(&mut self) -> String {
        self.ensure_feed().await;
        self.render_list()
    }

    /// Fetch the feed if the (topic, country) pair differs from the last fetch.
    #[instrument(level = "info", skip(self), fields(topic = %self.prefs.topic(), country = self.prefs.country.code()))]
    async fn ensure_feed(&mut self) {
        let key = (self.prefs.topic().to_string(), self.prefs.country);
        if self.fetched_for.as_ref() == Some(&key) {
            return;
        }

        let articles = match self.feed_cache.get(&key) {
            Some(articles) => {
                debug!("Feed cache hit");
                self.feed_error = None;
                articles
            }
            None => {
                let fetched = self.feed.fetch(&key.0, key.1).await;
                match fetched.error {
                    Some(error) => {
                        warn!(%error, "Feed unavailable");
                        self.feed_error = Some(error);
                    }
                    None => {
                        self.feed_error = None;
                        self.feed_cache.insert(key.clone(), fetched.articles.clone());
                    }
                }
                fetched.articles
            }
        };

        self.articles = articles;
        self.display_limit = None;
        self.fetched_for = Some(key);
    }

    fn effective_limit(&self) -> usize {
        let len = self.articles.len();
        let wanted = self.display_limit.unwrap_or(self.default_display_limit);
        wanted.clamp(1, len.max(1))
    }

    fn render_list(&self) -> String {
        let mut text = String::new();
        if let Some(error) = &self.feed_error {
            text.push_str(&format!("⚠️ {error}\n\n"));
        }
        text.push_str(&markdown::article_list(
            &self.prefs,
            &self.articles,
            self.effective_limit(),
        ));
        text
    }

    fn article(&self, number: usize) -> Result<&Article, String> {
        number
            .checked_sub(1)
            .and_then(|i| self.articles.get(i))
            .ok_or_else(|| {
                format!(
                    "There is no article #{number}; the list has {} articles.\n",
                    self.articles.len()
                )
            })
    }

    /// Scrape (cached), build the prompt for `kind`, call the model, and store
    /// the result under the article link.
    #[instrument(level = "info", skip(self, question))]
    async fn analyze(&mut self, number: usize, kind: AnalysisKind, question: Option<String>) -> String {
        let article = match self.article(number) {
            Ok(article) => article.clone(),
            Err(message) => return message,
        };

        let outcome = self.scraper.scrape(&article.link).await;
        let result = match &outcome {
            ScrapeOutcome::Failed(failure) => format!("⚠️ **Scraping Error:** {failure}"),
            ScrapeOutcome::Text(text) => {
                let prompt = match kind {
                    AnalysisKind::Summary => prompts::summary(self.prefs.style.phrase(), text),
                    AnalysisKind::Sentiment => prompts::sentiment(text),
                    AnalysisKind::Entities => prompts::entities(text),
                    AnalysisKind::Qa => prompts::qa(text, question.as_deref().unwrap_or_default()),
                };
                match prompt {
                    Ok(prompt) => self.gateway.complete(&prompt).await,
                    Err(e) => format!("⚠️ **Prompt Error:** {e}"),
                }
            }
        };

        if let (AnalysisKind::Qa, Some(q)) = (kind, question) {
            self.questions.insert(article.link.clone(), q);
        }
        self.analyses.insert((article.link.clone(), kind), result);
        self.results(number)
    }

    fn results(&self, number: usize) -> String {
        let article = match self.article(number) {
            Ok(article) => article,
            Err(message) => return message,
        };
        markdown::article_results(
            number,
            article,
            |kind| self.analysis(&article.link, kind),
            self.questions.get(&article.link).map(String::as_str),
        )
    }

    fn open(&self, number: usize) -> String {
        let article = match self.article(number) {
            Ok(article) => article,
            Err(message) => return message,
        };
        match (self.link_opener)(&article.link) {
            Ok(()) => format!("Opened {}\n", article.link),
            Err(e) => {
                warn!(link = %article.link, error = %e, "Could not open browser");
                format!("Could not open a browser ({e}). Read it here: {}\n", article.link)
            }
        }
    }

    async fn chat(&mut self, message: &str) -> String {
        self.transcript.push(ChatMessage::user(message));
        let reply = self.gateway.chat(&mut self.chat, message).await;
        self.transcript.push(ChatMessage::assistant(reply.clone()));
        format!("**Assistant:** {reply}\n")
    }
}
