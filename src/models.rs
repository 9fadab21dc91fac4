//! Data models shared across the feed fetcher, scraper, AI gateway and session.
//!
//! - [`Article`]: one headline from the news feed; its `link` is the identity
//!   used by every cache
//! - [`ScrapeOutcome`] / [`ScrapeFailure`]: the tagged result of one scrape
//! - [`AnalysisKind`]: which AI action produced a cached result
//! - [`ChatMessage`] / [`ChatTranscript`]: the general chat history
//! - [`Country`], [`Category`], [`SummaryStyle`]: the fixed user choices

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// A news headline parsed from one RSS `<item>`.
///
/// Articles are immutable once parsed. The session keeps the list from the
/// latest fetch and refers to entries by their 1-based position, but every
/// cache (scrapes, analyses, questions) is keyed by [`Article::link`], so a
/// re-fetch that reorders the list never mixes up results.
///
/// # Fields
///
/// * `title` - Headline as published
/// * `link` - Article URL, the identity of the article
/// * `source` - Publisher name
/// * `published_date` - Publication time in UTC
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    /// The headline text.
    pub title: String,
    /// The article URL. Unique within a fetched feed.
    pub link: String,
    /// Publisher name, `"Unknown"` when the feed omits it.
    pub source: String,
    /// Publication time, or the fetch time when the feed omits it.
    pub published_date: DateTime<Utc>,
}

/// Why a scrape produced no usable article text.
///
/// The `Display` text is shown verbatim as the analysis result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeFailure {
    /// Body text was empty or below the minimum content length.
    TooShort,
    /// The browser session failed; carries a truncated error description.
    Exception(String),
}

impl fmt::Display for ScrapeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrapeFailure::TooShort => write!(
                f,
                "Extracted text was too short or empty. The page may have a paywall or advanced anti-scraping protection."
            ),
            ScrapeFailure::Exception(reason) => {
                write!(f, "Scraping failed with headless browser: {reason}")
            }
        }
    }
}

/// One scrape of one URL: either the page text or a classified failure.
///
/// Both variants are cached by the scraper, so a page behind a paywall is
/// not re-launched against for the rest of the cache window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeOutcome {
    /// Visible body text, at least the configured minimum length.
    Text(String),
    /// No usable text; the reason is shown in place of the analysis.
    Failed(ScrapeFailure),
}

impl ScrapeOutcome {
    /// The scraped text, or `None` for a failed scrape.
    pub fn text(&self) -> Option<&str> {
        match self {
            ScrapeOutcome::Text(text) => Some(text),
            ScrapeOutcome::Failed(_) => None,
        }
    }
}

/// The AI actions available on a single article.
///
/// Each kind has its own prompt template and its own slot in the session's
/// result store, so running a sentiment analysis never replaces a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisKind {
    /// Summary in the user's chosen [`SummaryStyle`].
    Summary,
    /// Positive / Negative / Neutral with a one-sentence reason.
    Sentiment,
    /// Key people, organizations and the main topic.
    Entities,
    /// An answer drawn only from the article text.
    Qa,
}

impl AnalysisKind {
    /// Every kind, in the order results are rendered.
    pub const ALL: [AnalysisKind; 4] = [
        AnalysisKind::Summary,
        AnalysisKind::Sentiment,
        AnalysisKind::Entities,
        AnalysisKind::Qa,
    ];

    /// Heading used when rendering a cached result.
    pub fn heading(&self) -> &'static str {
        match self {
            AnalysisKind::Summary => "AI Summary",
            AnalysisKind::Sentiment => "Sentiment Analysis",
            AnalysisKind::Entities => "Key Information",
            AnalysisKind::Qa => "Question & Answer",
        }
    }
}

/// Author of one chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRole::User => write!(f, "user"),
            ChatRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// One turn of a conversation with the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Who wrote the turn.
    pub role: ChatRole,
    /// The turn's text, Markdown as returned by the model.
    pub content: String,
}

impl ChatMessage {
    /// A turn written by the user.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// A turn written by the model, or a failure notice shown in its place.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// The chat history shown to the user.
///
/// Only ever grows until [`ChatTranscript::clear`] is called.
#[derive(Debug, Default, Clone)]
pub struct ChatTranscript {
    messages: Vec<ChatMessage>,
}

impl ChatTranscript {
    /// Append one message at the end.
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Drop every message. Used by `new-chat`.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Messages in the order they were pushed.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Number of messages, both roles counted.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// `true` before the first message and after [`ChatTranscript::clear`].
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Error returned when a user choice does not match any known value.
///
/// Shared by the CLI (through clap's `FromStr` support) and the command
/// parser.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownChoice {
    /// What was being chosen, e.g. `"country"`.
    pub kind: &'static str,
    /// The input as the user typed it.
    pub value: String,
}

/// Lowercase and drop everything that is not alphanumeric, so `"U.S."`,
/// `"u.s"` and `"us"` compare equal.
fn normalize_choice(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Regions the news feed can be localized to.
///
/// Parses from either the two-letter code or the display name, ignoring
/// case and punctuation: `"gb"`, `"GB"` and `"United Kingdom"` all work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Country {
    #[default]
    UnitedStates,
    UnitedKingdom,
    India,
    Canada,
    Australia,
}

impl Country {
    /// Every supported country, in menu order.
    pub const ALL: [Country; 5] = [
        Country::UnitedStates,
        Country::UnitedKingdom,
        Country::India,
        Country::Canada,
        Country::Australia,
    ];

    /// Two-letter region code used in the feed's `hl`, `gl` and `ceid` parameters.
    pub fn code(&self) -> &'static str {
        match self {
            Country::UnitedStates => "US",
            Country::UnitedKingdom => "GB",
            Country::India => "IN",
            Country::Canada => "CA",
            Country::Australia => "AU",
        }
    }

    /// Display name shown in the headline list and `countries` listing.
    pub fn name(&self) -> &'static str {
        match self {
            Country::UnitedStates => "United States",
            Country::UnitedKingdom => "United Kingdom",
            Country::India => "India",
            Country::Canada => "Canada",
            Country::Australia => "Australia",
        }
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Country {
    type Err = UnknownChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_choice(s);
        Country::ALL
            .into_iter()
            .find(|c| normalize_choice(c.code()) == wanted || normalize_choice(c.name()) == wanted)
            .ok_or_else(|| UnknownChoice {
                kind: "country",
                value: s.to_string(),
            })
    }
}

/// Predefined news categories.
///
/// A category's label is the feed search topic, except
/// [`Category::TopStories`], which searches nothing and returns the region's
/// general headlines. A non-blank free-text search overrides the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Category {
    #[default]
    TopStories,
    World,
    Us,
    Business,
    Technology,
    Entertainment,
    Sports,
    Science,
    Health,
}

impl Category {
    /// Every category, in menu order.
    pub const ALL: [Category; 9] = [
        Category::TopStories,
        Category::World,
        Category::Us,
        Category::Business,
        Category::Technology,
        Category::Entertainment,
        Category::Sports,
        Category::Science,
        Category::Health,
    ];

    /// The label, which doubles as the feed search topic.
    pub fn label(&self) -> &'static str {
        match self {
            Category::TopStories => "Top Stories",
            Category::World => "World",
            Category::Us => "U.S.",
            Category::Business => "Business",
            Category::Technology => "Technology",
            Category::Entertainment => "Entertainment",
            Category::Sports => "Sports",
            Category::Science => "Science",
            Category::Health => "Health",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = UnknownChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_choice(s);
        Category::ALL
            .into_iter()
            .find(|c| normalize_choice(c.label()) == wanted)
            .ok_or_else(|| UnknownChoice {
                kind: "category",
                value: s.to_string(),
            })
    }
}

/// How summaries are formatted by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SummaryStyle {
    #[default]
    Bullets,
    Paragraph,
}

impl SummaryStyle {
    /// The phrase substituted into the summary prompt.
    pub fn phrase(&self) -> &'static str {
        match self {
            SummaryStyle::Bullets => "3 concise bullet points",
            SummaryStyle::Paragraph => "A single, informative paragraph",
        }
    }
}

impl fmt::Display for SummaryStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.phrase())
    }
}

impl FromStr for SummaryStyle {
    type Err = UnknownChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_choice(s).as_str() {
            "bullets" | "bullet" | "points" | "3concisebulletpoints" => Ok(SummaryStyle::Bullets),
            "paragraph" | "asingleinformativeparagraph" => Ok(SummaryStyle::Paragraph),
            _ => Err(UnknownChoice {
                kind: "summary style",
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_country_parses_code_and_name() {
        assert_eq!("gb".parse::<Country>().unwrap(), Country::UnitedKingdom);
        assert_eq!("United States".parse::<Country>().unwrap(), Country::UnitedStates);
        assert_eq!("IN".parse::<Country>().unwrap().code(), "IN");
        assert!("FR".parse::<Country>().is_err());
    }

    #[test]
    fn test_category_parsing_ignores_punctuation() {
        assert_eq!("U.S.".parse::<Category>().unwrap(), Category::Us);
        assert_eq!("us".parse::<Category>().unwrap(), Category::Us);
        assert_eq!("top stories".parse::<Category>().unwrap(), Category::TopStories);
        assert_eq!("Top-Stories".parse::<Category>().unwrap(), Category::TopStories);
        let err = "gardening".parse::<Category>().unwrap_err();
        assert_eq!(err.kind, "category");
    }

    #[test]
    fn test_summary_style_aliases() {
        assert_eq!("bullets".parse::<SummaryStyle>().unwrap(), SummaryStyle::Bullets);
        assert_eq!("Paragraph".parse::<SummaryStyle>().unwrap(), SummaryStyle::Paragraph);
        assert_eq!(SummaryStyle::Bullets.phrase(), "3 concise bullet points");
        assert!("haiku".parse::<SummaryStyle>().is_err());
    }

    #[test]
    fn test_transcript_grows_until_cleared() {
        let mut transcript = ChatTranscript::default();
        transcript.push(ChatMessage::user("hi"));
        transcript.push(ChatMessage::assistant("hello"));
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.messages()[1].role, ChatRole::Assistant);
        transcript.clear();
        assert!(transcript.is_empty());
    }

    #[test]
    fn test_analysis_kinds_render_in_menu_order() {
        let headings: Vec<_> = AnalysisKind::ALL.iter().map(|k| k.heading()).collect();
        assert_eq!(
            headings,
            vec!["AI Summary", "Sentiment Analysis", "Key Information", "Question & Answer"]
        );
    }

    #[test]
    fn test_article_keeps_utc_publication_time() {
        let published = chrono::TimeZone::with_ymd_and_hms(&Utc, 2026, 10, 17, 14, 30, 0).unwrap();
        let article = Article {
            title: "Headline".into(),
            link: "https://news.test/a".into(),
            source: "Test Wire".into(),
            published_date: published,
        };
        assert_eq!(article.clone(), article);
        assert_eq!(article.published_date.format("%d %b %Y").to_string(), "17 Oct 2026");
    }

    #[test]
    fn test_scrape_failure_messages() {
        assert!(ScrapeFailure::TooShort.to_string().contains("too short"));
        let e = ScrapeFailure::Exception("timeout".into());
        assert_eq!(e.to_string(), "Scraping failed with headless browser: timeout");
        assert_eq!(ScrapeOutcome::Failed(e).text(), None);
        assert_eq!(ScrapeOutcome::Text("body".into()).text(), Some("body"));
    }
}
