//! Markdown rendering of the session for the terminal.
//!
//! Everything the command loop prints goes through here, so the session
//! logic never formats text itself.

use crate::models::{AnalysisKind, Article, Category, ChatTranscript, Country};
use crate::session::Preferences;
use crate::utils::upcase;
use std::fmt::Write;

/// Render the headline list, numbered from 1, showing at most `limit` items.
pub fn article_list(prefs: &Preferences, articles: &[Article], limit: usize) -> String {
    let mut md = String::new();
    let _ = writeln!(
        md,
        "## Latest News for: '{}' in {}\n",
        prefs.topic(),
        prefs.country
    );

    if articles.is_empty() {
        md.push_str("Couldn't find any news. Please try another search or category.\n");
        return md;
    }

    for (i, article) in articles.iter().take(limit).enumerate() {
        let _ = writeln!(md, "{}. **{}**", i + 1, article.title);
        let _ = writeln!(
            md,
            "   Source: {} | Published: {}",
            article.source,
            article.published_date.format("%d %b %Y")
        );
    }
    let _ = writeln!(
        md,
        "\nShowing {} of {} articles.",
        limit.min(articles.len()),
        articles.len()
    );
    md
}

/// Render every cached analysis for one article.
///
/// `lookup` returns the cached text for a kind; `question` the last question
/// asked about this article.
pub fn article_results<'a>(
    number: usize,
    article: &Article,
    lookup: impl Fn(AnalysisKind) -> Option<&'a str>,
    question: Option<&str>,
) -> String {
    let mut md = String::new();
    let _ = writeln!(md, "### {}. {}", number, article.title);
    let _ = writeln!(md, "{}\n", article.link);

    let mut any = false;
    for kind in AnalysisKind::ALL {
        let Some(text) = lookup(kind) else { continue };
        any = true;
        let _ = writeln!(md, "#### {}", kind.heading());
        if kind == AnalysisKind::Qa {
            if let Some(q) = question {
                let _ = writeln!(md, "**Your Question:** {q}\n");
            }
            md.push_str("**Gemini's Answer:**\n");
        }
        let _ = writeln!(md, "{}\n", text.trim_end());
    }
    if !any {
        md.push_str("No analysis yet. Try `summarize`, `sentiment`, `keyinfo` or `ask`.\n");
    }
    md
}

pub fn transcript(transcript: &ChatTranscript) -> String {
    if transcript.is_empty() {
        return "The chat is empty. Ask anything with `chat <message>`.\n".to_string();
    }
    let mut md = String::new();
    for message in transcript.messages() {
        let _ = writeln!(md, "**{}:** {}\n", upcase(&message.role.to_string()), message.content);
    }
    md
}

pub fn countries() -> String {
    Country::ALL
        .iter()
        .map(|c| format!("- {} ({})\n", c.name(), c.code()))
        .collect()
}

pub fn categories() -> String {
    Category::ALL
        .iter()
        .map(|c| format!("- {}\n", c.label()))
        .collect()
}

pub fn status(prefs: &Preferences, model: &str) -> String {
    let mut md = String::new();
    let _ = writeln!(md, "- Country: {} ({})", prefs.country, prefs.country.code());
    let _ = writeln!(md, "- Category: {}", prefs.category);
    if !prefs.search.trim().is_empty() {
        let _ = writeln!(md, "- Search: {} (overrides category)", prefs.search.trim());
    }
    let _ = writeln!(md, "- Summary style: {}", prefs.style);
    let _ = writeln!(md, "- Model: {model}");
    md
}

pub fn help() -> &'static str {
    "\
Commands:
  country <code|name>        switch country (see `countries`)
  category <name>            switch category (see `categories`)
  search [topic]             search any topic; empty clears the search
  style bullets|paragraph    summary style
  show [n]                   list headlines, optionally only the first n
  refresh                    fetch the feed again
  summarize <n>              AI summary of article n
  sentiment <n>              sentiment of article n
  keyinfo <n>                key people, organizations and topic of article n
  ask <n> <question>         answer a question from article n's text
  results <n>                show saved analyses for article n
  open <n>                   open article n in your browser
  chat <message>             general AI chat, separate from articles
  new-chat                   start a fresh chat
  transcript                 show the chat so far
  status                     current settings
  help                       this list
  quit                       exit
"
}
