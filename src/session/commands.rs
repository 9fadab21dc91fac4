//! Parsing of command-loop input lines into [`Command`] values.
//!
//! Article numbers are 1-based, matching the rendered list.

use crate::models::{AnalysisKind, Category, Country, SummaryStyle, UnknownChoice};
use std::str::FromStr;
use thiserror::Error;

/// One user action, parsed from an input line.
///
/// See `help` in the running program for the input syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `country <code|name>`
    SetCountry(Country),
    /// `category <name>`
    SetCategory(Category),
    /// Free-text topic; empty clears the search and falls back to the category.
    Search(String),
    /// `style bullets|paragraph`
    SetStyle(SummaryStyle),
    /// `show [n]`; `None` keeps the current display limit.
    Show(Option<usize>),
    /// Fetch again for the current topic and country.
    Refresh,
    /// `summarize`, `sentiment` or `keyinfo` on a 1-based article number.
    Analyze { article: usize, kind: AnalysisKind },
    /// `ask <n> <question>`
    Ask { article: usize, question: String },
    /// Show stored results for an article.
    Results(usize),
    /// Open an article in the system browser.
    Open(usize),
    /// General chat message, unrelated to any article.
    Chat(String),
    /// Clear the chat and its transcript.
    NewChat,
    Transcript,
    Countries,
    Categories,
    Status,
    Help,
    Quit,
}

/// Why an input line could not be parsed. Shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Blank line; the loop just prompts again.
    #[error("empty command")]
    Empty,
    #[error("unknown command {0:?}; type `help` for the list")]
    Unknown(String),
    #[error("`{command}` needs {what}")]
    MissingArgument {
        command: &'static str,
        what: &'static str,
    },
    #[error("{0:?} is not an article number")]
    InvalidArticle(String),
    #[error(transparent)]
    Choice(#[from] UnknownChoice),
}

fn article_number(raw: &str) -> Result<usize, CommandError> {
    match raw.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(CommandError::InvalidArticle(raw.to_string())),
    }
}

fn required<'a>(rest: &'a str, command: &'static str, what: &'static str) -> Result<&'a str, CommandError> {
    if rest.is_empty() {
        Err(CommandError::MissingArgument { command, what })
    } else {
        Ok(rest)
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        if line.is_empty() {
            return Err(CommandError::Empty);
        }
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };

        let analyze = |kind: AnalysisKind, command: &'static str| -> Result<Command, CommandError> {
            let n = required(rest, command, "an article number")?;
            Ok(Command::Analyze {
                article: article_number(n)?,
                kind,
            })
        };

        match head.to_lowercase().as_str() {
            "country" => Ok(Command::SetCountry(
                required(rest, "country", "a country code or name")?.parse()?,
            )),
            "category" => Ok(Command::SetCategory(
                required(rest, "category", "a category name")?.parse()?,
            )),
            "search" => Ok(Command::Search(rest.to_string())),
            "style" => Ok(Command::SetStyle(
                required(rest, "style", "`bullets` or `paragraph`")?.parse()?,
            )),
            "show" | "list" => match rest {
                "" => Ok(Command::Show(None)),
                n => Ok(Command::Show(Some(article_number(n)?))),
            },
            "refresh" => Ok(Command::Refresh),
            "summarize" | "summary" => analyze(AnalysisKind::Summary, "summarize"),
            "sentiment" => analyze(AnalysisKind::Sentiment, "sentiment"),
            "keyinfo" | "entities" => analyze(AnalysisKind::Entities, "keyinfo"),
            "ask" => {
                let rest = required(rest, "ask", "an article number and a question")?;
                let (n, question) = rest.split_once(char::is_whitespace).ok_or(
                    CommandError::MissingArgument {
                        command: "ask",
                        what: "a question after the article number",
                    },
                )?;
                Ok(Command::Ask {
                    article: article_number(n)?,
                    question: question.trim().to_string(),
                })
            }
            "results" => Ok(Command::Results(article_number(required(
                rest,
                "results",
                "an article number",
            )?)?)),
            "open" | "read" => Ok(Command::Open(article_number(required(
                rest,
                "open",
                "an article number",
            )?)?)),
            "chat" => Ok(Command::Chat(required(rest, "chat", "a message")?.to_string())),
            "new-chat" | "newchat" => Ok(Command::NewChat),
            "transcript" => Ok(Command::Transcript),
            "countries" => Ok(Command::Countries),
            "categories" => Ok(Command::Categories),
            "status" => Ok(Command::Status),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}
