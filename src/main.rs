//! # News Intel
//!
//! A terminal news dashboard. Pick a country and a topic, get the last 24
//! hours of Google News headlines, and run AI actions on any article:
//! summary, sentiment, key information, or questions answered strictly from
//! the article text. A separate general-purpose chat is available too.
//!
//! ## Features
//!
//! - Google News search RSS feed per country and topic
//! - Article text scraped with headless Chrome, consent banners dismissed
//! - Gemini-backed analysis with quota-aware error messages
//! - Per-session caches: feed (10 min), scrapes (1 h), analysis results
//!
//! ## Usage
//!
//! ```sh
//! GOOGLE_API_KEY=... news_intel --country GB
//! ```
//!
//! ## Architecture
//!
//! 1. **Startup**: parse CLI, load settings, resolve the API key and one
//!    Gemini model. Any failure here is fatal.
//! 2. **Command loop**: each input line becomes a [`Command`] dispatched to
//!    the [`Session`], which fetches, scrapes and calls the model as needed.

use clap::Parser;
use std::error::Error;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cache;
mod cli;
mod config;
mod feed;
mod gateway;
mod models;
mod outputs;
mod prompts;
mod scraper;
mod session;
mod utils;

#[cfg(test)]
mod testing;

use cli::Cli;
use config::{Settings, resolve_api_key};
use feed::GoogleNewsFeed;
use gateway::AiGateway;
use gateway::gemini::GeminiClient;
use scraper::chrome::ChromeLauncher;
use scraper::{ScrapeOptions, Scraper};
use session::{Command, CommandError, Flow, Preferences, Session};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    info!("news_intel starting up");

    let args = Cli::parse();
    debug!(?args.config, ?args.secrets, country = args.country.code(), "Parsed CLI arguments");

    // ---- Configuration: every failure here ends the session ----
    let mut settings = match Settings::load(args.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => exit_with(StartupError::Config(e)),
    };
    if args.chrome_path.is_some() {
        settings.chrome_path = args.chrome_path.clone();
    }

    let api_key = match resolve_api_key(args.api_key.as_deref(), &args.secrets) {
        Ok(key) => key,
        Err(e) => exit_with(StartupError::Config(e)),
    };

    let backend = GeminiClient::new(&settings.gemini_base_url, api_key)?;
    let gateway = match AiGateway::resolve(backend, &settings.model_candidates, settings.model_timeout()).await {
        Ok(gateway) => gateway,
        Err(e) => exit_with(StartupError::Model(e)),
    };

    let feed = GoogleNewsFeed::new(&settings)?;
    let scraper = Scraper::new(
        ChromeLauncher,
        ScrapeOptions::from_settings(&settings),
        settings.scrape_cache_ttl(),
    );
    let prefs = Preferences {
        country: args.country,
        category: args.category,
        search: args.search.unwrap_or_default(),
        style: args.style,
    };
    let mut session = Session::new(feed, scraper, gateway, prefs, &settings);

    println!("# AI News Intelligence Dashboard\n");
    println!("{}", session.start().await);
    println!("Type `help` for commands.");

    run_command_loop(&mut session).await?;

    info!("news_intel shutting down");
    Ok(())
}

/// Fatal startup failures. Each one is reported once, on stderr, and ends
/// the process before the command loop starts.
#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("❌ {0}")]
    Config(#[source] config::ConfigError),
    #[error("❌ Failed to load Gemini model. Check your GOOGLE_API_KEY. ({0})")]
    Model(#[source] gateway::GatewayError),
}

/// Log and print `err`, then exit with status 1.
fn exit_with(err: StartupError) -> ! {
    error!(error = %err, "Startup failed");
    eprintln!("{err}");
    std::process::exit(1)
}

/// Read commands from stdin until `quit` or end of input.
async fn run_command_loop<F, L, B>(session: &mut Session<F, L, B>) -> Result<(), Box<dyn Error>>
where
    F: feed::NewsFeed,
    L: scraper::BrowserLauncher,
    B: gateway::ModelBackend,
{
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(CommandError::Empty) => continue,
            Err(e) => {
                warn!(input = %line, error = %e, "Rejected command");
                println!("{e}\n");
                continue;
            }
        };

        match session.dispatch(command).await {
            Flow::Continue(text) => println!("{text}"),
            Flow::Quit => break,
        }
    }
    info!(
        topic = %session.preferences().topic(),
        articles = session.articles().len(),
        transcript = session.transcript().len(),
        chat_turns = session.chat_session().history().len(),
        "Command loop finished"
    );
    Ok(())
}
