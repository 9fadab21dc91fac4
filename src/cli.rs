//! Command-line interface definitions for News Intel.
//!
//! All arguments can be provided via command-line flags or environment variables.

use crate::models::{Category, Country, SummaryStyle};
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the News Intel dashboard.
///
/// # Examples
///
/// ```sh
/// # Key from the environment, defaults for everything else
/// GOOGLE_API_KEY=... news_intel
///
/// # Start on UK business news with paragraph summaries
/// news_intel --country GB --category Business --style paragraph
///
/// # Override policy constants from a YAML file
/// news_intel --config ./news_intel.yaml --secrets ./secrets.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Gemini API key
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// YAML secrets file holding `google_api_key`, used when no key is given
    #[arg(long, env = "NEWS_INTEL_SECRETS", default_value = "secrets.yaml")]
    pub secrets: PathBuf,

    /// Optional YAML settings file overriding thresholds, timeouts and models
    #[arg(short, long, env = "NEWS_INTEL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Country to start with (code or name)
    #[arg(long, default_value = "US")]
    pub country: Country,

    /// Category to start with
    #[arg(long, default_value = "Top Stories")]
    pub category: Category,

    /// Free-text topic to start with; overrides the category
    #[arg(short, long)]
    pub search: Option<String>,

    /// Summary style: `bullets` or `paragraph`
    #[arg(long, default_value = "bullets")]
    pub style: SummaryStyle,

    /// Chrome or Chromium binary used for scraping; auto-detected when omitted
    #[arg(long, env = "CHROME_PATH")]
    pub chrome_path: Option<PathBuf>,
}
