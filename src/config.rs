//! Runtime settings and secret resolution.
//!
//! Every policy constant (content threshold, cache windows, timeouts, the
//! model fallback list) lives in [`Settings`]. The defaults are the values the
//! dashboard has always used; an optional YAML file passed with `--config`
//! overrides any subset of them:
//!
//! ```yaml
//! min_content_chars: 400
//! scrape_cache_ttl_secs: 1800
//! model_candidates: ["gemini-1.5-pro"]
//! ```
//!
//! The Gemini API key is resolved separately by [`resolve_api_key`] and is
//! never part of the settings file.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument};

pub const DEFAULT_FEED_ENDPOINT: &str = "https://news.google.com/rss/search";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";

/// Failures while loading settings or resolving the API key. All are fatal
/// at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid setting {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
    #[error("no Gemini API key: pass --api-key, set GOOGLE_API_KEY, or add google_api_key to {secrets_path}")]
    MissingApiKey { secrets_path: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Search RSS endpoint; query parameters are appended by the feed fetcher.
    pub feed_endpoint: String,
    pub feed_user_agent: String,
    pub feed_timeout_secs: u64,
    pub feed_cache_ttl_secs: u64,

    pub scrape_cache_ttl_secs: u64,
    /// Body text shorter than this many characters is treated as blocked.
    pub min_content_chars: usize,
    pub navigation_timeout_secs: u64,
    pub body_timeout_secs: u64,
    pub consent_delay_ms: u64,
    pub post_consent_delay_ms: u64,
    /// Ranked consent matchers; earlier keywords win.
    pub consent_keywords: Vec<String>,
    pub window_width: u32,
    pub window_height: u32,
    pub browser_user_agent: String,
    pub chrome_path: Option<PathBuf>,

    pub gemini_base_url: String,
    /// Tried in order at startup; the first model that answers is used.
    pub model_candidates: Vec<String>,
    pub model_timeout_secs: u64,

    pub default_display_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            feed_endpoint: DEFAULT_FEED_ENDPOINT.to_string(),
            feed_user_agent: "Mozilla/5.0".to_string(),
            feed_timeout_secs: 15,
            feed_cache_ttl_secs: 600,
            scrape_cache_ttl_secs: 3600,
            min_content_chars: 250,
            navigation_timeout_secs: 30,
            body_timeout_secs: 10,
            consent_delay_ms: 2000,
            post_consent_delay_ms: 1000,
            consent_keywords: vec!["accept".into(), "agree".into(), "consent".into()],
            window_width: 1920,
            window_height: 1080,
            browser_user_agent: DEFAULT_BROWSER_USER_AGENT.to_string(),
            chrome_path: None,
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            model_candidates: vec![
                "gemini-1.5-flash".into(),
                "gemini-1.5-pro".into(),
                "gemini-1.0-pro".into(),
            ],
            model_timeout_secs: 120,
            default_display_limit: 10,
        }
    }
}

impl Settings {
    /// Load settings from an optional YAML file; missing fields keep their defaults.
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let settings = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                let parsed = Self::from_yaml(&raw, &path.display().to_string())?;
                info!(path = %path.display(), "Loaded settings file");
                parsed
            }
            None => Self::default(),
        };
        settings.validate()?;
        debug!(?settings, "Effective settings");
        Ok(settings)
    }

    fn from_yaml(raw: &str, origin: &str) -> Result<Self, ConfigError> {
        // An empty file deserializes to `null`, which `#[serde(default)]` does not cover.
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).map_err(|source| ConfigError::Yaml {
            path: origin.to_string(),
            source,
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.model_candidates.is_empty() {
            return Err(ConfigError::Invalid {
                name: "model_candidates",
                reason: "at least one model id is required".into(),
            });
        }
        if self.default_display_limit == 0 {
            return Err(ConfigError::Invalid {
                name: "default_display_limit",
                reason: "must be at least 1".into(),
            });
        }
        url::Url::parse(&self.feed_endpoint).map_err(|e| ConfigError::Invalid {
            name: "feed_endpoint",
            reason: e.to_string(),
        })?;
        url::Url::parse(&self.gemini_base_url).map_err(|e| ConfigError::Invalid {
            name: "gemini_base_url",
            reason: e.to_string(),
        })?;
        Ok(())
    }

    /// Whole-request limit for one feed fetch.
    pub fn feed_timeout(&self) -> Duration {
        Duration::from_secs(self.feed_timeout_secs)
    }

    /// How long a successful feed fetch is reused.
    pub fn feed_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.feed_cache_ttl_secs)
    }

    /// How long a scrape outcome, success or failure, is reused.
    pub fn scrape_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.scrape_cache_ttl_secs)
    }

    /// Per-call limit for model requests.
    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }
}

#[derive(Debug, Default, Deserialize)]
struct Secrets {
    google_api_key: Option<String>,
}

/// Resolve the Gemini API key.
///
/// Precedence: the CLI flag (which clap already fills from `GOOGLE_API_KEY`),
/// then `google_api_key` in the secrets file. A missing secrets file is not an
/// error; a malformed one is. Blank values count as absent.
#[instrument(level = "info", skip(cli_key), fields(secrets_path = %secrets_path.display()))]
pub fn resolve_api_key(cli_key: Option<&str>, secrets_path: &Path) -> Result<String, ConfigError> {
    if let Some(key) = cli_key.map(str::trim).filter(|k| !k.is_empty()) {
        debug!("Using API key from command line or environment");
        return Ok(key.to_string());
    }

    let secrets = match std::fs::read_to_string(secrets_path) {
        Ok(raw) if raw.trim().is_empty() => Secrets::default(),
        Ok(raw) => serde_yaml::from_str::<Secrets>(&raw).map_err(|source| ConfigError::Yaml {
            path: secrets_path.display().to_string(),
            source,
        })?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Secrets::default(),
        Err(source) => {
            return Err(ConfigError::Io {
                path: secrets_path.display().to_string(),
                source,
            });
        }
    };

    secrets
        .google_api_key
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .inspect(|_| info!("Using API key from secrets file"))
        .ok_or_else(|| ConfigError::MissingApiKey {
            secrets_path: secrets_path.display().to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{TempDir, tempdir};

    /// Write `contents` to `name` inside a fresh temp dir. The dir (and file)
    /// are removed when the returned guard drops.
    fn temp_file(name: &str, contents: &str) -> (TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_temp_files_removed_on_drop() {
        let (dir, path) = temp_file("settings.yaml", "min_content_chars: 300\n");
        let root = dir.path().to_path_buf();
        assert_eq!(Settings::load(Some(&path)).unwrap().min_content_chars, 300);
        drop(dir);
        assert!(!path.exists());
        assert!(!root.exists());
    }

    #[test]
    fn test_defaults_match_dashboard_policy() {
        let s = Settings::default();
        assert_eq!(s.min_content_chars, 250);
        assert_eq!(s.scrape_cache_ttl(), Duration::from_secs(3600));
        assert_eq!(s.feed_cache_ttl(), Duration::from_secs(600));
        assert_eq!(s.model_timeout(), Duration::from_secs(120));
        assert_eq!(s.feed_timeout(), Duration::from_secs(15));
        assert_eq!(s.consent_keywords, vec!["accept", "agree", "consent"]);
        assert_eq!(s.model_candidates[0], "gemini-1.5-flash");
    }

    #[test]
    fn test_partial_yaml_overlays_defaults() {
        let (_dir, path) = temp_file("partial.yaml", "min_content_chars: 400\nmodel_candidates: [\"gemini-1.5-pro\"]\n");
        let s = Settings::load(Some(&path)).unwrap();
        assert_eq!(s.min_content_chars, 400);
        assert_eq!(s.model_candidates, vec!["gemini-1.5-pro"]);
        assert_eq!(s.body_timeout_secs, 10);
    }

    #[test]
    fn test_empty_yaml_is_defaults() {
        let (_dir, path) = temp_file("empty.yaml", "\n");
        assert_eq!(Settings::load(Some(&path)).unwrap(), Settings::default());
    }

    #[test]
    fn test_empty_model_list_rejected() {
        let (_dir, path) = temp_file("nomodels.yaml", "model_candidates: []\n");
        let err = Settings::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "model_candidates", .. }));
    }

    #[test]
    fn test_missing_settings_file_is_io_error() {
        let err = Settings::load(Some(Path::new("/definitely/not/here.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_cli_key_wins_over_secrets() {
        let (_dir, path) = temp_file("secrets_a.yaml", "google_api_key: from-file\n");
        assert_eq!(resolve_api_key(Some("from-cli"), &path).unwrap(), "from-cli");
    }

    #[test]
    fn test_secrets_file_fallback() {
        let (_dir, path) = temp_file("secrets_b.yaml", "google_api_key: \"  from-file  \"\n");
        assert_eq!(resolve_api_key(None, &path).unwrap(), "from-file");
        assert_eq!(resolve_api_key(Some("   "), &path).unwrap(), "from-file");
    }

    #[test]
    fn test_missing_key_is_fatal_error() {
        let err = resolve_api_key(None, Path::new("/definitely/not/secrets.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey { .. }));

        let (_dir, path) = temp_file("secrets_c.yaml", "other: value\n");
        assert!(matches!(
            resolve_api_key(None, &path).unwrap_err(),
            ConfigError::MissingApiKey { .. }
        ));
    }
}
