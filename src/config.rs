//! Configuration file parser for ~/.config/newsaggr/config.toml.
//!
//! A missing or empty file yields `Config::default()`.
//! Unknown keys are accepted by serde but logged as warnings, since they are
//! usually typos.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::storage::NewSource;

/// Environment variable overriding `database_path`
pub const DATABASE_ENV: &str = "NEWSAGGR_DATABASE";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    /// A value parsed but is not usable
    #[error("Invalid config value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Ingester settings. Every key is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database file. `None` means `<config dir>/newsaggr.db`.
    pub database_path: Option<PathBuf>,

    /// Minutes between ingestion runs. Must be non-zero.
    pub interval_minutes: u64,

    /// Whether to run once immediately when the scheduler starts.
    pub run_on_start: bool,

    /// Per-source fetch timeout in seconds.
    pub fetch_timeout_secs: u64,

    /// Largest feed document accepted, in bytes.
    pub max_feed_bytes: usize,

    /// User-Agent header sent with every feed request.
    pub user_agent: String,

    /// Sources created at startup if their link is not registered yet.
    pub sources: Vec<NewSource>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            interval_minutes: 60,
            run_on_start: true,
            fetch_timeout_secs: 30,
            max_feed_bytes: crate::feed::DEFAULT_MAX_FEED_SIZE,
            user_agent: format!("newsaggr/{}", env!("CARGO_PKG_VERSION")),
            sources: default_sources(),
        }
    }
}

fn default_sources() -> Vec<NewSource> {
    [
        ("https://cloudblog.withgoogle.com/rss/", "cloud.google.com/blog"),
        ("https://blog.google/rss/", "blog.google"),
        ("https://feeds.feedburner.com/GDBcode", "developers.googleblog.com"),
    ]
    .into_iter()
    .map(|(link, provider)| NewSource {
        link: link.to_string(),
        provider: provider.to_string(),
        category: "engineering".to_string(),
    })
    .collect()
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Read and validate the ingester settings at `path`.
    ///
    /// Absent or blank files fall back to defaults. Malformed TOML is a
    /// `ConfigError::Parse`; a zero interval or timeout, or a seed source
    /// with an unusable link, is a `ConfigError::Invalid`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Removed after the size check
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                "database_path",
                "interval_minutes",
                "run_on_start",
                "fetch_timeout_secs",
                "max_feed_bytes",
                "user_agent",
                "sources",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let mut config: Config = toml::from_str(&content)?;
        config.validate()?;
        tracing::info!(
            path = %path.display(),
            interval_minutes = config.interval_minutes,
            sources = config.sources.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Reject values that parse but cannot drive the pipeline.
    ///
    /// Source links are rewritten to their parsed form, the same form
    /// `sources add` stores, so both paths hit the same `UNIQUE(link)` row.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.interval_minutes == 0 {
            return Err(ConfigError::Invalid {
                key: "interval_minutes",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "fetch_timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        for source in &mut self.sources {
            let url =
                crate::util::validate_feed_url(&source.link).map_err(|e| ConfigError::Invalid {
                    key: "sources",
                    reason: format!("{}: {}", source.link, e),
                })?;
            source.link = url.to_string();
        }
        Ok(())
    }

    /// Apply `NEWSAGGR_DATABASE` if set.
    pub fn apply_env(&mut self) {
        self.apply_database_override(std::env::var(DATABASE_ENV).ok());
    }

    fn apply_database_override(&mut self, value: Option<String>) {
        if let Some(path) = value.filter(|v| !v.trim().is_empty()) {
            self.database_path = Some(PathBuf::from(path));
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.saturating_mul(60))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write_config(name: &str, content: &str) -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!("newsaggr_config_test_{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_default_config() {
        let mut config = Config::default();
        assert_eq!(config.interval_minutes, 60);
        assert_eq!(config.interval(), Duration::from_secs(3600));
        assert!(config.run_on_start);
        assert_eq!(config.fetch_timeout(), Duration::from_secs(30));
        assert_eq!(config.max_feed_bytes, 10 * 1024 * 1024);
        assert!(config.database_path.is_none());
        assert_eq!(config.sources.len(), 3);
        assert!(config.user_agent.starts_with("newsaggr/"));

        // Built-in seeds are already in canonical form
        let before = config.sources.clone();
        config.validate().unwrap();
        assert_eq!(config.sources, before);
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/newsaggr_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.interval_minutes, 60);
    }

    #[test]
    fn test_empty_file_returns_default() {
        let (dir, path) = write_config("empty", "   \n  ");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.interval_minutes, 60);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_full_config() {
        let content = r#"
database_path = "/var/lib/newsaggr/articles.db"
interval_minutes = 15
run_on_start = false
fetch_timeout_secs = 5
max_feed_bytes = 4096
user_agent = "custom-agent"

[[sources]]
link = "https://example.com/rss"
provider = "example.com"
category = "news"
"#;
        let (dir, path) = write_config("full", content);

        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.database_path,
            Some(PathBuf::from("/var/lib/newsaggr/articles.db"))
        );
        assert_eq!(config.interval(), Duration::from_secs(900));
        assert!(!config.run_on_start);
        assert_eq!(config.fetch_timeout(), Duration::from_secs(5));
        assert_eq!(config.max_feed_bytes, 4096);
        assert_eq!(config.user_agent, "custom-agent");
        assert_eq!(
            config.sources,
            vec![NewSource {
                link: "https://example.com/rss".to_string(),
                provider: "example.com".to_string(),
                category: "news".to_string(),
            }]
        );

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_partial_config_keeps_default_sources() {
        let (dir, path) = write_config("partial", "interval_minutes = 5\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.interval_minutes, 5);
        assert_eq!(config.sources.len(), 3);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_empty_sources_list_allowed() {
        let (dir, path) = write_config("no_sources", "sources = []\n");
        let config = Config::load(&path).unwrap();
        assert!(config.sources.is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_zero_interval_rejected() {
        let (dir, path) = write_config("zero_interval", "interval_minutes = 0\n");
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "interval_minutes",
                ..
            }
        ));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let (dir, path) = write_config("zero_timeout", "fetch_timeout_secs = 0\n");
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::Invalid {
                key: "fetch_timeout_secs",
                ..
            })
        ));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_bad_source_link_rejected() {
        let content = r#"
[[sources]]
link = "ftp://example.com/feed"
provider = "example"
category = "news"
"#;
        let (dir, path) = write_config("bad_link", content);
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("ftp://example.com/feed"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let (dir, path) = write_config("invalid", "this is not [valid toml");
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_wrong_type_returns_error() {
        let (dir, path) = write_config("wrong_type", "interval_minutes = \"hourly\"\n");
        assert!(Config::load(&path).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let (dir, path) = write_config("unknown", "interval_minutes = 30\ntheme = \"dark\"\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.interval_minutes, 30);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_too_large_file_rejected() {
        let (dir, path) = write_config("too_large", &"a".repeat(1_048_577));
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_source_links_normalized() {
        let content = r#"
[[sources]]
link = "  HTTPS://Example.com  "
provider = "example"
category = "news"
"#;
        let (dir, path) = write_config("normalized", content);
        let config = Config::load(&path).unwrap();
        assert_eq!(config.sources[0].link, "https://example.com/");
        assert_eq!(
            config.sources[0].link,
            crate::util::validate_feed_url("https://example.com")
                .unwrap()
                .to_string()
        );
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_database_override() {
        let mut config = Config::default();
        config.apply_database_override(Some("/tmp/override.db".to_string()));
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/override.db")));

        // Blank values are ignored
        config.apply_database_override(Some("  ".to_string()));
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/override.db")));
        config.apply_database_override(None);
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/override.db")));
    }
}
