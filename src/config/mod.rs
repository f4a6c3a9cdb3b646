//! Configuration management.
//!
//! Configuration is read from `~/.config/feedrelay/config.toml` unless a
//! path is given. If the default file doesn't exist, one with comments is
//! created. Every section is optional.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::Deserialize;

use crate::app::{FeedRelayError, Result};
use crate::collab::TransformConfig;
use crate::domain::Source;
use crate::extract::ExtractorConfig;
use crate::fetcher::RelayConfig;
use crate::pagination::{PaginationStrategy, StrategyTable};
use crate::store::DEFAULT_STALE_AFTER_SECS;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds during which page 1 is served from the cache (default: 300)
    pub stale_after_secs: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_after_secs: DEFAULT_STALE_AFTER_SECS,
        }
    }
}

impl CacheConfig {
    pub fn stale_after(&self) -> Duration {
        Duration::seconds(self.stale_after_secs)
    }
}

/// Main configuration struct.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub relay: RelayConfig,
    pub extractor: ExtractorConfig,
    pub cache: CacheConfig,
    pub transform: TransformConfig,
    pub sources: Vec<Source>,
    /// Per-source strategies layered over the built-in table
    pub pagination: HashMap<String, PaginationStrategy>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            relay: RelayConfig::default(),
            extractor: ExtractorConfig::default(),
            cache: CacheConfig::default(),
            transform: TransformConfig::default(),
            sources: Source::builtin(),
            pagination: HashMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the default path.
    ///
    /// A missing default file is created with comments and defaults are
    /// returned. An explicit path must exist. Missing fields use default
    /// values.
    pub fn load(path: Option<&Path>) -> std::result::Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default_path = Self::default_config_path()?;
                if !default_path.exists() {
                    Self::create_default_config(&default_path)?;
                    return Ok(Self::default());
                }
                default_path
            }
        };

        Self::from_file(&config_path)
    }

    pub fn from_file(path: &Path) -> std::result::Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/feedrelay/config.toml`
    pub fn default_config_path() -> std::result::Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("feedrelay").join("config.toml"))
    }

    /// Write the commented default config to `path`.
    pub fn create_default_config(path: &Path) -> std::result::Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    pub fn strategy_table(&self) -> StrategyTable {
        StrategyTable::builtin().with_overrides(self.pagination.clone())
    }

    pub fn find_source(&self, id: &str) -> Result<&Source> {
        self.sources
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| FeedRelayError::SourceNotFound(id.to_string()))
    }

    /// Generate the default config file content with comments.
    pub fn default_config_content() -> String {
        r##"# feedrelay configuration

[relay]
# Relay endpoints, tried in order. {url} is the percent-encoded target,
# {raw} the target as-is. Use ["{raw}"] to fetch directly.
endpoints = [
    "https://corsproxy.io/?{url}",
    "https://api.allorigins.win/raw?url={url}",
    "https://api.codetabs.com/v1/proxy?quest={url}",
    "https://thingproxy.freeboard.io/fetch/{raw}",
]

# Per-relay timeout in seconds
timeout_secs = 10

# Cache-busting query parameter ("" disables it)
cache_bust_param = "_cb"

# Domains that reject unknown query parameters
no_cache_bust_domains = ["theverge.com"]

[extractor]
# Paragraph density fallback: more than this many <p> elements
min_paragraphs = 3

# Paragraph-to-link ratio a density candidate must exceed (0 accepts all)
min_paragraph_link_ratio = 0.3

# Content shorter than this is a stub worth replacing with the full text
min_content_length = 200

# Concurrent extractions during background enrichment
max_concurrency = 5

# Backfill stub articles in the background after every load
background = false

# Separator between containers of an article split across several
separator = "<br/>"

[cache]
# Seconds during which page 1 is reused instead of refetched
stale_after_secs = 300

[transform]
# External programs for rewrite/summarize; content is piped to stdin
# rewrite_command = ["llm", "-s", "Rewrite as clean Markdown"]
# summarize_command = ["llm", "-s", "Summarize in 3 bullet points"]

# Sources. kind is "syndication" (default), "api" or "listing".
[[sources]]
id = "cnbeta"
name = "CnBeta"
url = "https://www.cnbeta.com.tw/backend.php?rid=1"

[[sources]]
id = "36kr"
name = "36Kr"
url = "https://36kr.com/feed"

[[sources]]
id = "sspai"
name = "少数派"
url = "https://sspai.com/feed"

[[sources]]
id = "verge"
name = "The Verge"
url = "https://www.theverge.com/rss/index.xml"

[[sources]]
id = "hackernews"
name = "Hacker News"
url = "https://news.ycombinator.com/rss"

[[sources]]
id = "v2ex"
name = "V2EX"
url = "https://www.v2ex.com/index.xml"

# Pagination overrides, keyed by source id. {page} is the page number,
# {offset} is (page - 1) * page_size.
#
# [pagination.myblog]
# url = "https://blog.example/page/{page}"
# mode = "scrape"
# selector = "h2.entry-title a"
#
# [pagination.myapi]
# url = "https://api.example/posts?offset={offset}"
# page_size = 20
# mode = "api"
# fields = { items = "/posts", guid = "/id", title = "/title", link = "/url" }
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
