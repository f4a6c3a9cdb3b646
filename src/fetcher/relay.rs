use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use url::Url;

use crate::fetcher::Fetcher;

/// Relay configuration.
///
/// Endpoint templates are tried in order. `{url}` is replaced with the
/// percent-encoded target, `{raw}` with the target as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub endpoints: Vec<String>,

    /// Per-relay request timeout in seconds (default: 10)
    pub timeout_secs: u64,

    pub user_agent: String,

    /// Query parameter appended to defeat relay caches; empty disables it
    pub cache_bust_param: String,

    /// Domains (and their subdomains) that reject unknown query parameters
    pub no_cache_bust_domains: Vec<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![
                "https://corsproxy.io/?{url}".to_string(),
                "https://api.allorigins.win/raw?url={url}".to_string(),
                "https://api.codetabs.com/v1/proxy?quest={url}".to_string(),
                "https://thingproxy.freeboard.io/fetch/{raw}".to_string(),
            ],
            timeout_secs: 10,
            user_agent: concat!("feedrelay/", env!("CARGO_PKG_VERSION")).to_string(),
            cache_bust_param: "_cb".to_string(),
            no_cache_bust_domains: vec!["theverge.com".to_string()],
        }
    }
}

impl RelayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// No relaying and no cache busting: every request goes straight to
    /// the target.
    pub fn direct() -> Self {
        Self {
            endpoints: vec!["{raw}".to_string()],
            cache_bust_param: String::new(),
            ..Default::default()
        }
    }
}

pub fn wrap_url(template: &str, target: &str) -> String {
    template
        .replace("{url}", &urlencoding::encode(target))
        .replace("{raw}", target)
}

/// Issues GETs through an ordered list of relays, falling back to the next
/// relay on any failure except an authoritative 404.
pub struct RelayClient {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    config: RelayConfig,
}

impl RelayClient {
    pub fn new(fetcher: Arc<dyn Fetcher + Send + Sync>, config: RelayConfig) -> Self {
        Self { fetcher, config }
    }

    /// Fetch `target` as text. `None` when the resource does not exist or
    /// every relay failed.
    pub async fn fetch_text(&self, target: &str) -> Option<String> {
        let busted = self.cache_busted(target);

        for template in &self.config.endpoints {
            let relay_url = wrap_url(template, &busted);
            debug!(relay = %template, url = %target, "Relay attempt");

            match self.fetcher.get(&relay_url).await {
                Ok(response) if response.status == StatusCode::NOT_FOUND => {
                    warn!(url = %target, "404 Not Found, not trying other relays");
                    return None;
                }
                Ok(response) if response.status.is_success() => return Some(response.body),
                Ok(response) => {
                    warn!(
                        status = response.status.as_u16(),
                        relay = %template,
                        "Relay failed, trying next"
                    );
                }
                Err(e) => {
                    warn!(relay = %template, error = %e, "Relay network error, trying next");
                }
            }
        }

        error!(url = %target, "All relays failed");
        None
    }

    pub fn cache_busted(&self, target: &str) -> String {
        if self.config.cache_bust_param.is_empty() || self.is_strict(target) {
            return target.to_string();
        }
        let separator = if target.contains('?') { '&' } else { '?' };
        format!(
            "{}{}{}={}",
            target,
            separator,
            self.config.cache_bust_param,
            Utc::now().timestamp_millis()
        )
    }

    fn is_strict(&self, target: &str) -> bool {
        let host = Url::parse(target)
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase));

        self.config.no_cache_bust_domains.iter().any(|domain| match &host {
            Some(host) => host == domain || host.ends_with(&format!(".{domain}")),
            None => target.contains(domain.as_str()),
        })
    }
}
