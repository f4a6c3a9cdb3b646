pub mod http_fetcher;
pub mod parallel;
pub mod relay;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::app::Result;

pub use http_fetcher::HttpFetcher;
pub use relay::{RelayClient, RelayConfig};

#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: StatusCode,
    pub body: String,
}

/// A plain HTTP GET. Non-success statuses are returned, not raised;
/// `Err` means the request itself failed.
#[async_trait]
pub trait Fetcher {
    async fn get(&self, url: &str) -> Result<FetchResponse>;
}
