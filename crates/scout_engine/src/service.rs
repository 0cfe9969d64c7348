use std::time::Duration;

use scout_core::SearchPage;
use thiserror::Error;

/// Failure of a single search call. Both kinds are recoverable by retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// The request never produced a response: connectivity fault or timeout.
    #[error("network failure: {message}")]
    Network { message: String, timed_out: bool },
    /// The service answered, but not with a usable page.
    #[error("service failure ({}): {message}", describe_status(.status))]
    Service { status: Option<u16>, message: String },
}

impl SearchError {
    pub fn network(message: impl Into<String>) -> Self {
        SearchError::Network {
            message: message.into(),
            timed_out: false,
        }
    }

    pub fn status(code: u16, message: impl Into<String>) -> Self {
        SearchError::Service {
            status: Some(code),
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        SearchError::Service {
            status: None,
            message: message.into(),
        }
    }
}

fn describe_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("http {code}"),
        None => "invalid response".to_string(),
    }
}

/// Repository search capability consumed by a session.
#[async_trait::async_trait]
pub trait SearchService: Send + Sync {
    async fn search(&self, query: &str, page: u32, page_size: u32)
        -> Result<SearchPage, SearchError>;

    /// Adds provider-specific qualifiers to the user's query before it is sent.
    fn augment_query(&self, query: &str) -> String {
        query.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub base_url: String,
    pub page_size: u32,
    /// Appended to every query, e.g. to restrict which fields are searched.
    pub qualifier: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.github.com".to_string(),
            page_size: 30,
            qualifier: "in:name,description".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            user_agent: concat!("reposcout/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
