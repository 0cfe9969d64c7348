use reqwest::header::ACCEPT;
use reqwest::Url;
use scout_core::SearchPage;
use scout_logging::{scout_debug, scout_trace, scout_warn};

use crate::{SearchError, SearchService, SearchSettings};

const GITHUB_MEDIA_TYPE: &str = "application/vnd.github.v3+json";

/// [`SearchService`] backed by the GitHub repository search endpoint.
#[derive(Debug, Clone)]
pub struct GithubSearchService {
    settings: SearchSettings,
    client: reqwest::Client,
}

impl GithubSearchService {
    pub fn new(settings: SearchSettings) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|err| SearchError::network(err.to_string()))?;
        Ok(Self { settings, client })
    }

    fn search_url(&self, query: &str, page: u32, page_size: u32) -> Result<Url, SearchError> {
        let base = self.settings.base_url.trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}/search/repositories"))
            .map_err(|err| SearchError::network(format!("invalid base url {base:?}: {err}")))?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("sort", "stars")
            .append_pair("page", &page.to_string())
            .append_pair("per_page", &page_size.to_string());
        Ok(url)
    }
}

#[async_trait::async_trait]
impl SearchService for GithubSearchService {
    async fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<SearchPage, SearchError> {
        let url = self.search_url(query, page, page_size)?;
        scout_trace!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header(ACCEPT, GITHUB_MEDIA_TYPE)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            scout_warn!("search page={} failed with status {}", page, status);
            return Err(SearchError::status(
                status.as_u16(),
                status.canonical_reason().unwrap_or("unexpected status"),
            ));
        }

        let body = response.bytes().await.map_err(map_reqwest_error)?;
        let page_data: SearchPage = serde_json::from_slice(&body)
            .map_err(|err| SearchError::decode(format!("malformed search response: {err}")))?;
        scout_debug!(
            "search page={} returned {} items (total {})",
            page,
            page_data.items.len(),
            page_data.total_count
        );
        Ok(page_data)
    }

    fn augment_query(&self, query: &str) -> String {
        let qualifier = self.settings.qualifier.trim();
        if qualifier.is_empty() {
            query.to_string()
        } else {
            format!("{query} {qualifier}")
        }
    }
}

fn map_reqwest_error(err: reqwest::Error) -> SearchError {
    if err.is_timeout() {
        return SearchError::Network {
            message: err.to_string(),
            timed_out: true,
        };
    }
    SearchError::network(err.to_string())
}
