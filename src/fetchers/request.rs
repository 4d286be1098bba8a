use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::redirect::Policy;
use reqwest::Client;

use super::{FetchError, FetchedPage, PageFetcher};
use crate::config::FetchConfig;
use crate::safety::is_url_safe;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Fetches pages with reqwest, posing as a regular browser.
pub struct RequestFetcher {
    client: Client,
}

impl RequestFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .redirect(redirect_policy(config.max_redirects))
            .build()?;

        Ok(Self { client })
    }
}

/// Follows redirects, but never onto a URL the gateway itself would refuse.
fn redirect_policy(max_redirects: usize) -> Policy {
    Policy::custom(move |attempt| {
        if attempt.previous().len() >= max_redirects {
            attempt.error(format!("more than {max_redirects} redirects"))
        } else if !is_url_safe(attempt.url().as_str()) {
            let target = attempt.url().to_string();
            attempt.error(format!("redirect to unsafe URL {target}"))
        } else {
            attempt.follow()
        }
    })
}

#[async_trait]
impl PageFetcher for RequestFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        debug!("Fetched {} -> {}", url, status);

        let body = response.text().await?;
        Ok(FetchedPage { status, body })
    }
}
