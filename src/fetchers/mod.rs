use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

mod request;

pub use request::RequestFetcher;

/// Raw upstream response handed back to the gateway.
///
/// The body is read in full; enforcing the size ceiling is the caller's job.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: StatusCode,
    pub body: String,
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request timed out")]
    Timeout,

    /// Redirect chain was too long or pointed somewhere unsafe
    #[error("Redirect refused: {0}")]
    Redirect(String),

    #[error("Request failed: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_redirect() {
            FetchError::Redirect(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// Outbound HTTP collaborator used to retrieve recipe pages.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}
