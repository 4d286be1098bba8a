use reqwest::StatusCode;
use thiserror::Error;

use crate::extractors::ExtractError;
use crate::fetchers::FetchError;

/// Every way a gateway request can end without a recipe.
///
/// Each variant maps to exactly one HTTP status and one client-facing
/// message. The `Display` output is for logs and may carry upstream detail
/// that [`GatewayError::user_message`] never exposes.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Request used a method other than POST (or OPTIONS)
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    /// Client exhausted its sliding window
    #[error("Rate limit exceeded for client {0}")]
    RateLimited(String),

    /// Body did not carry a usable `url` field
    #[error("Request body is missing a recipe URL")]
    MissingUrl,

    /// URL failed the SSRF checks
    #[error("Unsafe URL rejected: {0}")]
    UnsafeUrl(String),

    /// URL host is not on the recipe-site allowlist
    #[error("Domain not on allowlist: {0}")]
    DomainNotAllowed(String),

    /// Upstream answered with a non-success status or broke mid-redirect
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Upstream page exceeded the body ceiling
    #[error("Upstream body too large: {size} bytes (max: {max} bytes)")]
    BodyTooLarge { size: usize, max: usize },

    /// Fetch did not finish within the configured timeout
    #[error("Upstream request timed out")]
    Timeout,

    /// Page held no JSON-LD Recipe object
    #[error("No recipe found in page")]
    NotFound,

    /// Anything else that went wrong while fetching
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::MissingUrl
            | GatewayError::UnsafeUrl(_)
            | GatewayError::DomainNotAllowed(_) => StatusCode::BAD_REQUEST,
            GatewayError::Upstream(_) | GatewayError::BodyTooLarge { .. } => {
                StatusCode::BAD_GATEWAY
            }
            GatewayError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::NotFound => StatusCode::NOT_FOUND,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand back to the caller
    pub fn user_message(&self) -> &'static str {
        match self {
            GatewayError::MethodNotAllowed(_) => "Method not allowed",
            GatewayError::RateLimited(_) => {
                "Too many requests. Please wait a minute and try again."
            }
            GatewayError::MissingUrl => "Please provide a recipe URL",
            GatewayError::UnsafeUrl(_) => "Invalid or unsafe URL",
            GatewayError::DomainNotAllowed(_) => {
                "This website is not supported yet. Try a recipe from one of the supported sites."
            }
            GatewayError::Upstream(_) | GatewayError::BodyTooLarge { .. } => {
                "Could not retrieve the recipe page"
            }
            GatewayError::Timeout => "The recipe website took too long to respond",
            GatewayError::NotFound => "No recipe found on this page",
            GatewayError::Internal(_) => "Something went wrong while fetching the recipe",
        }
    }
}

impl From<ExtractError> for GatewayError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::NotFound => GatewayError::NotFound,
        }
    }
}

impl From<FetchError> for GatewayError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Timeout => GatewayError::Timeout,
            FetchError::Redirect(msg) => GatewayError::Upstream(msg),
            FetchError::Transport(msg) => GatewayError::Internal(msg),
        }
    }
}
