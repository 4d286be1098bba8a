//! Request pipeline tying the gateway components together.
//!
//! One call to [`RecipeGateway::handle`] walks a request through:
//!
//! 1. method check (`OPTIONS` short-circuits, anything but `POST` is 405)
//! 2. per-client rate limit
//! 3. body parsing for the `url` field
//! 4. SSRF safety check, then the domain allowlist
//! 5. cache lookup
//! 6. fetch, bounded by the configured timeout and body ceiling
//! 7. JSON-LD extraction and sanitization
//! 8. cache store
//!
//! Every path ends in exactly one [`GatewayResponse`]. A request turned away
//! after the rate-limit step has still used up its slot.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use crate::cache::ResponseCache;
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::extractors::{Extractor, JsonLdExtractor};
use crate::fetchers::{FetchError, PageFetcher, RequestFetcher};
use crate::model::Recipe;
use crate::rate_limiter::RateLimiter;
use crate::safety::{is_domain_allowed, is_url_safe};
use crate::sanitizer::sanitize;

pub const CACHE_HEADER: HeaderName = HeaderName::from_static("x-cache");

const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";
const UNKNOWN_CLIENT: &str = "unknown";

/// Inbound request as handed over by the HTTP layer.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub method: Method,
    pub headers: HeaderMap,
    /// Transport-level peer address, if the HTTP layer knows it
    pub peer_addr: Option<IpAddr>,
    pub body: Vec<u8>,
}

impl GatewayRequest {
    /// A `POST` carrying `{"url": url}`.
    pub fn post_url(url: &str) -> Self {
        Self {
            method: Method::POST,
            headers: HeaderMap::new(),
            peer_addr: None,
            body: json!({ "url": url }).to_string().into_bytes(),
        }
    }

    pub fn with_peer_addr(mut self, peer_addr: IpAddr) -> Self {
        self.peer_addr = Some(peer_addr);
        self
    }

    /// Adds a header; names or values that are not valid HTTP are skipped.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => debug!("Skipping invalid header {:?}", name),
        }
        self
    }

    /// Client identity for rate limiting: forwarded-for, then real-ip, then
    /// the peer address, then `"unknown"`.
    ///
    /// These headers are client-controlled unless a trusted proxy rewrites
    /// them.
    pub fn client_id(&self) -> String {
        let header = |name: &str| {
            self.headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        if let Some(first) = header(FORWARDED_FOR)
            .and_then(|xff| xff.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
        {
            return first.to_string();
        }

        if let Some(real_ip) = header(REAL_IP) {
            return real_ip.to_string();
        }

        self.peer_addr
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
    }

    fn recipe_url(&self) -> Option<String> {
        #[derive(Deserialize)]
        struct Body {
            url: Option<Value>,
        }

        let body: Body = serde_json::from_slice(&self.body).ok()?;
        match body.url? {
            Value::String(url) if !url.trim().is_empty() => Some(url.trim().to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// Outbound response for the HTTP layer to serialize.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub status: StatusCode,
    /// Recipe JSON, `{"error": ...}`, or `null` for preflight
    pub body: Value,
    pub cache_status: Option<CacheStatus>,
}

impl GatewayResponse {
    fn recipe(recipe: &Recipe, cache_status: CacheStatus) -> Self {
        match serde_json::to_value(recipe) {
            Ok(body) => Self {
                status: StatusCode::OK,
                body,
                cache_status: Some(cache_status),
            },
            Err(err) => Self::error(&GatewayError::Internal(err.to_string())),
        }
    }

    fn error(err: &GatewayError) -> Self {
        Self {
            status: err.status(),
            body: json!({ "error": err.user_message() }),
            cache_status: None,
        }
    }

    fn preflight() -> Self {
        Self {
            status: StatusCode::OK,
            body: Value::Null,
            cache_status: None,
        }
    }

    /// Response headers owned by the gateway (content type and cache status).
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if !self.body.is_null() {
            headers.insert(
                reqwest::header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
        }
        if let Some(status) = self.cache_status {
            headers.insert(CACHE_HEADER, HeaderValue::from_static(status.as_str()));
        }
        headers
    }

    /// `Some(message)` for error responses.
    pub fn error_message(&self) -> Option<&str> {
        self.body.get("error").and_then(Value::as_str)
    }
}

/// Owns the shared cache and rate-limit state for one process.
pub struct RecipeGateway {
    config: GatewayConfig,
    fetcher: Arc<dyn PageFetcher>,
    extractor: JsonLdExtractor,
    cache: ResponseCache,
    limiter: Arc<RateLimiter>,
}

impl RecipeGateway {
    pub fn new(config: GatewayConfig, fetcher: Arc<dyn PageFetcher>) -> Self {
        let cache = ResponseCache::new(config.cache.ttl(), config.cache.max_entries);
        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit.max_requests,
            config.rate_limit.window(),
        ));

        Self {
            config,
            fetcher,
            extractor: JsonLdExtractor,
            cache,
            limiter,
        }
    }

    /// Gateway backed by the reqwest [`RequestFetcher`].
    pub fn with_request_fetcher(config: GatewayConfig) -> Result<Self, reqwest::Error> {
        let fetcher = RequestFetcher::new(&config.fetch)?;
        Ok(Self::new(config, Arc::new(fetcher)))
    }

    /// Starts the periodic rate-limit sweep. Must be called from within a
    /// tokio runtime.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        self.limiter
            .spawn_sweeper(self.config.rate_limit.sweep_interval())
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub async fn handle(&self, request: GatewayRequest) -> GatewayResponse {
        if request.method == Method::OPTIONS {
            return GatewayResponse::preflight();
        }

        match self.process(&request).await {
            Ok((recipe, cache_status)) => GatewayResponse::recipe(&recipe, cache_status),
            Err(err) => {
                match &err {
                    GatewayError::Internal(_) => error!("Request failed: {}", err),
                    GatewayError::Upstream(_)
                    | GatewayError::BodyTooLarge { .. }
                    | GatewayError::Timeout => warn!("Upstream failure: {}", err),
                    _ => debug!("Request rejected: {}", err),
                }
                GatewayResponse::error(&err)
            }
        }
    }

    async fn process(
        &self,
        request: &GatewayRequest,
    ) -> Result<(Recipe, CacheStatus), GatewayError> {
        if request.method != Method::POST {
            return Err(GatewayError::MethodNotAllowed(request.method.to_string()));
        }

        let client_id = request.client_id();
        if !self.limiter.check(&client_id) {
            warn!("Rate limit exceeded for {}", client_id);
            return Err(GatewayError::RateLimited(client_id));
        }

        let url = request.recipe_url().ok_or(GatewayError::MissingUrl)?;

        if !is_url_safe(&url) {
            return Err(GatewayError::UnsafeUrl(url));
        }
        if !is_domain_allowed(&url, &self.config.allowed_domains) {
            return Err(GatewayError::DomainNotAllowed(url));
        }

        if let Some(recipe) = self.cache.get(&url) {
            info!("Cache hit for {}", url);
            return Ok((recipe, CacheStatus::Hit));
        }

        let html = self.fetch_page(&url).await?;

        let recipe = self.extract_and_sanitize(html).await?;

        self.cache.set(&url, recipe.clone());
        info!("Extracted and cached recipe {:?} from {}", recipe.name, url);

        Ok((recipe, CacheStatus::Miss))
    }

    /// Extraction and sanitization on the blocking pool.
    async fn extract_and_sanitize(&self, html: String) -> Result<Recipe, GatewayError> {
        let extractor = self.extractor;
        let recipe = tokio::task::spawn_blocking(move || extractor.extract(&html).map(sanitize))
            .await
            .map_err(|err| GatewayError::Internal(format!("extraction task failed: {err}")))??;
        Ok(recipe)
    }

    async fn fetch_page(&self, url: &str) -> Result<String, GatewayError> {
        let timeout: Duration = self.config.fetch.timeout();
        let page = tokio::time::timeout(timeout, self.fetcher.fetch(url))
            .await
            .map_err(|_| FetchError::Timeout)??;

        if !page.status.is_success() {
            return Err(GatewayError::Upstream(format!(
                "{} returned {}",
                url, page.status
            )));
        }

        let max = self.config.fetch.max_body_bytes;
        if page.body.len() > max {
            return Err(GatewayError::BodyTooLarge {
                size: page.body.len(),
                max,
            });
        }

        Ok(page.body)
    }
}
