//! Recipe gateway: fetches a recipe page on behalf of a client, extracts the
//! schema.org Recipe embedded as JSON-LD, and returns it sanitized.
//!
//! # Example
//!
//! ```no_run
//! use recipe_gateway::{GatewayConfig, GatewayRequest, RecipeGateway};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = RecipeGateway::with_request_fetcher(GatewayConfig::load()?)?;
//! let _sweeper = gateway.spawn_sweeper();
//!
//! let response = gateway
//!     .handle(GatewayRequest::post_url("https://www.allrecipes.com/recipe/12345/soup/"))
//!     .await;
//! println!("{} {}", response.status, response.body);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod extractors;
pub mod fetchers;
pub mod gateway;
pub mod model;
pub mod rate_limiter;
pub mod safety;
pub mod sanitizer;

pub use crate::config::GatewayConfig;
pub use error::GatewayError;
pub use extractors::{ExtractError, Extractor, JsonLdExtractor};
pub use fetchers::{FetchError, FetchedPage, PageFetcher, RequestFetcher};
pub use gateway::{CacheStatus, GatewayRequest, GatewayResponse, RecipeGateway};
pub use model::Recipe;
pub use sanitizer::sanitize;
