use crate::model::Recipe;
use thiserror::Error;

mod json_ld;

pub use json_ld::JsonLdExtractor;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// No Recipe object anywhere in the page's JSON-LD
    #[error("No JSON-LD Recipe object found in page")]
    NotFound,
}

pub trait Extractor {
    fn extract(&self, html: &str) -> Result<Recipe, ExtractError>;
}
