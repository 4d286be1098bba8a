use serde::{Deserialize, Serialize};

/// Normalized recipe returned to clients.
///
/// Optional fields serialize as JSON `null` rather than being omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub name: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub servings: Option<String>,
    /// ISO-8601 duration exactly as the source page gives it
    pub prep_time: Option<String>,
    pub cook_time: Option<String>,
    /// Absolute `http`/`https` URL
    pub image: Option<String>,
}
