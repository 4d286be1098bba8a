use super::{ExtractError, Extractor};
use crate::model::Recipe;
use html_escape::decode_html_entities;
use log::debug;
use scraper::{ElementRef, Html};
use serde_json::Value;
use url::Url;

const UNTITLED: &str = "Untitled Recipe";

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLdExtractor;

/// The places a Recipe object can hide inside one JSON-LD block.
#[derive(Debug)]
enum JsonLdShape<'a> {
    /// The block itself is the recipe
    Direct(&'a Value),
    /// `[ {...}, {"@type": "Recipe"} ]`
    ArrayWrapped(&'a [Value]),
    /// `{"@graph": [ {...}, {"@type": "Recipe"} ]}`
    GraphWrapped(&'a [Value]),
}

impl<'a> JsonLdShape<'a> {
    /// Shapes of `candidate` in resolution priority order.
    fn of(candidate: &'a Value) -> impl Iterator<Item = JsonLdShape<'a>> {
        let array = candidate
            .as_array()
            .map(|items| JsonLdShape::ArrayWrapped(items.as_slice()));
        let graph = candidate
            .get("@graph")
            .and_then(Value::as_array)
            .map(|items| JsonLdShape::GraphWrapped(items.as_slice()));

        std::iter::once(JsonLdShape::Direct(candidate))
            .chain(array)
            .chain(graph)
    }

    fn recipe(&self) -> Option<&'a Value> {
        match *self {
            JsonLdShape::Direct(value) => Some(value).filter(|v| is_recipe(v)),
            JsonLdShape::ArrayWrapped(items) | JsonLdShape::GraphWrapped(items) => {
                items.iter().find(|item| is_recipe(item))
            }
        }
    }
}

fn is_recipe(value: &Value) -> bool {
    value.get("@type").and_then(Value::as_str) == Some("Recipe")
}

/// First Recipe object across all candidates, in document order.
fn resolve_recipe(candidates: &[Value]) -> Option<&Value> {
    candidates
        .iter()
        .flat_map(JsonLdShape::of)
        .find_map(|shape| shape.recipe())
}

/// Parses every `<script type="application/ld+json">` block, skipping the
/// ones that are not valid JSON.
fn json_ld_blocks(html: &str) -> Vec<Value> {
    let document = Html::parse_document(html);

    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|element| {
            element.value().name() == "script"
                && element
                    .value()
                    .attr("type")
                    .is_some_and(|kind| kind.trim().eq_ignore_ascii_case("application/ld+json"))
        })
        .filter_map(|script| {
            let text: String = script.text().collect();
            match serde_json::from_str::<Value>(text.trim()) {
                Ok(value) => Some(value),
                Err(err) => {
                    debug!("Skipping malformed JSON-LD block: {}", err);
                    None
                }
            }
        })
        .collect()
}

fn decode_html_symbols(text: &str) -> String {
    decode_html_entities(text).into_owned()
}

fn non_empty(text: &str) -> Option<String> {
    let text = decode_html_symbols(text.trim());
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn name(recipe: &Value) -> String {
    recipe
        .get("name")
        .and_then(Value::as_str)
        .and_then(non_empty)
        .unwrap_or_else(|| UNTITLED.to_string())
}

fn description(recipe: &Value) -> String {
    recipe
        .get("description")
        .and_then(Value::as_str)
        .map(|desc| decode_html_symbols(desc.trim()))
        .unwrap_or_default()
}

fn ingredients(recipe: &Value) -> Vec<String> {
    let ingredient = |value: &Value| match value {
        Value::String(s) => decode_html_symbols(s).trim().to_string(),
        _ => String::new(),
    };

    match recipe.get("recipeIngredient") {
        Some(Value::Array(items)) => items.iter().map(ingredient).collect(),
        Some(single @ Value::String(_)) => vec![ingredient(single)],
        _ => Vec::new(),
    }
}

fn instructions(recipe: &Value) -> Vec<String> {
    // Prefer `text` over `name` for HowToStep-like objects
    let step = |value: &Value| match value {
        Value::String(s) => non_empty(s),
        Value::Object(_) => value
            .get("text")
            .and_then(Value::as_str)
            .and_then(non_empty)
            .or_else(|| value.get("name").and_then(Value::as_str).and_then(non_empty)),
        _ => None,
    };

    match recipe.get("recipeInstructions") {
        Some(Value::String(s)) => non_empty(s).into_iter().collect(),
        Some(Value::Array(items)) => items.iter().filter_map(step).collect(),
        _ => Vec::new(),
    }
}

fn servings(recipe: &Value) -> Option<String> {
    match recipe.get("recipeYield")? {
        Value::Array(items) => {
            let yields: Vec<String> = items.iter().filter_map(scalar_text).collect();
            // For arrays, prefer the descriptive version (e.g., "4 servings") over just the number
            yields
                .iter()
                .find(|s| s.contains(char::is_alphabetic))
                .or_else(|| yields.first())
                .cloned()
        }
        other => scalar_text(other),
    }
}

fn duration(recipe: &Value, key: &str) -> Option<String> {
    recipe.get(key).and_then(Value::as_str).and_then(non_empty)
}

fn image(recipe: &Value) -> Option<String> {
    let object_url = |value: &Value| value.get("url").and_then(Value::as_str).map(str::to_string);

    let candidate = match recipe.get("image")? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.first().and_then(|first| match first {
            Value::String(s) => Some(s.clone()),
            other => object_url(other),
        }),
        other => object_url(other),
    }?;

    let candidate = decode_html_symbols(candidate.trim());
    match Url::parse(&candidate) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(candidate),
        _ => {
            debug!("Discarding image with unsupported URL: {}", candidate);
            None
        }
    }
}

impl JsonLdExtractor {
    fn convert_to_recipe(&self, recipe: &Value) -> Recipe {
        Recipe {
            name: name(recipe),
            description: description(recipe),
            ingredients: ingredients(recipe),
            instructions: instructions(recipe),
            servings: servings(recipe),
            prep_time: duration(recipe, "prepTime"),
            cook_time: duration(recipe, "cookTime"),
            image: image(recipe),
        }
    }
}

impl Extractor for JsonLdExtractor {
    fn extract(&self, html: &str) -> Result<Recipe, ExtractError> {
        let candidates = json_ld_blocks(html);
        debug!("Found {} parseable JSON-LD blocks", candidates.len());

        let recipe = resolve_recipe(&candidates).ok_or(ExtractError::NotFound)?;
        debug!("Resolved JSON-LD recipe: {:#?}", recipe);

        Ok(self.convert_to_recipe(recipe))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_html_document(json_ld: &str) -> String {
        format!(
            r#"
            <!DOCTYPE html>
            <html>
            <head>
                <script type="application/ld+json">
                    {}
                </script>
            </head>
            <body></body>
            </html>
            "#,
            json_ld
        )
    }

    #[test]
    fn test_tea_recipe() {
        let html = r#"<html><head><script type="application/ld+json">{"@type":"Recipe","name":"Tea","recipeIngredient":["Water","Tea bag"],"recipeInstructions":["Boil water","Steep tea"]}</script></head></html>"#;

        let recipe = JsonLdExtractor.extract(html).unwrap();

        assert_eq!(
            recipe,
            Recipe {
                name: "Tea".to_string(),
                description: String::new(),
                ingredients: vec!["Water".to_string(), "Tea bag".to_string()],
                instructions: vec!["Boil water".to_string(), "Steep tea".to_string()],
                servings: None,
                prep_time: None,
                cook_time: None,
                image: None,
            }
        );
    }

    #[test]
    fn test_parse_basic_recipe() {
        let json_ld = r#"
        {
            "@context": "https://schema.org/",
            "@type": "Recipe",
            "name": "Chocolate Chip Cookies",
            "description": "Delicious homemade cookies",
            "image": "https://example.com/cookie.jpg",
            "recipeYield": "24 cookies",
            "prepTime": "PT15M",
            "cookTime": "PT10M",
            "recipeIngredient": ["  flour ", "sugar", "chocolate chips"],
            "recipeInstructions": "Mix ingredients. Bake at 350F for 10 minutes."
        }
        "#;

        let recipe = JsonLdExtractor
            .extract(&create_html_document(json_ld))
            .unwrap();

        assert_eq!(recipe.name, "Chocolate Chip Cookies");
        assert_eq!(recipe.description, "Delicious homemade cookies");
        assert_eq!(recipe.image.as_deref(), Some("https://example.com/cookie.jpg"));
        assert_eq!(recipe.ingredients, vec!["flour", "sugar", "chocolate chips"]);
        assert_eq!(
            recipe.instructions,
            vec!["Mix ingredients. Bake at 350F for 10 minutes."]
        );
        assert_eq!(recipe.servings.as_deref(), Some("24 cookies"));
        assert_eq!(recipe.prep_time.as_deref(), Some("PT15M"));
        assert_eq!(recipe.cook_time.as_deref(), Some("PT10M"));
    }

    #[test]
    fn test_graph_skips_non_recipe_items() {
        let json_ld = r#"
        {
            "@context": "https://schema.org",
            "@graph": [
                {"@type": "WebPage", "name": "Soup page"},
                {"@type": "Recipe", "name": "Soup", "recipeInstructions": "Simmer"}
            ]
        }
        "#;

        let recipe = JsonLdExtractor
            .extract(&create_html_document(json_ld))
            .unwrap();

        assert_eq!(recipe.name, "Soup");
        assert_eq!(recipe.instructions, vec!["Simmer"]);
    }

    #[test]
    fn test_array_wrapped_recipe() {
        let json_ld = r#"
        [
            {"@type": "WebSite", "name": "Recipe Website"},
            {"@type": "Recipe", "name": "Pasta Carbonara"}
        ]
        "#;

        let recipe = JsonLdExtractor
            .extract(&create_html_document(json_ld))
            .unwrap();

        assert_eq!(recipe.name, "Pasta Carbonara");
    }

    #[test]
    fn test_first_candidate_in_document_order_wins() {
        let html = r#"
            <script type="application/ld+json">{"@type": "Organization", "name": "Org"}</script>
            <script type="application/ld+json">{"@graph": [{"@type": "Recipe", "name": "First"}]}</script>
            <script type="application/ld+json">{"@type": "Recipe", "name": "Second"}</script>
        "#;

        let recipe = JsonLdExtractor.extract(html).unwrap();
        assert_eq!(recipe.name, "First");
    }

    #[test]
    fn test_direct_beats_graph_within_one_candidate() {
        let json_ld = r#"
        {
            "@type": "Recipe",
            "name": "Outer",
            "@graph": [{"@type": "Recipe", "name": "Inner"}]
        }
        "#;

        let recipe = JsonLdExtractor
            .extract(&create_html_document(json_ld))
            .unwrap();
        assert_eq!(recipe.name, "Outer");
    }

    #[test]
    fn test_malformed_blocks_are_skipped() {
        let html = r#"
            <script type="application/ld+json">{"@type": "Recipe", "name": </script>
            <script type="application/ld+json">{"@type": "Recipe", "name": "Valid"}</script>
        "#;

        let recipe = JsonLdExtractor.extract(html).unwrap();
        assert_eq!(recipe.name, "Valid");
    }

    #[test]
    fn test_type_attribute_is_case_insensitive() {
        let html = r#"
            <SCRIPT TYPE=" Application/LD+JSON ">{"@type": "Recipe", "name": "Loud"}</SCRIPT>
        "#;

        let recipe = JsonLdExtractor.extract(html).unwrap();
        assert_eq!(recipe.name, "Loud");
    }

    #[test]
    fn test_other_scripts_are_ignored() {
        let html = r#"
            <script>{"@type": "Recipe", "name": "Not JSON-LD"}</script>
            <script type="application/json">{"@type": "Recipe", "name": "Plain JSON"}</script>
        "#;

        assert_eq!(JsonLdExtractor.extract(html), Err(ExtractError::NotFound));
    }

    #[test]
    fn test_no_recipe_is_not_found() {
        let json_ld = r#"{"@type": "Article", "name": "News"}"#;
        assert_eq!(
            JsonLdExtractor.extract(&create_html_document(json_ld)),
            Err(ExtractError::NotFound)
        );
        assert_eq!(
            JsonLdExtractor.extract("<html><body>Nothing</body></html>"),
            Err(ExtractError::NotFound)
        );
    }

    #[test]
    fn test_type_match_is_exact() {
        let json_ld = r#"{"@type": "recipe", "name": "Lowercase"}"#;
        assert_eq!(
            JsonLdExtractor.extract(&create_html_document(json_ld)),
            Err(ExtractError::NotFound)
        );
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let recipe = JsonLdExtractor
            .extract(&create_html_document(r#"{"@type": "Recipe"}"#))
            .unwrap();

        assert_eq!(recipe.name, "Untitled Recipe");
        assert_eq!(recipe.description, "");
        assert!(recipe.ingredients.is_empty());
        assert!(recipe.instructions.is_empty());
        assert_eq!(recipe.servings, None);
        assert_eq!(recipe.image, None);
    }

    #[test]
    fn test_non_string_ingredients_become_empty() {
        let value = json!({"recipeIngredient": ["salt", 3, null, {"name": "x"}]});
        assert_eq!(ingredients(&value), vec!["salt", "", "", ""]);
    }

    #[test]
    fn test_instruction_element_preference() {
        let value = json!({
            "recipeInstructions": [
                "Plain step",
                {"@type": "HowToStep", "text": "Text step", "name": "ignored"},
                {"@type": "HowToStep", "name": "Named step"},
                {"@type": "HowToStep", "text": "", "name": "Fallback name"},
                {"@type": "HowToStep", "url": "https://example.com#step5"},
                "   ",
                42
            ]
        });

        assert_eq!(
            instructions(&value),
            vec!["Plain step", "Text step", "Named step", "Fallback name"]
        );
    }

    #[test]
    fn test_servings_shapes() {
        assert_eq!(servings(&json!({"recipeYield": 4})).as_deref(), Some("4"));
        assert_eq!(
            servings(&json!({"recipeYield": ["4", "4 servings"]})).as_deref(),
            Some("4 servings")
        );
        assert_eq!(servings(&json!({"recipeYield": ["6"]})).as_deref(), Some("6"));
        assert_eq!(servings(&json!({"recipeYield": ""})), None);
        assert_eq!(servings(&json!({})), None);
    }

    #[test]
    fn test_image_shapes() {
        assert_eq!(
            image(&json!({"image": ["https://a.com/1.jpg", "https://a.com/2.jpg"]})).as_deref(),
            Some("https://a.com/1.jpg")
        );
        assert_eq!(
            image(&json!({"image": {"@type": "ImageObject", "url": "http://a.com/o.jpg"}}))
                .as_deref(),
            Some("http://a.com/o.jpg")
        );
        assert_eq!(
            image(&json!({"image": [{"url": "https://a.com/first.jpg"}]})).as_deref(),
            Some("https://a.com/first.jpg")
        );
    }

    #[test]
    fn test_image_rejects_non_http_urls() {
        assert_eq!(image(&json!({"image": "javascript:alert(1)"})), None);
        assert_eq!(image(&json!({"image": "data:image/png;base64,AAAA"})), None);
        assert_eq!(image(&json!({"image": "/relative/path.jpg"})), None);
        assert_eq!(image(&json!({"image": 12})), None);
    }

    #[test]
    fn test_html_entities_are_decoded() {
        let json_ld = r#"{"@type": "Recipe", "name": "Mac &amp; Cheese", "recipeIngredient": ["1&frac12; cups milk"]}"#;

        let recipe = JsonLdExtractor
            .extract(&create_html_document(json_ld))
            .unwrap();

        assert_eq!(recipe.name, "Mac & Cheese");
        assert_eq!(recipe.ingredients, vec!["1½ cups milk"]);
    }
}
