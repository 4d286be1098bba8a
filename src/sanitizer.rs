//! Denylist-based markup stripping for recipe text.
//!
//! This is not an HTML parser. It removes a fixed set of dangerous tags,
//! inline event handlers and script-capable URL schemes with regular
//! expressions, and may over-strip text that merely looks like markup.

use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use crate::model::Recipe;

/// `<script ...>...</script>` including its content
static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap());

static DENYLISTED_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?\s*(?:script|iframe|object|embed|form|link|style|base|meta|svg)\b[^>]*>")
        .unwrap()
});

static EVENT_HANDLER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\s*\bon[a-z]+\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]*)"#).unwrap()
});

static DANGEROUS_URL_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(href|src|action)\s*=\s*["']?\s*(?:javascript|data|vbscript):[^"'\s>]*"#)
        .unwrap()
});

/// Strips unsafe markup from every text field of `recipe`.
///
/// `image` is left alone; the extractor only ever produces `http`/`https`
/// image URLs.
pub fn sanitize(mut recipe: Recipe) -> Recipe {
    recipe.name = sanitize_text(&recipe.name);
    recipe.description = sanitize_text(&recipe.description);
    recipe.ingredients = recipe.ingredients.iter().map(|s| sanitize_text(s)).collect();
    recipe.instructions = recipe.instructions.iter().map(|s| sanitize_text(s)).collect();
    recipe.servings = recipe.servings.as_deref().map(sanitize_text);
    recipe.prep_time = recipe.prep_time.as_deref().map(sanitize_text);
    recipe.cook_time = recipe.cook_time.as_deref().map(sanitize_text);
    recipe
}

/// Rounds of the full pass sequence tried before stripping markup
/// characters outright. Real recipe text settles in one or two.
const MAX_ROUNDS: usize = 4;

/// Applies the denylist passes until the text stops changing.
///
/// Each round can peel only one layer of nested markup, so the number of
/// rounds is capped. Text still changing after the last round is stripped of
/// every `<`, `>` and `=`, which no pass can match. Either way the result is
/// a fixed point: sanitizing it again is a no-op.
pub fn sanitize_text(text: &str) -> String {
    settle(text).0
}

/// Sanitized text plus the number of rounds it took.
fn settle(text: &str) -> (String, usize) {
    let mut current = text.to_string();
    for round in 1..=MAX_ROUNDS {
        let next = sanitize_pass(&current);
        if next == current {
            return (current, round);
        }
        current = next;
    }

    debug!(
        "Markup still nested after {} rounds, stripping markup from {} bytes",
        MAX_ROUNDS,
        current.len()
    );
    (strip_markup(current), MAX_ROUNDS)
}

fn strip_markup(mut text: String) -> String {
    text.retain(|c| !matches!(c, '<' | '>' | '='));
    text
}

fn sanitize_pass(text: &str) -> String {
    let text = SCRIPT_BLOCK.replace_all(text, "");
    let text = DENYLISTED_TAG.replace_all(&text, "");
    let text = EVENT_HANDLER.replace_all(&text, "");
    let text = DANGEROUS_URL_ATTR.replace_all(&text, r#"$1=""#);
    SCRIPT_BLOCK.replace_all(&text, "").into_owned()
}
