//! Decision color extraction
//!
//! Reads the `COLOR_CODE` line out of the synthesized advisory, falling
//! back to keyword heuristics. Always returns a `#RRGGBB` string.

use std::sync::LazyLock;

use regex::Regex;

pub const RED: &str = "#EF4444";
pub const YELLOW: &str = "#EAB308";
pub const GREEN: &str = "#22C55E";

/// Color when nothing in the text decides
pub const DEFAULT_COLOR: &str = YELLOW;

/// Tried in order; the first match wins
static COLOR_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"(?i)\*\*COLOR_CODE:\*\*\s*(#[0-9A-Fa-f]{6})").unwrap(),
        Regex::new(r"(?i)COLOR_CODE:\s*(#[0-9A-Fa-f]{6})").unwrap(),
        Regex::new(r"(?i)\*\*COLOR_CODE:\*\*\s*`(#[0-9A-Fa-f]{6})`").unwrap(),
    ]
});

const RED_WORDS: &[&str] = &["skip", "avoid", "dangerous", "harmful"];
const YELLOW_WORDS: &[&str] = &["not ideal", "moderation", "limit", "caution"];
const GREEN_WORDS: &[&str] = &["generally safe", "safe to eat", "healthy choice", "nutritious"];

/// Decision color for an advisory text
pub fn extract_color(text: &str) -> String {
    if let Some(color) = explicit_color(text) {
        return color;
    }

    let lower = text.to_lowercase();
    let mentions = |words: &[&str]| words.iter().any(|word| lower.contains(word));

    let color = if mentions(RED_WORDS) {
        RED
    } else if mentions(YELLOW_WORDS) {
        YELLOW
    } else if mentions(GREEN_WORDS) {
        GREEN
    } else {
        DEFAULT_COLOR
    };
    color.to_string()
}

fn explicit_color(text: &str) -> Option<String> {
    COLOR_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(text))
        .map(|caps| caps[1].to_string())
}

/// Whether `color` is a `#RRGGBB` hex string
pub fn is_hex_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}
