//! Attribute normalization: turns a raw product name into a [`ProductRecord`].
//!
//! Lowercases, strips punctuation other than `. / -`, expands a few catalog
//! abbreviations, drops stop words, then pulls size, unit and manufacturer out
//! of the remaining tokens. The cleaned name has size and unit tokens removed.

use crate::models::ProductRecord;
use once_cell::sync::Lazy;
use regex::Regex;

pub const UNITS: [&str; 4] = ["oz", "g", "ml", "lb"];

const STOP_WORDS: [&str; 3] = ["and", "with", "the"];

static DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s./-]").expect("static pattern"));
static SIZE_WITH_UNIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s?(oz|g|ml|lb)\b").expect("static pattern"));
static UNIT_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(oz|g|ml|lb)\b").expect("static pattern"));

fn expand(token: &str) -> &str {
    match token {
        "choc" | "choc." => "chocolate",
        "strwbr" | "strwbr." => "strawberry",
        "eng" | "eng." => "energy",
        "pb" => "peanut butter",
        other => other,
    }
}

/// Lowercased, punctuation-stripped, abbreviation-expanded text without stop words.
pub fn canonical_text(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let stripped = DISALLOWED.replace_all(&lowered, "");
    stripped
        .split_whitespace()
        .map(expand)
        .flat_map(str::split_whitespace)
        .filter(|t| !STOP_WORDS.contains(t))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn extract_size_unit(text: &str) -> (f64, String) {
    if let Some(caps) = SIZE_WITH_UNIT.captures(text) {
        let size = caps[1].parse::<f64>().unwrap_or(0.0);
        return (size, caps[2].to_string());
    }
    let unit = UNIT_TOKEN
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    (0.0, unit)
}

pub fn cleaned_name(text: &str) -> String {
    let without_sizes = SIZE_WITH_UNIT.replace_all(text, " ");
    let without_units = UNIT_TOKEN.replace_all(&without_sizes, " ");
    without_units.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn normalize(original_name: &str) -> ProductRecord {
    let text = canonical_text(original_name);
    let (size, unit) = extract_size_unit(&text);
    let cleaned = cleaned_name(&text);
    // Taken after size removal, so a leading "16oz" never becomes the brand.
    let manufacturer = cleaned
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string();
    ProductRecord {
        original_name: original_name.to_string(),
        cleaned_name: cleaned,
        size,
        unit,
        manufacturer,
        embedding: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_attributes_from_compact_size() {
        let r = normalize("ACME Choco Bar 16oz");
        assert_eq!(r.original_name, "ACME Choco Bar 16oz");
        assert_eq!(r.cleaned_name, "acme choco bar");
        assert_eq!(r.size, 16.0);
        assert_eq!(r.unit, "oz");
        assert_eq!(r.manufacturer, "acme");
        assert!(r.embedding.is_none());
    }

    #[test]
    fn strips_punctuation_and_stop_words() {
        let r = normalize("Lipton Diet Green Tea with Citrus (20oz)");
        assert_eq!(r.cleaned_name, "lipton diet green tea citrus");
        assert_eq!(r.size, 20.0);
        assert_eq!(r.unit, "oz");
        assert_eq!(r.manufacturer, "lipton");
    }

    #[test]
    fn expands_abbreviations() {
        let r = normalize("Jif PB & Strwbr. Spread 1.5 lb");
        assert_eq!(r.cleaned_name, "jif peanut butter strawberry spread");
        assert_eq!(r.size, 1.5);
        assert_eq!(r.unit, "lb");
    }

    #[test]
    fn missing_size_is_unknown() {
        let r = normalize("Generic Gum");
        assert_eq!(r.size, 0.0);
        assert!(!r.has_size());
        assert_eq!(r.unit, "");
        assert_eq!(r.cleaned_name, "generic gum");
    }

    #[test]
    fn bare_unit_without_number_is_kept_as_unit() {
        let (size, unit) = extract_size_unit("bulk rice g pack");
        assert_eq!(size, 0.0);
        assert_eq!(unit, "g");
    }

    #[test]
    fn units_inside_words_are_left_alone() {
        let r = normalize("Golden Grahams 12 oz");
        assert_eq!(r.cleaned_name, "golden grahams");
        assert_eq!(r.size, 12.0);
    }

    #[test]
    fn leading_size_is_not_the_manufacturer() {
        let r = normalize("16oz Acme Bar");
        assert_eq!(r.manufacturer, "acme");
        assert_eq!(r.cleaned_name, "acme bar");
        assert_eq!(r.size, 16.0);
    }

    #[test]
    fn punctuation_only_name_cleans_to_empty() {
        let r = normalize("!!!");
        assert_eq!(r.cleaned_name, "");
        assert_eq!(r.manufacturer, "");
    }
}
