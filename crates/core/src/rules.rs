//! Deterministic attribute comparison between two normalized records.

use crate::models::ProductRecord;

/// Maximum size difference (in the record's own unit) for two sizes to agree.
pub const SIZE_TOLERANCE: f64 = 0.1;

// Absorbs binary rounding, e.g. 1.1 - 1.0.
const SIZE_EPSILON: f64 = 1e-9;

/// Both sizes must be known; unknown size never agrees.
pub fn size_agrees(a: &ProductRecord, b: &ProductRecord) -> bool {
    a.has_size() && b.has_size() && (a.size - b.size).abs() <= SIZE_TOLERANCE + SIZE_EPSILON
}

/// An unknown manufacturer on either side does not block a match.
pub fn manufacturer_agrees(a: &ProductRecord, b: &ProductRecord) -> bool {
    a.manufacturer.is_empty() || b.manufacturer.is_empty() || a.manufacturer == b.manufacturer
}

/// Token-order-insensitive Indel similarity on a 0-100 scale.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    let sorted = |s: &str| {
        let mut tokens: Vec<&str> = s.split_whitespace().collect();
        tokens.sort_unstable();
        tokens.join(" ")
    };
    let (a, b) = (sorted(a), sorted(b));
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    rapidfuzz::fuzz::ratio(a.chars(), b.chars()) * 100.0
}

#[derive(Debug, Clone, Copy)]
pub struct RuleMatcher {
    name_similarity_floor: f64,
}

impl RuleMatcher {
    pub fn new(name_similarity_floor: f64) -> Self {
        Self {
            name_similarity_floor,
        }
    }

    pub fn matches(&self, a: &ProductRecord, b: &ProductRecord) -> bool {
        size_agrees(a, b)
            && manufacturer_agrees(a, b)
            && token_sort_ratio(&a.cleaned_name, &b.cleaned_name) >= self.name_similarity_floor
    }

    /// First internal record, in catalog order, that passes [`Self::matches`].
    ///
    /// Stops at the first hit; a later and closer record is never considered.
    pub fn first_match<'a>(
        &self,
        external: &ProductRecord,
        internal: &'a [ProductRecord],
    ) -> Option<(usize, &'a ProductRecord)> {
        internal
            .iter()
            .enumerate()
            .find(|(_, candidate)| self.matches(external, candidate))
    }
}

impl Default for RuleMatcher {
    fn default() -> Self {
        Self::new(85.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, size: f64, unit: &str, manufacturer: &str) -> ProductRecord {
        ProductRecord {
            original_name: name.to_string(),
            cleaned_name: name.to_string(),
            size,
            unit: unit.to_string(),
            manufacturer: manufacturer.to_string(),
            embedding: None,
        }
    }

    #[test]
    fn size_within_tolerance_matches() {
        let external = record("acme choco bar", 16.0, "oz", "acme");
        let internal = record("acme choco bar", 16.05, "oz", "acme");
        let matcher = RuleMatcher::default();
        assert!(matcher.matches(&external, &internal));
        assert!(matcher.matches(&internal, &external));
    }

    #[test]
    fn tolerance_boundary_is_inclusive() {
        let a = record("acme bar", 1.0, "oz", "acme");
        let b = record("acme bar", 1.1, "oz", "acme");
        let c = record("acme bar", 1.2, "oz", "acme");
        assert!(size_agrees(&a, &b));
        assert!(!size_agrees(&a, &c));
    }

    #[test]
    fn unknown_size_blocks_match_in_either_order() {
        let known = record("acme choco bar", 16.0, "oz", "acme");
        let unknown = record("acme choco bar", 0.0, "", "acme");
        let matcher = RuleMatcher::default();
        assert!(!matcher.matches(&known, &unknown));
        assert!(!matcher.matches(&unknown, &known));
    }

    #[test]
    fn unknown_manufacturer_is_permissive_in_either_order() {
        let known = record("acme choco bar", 16.0, "oz", "acme");
        let unknown = record("acme choco bar", 16.0, "oz", "");
        let matcher = RuleMatcher::default();
        assert!(matcher.matches(&known, &unknown));
        assert!(matcher.matches(&unknown, &known));
    }

    #[test]
    fn different_manufacturers_never_match() {
        let a = record("choco bar", 16.0, "oz", "acme");
        let b = record("choco bar", 16.0, "oz", "zeta");
        assert!(!RuleMatcher::default().matches(&a, &b));
    }

    #[test]
    fn token_order_does_not_matter() {
        assert_eq!(token_sort_ratio("bar choco acme", "acme choco bar"), 100.0);
        assert!(token_sort_ratio("acme choco bar", "acme vanilla wafer") < 85.0);
        assert_eq!(token_sort_ratio("", "acme"), 0.0);
    }

    #[test]
    fn trailing_token_clears_default_floor() {
        // 2 * 11 / 25; an edit-distance ratio would put this at 78.6.
        assert!((token_sort_ratio("acme cookie", "acme cookie xl") - 88.0).abs() < 0.01);
        assert!((token_sort_ratio("zeta gum", "zeta gums") - 94.12).abs() < 0.01);
        let a = record("acme cookie", 12.0, "oz", "acme");
        let b = record("acme cookie xl", 12.0, "oz", "acme");
        assert!(RuleMatcher::default().matches(&a, &b));
    }

    #[test]
    fn name_floor_is_configurable() {
        let a = record("acme choco bar", 16.0, "oz", "acme");
        let b = record("acme choco bars", 16.0, "oz", "acme");
        assert!(RuleMatcher::new(85.0).matches(&a, &b));
        assert!(!RuleMatcher::new(100.0).matches(&a, &b));
    }

    #[test]
    fn first_hit_wins_over_closer_later_hit() {
        let external = record("acme choco bar", 16.0, "oz", "acme");
        let internal = vec![
            record("acme mint tea", 16.0, "oz", "acme"),
            record("acme choco bars", 16.1, "oz", "acme"),
            record("acme choco bar", 16.0, "oz", "acme"),
        ];
        let (idx, hit) = RuleMatcher::default()
            .first_match(&external, &internal)
            .unwrap();
        assert_eq!(idx, 1);
        assert_eq!(hit.cleaned_name, "acme choco bars");
    }
}
