use serde::{Deserialize, Serialize};
use std::fmt;

/// A normalized catalog entry. Produced once by the normalizer and only read afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub original_name: String,
    pub cleaned_name: String,
    /// 0.0 means the size is unknown.
    pub size: f64,
    pub unit: String,
    pub manufacturer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl ProductRecord {
    pub fn has_size(&self) -> bool {
        self.size > 0.0
    }

    pub fn with_embedding(self, embedding: Vec<f32>) -> Self {
        Self {
            embedding: Some(embedding),
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSide {
    External,
    Internal,
}

impl fmt::Display for CatalogSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogSide::External => f.write_str("external"),
            CatalogSide::Internal => f.write_str("internal"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub side: CatalogSide,
    records: Vec<ProductRecord>,
}

impl Catalog {
    pub fn new(side: CatalogSide, records: Vec<ProductRecord>) -> Self {
        Self { side, records }
    }

    pub fn records(&self) -> &[ProductRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ProductRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn embedded_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.embedding.is_some())
            .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchMethod {
    #[serde(rename = "Rule-Based")]
    RuleBased,
    #[serde(rename = "Semantic")]
    Semantic,
    #[serde(rename = "Semantic with Fallback")]
    SemanticWithFallback,
    #[serde(rename = "Unmatched")]
    Unmatched,
}

impl MatchMethod {
    pub fn label(&self) -> &'static str {
        match self {
            MatchMethod::RuleBased => "Rule-Based",
            MatchMethod::Semantic => "Semantic",
            MatchMethod::SemanticWithFallback => "Semantic with Fallback",
            MatchMethod::Unmatched => "Unmatched",
        }
    }
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Disposition of one external record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub external: String,
    pub internal: Option<String>,
    pub method: MatchMethod,
    pub semantic_score: Option<f32>,
    pub fallback_internal: Option<String>,
    pub fallback_score: Option<f32>,
}

impl MatchResult {
    pub fn rule_based(external: &str, internal: &str) -> Self {
        Self {
            external: external.to_string(),
            internal: Some(internal.to_string()),
            method: MatchMethod::RuleBased,
            semantic_score: None,
            fallback_internal: None,
            fallback_score: None,
        }
    }

    pub fn semantic(external: &str, internal: &str, score: f32) -> Self {
        Self {
            external: external.to_string(),
            internal: Some(internal.to_string()),
            method: MatchMethod::Semantic,
            semantic_score: Some(score),
            fallback_internal: None,
            fallback_score: None,
        }
    }

    pub fn confirmed(external: &str, internal: &str, score: f32) -> Self {
        Self {
            external: external.to_string(),
            internal: Some(internal.to_string()),
            method: MatchMethod::SemanticWithFallback,
            semantic_score: Some(score),
            fallback_internal: Some(internal.to_string()),
            fallback_score: Some(score),
        }
    }

    /// Arbitration said no; the candidate is kept for audit only.
    pub fn rejected(external: &str, candidate: &str, score: f32) -> Self {
        Self {
            external: external.to_string(),
            internal: None,
            method: MatchMethod::Unmatched,
            semantic_score: Some(score),
            fallback_internal: Some(candidate.to_string()),
            fallback_score: Some(score),
        }
    }

    /// `best_score` is the best similarity found with no floor, if any was computable.
    pub fn unmatched(external: &str, best_score: Option<f32>) -> Self {
        Self {
            external: external.to_string(),
            internal: None,
            method: MatchMethod::Unmatched,
            semantic_score: best_score,
            fallback_internal: None,
            fallback_score: None,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.internal.is_some()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodCounts {
    pub rule_based: usize,
    pub semantic: usize,
    pub semantic_with_fallback: usize,
    pub unmatched: usize,
}

impl MethodCounts {
    pub fn tally(results: &[MatchResult]) -> Self {
        let mut counts = Self::default();
        for result in results {
            match result.method {
                MatchMethod::RuleBased => counts.rule_based += 1,
                MatchMethod::Semantic => counts.semantic += 1,
                MatchMethod::SemanticWithFallback => counts.semantic_with_fallback += 1,
                MatchMethod::Unmatched => counts.unmatched += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.rule_based + self.semantic + self.semantic_with_fallback + self.unmatched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_labels_match_serde_names() {
        for method in [
            MatchMethod::RuleBased,
            MatchMethod::Semantic,
            MatchMethod::SemanticWithFallback,
            MatchMethod::Unmatched,
        ] {
            let json = serde_json::to_string(&method).unwrap();
            assert_eq!(json, format!("\"{}\"", method.label()));
        }
    }

    #[test]
    fn rejected_keeps_candidate_for_audit() {
        let r = MatchResult::rejected("ext", "cand", 0.9);
        assert!(!r.is_matched());
        assert_eq!(r.method, MatchMethod::Unmatched);
        assert_eq!(r.fallback_internal.as_deref(), Some("cand"));
        assert_eq!(r.fallback_score, Some(0.9));
    }

    #[test]
    fn tally_counts_each_method() {
        let results = vec![
            MatchResult::rule_based("a", "x"),
            MatchResult::semantic("b", "y", 0.99),
            MatchResult::unmatched("c", None),
            MatchResult::rejected("d", "z", 0.85),
        ];
        let counts = MethodCounts::tally(&results);
        assert_eq!(counts.rule_based, 1);
        assert_eq!(counts.semantic, 1);
        assert_eq!(counts.semantic_with_fallback, 0);
        assert_eq!(counts.unmatched, 2);
        assert_eq!(counts.total(), 4);
    }
}
