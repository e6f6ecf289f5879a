//! Per-record matching cascade: rules, then embeddings, then arbitration.
//!
//! Each external record resolves independently to exactly one [`MatchResult`]:
//!
//! 1. The rule matcher scans the internal catalog in order; the first hit is
//!    accepted as `RuleBased`.
//! 2. Otherwise the semantic matcher picks the most similar internal record at
//!    or above the floor. No candidate gives `Unmatched`, still reporting the
//!    best similarity seen with no floor.
//! 3. A candidate strictly above the high-confidence cutoff is accepted as
//!    `Semantic`. Anything else goes to the arbitrator, whose verdict is final.
//!
//! Provider failures abort the run; they never become `Unmatched` rows.

use crate::arbitration::Arbitrator;
use crate::catalog;
use crate::config::MatchingConfig;
use crate::error::MatchError;
use crate::models::{Catalog, MatchResult, MethodCounts, ProductRecord};
use crate::rules::RuleMatcher;
use crate::semantic::{self, SemanticMatcher};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use tracing::{debug, info};

pub struct Orchestrator {
    config: MatchingConfig,
    rules: RuleMatcher,
    semantic: SemanticMatcher,
    arbitrator: Arc<dyn Arbitrator>,
}

impl Orchestrator {
    pub fn new(config: MatchingConfig, arbitrator: Arc<dyn Arbitrator>) -> Self {
        Self {
            rules: RuleMatcher::new(config.rule_name_similarity_floor),
            semantic: SemanticMatcher::new(config.semantic_floor),
            config,
            arbitrator,
        }
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// One result per external record, in external catalog order.
    pub async fn run(
        &self,
        external: &Catalog,
        internal: &Catalog,
    ) -> Result<Vec<MatchResult>, MatchError> {
        catalog::validate_dimensions(external, internal)?;
        let concurrency = self.config.max_concurrency.max(1);
        info!(
            "matching {} external against {} internal records (concurrency {})",
            external.len(),
            internal.len(),
            concurrency
        );

        let results: Vec<MatchResult> = stream::iter(external.records())
            .map(|record| self.match_record(record, internal.records()))
            .buffered(concurrency)
            .try_collect()
            .await?;

        let counts = MethodCounts::tally(&results);
        info!(
            "matching done: {} rule-based, {} semantic, {} confirmed by fallback, {} unmatched",
            counts.rule_based, counts.semantic, counts.semantic_with_fallback, counts.unmatched
        );
        Ok(results)
    }

    pub async fn match_record(
        &self,
        external: &ProductRecord,
        internal: &[ProductRecord],
    ) -> Result<MatchResult, MatchError> {
        let name = external.original_name.as_str();

        if let Some((idx, hit)) = self.rules.first_match(external, internal) {
            debug!("`{}`: rule match with internal #{}", name, idx);
            return Ok(MatchResult::rule_based(name, &hit.original_name));
        }

        let Some(query) = external.embedding.as_deref() else {
            debug!("`{}`: no embedding, unmatched", name);
            return Ok(MatchResult::unmatched(name, None));
        };

        let Some(candidate) = self.semantic.best_in(query, internal) else {
            let best = semantic::best_unrestricted(
                query,
                internal.iter().map(|r| r.embedding.as_deref()),
            );
            debug!("`{}`: no candidate above floor (best {:?})", name, best);
            return Ok(MatchResult::unmatched(name, best.map(|c| c.score)));
        };

        let target = &internal[candidate.index].original_name;
        if candidate.score > self.config.semantic_high_confidence {
            debug!("`{}`: semantic match {:.4} with `{}`", name, candidate.score, target);
            return Ok(MatchResult::semantic(name, target, candidate.score));
        }

        let confirmed = self
            .arbitrator
            .confirm(name, target)
            .await
            .map_err(|source| MatchError::Arbitration {
                external: name.to_string(),
                internal: target.to_string(),
                source,
            })?;
        debug!(
            "`{}`: arbitration on `{}` ({:.4}) -> {}",
            name, target, candidate.score, confirmed
        );
        if confirmed {
            Ok(MatchResult::confirmed(name, target, candidate.score))
        } else {
            Ok(MatchResult::rejected(name, target, candidate.score))
        }
    }
}
