use crate::arbitration::VerdictMode;
use providers::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub catalogs: CatalogConfig,
    pub matching: MatchingConfig,
    pub providers: ProviderConfig,
    pub retry: RetryConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/reconciler.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub external_name_column: String,
    pub internal_name_column: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            external_name_column: "PRODUCT_NAME".to_string(),
            internal_name_column: "LONG_NAME".to_string(),
        }
    }
}

/// Knobs for the matching cascade. Passed to the orchestrator at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Token-sort similarity (0-100) two cleaned names need for a rule match.
    pub rule_name_similarity_floor: f64,
    /// Cosine similarity below which no semantic candidate is reported.
    pub semantic_floor: f32,
    /// Scores strictly above this are accepted without arbitration.
    pub semantic_high_confidence: f32,
    pub embedding_batch_size: usize,
    /// External records resolved at once. 1 reproduces the sequential reference run.
    pub max_concurrency: usize,
    pub verdict_mode: VerdictMode,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            rule_name_similarity_floor: 85.0,
            semantic_floor: 0.8,
            semantic_high_confidence: 0.97,
            embedding_batch_size: 100,
            max_concurrency: 1,
            verdict_mode: VerdictMode::Parity,
        }
    }
}

impl MatchingConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            (0.0..=100.0).contains(&self.rule_name_similarity_floor),
            "rule_name_similarity_floor must be within 0..=100, got {}",
            self.rule_name_similarity_floor
        );
        anyhow::ensure!(
            (-1.0..=1.0).contains(&self.semantic_floor),
            "semantic_floor must be within -1..=1, got {}",
            self.semantic_floor
        );
        anyhow::ensure!(
            (-1.0..=1.0).contains(&self.semantic_high_confidence),
            "semantic_high_confidence must be within -1..=1, got {}",
            self.semantic_high_confidence
        );
        anyhow::ensure!(
            self.embedding_batch_size > 0,
            "embedding_batch_size must be positive"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub embedding: String,
    pub llm: String,
    pub embedding_model: String,
    pub chat_model: String,
    /// Falls back to OPENAI_BASE_URL, then the public endpoint.
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            embedding: "openai".to_string(),
            llm: "openai".to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
            chat_model: "gpt-3.5-turbo".to_string(),
            base_url: None,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8000,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "output".to_string(),
        }
    }
}

pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    settings = settings.add_source(
        config::Environment::with_prefix("RECONCILE")
            .separator("__")
            .try_parsing(true),
    );
    let cfg = settings.build()?;
    let app: AppConfig = cfg.try_deserialize()?;
    app.matching.validate()?;
    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_match_reference_thresholds() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.matching.rule_name_similarity_floor, 85.0);
        assert_eq!(cfg.matching.semantic_floor, 0.8);
        assert_eq!(cfg.matching.semantic_high_confidence, 0.97);
        assert_eq!(cfg.matching.embedding_batch_size, 100);
        assert_eq!(cfg.matching.max_concurrency, 1);
        assert_eq!(cfg.matching.verdict_mode, VerdictMode::Parity);
        assert_eq!(cfg.catalogs.external_name_column, "PRODUCT_NAME");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reconcile.toml");
        fs::write(
            &path,
            r#"
            [matching]
            semantic_floor = 0.85
            verdict_mode = "strict"

            [retry]
            max_attempts = 5
            "#,
        )
        .unwrap();
        let cfg = load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(cfg.matching.semantic_floor, 0.85);
        assert_eq!(cfg.matching.verdict_mode, VerdictMode::Strict);
        assert_eq!(cfg.matching.semantic_high_confidence, 0.97);
        assert_eq!(cfg.retry.policy().max_attempts, 5);
        assert_eq!(cfg.database.path, "data/reconciler.db");
    }

    #[test]
    fn out_of_range_floor_is_rejected() {
        let cfg = MatchingConfig {
            semantic_floor: 1.5,
            ..MatchingConfig::default()
        };
        assert!(cfg.validate().is_err());
        let cfg = MatchingConfig {
            embedding_batch_size: 0,
            ..MatchingConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
