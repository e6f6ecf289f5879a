use crate::arbitration::LlmArbitrator;
use crate::catalog;
use crate::config::AppConfig;
use crate::embeddings;
use crate::models::{Catalog, CatalogSide, MatchResult, MethodCounts};
use crate::orchestrator::Orchestrator;
use crate::report;
use anyhow::Context;
use providers::openai::{OpenAiConfig, OpenAiProvider};
use providers::ProviderRegistry;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use storage::models::{NewRun, Run, StoredMatch};
use storage::{connect, migrate, results};
use tracing::{info, warn};

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

pub const EXTERNAL_PROCESSED: &str = "external_processed.json";
pub const INTERNAL_PROCESSED: &str = "internal_processed.json";
pub const RESULTS_FILE: &str = "matched_results.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineMode {
    /// Normalize and embed both CSV catalogs, write processed JSON.
    Preprocess,
    /// Match two processed catalogs, write results.
    Match,
    All,
}

/// For `Preprocess` and `All` these are CSV catalogs; for `Match`, processed JSON.
#[derive(Debug, Clone)]
pub struct PipelineInputs {
    pub external: PathBuf,
    pub internal: PathBuf,
}

#[derive(Debug, Default, Serialize)]
pub struct PipelineSummary {
    pub external_records: usize,
    pub internal_records: usize,
    pub embedded_external: usize,
    pub embedded_internal: usize,
    pub processed_files: Vec<PathBuf>,
    pub run_id: Option<i64>,
    pub counts: Option<MethodCounts>,
    pub results_file: Option<PathBuf>,
}

pub struct Prepared {
    pub external: Catalog,
    pub internal: Catalog,
}

pub async fn run_with_mode_summary(
    config: &AppConfig,
    mode: PipelineMode,
    inputs: &PipelineInputs,
    registry: &ProviderRegistry,
) -> anyhow::Result<PipelineSummary> {
    config.matching.validate()?;
    let mut summary = PipelineSummary::default();

    let prepared = match mode {
        PipelineMode::Preprocess | PipelineMode::All => {
            info!("Starting preprocessing phase...");
            let prepared = preprocess(config, &inputs.external, &inputs.internal, registry).await?;
            summary.processed_files = save_prepared(config, &prepared)?;
            info!("Preprocessing complete.");
            prepared
        }
        PipelineMode::Match => load_prepared(&inputs.external, &inputs.internal)?,
    };
    summary.external_records = prepared.external.len();
    summary.internal_records = prepared.internal.len();
    summary.embedded_external = prepared.external.embedded_count();
    summary.embedded_internal = prepared.internal.embedded_count();

    if matches!(mode, PipelineMode::Match | PipelineMode::All) {
        info!("Starting matching phase...");
        let matches = match_catalogs(config, &prepared, registry).await?;
        let results_file = Path::new(&config.output.dir).join(RESULTS_FILE);
        report::write_csv_file(&results_file, &matches)
            .with_context(|| format!("writing {}", results_file.display()))?;
        let run_id = record_run(config, &prepared, &matches).await?;
        info!(
            "Matching complete. Run {} written to {}.",
            run_id,
            results_file.display()
        );
        summary.counts = Some(MethodCounts::tally(&matches));
        summary.run_id = Some(run_id);
        summary.results_file = Some(results_file);
    }

    Ok(summary)
}

/// Reads both catalogs before embedding either, so a bad header fails fast.
pub async fn preprocess(
    config: &AppConfig,
    external_csv: &Path,
    internal_csv: &Path,
    registry: &ProviderRegistry,
) -> anyhow::Result<Prepared> {
    let external = catalog::read_csv(
        external_csv,
        &config.catalogs.external_name_column,
        CatalogSide::External,
    )?;
    let internal = catalog::read_csv(
        internal_csv,
        &config.catalogs.internal_name_column,
        CatalogSide::Internal,
    )?;

    let provider = registry
        .embedding(None)
        .context("embedding provider unavailable (is OPENAI_API_KEY set?)")?;
    let retry = config.retry.policy();
    let batch = config.matching.embedding_batch_size;
    let external = embeddings::embed_catalog(external, provider.as_ref(), batch, &retry)
        .await
        .context("embedding external catalog")?;
    let internal = embeddings::embed_catalog(internal, provider.as_ref(), batch, &retry)
        .await
        .context("embedding internal catalog")?;
    Ok(Prepared { external, internal })
}

pub fn save_prepared(config: &AppConfig, prepared: &Prepared) -> anyhow::Result<Vec<PathBuf>> {
    let dir = Path::new(&config.output.dir);
    let external = dir.join(EXTERNAL_PROCESSED);
    let internal = dir.join(INTERNAL_PROCESSED);
    catalog::save_processed(&external, &prepared.external)?;
    catalog::save_processed(&internal, &prepared.internal)?;
    Ok(vec![external, internal])
}

pub fn load_prepared(external: &Path, internal: &Path) -> anyhow::Result<Prepared> {
    let external = catalog::load_processed(external)?;
    let internal = catalog::load_processed(internal)?;
    anyhow::ensure!(
        external.side == CatalogSide::External && internal.side == CatalogSide::Internal,
        "processed catalogs given in the wrong order"
    );
    Ok(Prepared { external, internal })
}

pub async fn match_catalogs(
    config: &AppConfig,
    prepared: &Prepared,
    registry: &ProviderRegistry,
) -> anyhow::Result<Vec<MatchResult>> {
    let llm = registry
        .llm(None)
        .context("arbitration model unavailable (is OPENAI_API_KEY set?)")?;
    let arbitrator = Arc::new(LlmArbitrator::new(
        llm,
        config.retry.policy(),
        config.matching.verdict_mode,
    ));
    let orchestrator = Orchestrator::new(config.matching.clone(), arbitrator);
    let results = orchestrator
        .run(&prepared.external, &prepared.internal)
        .await?;
    Ok(results)
}

async fn record_run(
    config: &AppConfig,
    prepared: &Prepared,
    matches: &[MatchResult],
) -> anyhow::Result<i64> {
    let pool = connect(&config.database.path).await.context("db connect")?;
    migrate(&pool).await.context("db migrate")?;
    let run_id = results::insert_run(
        &pool,
        &NewRun {
            external_count: prepared.external.len(),
            internal_count: prepared.internal.len(),
            semantic_floor: f64::from(config.matching.semantic_floor),
            semantic_high_confidence: f64::from(config.matching.semantic_high_confidence),
        },
    )
    .await?;
    results::insert_matches(&pool, run_id, &report::to_stored(matches)).await?;
    Ok(run_id)
}

/// A stored run and its rows; the latest run when `run_id` is `None`.
pub async fn load_results(
    config: &AppConfig,
    run_id: Option<i64>,
) -> anyhow::Result<Option<(Run, Vec<StoredMatch>)>> {
    let pool = connect(&config.database.path).await.context("db connect")?;
    migrate(&pool).await.context("db migrate")?;
    let run = match run_id {
        Some(id) => results::fetch_run(&pool, id).await?,
        None => results::latest_run(&pool).await?,
    };
    let Some(run) = run else {
        return Ok(None);
    };
    let rows = results::fetch_matches(&pool, run.id).await?;
    Ok(Some((run, rows)))
}

pub fn build_registry(config: &AppConfig) -> ProviderRegistry {
    let mut reg = ProviderRegistry::new();

    if let Some(key) = std::env::var_os("OPENAI_API_KEY") {
        let base_url = config
            .providers
            .base_url
            .clone()
            .or_else(|| std::env::var("OPENAI_BASE_URL").ok())
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string());
        match OpenAiProvider::new(OpenAiConfig {
            api_key: key.to_string_lossy().into_owned(),
            base_url,
            embedding_model: config.providers.embedding_model.clone(),
            chat_model: config.providers.chat_model.clone(),
            timeout: Duration::from_secs(config.providers.timeout_secs),
        }) {
            Ok(provider) => {
                reg = reg
                    .with_embedding("openai", Arc::new(provider.clone()))
                    .with_llm("openai", Arc::new(provider));
            }
            Err(e) => warn!("OpenAI provider disabled: {}", e),
        }
    }

    reg.set_preferred_embedding(&config.providers.embedding)
        .set_preferred_llm(&config.providers.llm)
}
