use anyhow::Result;
use clap::{Parser, Subcommand};
use cli::output;
use reconciler_core::accuracy;
use reconciler_core::config;
use reconciler_core::config::AppConfig;
use reconciler_core::pipeline::{self, PipelineInputs, PipelineMode};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;
    debug!("config: {:?}", cfg);

    match cli.command {
        Commands::Preprocess {
            external,
            internal,
            json,
        } => {
            let inputs = PipelineInputs { external, internal };
            run_pipeline(&cfg, PipelineMode::Preprocess, &inputs, json).await
        }
        Commands::Match {
            external,
            internal,
            json,
        } => {
            let dir = Path::new(&cfg.output.dir);
            let inputs = PipelineInputs {
                external: external.unwrap_or_else(|| dir.join(pipeline::EXTERNAL_PROCESSED)),
                internal: internal.unwrap_or_else(|| dir.join(pipeline::INTERNAL_PROCESSED)),
            };
            run_pipeline(&cfg, PipelineMode::Match, &inputs, json).await
        }
        Commands::Run {
            external,
            internal,
            json,
        } => {
            let inputs = PipelineInputs { external, internal };
            run_pipeline(&cfg, PipelineMode::All, &inputs, json).await
        }
        Commands::Results { run_id, json } => run_results(&cfg, run_id, json).await,
        Commands::Accuracy {
            produced,
            expected,
            threshold,
            json,
        } => {
            let produced = produced
                .unwrap_or_else(|| Path::new(&cfg.output.dir).join(pipeline::RESULTS_FILE));
            run_accuracy(&produced, &expected, threshold, json)
        }
    }
}

#[derive(Parser)]
#[command(name = "reconcile")]
#[command(about = "Match an external product catalog against an internal one", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize and embed both catalogs, writing processed JSON to the output dir
    Preprocess {
        /// External catalog CSV
        external: PathBuf,
        /// Internal catalog CSV
        internal: PathBuf,
        /// Output JSON summary
        #[arg(long)]
        json: bool,
    },
    /// Match previously processed catalogs and record the run
    Match {
        /// Processed external catalog (defaults to the output dir)
        #[arg(long)]
        external: Option<PathBuf>,
        /// Processed internal catalog (defaults to the output dir)
        #[arg(long)]
        internal: Option<PathBuf>,
        /// Output JSON summary
        #[arg(long)]
        json: bool,
    },
    /// Preprocess and match in one go
    Run {
        /// External catalog CSV
        external: PathBuf,
        /// Internal catalog CSV
        internal: PathBuf,
        /// Output JSON summary
        #[arg(long)]
        json: bool,
    },
    /// Show the rows of a recorded run
    Results {
        /// Run to show; latest when omitted
        #[arg(long)]
        run_id: Option<i64>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Score a results file against a ground-truth mapping
    Accuracy {
        /// Ground-truth CSV (external, internal)
        expected: PathBuf,
        /// Results CSV (defaults to the latest results in the output dir)
        #[arg(long)]
        produced: Option<PathBuf>,
        /// Minimum fuzzy ratio (0-100) for a column to count as equal
        #[arg(long, default_value_t = accuracy::DEFAULT_THRESHOLD)]
        threshold: f64,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}

async fn run_pipeline(
    cfg: &AppConfig,
    mode: PipelineMode,
    inputs: &PipelineInputs,
    json: bool,
) -> Result<()> {
    let mode_label = match mode {
        PipelineMode::Preprocess => "preprocess",
        PipelineMode::Match => "match",
        PipelineMode::All => "run",
    };
    let registry = pipeline::build_registry(cfg);
    let summary = pipeline::run_with_mode_summary(cfg, mode, inputs, &registry).await?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output::summary_json(mode_label, &summary))?
        );
    } else {
        println!("{}", output::summary_line(mode_label, &summary));
    }
    Ok(())
}

async fn run_results(cfg: &AppConfig, run_id: Option<i64>, json: bool) -> Result<()> {
    let Some((run, rows)) = pipeline::load_results(cfg, run_id).await? else {
        match run_id {
            Some(id) => anyhow::bail!("run {} not found", id),
            None => anyhow::bail!("no recorded runs; run `reconcile match` first"),
        }
    };
    if json {
        let value = serde_json::json!({ "run": run, "results": rows });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print!("{}", output::results_table(&run, &rows));
    }
    Ok(())
}

fn run_accuracy(produced: &Path, expected: &Path, threshold: f64, json: bool) -> Result<()> {
    let report = accuracy::check_files(produced, expected, threshold)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", output::accuracy_text(&report));
    }
    Ok(())
}
