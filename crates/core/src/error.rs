use providers::ProviderError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{path}: missing column `{column}` (found: {found})")]
    SchemaMismatch {
        path: String,
        column: String,
        found: String,
    },
    #[error("embedding dimension mismatch for `{name}`: expected {expected}, found {found}")]
    DimensionMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("failed to read {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("processed catalog {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum MatchError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("arbitration failed for `{external}` vs `{internal}`: {source}")]
    Arbitration {
        external: String,
        internal: String,
        #[source]
        source: ProviderError,
    },
}
