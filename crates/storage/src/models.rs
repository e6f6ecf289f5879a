use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Run {
    pub id: i64,
    pub started_at: String,
    pub external_count: i64,
    pub internal_count: i64,
    pub semantic_floor: f64,
    pub semantic_high_confidence: f64,
}

#[derive(Debug, Clone)]
pub struct NewRun {
    pub external_count: usize,
    pub internal_count: usize,
    pub semantic_floor: f64,
    pub semantic_high_confidence: f64,
}

/// One persisted match row. `method` holds the display label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StoredMatch {
    pub position: i64,
    pub external: String,
    pub internal: Option<String>,
    pub method: String,
    pub semantic_score: Option<f64>,
    pub fallback_internal: Option<String>,
    pub fallback_score: Option<f64>,
}
