//! Scores a produced mapping against a ground-truth mapping.
//!
//! Both files are read positionally: column 0 is the external name, column 1
//! the internal name. A row is correct when both columns are fuzzy-equal.

use serde::Serialize;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_THRESHOLD: f64 = 90.0;

#[derive(Debug, Error)]
pub enum AccuracyError {
    #[error("files have different number of rows ({produced} vs {expected})")]
    RowCountMismatch { produced: usize, expected: usize },
    #[error("{0}: need at least two columns")]
    TooFewColumns(String),
    #[error("nothing to score: both files are empty")]
    Empty,
    #[error("{path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RowStatus {
    Correct,
    Wrong,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccuracyRow {
    pub external: String,
    pub predicted_internal: String,
    pub actual_internal: String,
    pub status: RowStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccuracyReport {
    /// Percent of correct rows, rounded to two decimals.
    pub accuracy: f64,
    pub results: Vec<AccuracyRow>,
}

/// Indel similarity on a 0-100 scale: `2 * matches / (len_a + len_b)`.
pub fn fuzzy_ratio(a: &str, b: &str) -> f64 {
    rapidfuzz::fuzz::ratio(a.chars(), b.chars()) * 100.0
}

fn clean(cell: Option<&str>) -> String {
    let value = cell.unwrap_or_default().trim().to_lowercase();
    if value.is_empty() {
        "null".to_string()
    } else {
        value
    }
}

/// Reads (external, internal) pairs from a headed CSV, lowercased and trimmed.
pub fn read_pairs<R: Read>(input: R, source: &str) -> Result<Vec<(String, String)>, AccuracyError> {
    let csv_err = |e: csv::Error| AccuracyError::Csv {
        path: source.to_string(),
        source: e,
    };
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);
    if reader.headers().map_err(csv_err)?.len() < 2 {
        return Err(AccuracyError::TooFewColumns(source.to_string()));
    }
    let mut pairs = Vec::new();
    for row in reader.records() {
        let row = row.map_err(csv_err)?;
        pairs.push((clean(row.get(0)), clean(row.get(1))));
    }
    Ok(pairs)
}

pub fn score(
    produced: &[(String, String)],
    expected: &[(String, String)],
    threshold: f64,
) -> Result<AccuracyReport, AccuracyError> {
    if produced.len() != expected.len() {
        return Err(AccuracyError::RowCountMismatch {
            produced: produced.len(),
            expected: expected.len(),
        });
    }
    if produced.is_empty() {
        return Err(AccuracyError::Empty);
    }

    let mut wrong = Vec::new();
    let mut correct = Vec::new();
    for (ours, truth) in produced.iter().zip(expected) {
        let ok = fuzzy_ratio(&ours.0, &truth.0) >= threshold
            && fuzzy_ratio(&ours.1, &truth.1) >= threshold;
        let row = AccuracyRow {
            external: ours.0.clone(),
            predicted_internal: ours.1.clone(),
            actual_internal: if ok { ours.1.clone() } else { truth.1.clone() },
            status: if ok { RowStatus::Correct } else { RowStatus::Wrong },
        };
        if ok {
            correct.push(row);
        } else {
            wrong.push(row);
        }
    }

    let accuracy = correct.len() as f64 / produced.len() as f64 * 100.0;
    wrong.extend(correct);
    Ok(AccuracyReport {
        accuracy: (accuracy * 100.0).round() / 100.0,
        results: wrong,
    })
}

pub fn check_files(
    produced: &Path,
    expected: &Path,
    threshold: f64,
) -> Result<AccuracyReport, AccuracyError> {
    let open = |path: &Path| {
        std::fs::File::open(path).map_err(|e| AccuracyError::Csv {
            path: path.display().to_string(),
            source: csv::Error::from(e),
        })
    };
    let ours = read_pairs(open(produced)?, &produced.display().to_string())?;
    let truth = read_pairs(open(expected)?, &expected.display().to_string())?;
    score(&ours, &truth, threshold)
}
