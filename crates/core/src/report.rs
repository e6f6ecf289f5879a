use crate::models::MatchResult;
use std::io::Write;
use std::path::Path;
use storage::models::StoredMatch;

pub const HEADERS: [&str; 6] = [
    "External",
    "Internal",
    "Method",
    "Semantic Score",
    "Fallback_Internal",
    "Fallback_Semantic_Score",
];

pub const NO_MATCH: &str = "NULL";
pub const NO_SCORE: &str = "N/A";

fn score(value: Option<f32>, absent: &str) -> String {
    value
        .map(|s| format!("{:.4}", s))
        .unwrap_or_else(|| absent.to_string())
}

pub fn to_row(result: &MatchResult) -> [String; 6] {
    [
        result.external.clone(),
        result
            .internal
            .clone()
            .unwrap_or_else(|| NO_MATCH.to_string()),
        result.method.label().to_string(),
        score(result.semantic_score, NO_SCORE),
        result.fallback_internal.clone().unwrap_or_default(),
        score(result.fallback_score, ""),
    ]
}

pub fn write_csv<W: Write>(writer: W, results: &[MatchResult]) -> csv::Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(HEADERS)?;
    for result in results {
        out.write_record(to_row(result))?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_csv_file(path: &Path, results: &[MatchResult]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_csv(file, results)?;
    Ok(())
}

pub fn to_stored(results: &[MatchResult]) -> Vec<StoredMatch> {
    results
        .iter()
        .enumerate()
        .map(|(position, r)| StoredMatch {
            position: position as i64,
            external: r.external.clone(),
            internal: r.internal.clone(),
            method: r.method.label().to_string(),
            semantic_score: r.semantic_score.map(f64::from),
            fallback_internal: r.fallback_internal.clone(),
            fallback_score: r.fallback_score.map(f64::from),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_use_sentinels_for_absent_values() {
        let results = vec![
            MatchResult::rule_based("Acme Bar 2oz", "ACME BAR 2 OZ"),
            MatchResult::unmatched("Zeta Gum", Some(0.75)),
            MatchResult::unmatched("???", None),
            MatchResult::rejected("Beta Tea", "Beta Green Tea", 0.9),
        ];
        let mut buf = Vec::new();
        write_csv(&mut buf, &results).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "External,Internal,Method,Semantic Score,Fallback_Internal,Fallback_Semantic_Score"
        );
        assert_eq!(lines[1], "Acme Bar 2oz,ACME BAR 2 OZ,Rule-Based,N/A,,");
        assert_eq!(lines[2], "Zeta Gum,NULL,Unmatched,0.7500,,");
        assert_eq!(lines[3], "???,NULL,Unmatched,N/A,,");
        assert_eq!(lines[4], "Beta Tea,NULL,Unmatched,0.9000,Beta Green Tea,0.9000");
    }

    #[test]
    fn stored_rows_keep_input_positions() {
        let results = vec![
            MatchResult::semantic("a", "x", 0.99),
            MatchResult::confirmed("b", "y", 0.9),
        ];
        let stored = to_stored(&results);
        assert_eq!(stored[0].position, 0);
        assert_eq!(stored[1].position, 1);
        assert_eq!(stored[1].method, "Semantic with Fallback");
        assert_eq!(stored[1].fallback_internal.as_deref(), Some("y"));
        assert!((stored[0].semantic_score.unwrap() - 0.99).abs() < 1e-6);
    }
}
