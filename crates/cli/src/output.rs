use reconciler_core::accuracy::{AccuracyReport, RowStatus};
use reconciler_core::pipeline::PipelineSummary;
use storage::models::{Run, StoredMatch};

pub fn summary_json(mode: &str, summary: &PipelineSummary) -> serde_json::Value {
    let mut value = serde_json::json!({
        "status": "ok",
        "mode": mode,
    });
    if let (Some(obj), Ok(serde_json::Value::Object(fields))) =
        (value.as_object_mut(), serde_json::to_value(summary))
    {
        obj.extend(fields);
    }
    value
}

pub fn summary_line(mode: &str, summary: &PipelineSummary) -> String {
    let mut line = format!(
        "{}: external {} ({} embedded), internal {} ({} embedded)",
        mode,
        summary.external_records,
        summary.embedded_external,
        summary.internal_records,
        summary.embedded_internal
    );
    if let Some(counts) = &summary.counts {
        line.push_str(&format!(
            "; rule-based {}, semantic {}, semantic with fallback {}, unmatched {}",
            counts.rule_based, counts.semantic, counts.semantic_with_fallback, counts.unmatched
        ));
    }
    if let (Some(run_id), Some(file)) = (summary.run_id, &summary.results_file) {
        line.push_str(&format!("; run {} -> {}", run_id, file.display()));
    }
    line
}

fn score(value: Option<f64>) -> String {
    value.map(|s| format!("{:.4}", s)).unwrap_or_else(|| "N/A".into())
}

/// Tab-separated rows, one per external record.
pub fn results_table(run: &Run, rows: &[StoredMatch]) -> String {
    let mut out = format!(
        "run {} ({}): {} external, {} internal, floor {}, cutoff {}\n",
        run.id,
        run.started_at,
        run.external_count,
        run.internal_count,
        run.semantic_floor,
        run.semantic_high_confidence
    );
    out.push_str("External\tInternal\tMethod\tSemantic Score\tFallback_Internal\n");
    for row in rows {
        out.push_str(&format!(
            "{}\t{}\t{}\t{}\t{}\n",
            row.external,
            row.internal.as_deref().unwrap_or("NULL"),
            row.method,
            score(row.semantic_score),
            row.fallback_internal.as_deref().unwrap_or("")
        ));
    }
    out
}

pub fn accuracy_text(report: &AccuracyReport) -> String {
    let mut out = format!("accuracy: {:.2}%\n", report.accuracy);
    for row in report.results.iter().filter(|r| r.status == RowStatus::Wrong) {
        out.push_str(&format!(
            "wrong: {} -> {} (expected {})\n",
            row.external, row.predicted_internal, row.actual_internal
        ));
    }
    out
}
