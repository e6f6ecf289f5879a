use crate::models::{NewRun, Run, StoredMatch};
use sqlx::SqlitePool;
use tracing::debug;

pub async fn insert_run(pool: &SqlitePool, run: &NewRun) -> anyhow::Result<i64> {
    let res = sqlx::query(
        r#"
        INSERT INTO runs (started_at, external_count, internal_count, semantic_floor, semantic_high_confidence)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(run.external_count as i64)
    .bind(run.internal_count as i64)
    .bind(run.semantic_floor)
    .bind(run.semantic_high_confidence)
    .execute(pool)
    .await?;
    Ok(res.last_insert_rowid())
}

/// Writes all rows of a run in one transaction.
pub async fn insert_matches(
    pool: &SqlitePool,
    run_id: i64,
    rows: &[StoredMatch],
) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;
    for row in rows {
        sqlx::query(
            r#"
            INSERT INTO match_results
                (run_id, position, external, internal, method, semantic_score, fallback_internal, fallback_score)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(run_id)
        .bind(row.position)
        .bind(&row.external)
        .bind(&row.internal)
        .bind(&row.method)
        .bind(row.semantic_score)
        .bind(&row.fallback_internal)
        .bind(row.fallback_score)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    debug!("stored {} match rows for run {}", rows.len(), run_id);
    Ok(())
}

pub async fn latest_run(pool: &SqlitePool) -> anyhow::Result<Option<Run>> {
    let run = sqlx::query_as::<_, Run>("SELECT * FROM runs ORDER BY id DESC LIMIT 1")
        .fetch_optional(pool)
        .await?;
    Ok(run)
}

pub async fn fetch_run(pool: &SqlitePool, run_id: i64) -> anyhow::Result<Option<Run>> {
    let run = sqlx::query_as::<_, Run>("SELECT * FROM runs WHERE id = ?1")
        .bind(run_id)
        .fetch_optional(pool)
        .await?;
    Ok(run)
}

pub async fn fetch_matches(pool: &SqlitePool, run_id: i64) -> anyhow::Result<Vec<StoredMatch>> {
    let rows = sqlx::query_as::<_, StoredMatch>(
        r#"
        SELECT position, external, internal, method, semantic_score, fallback_internal, fallback_score
        FROM match_results
        WHERE run_id = ?1
        ORDER BY position
        "#,
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connect, migrate};

    fn row(position: i64, external: &str, internal: Option<&str>, method: &str) -> StoredMatch {
        StoredMatch {
            position,
            external: external.to_string(),
            internal: internal.map(str::to_string),
            method: method.to_string(),
            semantic_score: None,
            fallback_internal: None,
            fallback_score: None,
        }
    }

    #[tokio::test]
    async fn round_trips_latest_run() {
        let pool = connect("sqlite://file:results_store?mode=memory&cache=shared")
            .await
            .unwrap();
        migrate(&pool).await.unwrap();

        let first = insert_run(
            &pool,
            &NewRun {
                external_count: 1,
                internal_count: 1,
                semantic_floor: 0.8,
                semantic_high_confidence: 0.97,
            },
        )
        .await
        .unwrap();
        insert_matches(&pool, first, &[row(0, "old", None, "Unmatched")])
            .await
            .unwrap();

        let second = insert_run(
            &pool,
            &NewRun {
                external_count: 2,
                internal_count: 3,
                semantic_floor: 0.85,
                semantic_high_confidence: 0.97,
            },
        )
        .await
        .unwrap();
        let mut semantic = row(1, "Acme Bar 2oz", Some("ACME BAR 2 OZ"), "Semantic");
        semantic.semantic_score = Some(0.99);
        insert_matches(
            &pool,
            second,
            &[semantic.clone(), row(0, "Zeta Gum", None, "Unmatched")],
        )
        .await
        .unwrap();

        let latest = latest_run(&pool).await.unwrap().unwrap();
        assert_eq!(latest.id, second);
        assert_eq!(latest.internal_count, 3);

        let rows = fetch_matches(&pool, second).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].external, "Zeta Gum");
        assert_eq!(rows[1], semantic);

        assert_eq!(fetch_matches(&pool, first).await.unwrap().len(), 1);
        assert!(fetch_run(&pool, 9999).await.unwrap().is_none());
    }
}
