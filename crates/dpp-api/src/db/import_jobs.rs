//! Import job persistence operations on the `import_jobs` table.

use chrono::{DateTime, Utc};
use dpp_core::ImportJob;
use sqlx::PgPool;

/// Insert or replace an import job document.
pub async fn upsert(pool: &PgPool, job: &ImportJob) -> Result<(), sqlx::Error> {
    let document = serde_json::to_value(job).map_err(super::json_error)?;
    sqlx::query(
        "INSERT INTO import_jobs (job_id, status, submitted_at, updated_at, document)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (job_id) DO UPDATE
         SET status = EXCLUDED.status,
             updated_at = EXCLUDED.updated_at,
             document = EXCLUDED.document
         WHERE import_jobs.updated_at <= EXCLUDED.updated_at",
    )
    .bind(job.job_id.as_str())
    .bind(job.status.as_str())
    .bind(job.submitted_at)
    .bind(job.updated_at)
    .bind(document)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load every retained import job.
pub async fn load_all(pool: &PgPool) -> Result<Vec<ImportJob>, sqlx::Error> {
    let rows: Vec<(serde_json::Value,)> =
        sqlx::query_as("SELECT document FROM import_jobs ORDER BY submitted_at")
            .fetch_all(pool)
            .await?;

    rows.into_iter()
        .map(|(document,)| serde_json::from_value(document).map_err(super::json_error))
        .collect()
}

/// Delete jobs last changed before `cutoff`. Returns the number removed.
pub async fn delete_updated_before(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM import_jobs WHERE updated_at < $1")
        .bind(cutoff)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
