//! Passport persistence operations on the `passports` table.

use dpp_core::Passport;
use sqlx::PgPool;

/// Insert or replace a passport document.
///
/// An older `lastUpdated` never overwrites a newer one, so concurrent
/// write-throughs settle on the latest state.
pub async fn upsert(pool: &PgPool, passport: &Passport) -> Result<(), sqlx::Error> {
    let document = serde_json::to_value(passport).map_err(super::json_error)?;
    sqlx::query(
        "INSERT INTO passports (id, status, last_updated, document)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (id) DO UPDATE
         SET status = EXCLUDED.status,
             last_updated = EXCLUDED.last_updated,
             document = EXCLUDED.document
         WHERE passports.last_updated <= EXCLUDED.last_updated",
    )
    .bind(passport.id.as_str())
    .bind(passport.metadata.status.as_str())
    .bind(passport.metadata.last_updated)
    .bind(document)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load every passport in insertion order.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Passport>, sqlx::Error> {
    let rows = sqlx::query_as::<_, PassportRow>("SELECT id, document FROM passports ORDER BY seq")
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(PassportRow::into_passport).collect()
}

#[derive(sqlx::FromRow)]
struct PassportRow {
    id: String,
    document: serde_json::Value,
}

impl PassportRow {
    fn into_passport(self) -> Result<Passport, sqlx::Error> {
        let passport: Passport = serde_json::from_value(self.document).map_err(|e| {
            tracing::error!(passport_id = %self.id, error = %e, "stored passport is malformed");
            super::json_error(e)
        })?;
        Ok(passport)
    }
}
