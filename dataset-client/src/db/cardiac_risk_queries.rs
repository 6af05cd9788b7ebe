use anyhow::Result;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::domain::CardiacRiskRecord;

pub async fn list_records(pool: &PgPool) -> Result<Vec<CardiacRiskRecord>> {
    let rows = sqlx::query_as::<_, CardiacRiskRecord>(
        r#"
        SELECT
            patient_id,
            age,
            cholesterol,
            pressure,
            risk
        FROM cardiac_risk
        ORDER BY patient_id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn get_record(pool: &PgPool, patient_id: i32) -> Result<Option<CardiacRiskRecord>> {
    let row = sqlx::query_as::<_, CardiacRiskRecord>(
        r#"
        SELECT
            patient_id,
            age,
            cholesterol,
            pressure,
            risk
        FROM cardiac_risk
        WHERE patient_id = $1
        "#,
    )
    .bind(patient_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Insert a record, overwriting any existing row with the same `patient_id`.
/// `loaded_at` tracks when the row last entered the store.
pub async fn upsert_record(
    pool: &PgPool,
    r: &CardiacRiskRecord,
    loaded_at: OffsetDateTime,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO cardiac_risk
            (patient_id, age, cholesterol, pressure, risk, loaded_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (patient_id) DO UPDATE SET
            age = EXCLUDED.age,
            cholesterol = EXCLUDED.cholesterol,
            pressure = EXCLUDED.pressure,
            risk = EXCLUDED.risk,
            loaded_at = EXCLUDED.loaded_at
        "#,
    )
    .bind(r.patient_id)
    .bind(r.age)
    .bind(r.cholesterol)
    .bind(r.pressure)
    .bind(&r.risk)
    .bind(loaded_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Update an existing record. Returns false when no row matched.
pub async fn update_record(pool: &PgPool, r: &CardiacRiskRecord) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE cardiac_risk SET
            age = $2,
            cholesterol = $3,
            pressure = $4,
            risk = $5
        WHERE patient_id = $1
        "#,
    )
    .bind(r.patient_id)
    .bind(r.age)
    .bind(r.cholesterol)
    .bind(r.pressure)
    .bind(&r.risk)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a record. Returns false when no row matched.
pub async fn delete_record(pool: &PgPool, patient_id: i32) -> Result<bool> {
    let result = sqlx::query("DELETE FROM cardiac_risk WHERE patient_id = $1")
        .bind(patient_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
