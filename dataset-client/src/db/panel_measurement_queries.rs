use anyhow::Result;
use sqlx::PgPool;

use crate::domain::PanelMeasurement;

/// Fetch every persisted panel sample, ordered for reproducible output.
pub async fn list_measurements(pool: &PgPool) -> Result<Vec<PanelMeasurement>> {
    let rows = sqlx::query_as::<_, PanelMeasurement>(
        r#"
        SELECT
            panel_id,
            hour,
            irradiance_w_per_m2,
            temperature_c,
            power_kw
        FROM solar_panel_performance
        ORDER BY panel_id, hour
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn get_measurement(pool: &PgPool, panel_id: i32) -> Result<Option<PanelMeasurement>> {
    let row = sqlx::query_as::<_, PanelMeasurement>(
        r#"
        SELECT
            panel_id,
            hour,
            irradiance_w_per_m2,
            temperature_c,
            power_kw
        FROM solar_panel_performance
        WHERE panel_id = $1
        "#,
    )
    .bind(panel_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Insert a sample, overwriting any existing row with the same `panel_id`.
pub async fn upsert_measurement(pool: &PgPool, m: &PanelMeasurement) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO solar_panel_performance
            (panel_id, hour, irradiance_w_per_m2, temperature_c, power_kw)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (panel_id) DO UPDATE SET
            hour = EXCLUDED.hour,
            irradiance_w_per_m2 = EXCLUDED.irradiance_w_per_m2,
            temperature_c = EXCLUDED.temperature_c,
            power_kw = EXCLUDED.power_kw
        "#,
    )
    .bind(m.panel_id)
    .bind(m.hour)
    .bind(m.irradiance_w_per_m2)
    .bind(m.temperature_c)
    .bind(m.power_kw)
    .execute(pool)
    .await?;

    Ok(())
}

/// Update an existing sample. Returns false when no row matched.
pub async fn update_measurement(pool: &PgPool, m: &PanelMeasurement) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE solar_panel_performance SET
            hour = $2,
            irradiance_w_per_m2 = $3,
            temperature_c = $4,
            power_kw = $5
        WHERE panel_id = $1
        "#,
    )
    .bind(m.panel_id)
    .bind(m.hour)
    .bind(m.irradiance_w_per_m2)
    .bind(m.temperature_c)
    .bind(m.power_kw)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a sample. Returns false when no row matched.
pub async fn delete_measurement(pool: &PgPool, panel_id: i32) -> Result<bool> {
    let result = sqlx::query("DELETE FROM solar_panel_performance WHERE panel_id = $1")
        .bind(panel_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
