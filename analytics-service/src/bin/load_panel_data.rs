use analytics_service::{
    config::AppConfig,
    observability,
    pipeline::Pipeline,
    sinks::PgMeasurementSink,
    sources::PanelCsvFileSource,
    transform,
};
use anyhow::{bail, Result};
use dataset_client::domain::PanelMeasurement;
use sqlx::postgres::PgPoolOptions;
use std::{env, path::Path, sync::Arc, time::Duration};

/// Bulk-load the hourly solar performance CSV into Postgres so the CRUD API
/// has rows to serve. Duplicate panel ids collapse to the last sample seen.
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    let args: Vec<String> = env::args().collect();
    let file_path = match args.get(1) {
        Some(p) => p.clone(),
        None => cfg.panel_data.csv_path.display().to_string(),
    };

    if !Path::new(&file_path).exists() {
        bail!("panel performance CSV not found at: {file_path}");
    }

    tracing::info!(path = %file_path, "loading panel performance data");

    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&cfg.database.uri)
        .await?;

    let sink = PgMeasurementSink::new(
        pool,
        cfg.sink.batch_size,
        cfg.sink.max_retries,
        Duration::from_millis(cfg.sink.retry_backoff_ms),
    );

    let source = PanelCsvFileSource::new(&file_path);

    let pipeline: Pipeline<_, PanelMeasurement, _> = Pipeline {
        source,
        transforms: vec![Arc::new(transform::PanelMeasurementValidation::default())],
        sink,
    };

    pipeline.run().await?;

    tracing::info!("panel performance data loaded");
    Ok(())
}
