use analytics_service::{
    config::AppConfig,
    observability,
    pipeline::Pipeline,
    sinks::PgCardiacRiskSink,
    sources::CardiacCsvFileSource,
};
use anyhow::{bail, Result};
use dataset_client::domain::CardiacRiskRecord;
use sqlx::postgres::PgPoolOptions;
use std::{env, path::Path, time::Duration};

/// Bulk-load the cardiac risk CSV into Postgres. The file path can be given
/// as the first argument, otherwise the configured path is used. A missing
/// file aborts the whole run before anything is inserted; a malformed row
/// fails only that row.
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    let args: Vec<String> = env::args().collect();
    let file_path = match args.get(1) {
        Some(p) => p.clone(),
        None => cfg.cardiac_data.csv_path.display().to_string(),
    };

    if !Path::new(&file_path).exists() {
        bail!("cardiac risk CSV not found at: {file_path}");
    }

    tracing::info!(path = %file_path, "loading cardiac risk data");

    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&cfg.database.uri)
        .await?;

    let sink = PgCardiacRiskSink::new(
        pool,
        cfg.sink.batch_size,
        cfg.sink.max_retries,
        Duration::from_millis(cfg.sink.retry_backoff_ms),
    );

    let source = CardiacCsvFileSource::new(&file_path);

    // No validation transform: the dataset is loaded as exported, and only
    // rows missing one of the five fields are rejected at parse time.
    let pipeline: Pipeline<_, CardiacRiskRecord, _> = Pipeline {
        source,
        transforms: vec![],
        sink,
    };

    pipeline.run().await?;

    tracing::info!("cardiac risk data loaded");
    Ok(())
}
