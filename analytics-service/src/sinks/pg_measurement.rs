use std::time::Duration;

use dataset_client::domain::PanelMeasurement;
use futures::StreamExt;
use sqlx::{postgres::PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::pipeline::{Envelope, PipelineError, Sink};
use crate::sinks::dedupe_last_by_key;

/// Batched Postgres sink for panel performance samples.
///
/// Rows sharing a `panel_id` overwrite each other: within a batch the last
/// occurrence wins, across batches the upsert wins.
pub struct PgMeasurementSink {
    pool: PgPool,
    batch_size: usize,
    max_retries: u32,
    retry_backoff: Duration,
}

impl PgMeasurementSink {
    pub fn new(pool: PgPool, batch_size: usize, max_retries: u32, retry_backoff: Duration) -> Self {
        Self {
            pool,
            batch_size,
            max_retries,
            retry_backoff,
        }
    }

    async fn flush_batch(&self, batch: &[Envelope<PanelMeasurement>]) -> Result<(), PipelineError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut attempt: u32 = 0;
        loop {
            let res = self.insert_batch(batch).await;
            match res {
                Ok(()) => {
                    let counter = metrics::counter!("panel_measurement_ingested_records_total");
                    counter.increment(batch.len() as u64);

                    // Approximate end-to-end latency from earliest received_at to now.
                    if let Some(min_received) = batch.iter().map(|e| e.received_at).min() {
                        let lag = (OffsetDateTime::now_utc() - min_received).as_seconds_f64();
                        if lag >= 0.0 {
                            let hist = metrics::histogram!("load_end_to_end_latency_seconds");
                            hist.record(lag);
                        }
                    }

                    return Ok(());
                }
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    let sleep_for = self.retry_backoff * attempt;
                    tracing::warn!(
                        error = %e,
                        attempt,
                        "panel measurement sink flush failed, retrying with backoff"
                    );
                    tokio::time::sleep(sleep_for).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "panel measurement sink flush failed, giving up");
                    metrics::counter!("panel_measurement_sink_errors_total").increment(1);
                    return Err(PipelineError::Sink(e.to_string()));
                }
            }
        }
    }

    async fn insert_batch(&self, batch: &[Envelope<PanelMeasurement>]) -> Result<(), sqlx::Error> {
        let rows = dedupe_last_by_key(batch, |m| m.panel_id);

        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO solar_panel_performance (panel_id, hour, irradiance_w_per_m2, temperature_c, power_kw) ",
        );

        builder.push_values(rows, |mut b, env| {
            let m = &env.payload;
            b.push_bind(m.panel_id)
                .push_bind(m.hour)
                .push_bind(m.irradiance_w_per_m2)
                .push_bind(m.temperature_c)
                .push_bind(m.power_kw);
        });

        builder.push(
            " ON CONFLICT (panel_id) DO UPDATE SET \
             hour = EXCLUDED.hour, \
             irradiance_w_per_m2 = EXCLUDED.irradiance_w_per_m2, \
             temperature_c = EXCLUDED.temperature_c, \
             power_kw = EXCLUDED.power_kw",
        );

        let query = builder.build();
        query.execute(&self.pool).await.map(|_| ())
    }
}

#[async_trait::async_trait]
impl Sink<PanelMeasurement> for PgMeasurementSink {
    async fn run<S>(&self, mut input: S) -> Result<(), PipelineError>
    where
        S: futures::Stream<Item = Result<Envelope<PanelMeasurement>, PipelineError>>
            + Send
            + Unpin
            + 'static,
    {
        let mut buffer: Vec<Envelope<PanelMeasurement>> = Vec::with_capacity(self.batch_size);

        while let Some(item) = input.next().await {
            let env = match item {
                Ok(env) => env,
                Err(e) => {
                    tracing::error!(error = %e, "error in upstream pipeline for PgMeasurementSink");
                    continue;
                }
            };

            buffer.push(env);
            if buffer.len() >= self.batch_size {
                self.flush_batch(&buffer).await?;
                buffer.clear();
            }
        }

        if !buffer.is_empty() {
            self.flush_batch(&buffer).await?;
        }

        Ok(())
    }
}
