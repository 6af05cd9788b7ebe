use std::time::Duration;

use dataset_client::domain::CardiacRiskRecord;
use futures::StreamExt;
use sqlx::{postgres::PgPool, Postgres, QueryBuilder};

use crate::pipeline::{Envelope, PipelineError, Sink};
use crate::sinks::dedupe_last_by_key;

/// Batched Postgres sink for cardiac risk records.
///
/// Duplicate `patient_id` rows overwrite. The envelope timestamp is persisted
/// as `loaded_at` so reloads are traceable.
pub struct PgCardiacRiskSink {
    pool: PgPool,
    batch_size: usize,
    max_retries: u32,
    retry_backoff: Duration,
}

impl PgCardiacRiskSink {
    pub fn new(pool: PgPool, batch_size: usize, max_retries: u32, retry_backoff: Duration) -> Self {
        Self {
            pool,
            batch_size,
            max_retries,
            retry_backoff,
        }
    }

    async fn flush_batch(&self, batch: &[Envelope<CardiacRiskRecord>]) -> Result<(), PipelineError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut attempt: u32 = 0;
        loop {
            let res = self.insert_batch(batch).await;
            match res {
                Ok(()) => {
                    let counter = metrics::counter!("cardiac_risk_ingested_records_total");
                    counter.increment(batch.len() as u64);
                    return Ok(());
                }
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    let sleep_for = self.retry_backoff * attempt;
                    tracing::warn!(
                        error = %e,
                        attempt,
                        "cardiac risk sink flush failed, retrying with backoff"
                    );
                    tokio::time::sleep(sleep_for).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "cardiac risk sink flush failed, giving up");
                    metrics::counter!("cardiac_risk_sink_errors_total").increment(1);
                    return Err(PipelineError::Sink(e.to_string()));
                }
            }
        }
    }

    async fn insert_batch(&self, batch: &[Envelope<CardiacRiskRecord>]) -> Result<(), sqlx::Error> {
        let rows = dedupe_last_by_key(batch, |r| r.patient_id);

        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO cardiac_risk (patient_id, age, cholesterol, pressure, risk, loaded_at) ",
        );

        builder.push_values(rows, |mut b, env| {
            let r = &env.payload;
            b.push_bind(r.patient_id)
                .push_bind(r.age)
                .push_bind(r.cholesterol)
                .push_bind(r.pressure)
                .push_bind(&r.risk)
                .push_bind(env.received_at);
        });

        builder.push(
            " ON CONFLICT (patient_id) DO UPDATE SET \
             age = EXCLUDED.age, \
             cholesterol = EXCLUDED.cholesterol, \
             pressure = EXCLUDED.pressure, \
             risk = EXCLUDED.risk, \
             loaded_at = EXCLUDED.loaded_at",
        );

        let query = builder.build();
        query.execute(&self.pool).await.map(|_| ())
    }
}

#[async_trait::async_trait]
impl Sink<CardiacRiskRecord> for PgCardiacRiskSink {
    async fn run<S>(&self, mut input: S) -> Result<(), PipelineError>
    where
        S: futures::Stream<Item = Result<Envelope<CardiacRiskRecord>, PipelineError>>
            + Send
            + Unpin
            + 'static,
    {
        let mut buffer: Vec<Envelope<CardiacRiskRecord>> = Vec::with_capacity(self.batch_size);

        while let Some(item) = input.next().await {
            let env = match item {
                Ok(env) => env,
                Err(e) => {
                    tracing::error!(error = %e, "error in upstream pipeline for PgCardiacRiskSink");
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
