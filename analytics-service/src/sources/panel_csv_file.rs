use std::{fs::File, path::PathBuf};

use csv::StringRecord;
use dataset_client::domain::PanelMeasurement;
use futures::Stream;

use crate::pipeline::{Envelope, PipelineError, Source};

/// CSV file source for hourly panel performance samples.
///
/// Expected header columns (by name):
/// - panel_id
/// - hour
/// - irradiance_w_per_m2
/// - temperature_c
/// - power_kw
pub struct PanelCsvFileSource {
    path: PathBuf,
}

impl PanelCsvFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

fn record_to_measurement(
    record: &StringRecord,
    headers: &StringRecord,
) -> Result<PanelMeasurement, PipelineError> {
    let get = |name: &str| -> Result<&str, PipelineError> {
        headers
            .iter()
            .position(|h| h == name)
            .and_then(|idx| record.get(idx))
            .ok_or_else(|| PipelineError::Source(format!("missing column '{name}' in CSV record")))
    };

    let panel_id_str = get("panel_id")?;
    let panel_id: i32 = panel_id_str
        .trim()
        .parse()
        .map_err(|e| PipelineError::Source(format!("invalid panel_id '{panel_id_str}': {e}")))?;

    let hour_str = get("hour")?;
    let hour: i32 = hour_str
        .trim()
        .parse()
        .map_err(|e| PipelineError::Source(format!("invalid hour '{hour_str}': {e}")))?;

    let irradiance_str = get("irradiance_w_per_m2")?;
    let irradiance_w_per_m2: f64 = irradiance_str.trim().parse().map_err(|e| {
        PipelineError::Source(format!("invalid irradiance_w_per_m2 '{irradiance_str}': {e}"))
    })?;

    let temperature_str = get("temperature_c")?;
    let temperature_c: f64 = temperature_str
        .trim()
        .parse()
        .map_err(|e| PipelineError::Source(format!("invalid temperature_c '{temperature_str}': {e}")))?;

    let power_str = get("power_kw")?;
    let power_kw: f64 = power_str
        .trim()
        .parse()
        .map_err(|e| PipelineError::Source(format!("invalid power_kw '{power_str}': {e}")))?;

    Ok(PanelMeasurement {
        panel_id,
        hour,
        irradiance_w_per_m2,
        temperature_c,
        power_kw,
    })
}

#[async_trait::async_trait]
impl Source<PanelMeasurement> for PanelCsvFileSource {
    async fn stream(
        &self,
    ) -> std::pin::Pin<Box<dyn Stream<Item = Result<Envelope<PanelMeasurement>, PipelineError>> + Send>>
    {
        // This source uses a blocking CSV reader but is wrapped in a single async task.
        // For large files, you might want to move this onto a dedicated thread pool.
        let path = self.path.clone();
        let s = async_stream::try_stream! {
            let file = File::open(&path)
                .map_err(|e| PipelineError::Source(format!("failed to open CSV file: {e}")))?;
            let mut rdr = csv::Reader::from_reader(file);
            let headers = rdr
                .headers()
                .map_err(|e| PipelineError::Source(format!("failed to read CSV headers: {e}")))?
                .clone();

            for result in rdr.records() {
                let record = result.map_err(|e| PipelineError::Source(format!(
                    "failed to read CSV record: {e}"
                )))?;

                let measurement = match record_to_measurement(&record, &headers) {
                    Ok(m) => m,
                    Err(e) => {
                        metrics::counter!("panel_csv_parse_errors_total").increment(1);
                        Err(e)?
                    }
                };

                yield Envelope::now(measurement);
            }
        };

        Box::pin(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_rows(csv: &str) -> Vec<Result<PanelMeasurement, PipelineError>> {
        let mut rdr = csv::Reader::from_reader(csv.as_bytes());
        let headers = rdr.headers().unwrap().clone();
        rdr.records()
            .map(|r| record_to_measurement(&r.unwrap(), &headers))
            .collect()
    }

    #[test]
    fn parses_well_formed_rows() {
        let rows = parse_rows(
            "panel_id,hour,irradiance_w_per_m2,temperature_c,power_kw\n1,12,800,25,6\n",
        );

        let m = rows[0].as_ref().unwrap();
        assert_eq!(m.panel_id, 1);
        assert_eq!(m.hour, 12);
        assert_eq!(m.irradiance_w_per_m2, 800.0);
        assert_eq!(m.power_kw, 6.0);
    }

    #[test]
    fn rejects_row_with_missing_column() {
        let rows = parse_rows("panel_id,hour,temperature_c,power_kw\n1,12,25,6\n");
        assert!(matches!(rows[0], Err(PipelineError::Source(_))));
    }
}
