use std::{fs::File, path::PathBuf};

use csv::StringRecord;
use dataset_client::domain::CardiacRiskRecord;
use futures::Stream;

use crate::pipeline::{Envelope, PipelineError, Source};

/// CSV file source for the cardiac risk dataset.
///
/// The upstream export keeps its original Portuguese header:
/// paciente,idade,colesterol,pressao,risco.
/// A row missing any of the five fields fails as a per-row stream error;
/// there is no further validation on this dataset.
pub struct CardiacCsvFileSource {
    path: PathBuf,
}

impl CardiacCsvFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

fn record_to_cardiac_risk(
    record: &StringRecord,
    headers: &StringRecord,
) -> Result<CardiacRiskRecord, PipelineError> {
    let get = |name: &str| -> Result<&str, PipelineError> {
        headers
            .iter()
            .position(|h| h == name)
            .and_then(|idx| record.get(idx))
            .ok_or_else(|| PipelineError::Source(format!("missing column '{name}' in CSV record")))
    };

    let patient_str = get("paciente")?;
    let patient_id: i32 = patient_str
        .trim()
        .parse()
        .map_err(|e| PipelineError::Source(format!("invalid paciente '{patient_str}': {e}")))?;

    let age_str = get("idade")?;
    let age: i32 = age_str
        .trim()
        .parse()
        .map_err(|e| PipelineError::Source(format!("invalid idade '{age_str}': {e}")))?;

    let cholesterol_str = get("colesterol")?;
    let cholesterol: f64 = cholesterol_str
        .trim()
        .parse()
        .map_err(|e| PipelineError::Source(format!("invalid colesterol '{cholesterol_str}': {e}")))?;

    let pressure_str = get("pressao")?;
    let pressure: f64 = pressure_str
        .trim()
        .parse()
        .map_err(|e| PipelineError::Source(format!("invalid pressao '{pressure_str}': {e}")))?;

    let risk = get("risco")?.trim();
    if risk.is_empty() {
        return Err(PipelineError::Source("empty risco field".to_string()));
    }

    Ok(CardiacRiskRecord {
        patient_id,
        age,
        cholesterol,
        pressure,
        risk: risk.to_string(),
    })
}

#[async_trait::async_trait]
impl Source<CardiacRiskRecord> for CardiacCsvFileSource {
    async fn stream(
        &self,
    ) -> std::pin::Pin<
        Box<dyn Stream<Item = Result<Envelope<CardiacRiskRecord>, PipelineError>> + Send>,
    > {
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

                let risk_record = match record_to_cardiac_risk(&record, &headers) {
                    Ok(r) => r,
                    Err(e) => {
                        metrics::counter!("cardiac_csv_parse_errors_total").increment(1);
                        Err(e)?
                    }
                };

                yield Envelope::now(risk_record);
            }
        };

        Box::pin(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_rows(csv: &str) -> Vec<Result<CardiacRiskRecord, PipelineError>> {
        let mut rdr = csv::Reader::from_reader(csv.as_bytes());
        let headers = rdr.headers().unwrap().clone();
        rdr.records()
            .map(|r| record_to_cardiac_risk(&r.unwrap(), &headers))
            .collect()
    }

    #[test]
    fn parses_well_formed_rows() {
        let rows = parse_rows("paciente,idade,colesterol,pressao,risco\n7,54,233,145,alto\n");

        let r = rows[0].as_ref().unwrap();
        assert_eq!(r.patient_id, 7);
        assert_eq!(r.age, 54);
        assert_eq!(r.cholesterol, 233.0);
        assert_eq!(r.pressure, 145.0);
        assert_eq!(r.risk, "alto");
    }

    #[test]
    fn rejects_row_with_missing_field() {
        let rows = parse_rows("paciente,idade,colesterol,pressao\n7,54,233,145\n");
        assert!(matches!(rows[0], Err(PipelineError::Source(_))));
    }

    #[test]
    fn rejects_non_numeric_age() {
        let rows = parse_rows("paciente,idade,colesterol,pressao,risco\n7,old,233,145,alto\n");
        assert!(matches!(rows[0], Err(PipelineError::Source(_))));
    }
}
