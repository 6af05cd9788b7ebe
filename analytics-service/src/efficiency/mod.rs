use std::{io, path::Path};

use csv::StringRecord;
use dataset_client::domain::PanelMeasurement;
use serde::Serialize;

/// Panel surface area assumed when the configuration does not override it.
pub const DEFAULT_PANEL_AREA_M2: f64 = 10.0;

#[derive(Debug, thiserror::Error)]
pub enum EfficiencyError {
    #[error("invalid configuration: panel area must be positive, got {0}")]
    InvalidConfiguration(f64),
    #[error("measurement source not found: {0}")]
    SourceNotFound(String),
    #[error("malformed row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },
}

/// One input sample with its derived quantities.
///
/// `efficiency_ratio` is `None` when the sample had zero incident power;
/// callers see an explicit JSON `null` rather than a silently absent field.
#[derive(Debug, Clone, Serialize)]
pub struct EfficiencyRecord {
    #[serde(flatten)]
    pub measurement: PanelMeasurement,
    pub incident_power_kw: f64,
    pub efficiency_ratio: Option<f64>,
}

/// Computes incident power and conversion efficiency for hourly panel samples.
///
/// The panel area is fixed for the lifetime of the calculator, so every row of
/// one pass is derived against the same surface. The computation is pure: rows
/// go in, a derived table of the same length and order comes out, and nothing
/// is written anywhere.
#[derive(Debug, Clone, Copy)]
pub struct EfficiencyCalculator {
    panel_area_m2: f64,
}

impl EfficiencyCalculator {
    pub fn new(panel_area_m2: f64) -> Result<Self, EfficiencyError> {
        // Rejects NaN as well as zero and negative areas.
        if !(panel_area_m2 > 0.0) {
            return Err(EfficiencyError::InvalidConfiguration(panel_area_m2));
        }
        Ok(Self { panel_area_m2 })
    }

    pub fn panel_area_m2(&self) -> f64 {
        self.panel_area_m2
    }

    /// Derive incident power and efficiency for every sample, in input order.
    ///
    /// A zero-irradiance sample yields an undefined ratio instead of aborting
    /// the batch or faulting on the division.
    pub fn compute(&self, rows: &[PanelMeasurement]) -> Vec<EfficiencyRecord> {
        rows.iter()
            .map(|m| {
                let incident_power_kw = m.irradiance_w_per_m2 * self.panel_area_m2 / 1000.0;
                let efficiency_ratio = if incident_power_kw == 0.0 {
                    None
                } else {
                    Some(m.power_kw / incident_power_kw)
                };
                EfficiencyRecord {
                    measurement: m.clone(),
                    incident_power_kw,
                    efficiency_ratio,
                }
            })
            .collect()
    }
}

/// Read the whole measurement table from a CSV file.
///
/// Expected header columns (by name):
/// - panel_id
/// - hour
/// - irradiance_w_per_m2
/// - temperature_c
/// - power_kw
///
/// A missing file maps to `SourceNotFound`; the first row with a missing or
/// unparseable field aborts the batch with `MalformedRow`.
pub fn load_measurements(path: &Path) -> Result<Vec<PanelMeasurement>, EfficiencyError> {
    let file = std::fs::File::open(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            EfficiencyError::SourceNotFound(path.display().to_string())
        } else {
            EfficiencyError::SourceNotFound(format!("{}: {e}", path.display()))
        }
    })?;
    read_measurements(file)
}

pub fn read_measurements<R: io::Read>(reader: R) -> Result<Vec<PanelMeasurement>, EfficiencyError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| EfficiencyError::MalformedRow {
            row: 0,
            reason: format!("failed to read CSV headers: {e}"),
        })?
        .clone();

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        // 1-based row numbers, counting from the first data row.
        let row = idx + 1;
        let record = result.map_err(|e| EfficiencyError::MalformedRow {
            row,
            reason: e.to_string(),
        })?;
        rows.push(record_to_measurement(&record, &headers, row)?);
    }
    Ok(rows)
}

fn record_to_measurement(
    record: &StringRecord,
    headers: &StringRecord,
    row: usize,
) -> Result<PanelMeasurement, EfficiencyError> {
    let get = |name: &str| -> Result<&str, EfficiencyError> {
        headers
            .iter()
            .position(|h| h == name)
            .and_then(|idx| record.get(idx))
            .ok_or_else(|| EfficiencyError::MalformedRow {
                row,
                reason: format!("missing column '{name}'"),
            })
    };

    let parse_i32 = |name: &str, s: &str| -> Result<i32, EfficiencyError> {
        s.trim().parse().map_err(|e| EfficiencyError::MalformedRow {
            row,
            reason: format!("invalid {name} '{s}': {e}"),
        })
    };
    let parse_f64 = |name: &str, s: &str| -> Result<f64, EfficiencyError> {
        s.trim().parse().map_err(|e| EfficiencyError::MalformedRow {
            row,
            reason: format!("invalid {name} '{s}': {e}"),
        })
    };

    Ok(PanelMeasurement {
        panel_id: parse_i32("panel_id", get("panel_id")?)?,
        hour: parse_i32("hour", get("hour")?)?,
        irradiance_w_per_m2: parse_f64("irradiance_w_per_m2", get("irradiance_w_per_m2")?)?,
        temperature_c: parse_f64("temperature_c", get("temperature_c")?)?,
        power_kw: parse_f64("power_kw", get("power_kw")?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(panel_id: i32, hour: i32, irradiance: f64, power: f64) -> PanelMeasurement {
        PanelMeasurement {
            panel_id,
            hour,
            irradiance_w_per_m2: irradiance,
            temperature_c: 25.0,
            power_kw: power,
        }
    }

    #[test]
    fn derives_incident_power_and_ratio() {
        let calc = EfficiencyCalculator::new(10.0).unwrap();
        let out = calc.compute(&[sample(1, 12, 800.0, 6.0)]);

        assert_eq!(out.len(), 1);
        assert!((out[0].incident_power_kw - 8.0).abs() < 1e-9);
        assert!((out[0].efficiency_ratio.unwrap() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn ratio_matches_closed_form_for_positive_irradiance() {
        let area = 7.3;
        let calc = EfficiencyCalculator::new(area).unwrap();
        let rows = vec![
            sample(1, 6, 120.0, 0.4),
            sample(1, 7, 451.5, 2.1),
            sample(2, 7, 990.25, 5.9),
        ];

        for rec in calc.compute(&rows) {
            let m = &rec.measurement;
            let expected = m.power_kw * 1000.0 / (m.irradiance_w_per_m2 * area);
            assert!((rec.efficiency_ratio.unwrap() - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn zero_irradiance_yields_undefined_ratio() {
        let calc = EfficiencyCalculator::new(10.0).unwrap();
        let out = calc.compute(&[sample(3, 0, 0.0, 0.0)]);

        assert_eq!(out[0].incident_power_kw, 0.0);
        assert!(out[0].efficiency_ratio.is_none());
    }

    #[test]
    fn zero_irradiance_rows_do_not_abort_the_batch() {
        let calc = EfficiencyCalculator::new(10.0).unwrap();
        let rows = vec![
            sample(1, 5, 200.0, 1.0),
            sample(1, 23, 0.0, 0.0),
            sample(1, 6, 400.0, 2.0),
        ];
        let out = calc.compute(&rows);

        assert_eq!(out.len(), 3);
        assert!(out[0].efficiency_ratio.is_some());
        assert!(out[1].efficiency_ratio.is_none());
        assert!(out[2].efficiency_ratio.is_some());
    }

    #[test]
    fn output_preserves_input_order_and_cardinality() {
        let calc = EfficiencyCalculator::new(10.0).unwrap();
        let rows = vec![
            sample(5, 14, 600.0, 4.0),
            sample(2, 9, 300.0, 1.5),
            sample(5, 15, 550.0, 3.8),
            sample(1, 12, 800.0, 6.0),
        ];
        let out = calc.compute(&rows);

        assert_eq!(out.len(), rows.len());
        for (rec, m) in out.iter().zip(&rows) {
            assert_eq!(&rec.measurement, m);
        }
    }

    #[test]
    fn non_positive_or_nan_area_is_rejected() {
        for area in [0.0, -1.0, f64::NAN] {
            assert!(matches!(
                EfficiencyCalculator::new(area),
                Err(EfficiencyError::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn undefined_ratio_serializes_as_null() {
        let calc = EfficiencyCalculator::new(10.0).unwrap();
        let out = calc.compute(&[sample(1, 0, 0.0, 0.0)]);
        let json = serde_json::to_value(&out[0]).unwrap();

        assert_eq!(json["panel_id"], 1);
        assert!(json["efficiency_ratio"].is_null());
    }

    #[test]
    fn reads_measurements_from_csv() {
        let csv = "panel_id,hour,irradiance_w_per_m2,temperature_c,power_kw\n\
                   1,12,800,25,6\n\
                   2,13,0,26.5,0\n";
        let rows = read_measurements(csv.as_bytes()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], sample(1, 12, 800.0, 6.0));
        assert_eq!(rows[1].irradiance_w_per_m2, 0.0);
    }

    #[test]
    fn missing_column_is_a_malformed_row() {
        let csv = "panel_id,hour,temperature_c,power_kw\n1,12,25,6\n";
        let err = read_measurements(csv.as_bytes()).unwrap_err();

        assert!(matches!(err, EfficiencyError::MalformedRow { row: 1, .. }));
    }

    #[test]
    fn non_numeric_field_is_a_malformed_row() {
        let csv = "panel_id,hour,irradiance_w_per_m2,temperature_c,power_kw\n\
                   1,12,800,25,6\n\
                   2,13,bright,25,4\n";
        let err = read_measurements(csv.as_bytes()).unwrap_err();

        match err {
            EfficiencyError::MalformedRow { row, reason } => {
                assert_eq!(row, 2);
                assert!(reason.contains("irradiance_w_per_m2"));
            }
            other => panic!("expected MalformedRow, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_source_not_found() {
        let err = load_measurements(Path::new("/nonexistent/painel_solar.csv")).unwrap_err();
        assert!(matches!(err, EfficiencyError::SourceNotFound(_)));
    }
}
