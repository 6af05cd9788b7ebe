use crate::pipeline::{Envelope, PipelineError, Transform};
use dataset_client::domain::PanelMeasurement;

/// Pure validation of a `PanelMeasurement` record.
///
/// Rules:
/// - irradiance must be non-negative.
/// - measured power must be non-negative.
/// - the sampling hour must fall in 0..=23.
pub fn validate_measurement(
    env: Envelope<PanelMeasurement>,
) -> Result<Envelope<PanelMeasurement>, PipelineError> {
    let m = &env.payload;

    if m.irradiance_w_per_m2 < 0.0 {
        return Err(PipelineError::Transform(
            "irradiance_w_per_m2 must be non-negative".to_string(),
        ));
    }

    if m.power_kw < 0.0 {
        return Err(PipelineError::Transform(
            "power_kw must be non-negative".to_string(),
        ));
    }

    if !(0..=23).contains(&m.hour) {
        return Err(PipelineError::Transform(
            "hour must fall in 0..=23".to_string(),
        ));
    }

    Ok(env)
}

#[derive(Clone, Default)]
pub struct PanelMeasurementValidation;

#[async_trait::async_trait]
impl Transform<PanelMeasurement, PanelMeasurement> for PanelMeasurementValidation {
    async fn apply(
        &self,
        input: Envelope<PanelMeasurement>,
    ) -> Result<Envelope<PanelMeasurement>, PipelineError> {
        match validate_measurement(input) {
            Ok(env) => Ok(env),
            Err(e) => {
                metrics::counter!("validation_panel_measurement_rejected_total").increment(1);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(hour: i32, irradiance: f64, power: f64) -> Envelope<PanelMeasurement> {
        Envelope::now(PanelMeasurement {
            panel_id: 1,
            hour,
            irradiance_w_per_m2: irradiance,
            temperature_c: 25.0,
            power_kw: power,
        })
    }

    #[test]
    fn validation_accepts_valid_record() {
        let res = validate_measurement(envelope(12, 800.0, 6.0));
        assert!(res.is_ok());
    }

    #[test]
    fn validation_accepts_zero_irradiance() {
        let res = validate_measurement(envelope(0, 0.0, 0.0));
        assert!(res.is_ok());
    }

    #[test]
    fn validation_rejects_negative_irradiance() {
        let res = validate_measurement(envelope(12, -1.0, 6.0));
        assert!(matches!(res, Err(PipelineError::Transform(_))));
    }

    #[test]
    fn validation_rejects_negative_power() {
        let res = validate_measurement(envelope(12, 800.0, -0.5));
        assert!(matches!(res, Err(PipelineError::Transform(_))));
    }

    #[test]
    fn validation_rejects_out_of_range_hour() {
        let res = validate_measurement(envelope(24, 800.0, 6.0));
        assert!(matches!(res, Err(PipelineError::Transform(_))));
    }
}
