pub mod cardiac_risk_queries;
pub mod panel_measurement_queries;
