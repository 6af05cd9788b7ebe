mod cardiac_risk;
mod panel_measurement;

pub use cardiac_risk::CardiacRiskRecord;
pub use panel_measurement::PanelMeasurement;
