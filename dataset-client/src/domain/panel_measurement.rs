/// One hourly performance sample for one solar panel.
///
/// `panel_id` is the primary key of the persisted table, but CSV input may
/// repeat an id across sampling hours; callers that persist decide how to
/// collapse duplicates.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PanelMeasurement {
    pub panel_id: i32,
    pub hour: i32,
    pub irradiance_w_per_m2: f64,
    pub temperature_c: f64,
    pub power_kw: f64,
}
