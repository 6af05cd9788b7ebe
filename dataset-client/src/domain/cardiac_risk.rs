/// One patient record from the cardiac risk dataset.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CardiacRiskRecord {
    pub patient_id: i32,
    pub age: i32,
    pub cholesterol: f64,
    pub pressure: f64,
    pub risk: String,
}
