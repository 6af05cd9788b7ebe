use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use dataset_client::{
    db::{cardiac_risk_queries, panel_measurement_queries},
    domain::{CardiacRiskRecord, PanelMeasurement},
};
use serde::Deserialize;
use sqlx::PgPool;

use crate::efficiency::{EfficiencyCalculator, EfficiencyRecord};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub calculator: EfficiencyCalculator,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/panels", get(list_panels).post(create_panel))
        .route("/panels/efficiency", get(panel_efficiency))
        .route(
            "/panels/:panel_id",
            get(get_panel).put(update_panel).delete(delete_panel),
        )
        .route("/patients", get(list_patients).post(create_patient))
        .route(
            "/patients/:patient_id",
            get(get_patient).put(update_patient).delete(delete_patient),
        )
        .with_state(state)
}

pub enum ApiError {
    NotFound(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound(what) => (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": what })),
            )
                .into_response(),
            Self::Internal(err) => {
                tracing::error!(error = %err, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": "internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Internal(err.into())
    }
}

async fn healthz() -> &'static str {
    "ok"
}

async fn list_panels(
    State(state): State<AppState>,
) -> Result<Json<Vec<PanelMeasurement>>, ApiError> {
    let rows = panel_measurement_queries::list_measurements(&state.pool).await?;
    Ok(Json(rows))
}

/// Run the efficiency pass over every persisted sample and return the derived
/// table. Zero-irradiance rows carry a null `efficiency_ratio`.
async fn panel_efficiency(
    State(state): State<AppState>,
) -> Result<Json<Vec<EfficiencyRecord>>, ApiError> {
    let rows = panel_measurement_queries::list_measurements(&state.pool).await?;
    Ok(Json(state.calculator.compute(&rows)))
}

async fn get_panel(
    State(state): State<AppState>,
    Path(panel_id): Path<i32>,
) -> Result<Json<PanelMeasurement>, ApiError> {
    match panel_measurement_queries::get_measurement(&state.pool, panel_id).await? {
        Some(m) => Ok(Json(m)),
        None => Err(ApiError::NotFound(format!("panel {panel_id} not found"))),
    }
}

async fn create_panel(
    State(state): State<AppState>,
    Json(measurement): Json<PanelMeasurement>,
) -> Result<StatusCode, ApiError> {
    panel_measurement_queries::upsert_measurement(&state.pool, &measurement).await?;
    Ok(StatusCode::CREATED)
}

#[derive(Deserialize)]
struct PanelMeasurementBody {
    hour: i32,
    irradiance_w_per_m2: f64,
    temperature_c: f64,
    power_kw: f64,
}

async fn update_panel(
    State(state): State<AppState>,
    Path(panel_id): Path<i32>,
    Json(body): Json<PanelMeasurementBody>,
) -> Result<StatusCode, ApiError> {
    let measurement = PanelMeasurement {
        panel_id,
        hour: body.hour,
        irradiance_w_per_m2: body.irradiance_w_per_m2,
        temperature_c: body.temperature_c,
        power_kw: body.power_kw,
    };

    if panel_measurement_queries::update_measurement(&state.pool, &measurement).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("panel {panel_id} not found")))
    }
}

async fn delete_panel(
    State(state): State<AppState>,
    Path(panel_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    if panel_measurement_queries::delete_measurement(&state.pool, panel_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("panel {panel_id} not found")))
    }
}

async fn list_patients(
    State(state): State<AppState>,
) -> Result<Json<Vec<CardiacRiskRecord>>, ApiError> {
    let rows = cardiac_risk_queries::list_records(&state.pool).await?;
    Ok(Json(rows))
}

async fn get_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<i32>,
) -> Result<Json<CardiacRiskRecord>, ApiError> {
    match cardiac_risk_queries::get_record(&state.pool, patient_id).await? {
        Some(r) => Ok(Json(r)),
        None => Err(ApiError::NotFound(format!("patient {patient_id} not found"))),
    }
}

async fn create_patient(
    State(state): State<AppState>,
    Json(record): Json<CardiacRiskRecord>,
) -> Result<StatusCode, ApiError> {
    cardiac_risk_queries::upsert_record(&state.pool, &record, time::OffsetDateTime::now_utc())
        .await?;
    Ok(StatusCode::CREATED)
}

#[derive(Deserialize)]
struct CardiacRiskBody {
    age: i32,
    cholesterol: f64,
    pressure: f64,
    risk: String,
}

async fn update_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<i32>,
    Json(body): Json<CardiacRiskBody>,
) -> Result<StatusCode, ApiError> {
    let record = CardiacRiskRecord {
        patient_id,
        age: body.age,
        cholesterol: body.cholesterol,
        pressure: body.pressure,
        risk: body.risk,
    };

    if cardiac_risk_queries::update_record(&state.pool, &record).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("patient {patient_id} not found")))
    }
}

async fn delete_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    if cardiac_risk_queries::delete_record(&state.pool, patient_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("patient {patient_id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let resp = ApiError::NotFound("panel 9 not found".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn internal_maps_to_500() {
        let resp = ApiError::Internal(anyhow::anyhow!("boom")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
