use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    models::patient::{CreatePatientRequest, UpdatePatientRequest},
    routes::{internal, not_found, rejected, to_json, ApiResult},
    services::patients::PatientService,
    AppState,
};

pub async fn list_patients(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let patients = PatientService::list(&state.db).await.map_err(internal)?;
    to_json(patients)
}

pub async fn get_patient(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let patient = PatientService::get(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("Hasta bulunamadı"))?;
    to_json(patient)
}

/// Register a patient (walk-in, phone call, web lead). Starts in the `new` stage.
pub async fn create_patient(
    State(state): State<AppState>,
    Json(body): Json<CreatePatientRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let patient = PatientService::create(&state.db, &body).await.map_err(rejected)?;
    Ok((StatusCode::CREATED, to_json(patient)?))
}

pub async fn update_patient(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdatePatientRequest>,
) -> ApiResult<Json<Value>> {
    let patient = PatientService::update(&state.db, id, &body)
        .await
        .map_err(rejected)?
        .ok_or_else(|| not_found("Hasta bulunamadı"))?;
    to_json(patient)
}

pub async fn delete_patient(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !PatientService::delete(&state.db, id).await.map_err(internal)? {
        return Err(not_found("Hasta bulunamadı"));
    }
    Ok(StatusCode::NO_CONTENT)
}
