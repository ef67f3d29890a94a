use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    models::therapist::{CreateTherapistRequest, UpdateTherapistRequest},
    routes::{internal, not_found, rejected, to_json, ApiResult},
    services::therapists::TherapistService,
    AppState,
};

/// Public "our team" listing.
pub async fn list_team(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let team = TherapistService::list_team(&state.db).await.map_err(internal)?;
    to_json(team)
}

pub async fn list_therapists(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let therapists = TherapistService::list(&state.db).await.map_err(internal)?;
    to_json(therapists)
}

pub async fn create_therapist(
    State(state): State<AppState>,
    Json(body): Json<CreateTherapistRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let therapist = TherapistService::create(&state.db, &body).await.map_err(rejected)?;
    Ok((StatusCode::CREATED, to_json(therapist)?))
}

pub async fn update_therapist(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateTherapistRequest>,
) -> ApiResult<Json<Value>> {
    let therapist = TherapistService::update(&state.db, id, &body)
        .await
        .map_err(rejected)?
        .ok_or_else(|| not_found("Terapist bulunamadı"))?;
    to_json(therapist)
}

pub async fn delete_therapist(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !TherapistService::delete(&state.db, id).await.map_err(internal)? {
        return Err(not_found("Terapist bulunamadı"));
    }
    Ok(StatusCode::NO_CONTENT)
}
