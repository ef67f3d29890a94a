use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    middleware::rate_limit::{check_rate_limit, client_ip},
    models::appointment::{AppointmentFilter, CreateAppointmentRequest, UpdateAppointmentRequest},
    routes::{internal, not_found, rejected, to_json, ApiResult},
    services::{appointments::AppointmentService, otp::normalize_phone},
    AppState,
};

/// Public appointment request from the website form.
pub async fn request_appointment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut body): Json<CreateAppointmentRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut redis = state.redis.clone();
    check_rate_limit(&mut redis, &format!("rate:appointment:{}", client_ip(&headers)), 5, 3600)
        .await?;

    body.phone = normalize_phone(&body.phone);
    if body.full_name.trim().is_empty() || body.phone.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Ad soyad ve telefon zorunludur" })),
        ));
    }

    let appointment = AppointmentService::create(&state.db, &body).await.map_err(rejected)?;
    tracing::info!("Appointment request {} received", appointment.id);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "id": appointment.id })),
    ))
}

pub async fn list_appointments(
    State(state): State<AppState>,
    Query(filter): Query<AppointmentFilter>,
) -> ApiResult<Json<Value>> {
    let items = AppointmentService::list(&state.db, filter.status).await.map_err(internal)?;
    to_json(items)
}

pub async fn update_appointment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateAppointmentRequest>,
) -> ApiResult<Json<Value>> {
    let item = AppointmentService::update(&state.db, id, &body)
        .await
        .map_err(rejected)?
        .ok_or_else(|| not_found("Randevu bulunamadı"))?;
    to_json(item)
}

pub async fn delete_appointment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !AppointmentService::delete(&state.db, id).await.map_err(internal)? {
        return Err(not_found("Randevu bulunamadı"));
    }
    Ok(StatusCode::NO_CONTENT)
}
