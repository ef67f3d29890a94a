use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    middleware::rate_limit::{check_rate_limit, client_ip},
    models::contact::ContactRequest,
    routes::{internal, not_found, rejected, to_json, ApiResult},
    services::contact::ContactService,
    AppState,
};

pub async fn submit_contact(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ContactRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    // Rate limit by IP: max 5 requests per hour
    let rate_limit_key = format!("rate:contact:{}", client_ip(&headers));
    let mut redis = state.redis.clone();
    check_rate_limit(&mut redis, &rate_limit_key, 5, 3600).await?;

    if payload.full_name.trim().is_empty() || payload.message.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Ad ve mesaj alanları zorunludur" })),
        ));
    }

    ContactService::create(&state.db, &payload).await.map_err(rejected)?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true }))))
}

pub async fn list_messages(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let messages = ContactService::list(&state.db).await.map_err(internal)?;
    to_json(messages)
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    if !ContactService::mark_read(&state.db, id).await.map_err(internal)? {
        return Err(not_found("Mesaj bulunamadı"));
    }
    Ok(Json(json!({ "success": true })))
}

pub async fn delete_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !ContactService::delete(&state.db, id).await.map_err(internal)? {
        return Err(not_found("Mesaj bulunamadı"));
    }
    Ok(StatusCode::NO_CONTENT)
}
