use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    middleware::rate_limit::{check_rate_limit, client_ip},
    models::testimonial::{CreateTestimonialRequest, UpdateTestimonialRequest},
    routes::{internal, not_found, rejected, to_json, ApiResult},
    services::testimonials::TestimonialService,
    AppState,
};

pub async fn list_approved(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let items = TestimonialService::list_approved(&state.db).await.map_err(internal)?;
    to_json(items)
}

/// Visitor-submitted review; hidden until an admin approves it.
pub async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateTestimonialRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut redis = state.redis.clone();
    check_rate_limit(&mut redis, &format!("rate:testimonial:{}", client_ip(&headers)), 5, 3600)
        .await?;

    TestimonialService::submit(&state.db, &body).await.map_err(rejected)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": "Yorumunuz onaylandıktan sonra yayınlanacaktır." })),
    ))
}

pub async fn list_all(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let items = TestimonialService::list_all(&state.db).await.map_err(internal)?;
    to_json(items)
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateTestimonialRequest>,
) -> ApiResult<Json<Value>> {
    let item = TestimonialService::update(&state.db, id, &body)
        .await
        .map_err(rejected)?
        .ok_or_else(|| not_found("Yorum bulunamadı"))?;
    to_json(item)
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !TestimonialService::delete(&state.db, id).await.map_err(internal)? {
        return Err(not_found("Yorum bulunamadı"));
    }
    Ok(StatusCode::NO_CONTENT)
}
