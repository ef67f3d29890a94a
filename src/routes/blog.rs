use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    models::blog::{CreateBlogPostRequest, UpdateBlogPostRequest},
    routes::{internal, not_found, rejected, to_json, ApiResult},
    services::blog::BlogService,
    AppState,
};

pub async fn list_published(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let posts = BlogService::list_published(&state.db).await.map_err(internal)?;
    to_json(posts)
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<Value>> {
    let post = BlogService::get_published_by_slug(&state.db, &slug)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("Yazı bulunamadı"))?;
    to_json(post)
}

pub async fn list_all(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let posts = BlogService::list_all(&state.db).await.map_err(internal)?;
    to_json(posts)
}

pub async fn create_post(
    State(state): State<AppState>,
    Json(body): Json<CreateBlogPostRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let post = BlogService::create(&state.db, &body).await.map_err(rejected)?;
    Ok((StatusCode::CREATED, to_json(post)?))
}

pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateBlogPostRequest>,
) -> ApiResult<Json<Value>> {
    let post = BlogService::update(&state.db, id, &body)
        .await
        .map_err(rejected)?
        .ok_or_else(|| not_found("Yazı bulunamadı"))?;
    to_json(post)
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !BlogService::delete(&state.db, id).await.map_err(internal)? {
        return Err(not_found("Yazı bulunamadı"));
    }
    Ok(StatusCode::NO_CONTENT)
}
