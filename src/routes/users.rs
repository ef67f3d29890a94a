use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    models::{
        auth::AuthenticatedUser,
        user::{CreateUserRequest, UpdateUserRequest},
    },
    routes::{internal, not_found, rejected, to_json, ApiResult},
    services::users::UserService,
    AppState,
};

pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let users = UserService::list(&state.db).await.map_err(internal)?;
    to_json(users)
}

pub async fn create_user(
    State(state): State<AppState>,
    admin: AuthenticatedUser,
    Json(body): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let user = UserService::create(&state.db, &body).await.map_err(rejected)?;
    tracing::info!("User {} ({}) created by {}", user.id, user.role, admin.user_id);
    Ok((StatusCode::CREATED, to_json(user)?))
}

pub async fn update_user(
    State(state): State<AppState>,
    admin: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateUserRequest>,
) -> ApiResult<Json<Value>> {
    if id == admin.user_id && body.is_active == Some(false) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Kendi hesabınızı devre dışı bırakamazsınız" })),
        ));
    }
    let user = UserService::update(&state.db, id, &body)
        .await
        .map_err(rejected)?
        .ok_or_else(|| not_found("Kullanıcı bulunamadı"))?;
    to_json(user)
}

pub async fn delete_user(
    State(state): State<AppState>,
    admin: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if id == admin.user_id {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Kendi hesabınızı silemezsiniz" })),
        ));
    }
    if !UserService::delete(&state.db, id).await.map_err(internal)? {
        return Err(not_found("Kullanıcı bulunamadı"));
    }
    tracing::info!("User {id} deleted by {}", admin.user_id);
    Ok(StatusCode::NO_CONTENT)
}
