use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    models::{
        auth::AuthenticatedUser,
        package::{
            CreatePackageRequest, CreatePurchaseRequest, PurchaseFilter, UpdatePackageRequest,
            UpdatePurchaseRequest,
        },
    },
    routes::{internal, not_found, rejected, to_json, ApiResult},
    services::packages::{PackageService, PurchaseService},
    AppState,
};

// ─── Packages ────────────────────────────────────────────────────────────────

/// Public price list: active packages only.
pub async fn list_active(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let packages = PackageService::list(&state.db, true).await.map_err(internal)?;
    to_json(packages)
}

pub async fn list_packages(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let packages = PackageService::list(&state.db, false).await.map_err(internal)?;
    to_json(packages)
}

pub async fn create_package(
    State(state): State<AppState>,
    Json(body): Json<CreatePackageRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let package = PackageService::create(&state.db, &body).await.map_err(rejected)?;
    Ok((StatusCode::CREATED, to_json(package)?))
}

pub async fn update_package(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdatePackageRequest>,
) -> ApiResult<Json<Value>> {
    let package = PackageService::update(&state.db, id, &body)
        .await
        .map_err(rejected)?
        .ok_or_else(|| not_found("Paket bulunamadı"))?;
    to_json(package)
}

pub async fn delete_package(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !PackageService::delete(&state.db, id).await.map_err(internal)? {
        return Err(not_found("Paket bulunamadı"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ─── Purchases ───────────────────────────────────────────────────────────────

pub async fn list_purchases(
    State(state): State<AppState>,
    Query(filter): Query<PurchaseFilter>,
) -> ApiResult<Json<Value>> {
    let purchases = PurchaseService::list(&state.db, filter.patient_id)
        .await
        .map_err(internal)?;
    to_json(purchases)
}

/// Record a package sale. The patient's lead is marked converted.
pub async fn create_purchase(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreatePurchaseRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let purchase = PurchaseService::create(&state.db, &body, user.user_id)
        .await
        .map_err(rejected)?;
    tracing::info!(
        "Purchase {} of package {} for patient {} sold by {}",
        purchase.id,
        purchase.package_id,
        purchase.patient_id,
        user.user_id
    );
    Ok((StatusCode::CREATED, to_json(purchase)?))
}

pub async fn update_purchase(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdatePurchaseRequest>,
) -> ApiResult<Json<Value>> {
    let purchase = PurchaseService::update(&state.db, id, &body)
        .await
        .map_err(rejected)?
        .ok_or_else(|| not_found("Satış bulunamadı"))?;
    to_json(purchase)
}

pub async fn delete_purchase(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !PurchaseService::delete(&state.db, id).await.map_err(internal)? {
        return Err(not_found("Satış bulunamadı"));
    }
    Ok(StatusCode::NO_CONTENT)
}
