use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    models::{crm::FunnelQuery, patient::UpdateLeadStatusRequest},
    routes::{internal, not_found, to_json, ApiResult},
    services::{crm::CrmService, patients::PatientService},
    AppState,
};

/// `GET /api/crm/funnel?from=YYYY-MM-DD&to=YYYY-MM-DD`
pub async fn funnel(
    State(state): State<AppState>,
    Query(q): Query<FunnelQuery>,
) -> ApiResult<Json<Value>> {
    if let (Some(from), Some(to)) = (q.from, q.to) {
        if from > to {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Başlangıç tarihi bitiş tarihinden sonra olamaz" })),
            ));
        }
    }
    let stats = CrmService::funnel(&state.db, q.from, q.to).await.map_err(internal)?;
    to_json(stats)
}

pub async fn set_lead_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateLeadStatusRequest>,
) -> ApiResult<Json<Value>> {
    let patient = PatientService::set_lead_status(&state.db, id, body.lead_status)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("Hasta bulunamadı"))?;
    tracing::info!("Patient {id} moved to {}", body.lead_status.as_str());
    to_json(patient)
}
