use axum::{extract::State, Json};
use serde_json::Value;

use crate::{
    models::{auth::AuthenticatedUser, patient::Patient},
    routes::{internal, not_found, to_json, ApiResult},
    services::{
        packages::PurchaseService,
        patients::PatientService,
        treatment::{SessionNoteService, TreatmentPlanService},
    },
    AppState,
};

/// Patient record linked to the logged-in user.
async fn own_record(state: &AppState, user: &AuthenticatedUser) -> ApiResult<Patient> {
    PatientService::find_by_user(&state.db, user.user_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("Hasta kaydı bulunamadı"))
}

pub async fn profile(State(state): State<AppState>, user: AuthenticatedUser) -> ApiResult<Json<Value>> {
    to_json(own_record(&state, &user).await?)
}

pub async fn purchases(State(state): State<AppState>, user: AuthenticatedUser) -> ApiResult<Json<Value>> {
    let patient = own_record(&state, &user).await?;
    let items = PurchaseService::list(&state.db, Some(patient.id)).await.map_err(internal)?;
    to_json(items)
}

pub async fn treatment_plans(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<Value>> {
    let patient = own_record(&state, &user).await?;
    let plans = TreatmentPlanService::list_for_patient(&state.db, patient.id)
        .await
        .map_err(internal)?;
    to_json(plans)
}

pub async fn session_notes(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<Value>> {
    let patient = own_record(&state, &user).await?;
    let notes = SessionNoteService::list_for_patient(&state.db, patient.id)
        .await
        .map_err(internal)?;
    to_json(notes)
}
