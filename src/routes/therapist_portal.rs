use axum::{extract::State, Json};
use serde_json::Value;

use crate::{
    models::{auth::AuthenticatedUser, therapist::Therapist},
    routes::{internal, not_found, to_json, ApiResult},
    services::{
        patients::PatientService, therapists::TherapistService, treatment::SessionNoteService,
    },
    AppState,
};

async fn own_record(state: &AppState, user: &AuthenticatedUser) -> ApiResult<Therapist> {
    TherapistService::find_by_user(&state.db, user.user_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("Terapist kaydı bulunamadı"))
}

pub async fn profile(State(state): State<AppState>, user: AuthenticatedUser) -> ApiResult<Json<Value>> {
    to_json(own_record(&state, &user).await?)
}

/// Patients assigned to the logged-in therapist.
pub async fn patients(State(state): State<AppState>, user: AuthenticatedUser) -> ApiResult<Json<Value>> {
    let therapist = own_record(&state, &user).await?;
    let patients = PatientService::list_for_therapist(&state.db, therapist.id)
        .await
        .map_err(internal)?;
    to_json(patients)
}

pub async fn session_notes(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<Value>> {
    let therapist = own_record(&state, &user).await?;
    let notes = SessionNoteService::list_for_therapist(&state.db, therapist.id)
        .await
        .map_err(internal)?;
    to_json(notes)
}
