use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    models::{
        auth::AuthenticatedUser,
        treatment::{
            CreateSessionNoteRequest, CreateTreatmentPlanRequest, PatientFilter,
            UpdateTreatmentPlanRequest,
        },
        user::UserRole,
    },
    routes::{forbidden, internal, not_found, rejected, to_json, ApiResult},
    services::{
        patients::PatientService,
        therapists::TherapistService,
        treatment::{SessionNoteService, TreatmentPlanService},
    },
    AppState,
};

/// Therapist record of the caller. Admins act on behalf of any therapist and get `None`.
async fn acting_therapist(state: &AppState, user: &AuthenticatedUser) -> ApiResult<Option<Uuid>> {
    if user.role == UserRole::Admin {
        return Ok(None);
    }
    let therapist = TherapistService::find_by_user(&state.db, user.user_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "Terapist kaydı bulunamadı" })),
            )
        })?;
    Ok(Some(therapist.id))
}

/// Therapists only see patients assigned to them.
async fn ensure_patient_access(
    state: &AppState,
    therapist_id: Option<Uuid>,
    patient_id: Uuid,
) -> ApiResult<()> {
    let Some(therapist_id) = therapist_id else {
        return Ok(());
    };
    if PatientService::is_assigned_to(&state.db, patient_id, therapist_id)
        .await
        .map_err(internal)?
    {
        Ok(())
    } else {
        Err(forbidden())
    }
}

// ─── Treatment plans ─────────────────────────────────────────────────────────

pub async fn list_plans(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(filter): Query<PatientFilter>,
) -> ApiResult<Json<Value>> {
    let me = acting_therapist(&state, &user).await?;
    ensure_patient_access(&state, me, filter.patient_id).await?;

    let plans = TreatmentPlanService::list_for_patient(&state.db, filter.patient_id)
        .await
        .map_err(internal)?;
    to_json(plans)
}

pub async fn create_plan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateTreatmentPlanRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let me = acting_therapist(&state, &user).await?;
    ensure_patient_access(&state, me, body.patient_id).await?;

    let plan = TreatmentPlanService::create(&state.db, &body, me.or(body.therapist_id))
        .await
        .map_err(rejected)?;
    Ok((StatusCode::CREATED, to_json(plan)?))
}

pub async fn update_plan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateTreatmentPlanRequest>,
) -> ApiResult<Json<Value>> {
    let me = acting_therapist(&state, &user).await?;
    let existing = TreatmentPlanService::get(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("Tedavi planı bulunamadı"))?;
    ensure_patient_access(&state, me, existing.patient_id).await?;

    let plan = TreatmentPlanService::update(&state.db, id, &body)
        .await
        .map_err(rejected)?
        .ok_or_else(|| not_found("Tedavi planı bulunamadı"))?;
    to_json(plan)
}

pub async fn delete_plan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let me = acting_therapist(&state, &user).await?;
    let existing = TreatmentPlanService::get(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("Tedavi planı bulunamadı"))?;
    ensure_patient_access(&state, me, existing.patient_id).await?;

    TreatmentPlanService::delete(&state.db, id).await.map_err(internal)?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Session notes ───────────────────────────────────────────────────────────

pub async fn list_notes(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(filter): Query<PatientFilter>,
) -> ApiResult<Json<Value>> {
    let me = acting_therapist(&state, &user).await?;
    ensure_patient_access(&state, me, filter.patient_id).await?;

    let notes = SessionNoteService::list_for_patient(&state.db, filter.patient_id)
        .await
        .map_err(internal)?;
    to_json(notes)
}

/// Record a treatment session; consumes one session of the given purchase.
pub async fn create_note(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateSessionNoteRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let me = acting_therapist(&state, &user).await?;
    ensure_patient_access(&state, me, body.patient_id).await?;

    let note = SessionNoteService::create(&state.db, &body, me.or(body.therapist_id))
        .await
        .map_err(rejected)?;
    tracing::info!("Session note {} recorded for patient {}", note.id, note.patient_id);
    Ok((StatusCode::CREATED, to_json(note)?))
}

pub async fn delete_note(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let me = acting_therapist(&state, &user).await?;
    let existing = SessionNoteService::get(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("Seans notu bulunamadı"))?;
    ensure_patient_access(&state, me, existing.patient_id).await?;

    SessionNoteService::delete(&state.db, id).await.map_err(internal)?;
    Ok(StatusCode::NO_CONTENT)
}
