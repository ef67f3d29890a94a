use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Active,
    Completed,
    Cancelled,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Active => "active",
            PlanStatus::Completed => "completed",
            PlanStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TreatmentPlan {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub therapist_id: Option<Uuid>,
    pub title: String,
    pub diagnosis: Option<String>,
    pub goals: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTreatmentPlanRequest {
    pub patient_id: Uuid,
    /// Ignored for therapists; their own id is used.
    pub therapist_id: Option<Uuid>,
    pub title: String,
    pub diagnosis: Option<String>,
    pub goals: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTreatmentPlanRequest {
    pub title: Option<String>,
    pub diagnosis: Option<String>,
    pub goals: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<PlanStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionNote {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub therapist_id: Option<Uuid>,
    pub treatment_plan_id: Option<Uuid>,
    pub purchase_id: Option<Uuid>,
    pub session_date: NaiveDate,
    pub notes: String,
    pub pain_level: Option<i16>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionNoteRequest {
    pub patient_id: Uuid,
    pub therapist_id: Option<Uuid>,
    pub treatment_plan_id: Option<Uuid>,
    /// Consumes one session of this purchase.
    pub purchase_id: Option<Uuid>,
    pub session_date: NaiveDate,
    pub notes: String,
    pub pain_level: Option<i16>,
}

#[derive(Debug, Deserialize)]
pub struct PatientFilter {
    pub patient_id: Uuid,
}
