use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::user::UserProfile;

/// One issued code. `verified = true` means consumed, exhausted or superseded.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OtpChallenge {
    pub id: i64,
    pub phone: String,
    pub code: String,
    pub attempts: i32,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl OtpChallenge {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.verified && self.expires_at > now
    }
}

#[derive(Debug, Clone)]
pub struct NewChallenge {
    pub phone: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// The part of a patient record the OTP flow needs.
#[derive(Debug, Clone, FromRow)]
pub struct PatientLink {
    pub id: Uuid,
    pub full_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewPatientUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub phone: String,
}

/// Successful verification result.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedPatient {
    pub patient_id: Uuid,
    pub user_id: Uuid,
    pub user_created: bool,
}

#[derive(Debug, Deserialize)]
pub struct SendCodeRequest {
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub phone: String,
    pub code: String,
}

/// Body returned by both OTP endpoints.
#[derive(Debug, Serialize)]
pub struct OtpResponse {
    pub success: bool,
    pub message: String,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_attempts: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}
