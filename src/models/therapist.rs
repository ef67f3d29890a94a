use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Therapist {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub full_name: String,
    pub title: Option<String>,
    pub specialization: Option<String>,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public team page entry; contact details stay internal.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TeamMember {
    pub id: Uuid,
    pub full_name: String,
    pub title: Option<String>,
    pub specialization: Option<String>,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTherapistRequest {
    pub user_id: Option<Uuid>,
    pub full_name: String,
    pub title: Option<String>,
    pub specialization: Option<String>,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTherapistRequest {
    pub user_id: Option<Uuid>,
    pub full_name: Option<String>,
    pub title: Option<String>,
    pub specialization: Option<String>,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
}
