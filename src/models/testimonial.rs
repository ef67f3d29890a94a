use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Testimonial {
    pub id: Uuid,
    pub full_name: String,
    pub content: String,
    pub rating: i16,
    pub treatment: Option<String>,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTestimonialRequest {
    pub full_name: String,
    pub content: String,
    pub rating: i16,
    pub treatment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTestimonialRequest {
    pub full_name: Option<String>,
    pub content: Option<String>,
    pub rating: Option<i16>,
    pub treatment: Option<String>,
    pub approved: Option<bool>,
}
