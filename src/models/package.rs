use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Package {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub session_count: i32,
    pub price: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePackageRequest {
    pub name: String,
    pub description: Option<String>,
    pub session_count: i32,
    pub price: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePackageRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub session_count: Option<i32>,
    pub price: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    Active,
    Completed,
    Cancelled,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Active => "active",
            PurchaseStatus::Completed => "completed",
            PurchaseStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Purchase {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub package_id: Uuid,
    pub sessions_total: i32,
    pub sessions_used: i32,
    pub amount_paid: Decimal,
    pub payment_method: Option<String>,
    pub status: String,
    pub sold_by: Option<Uuid>,
    pub purchased_at: DateTime<Utc>,
}

/// Purchase joined with its package name, for listings.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PurchaseWithPackage {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub package_id: Uuid,
    pub package_name: String,
    pub sessions_total: i32,
    pub sessions_used: i32,
    pub amount_paid: Decimal,
    pub payment_method: Option<String>,
    pub status: String,
    pub purchased_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePurchaseRequest {
    pub patient_id: Uuid,
    pub package_id: Uuid,
    /// Defaults to the package price.
    pub amount_paid: Option<Decimal>,
    pub payment_method: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePurchaseRequest {
    pub amount_paid: Option<Decimal>,
    pub payment_method: Option<String>,
    pub status: Option<PurchaseStatus>,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseFilter {
    pub patient_id: Option<Uuid>,
}
