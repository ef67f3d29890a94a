use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct FunnelQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StageCount {
    pub lead_status: String,
    pub count: i64,
}

/// Registrations → sales conversion over a date range.
#[derive(Debug, Clone, Serialize)]
pub struct FunnelStats {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub registrations: i64,
    pub stages: Vec<StageCount>,
    pub sales: i64,
    pub converted_patients: i64,
    pub conversion_rate: f64,
}
