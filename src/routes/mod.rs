pub mod appointments;
pub mod auth;
pub mod blog;
pub mod clinical;
pub mod contact;
pub mod crm;
pub mod health;
pub mod packages;
pub mod patient_portal;
pub mod patients;
pub mod sms_settings;
pub mod testimonials;
pub mod therapist_portal;
pub mod therapists;
pub mod users;

use axum::{http::StatusCode, Json};
use serde_json::{json, Value};

pub type ApiError = (StatusCode, Json<Value>);
pub type ApiResult<T> = Result<T, ApiError>;

/// Log the full error server-side, answer with a generic message.
pub(crate) fn internal(e: anyhow::Error) -> ApiError {
    tracing::error!("request failed: {e:#}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Bir hata oluştu. Lütfen tekrar deneyin." })),
    )
}

/// Validation messages raised by services go back to the caller;
/// database errors are treated as internal.
pub(crate) fn rejected(e: anyhow::Error) -> ApiError {
    if e.downcast_ref::<sqlx::Error>().is_some() {
        return internal(e);
    }
    (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() })))
}

pub(crate) fn not_found(msg: &str) -> ApiError {
    (StatusCode::NOT_FOUND, Json(json!({ "error": msg })))
}

pub(crate) fn forbidden() -> ApiError {
    (StatusCode::FORBIDDEN, Json(json!({ "error": "Erişim reddedildi" })))
}

pub(crate) fn to_json<T: serde::Serialize>(value: T) -> ApiResult<Json<Value>> {
    serde_json::to_value(value)
        .map(Json)
        .map_err(|e| internal(e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_errors_are_not_echoed() {
        let (status, Json(body)) = rejected(anyhow::Error::from(sqlx::Error::RowNotFound));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body["error"].as_str().unwrap().contains("no rows"));

        let (status, Json(body)) = rejected(anyhow::anyhow!("Puan 1 ile 5 arasında olmalıdır"));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Puan 1 ile 5 arasında olmalıdır");
    }
}
