use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::{
    models::sms::{SmsSettingsView, TestSmsRequest, UpdateSmsSettingsRequest},
    routes::{internal, to_json, ApiResult},
    services::{
        otp::normalize_phone,
        sms::{mask_phone, SmsError, SmsSettingsService},
    },
    AppState,
};

pub async fn get_settings(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let settings = SmsSettingsService::get(&state.db).await.map_err(internal)?;
    to_json(SmsSettingsView::from(settings))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Json(body): Json<UpdateSmsSettingsRequest>,
) -> ApiResult<Json<Value>> {
    if let Some(provider) = body.provider.as_deref() {
        if provider != "netgsm" {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Desteklenmeyen SMS sağlayıcısı" })),
            ));
        }
    }
    let settings = SmsSettingsService::update(&state.db, &body).await.map_err(internal)?;
    tracing::info!("SMS settings updated (enabled: {})", settings.enabled);
    to_json(SmsSettingsView::from(settings))
}

/// Send a test message with the stored settings.
pub async fn send_test(
    State(state): State<AppState>,
    Json(body): Json<TestSmsRequest>,
) -> ApiResult<Json<Value>> {
    let phone = normalize_phone(&body.phone);
    if phone.is_empty() {
        return Err((StatusCode::BAD_REQUEST, Json(json!({ "error": "Telefon numarası gerekli" }))));
    }

    match state.sms.send(&phone, "Fizyoterapi kliniği SMS test mesajı.").await {
        Ok(()) => Ok(Json(json!({ "success": true }))),
        Err(SmsError::NotConfigured) => Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": SmsError::NotConfigured.to_string() })),
        )),
        Err(e) => {
            tracing::warn!("Test SMS to {} failed: {e}", mask_phone(&phone));
            Err((StatusCode::BAD_GATEWAY, Json(json!({ "error": e.to_string() }))))
        }
    }
}
