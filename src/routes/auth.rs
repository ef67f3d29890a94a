use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::{
    middleware::rate_limit::check_rate_limit,
    models::{
        auth::AuthenticatedUser,
        otp::{OtpResponse, SendCodeRequest, VerifyCodeRequest},
        user::LoginRequest,
    },
    routes::{internal, not_found, to_json, ApiResult},
    services::{
        auth::AuthService,
        otp::{normalize_phone, OtpError, CODE_TTL_MINUTES},
    },
    AppState,
};

/// Staff login (admin, therapist, receptionist).
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Json<Value>> {
    // Rate limit: 5 attempts per 15 min per username
    let rate_key = format!("rate:login:{}", body.username.trim().to_lowercase());
    let mut redis = state.redis.clone();
    check_rate_limit(&mut redis, &rate_key, 5, 900).await?;

    match AuthService::login(
        &state.db,
        &body.username,
        &body.password,
        &state.config.jwt_secret,
        state.config.jwt_expiry_seconds,
    )
    .await
    {
        Ok(res) => to_json(res),
        Err(e) if e.downcast_ref::<sqlx::Error>().is_some() => Err(internal(e)),
        Err(e) => Err((StatusCode::UNAUTHORIZED, Json(json!({ "error": e.to_string() })))),
    }
}

pub async fn me(State(state): State<AppState>, user: AuthenticatedUser) -> ApiResult<Json<Value>> {
    let profile = AuthService::profile(&state.db, user.user_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("Kullanıcı bulunamadı"))?;
    to_json(profile)
}

fn otp_failure(e: OtpError) -> (StatusCode, Json<OtpResponse>) {
    let status = match &e {
        OtpError::NotFound => StatusCode::NOT_FOUND,
        OtpError::ExpiredOrInvalid | OtpError::InvalidCode { .. } => StatusCode::BAD_REQUEST,
        OtpError::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
        OtpError::Store(inner) => {
            tracing::error!("OTP store failure: {inner:#}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (
        status,
        Json(OtpResponse {
            success: false,
            message: e.to_string(),
            outcome: e.outcome(),
            remaining_attempts: e.remaining_attempts(),
            access_token: None,
            user: None,
        }),
    )
}

/// A verified patient whose account is disabled gets a 403 with the reason.
fn patient_login_failure(e: anyhow::Error) -> (StatusCode, Json<Value>) {
    if e.downcast_ref::<sqlx::Error>().is_some() {
        return internal(e);
    }
    (StatusCode::FORBIDDEN, Json(json!({ "error": e.to_string() })))
}

/// Step 1 of patient login: text a code to the phone on file.
pub async fn send_code(
    State(state): State<AppState>,
    Json(body): Json<SendCodeRequest>,
) -> Result<Json<OtpResponse>, (StatusCode, Json<Value>)> {
    let phone = normalize_phone(&body.phone);
    if phone.is_empty() {
        return Err((StatusCode::BAD_REQUEST, Json(json!({ "error": "Telefon numarası gerekli" }))));
    }

    // Rate limit: 3 codes per 10 min per phone
    let mut redis = state.redis.clone();
    check_rate_limit(&mut redis, &format!("rate:otp:send:{phone}"), 3, 600).await?;

    match state.otp.issue_challenge(&phone).await {
        Ok(_) => Ok(Json(OtpResponse {
            success: true,
            message: format!(
                "Doğrulama kodu telefonunuza gönderildi. Kod {CODE_TTL_MINUTES} dakika geçerlidir."
            ),
            outcome: "sent",
            remaining_attempts: None,
            access_token: None,
            user: None,
        })),
        Err(e) => {
            let (status, Json(res)) = otp_failure(e);
            Err((status, Json(json!(res))))
        }
    }
}

/// Step 2 of patient login: check the code and hand out a token.
pub async fn verify_code(
    State(state): State<AppState>,
    Json(body): Json<VerifyCodeRequest>,
) -> Result<Json<OtpResponse>, (StatusCode, Json<Value>)> {
    let phone = normalize_phone(&body.phone);
    if phone.is_empty() || body.code.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Telefon numarası ve kod gerekli" })),
        ));
    }

    // Rate limit: 10 attempts per 15 min per phone
    let mut redis = state.redis.clone();
    check_rate_limit(&mut redis, &format!("rate:otp:verify:{phone}"), 10, 900).await?;

    let verified = match state.otp.verify_challenge(&phone, &body.code).await {
        Ok(v) => v,
        Err(e) => {
            let (status, Json(res)) = otp_failure(e);
            return Err((status, Json(json!(res))));
        }
    };

    let login = AuthService::login_verified_patient(
        &state.db,
        verified.user_id,
        &state.config.jwt_secret,
        state.config.jwt_expiry_seconds,
    )
    .await
    .map_err(patient_login_failure)?;

    Ok(Json(OtpResponse {
        success: true,
        message: "Giriş başarılı.".to_string(),
        outcome: "verified",
        remaining_attempts: None,
        access_token: Some(login.access_token),
        user: Some(login.user),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_map_to_status_and_outcome() {
        let (status, Json(body)) = otp_failure(OtpError::InvalidCode { remaining: 1 });
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.success);
        assert_eq!(body.outcome, "invalid_code");
        assert_eq!(body.remaining_attempts, Some(1));
        assert_eq!(body.message, "Geçersiz kod. 1 deneme hakkınız kaldı.");

        let (status, Json(body)) = otp_failure(OtpError::TooManyAttempts);
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body.outcome, "too_many_attempts");

        let (status, Json(body)) = otp_failure(OtpError::Store(anyhow::anyhow!("connection refused")));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.message.contains("connection"));
    }

    #[test]
    fn disabled_patient_account_is_forbidden_not_internal() {
        let (status, Json(body)) = patient_login_failure(anyhow::anyhow!("Hesap devre dışı"));
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Hesap devre dışı");

        let (status, _) = patient_login_failure(sqlx::Error::PoolTimedOut.into());
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
