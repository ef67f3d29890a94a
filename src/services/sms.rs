use async_trait::async_trait;
use reqwest::Client;
use sqlx::PgPool;

use crate::models::sms::{SmsSettings, UpdateSmsSettingsRequest};

const NETGSM_SEND_URL: &str = "https://api.netgsm.com.tr/sms/send/get";

#[derive(Debug, thiserror::Error)]
pub enum SmsError {
    #[error("SMS sağlayıcısı yapılandırılmamış")]
    NotConfigured,
    #[error("SMS gönderilemedi: {0}")]
    DeliveryFailed(String),
}

/// Outbound SMS delivery.
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, phone: &str, body: &str) -> Result<(), SmsError>;
}

/// Sends through the provider configured in the `sms_settings` row.
/// Settings are re-read on every send so admin changes apply immediately.
pub struct ClinicSmsSender {
    pool: PgPool,
    client: Client,
}

impl ClinicSmsSender {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl SmsSender for ClinicSmsSender {
    async fn send(&self, phone: &str, body: &str) -> Result<(), SmsError> {
        let settings = SmsSettingsService::get(&self.pool)
            .await
            .map_err(|e| SmsError::DeliveryFailed(format!("settings unavailable: {e}")))?;

        let (username, password, sender) = settings.credentials().ok_or(SmsError::NotConfigured)?;

        if settings.provider != "netgsm" {
            return Err(SmsError::DeliveryFailed(format!(
                "unsupported provider: {}",
                settings.provider
            )));
        }

        let gsm_number = to_gsm_number(phone);
        let res = self
            .client
            .get(NETGSM_SEND_URL)
            .query(&[
                ("usercode", username),
                ("password", password),
                ("gsmno", gsm_number.as_str()),
                ("message", body),
                ("msgheader", sender),
                ("dil", "TR"),
            ])
            .send()
            .await
            .map_err(|e| SmsError::DeliveryFailed(e.to_string()))?;

        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        if !status.is_success() || !netgsm_accepted(&text) {
            return Err(SmsError::DeliveryFailed(format!("netgsm {status}: {}", text.trim())));
        }

        tracing::info!("SMS sent to {}", mask_phone(phone));
        Ok(())
    }
}

/// NetGSM answers "00 <job id>" (or 01/02 for date warnings) on success.
fn netgsm_accepted(body: &str) -> bool {
    matches!(body.split_whitespace().next(), Some("00" | "01" | "02"))
}

/// Convert a local or international Turkish number to the 90XXXXXXXXXX form.
pub fn to_gsm_number(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    match digits.len() {
        10 => format!("90{digits}"),
        11 if digits.starts_with('0') => format!("9{digits}"),
        _ => digits,
    }
}

/// Keep only the last four digits, for logs.
pub fn mask_phone(phone: &str) -> String {
    let visible: String = phone
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("***{visible}")
}

pub struct SmsSettingsService;

impl SmsSettingsService {
    pub async fn get(pool: &PgPool) -> anyhow::Result<SmsSettings> {
        let settings = sqlx::query_as::<_, SmsSettings>(
            "SELECT provider, username, password, sender_id, enabled, updated_at
             FROM sms_settings WHERE id = 1",
        )
        .fetch_one(pool)
        .await?;
        Ok(settings)
    }

    pub async fn update(
        pool: &PgPool,
        req: &UpdateSmsSettingsRequest,
    ) -> anyhow::Result<SmsSettings> {
        let password = req.password.as_deref().filter(|p| !p.is_empty());
        let settings = sqlx::query_as::<_, SmsSettings>(
            "UPDATE sms_settings
             SET provider   = COALESCE($1, provider),
                 username   = COALESCE($2, username),
                 password   = COALESCE($3, password),
                 sender_id  = COALESCE($4, sender_id),
                 enabled    = COALESCE($5, enabled),
                 updated_at = NOW()
             WHERE id = 1
             RETURNING provider, username, password, sender_id, enabled, updated_at",
        )
        .bind(&req.provider)
        .bind(&req.username)
        .bind(password)
        .bind(&req.sender_id)
        .bind(req.enabled)
        .fetch_one(pool)
        .await?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn gsm_number_forms() {
        assert_eq!(to_gsm_number("05326127244"), "905326127244");
        assert_eq!(to_gsm_number("5326127244"), "905326127244");
        assert_eq!(to_gsm_number("+905326127244"), "905326127244");
    }

    #[test]
    fn netgsm_response_codes() {
        assert!(netgsm_accepted("00 123456789"));
        assert!(netgsm_accepted("02 987"));
        assert!(!netgsm_accepted("30"));
        assert!(!netgsm_accepted(""));
    }

    #[test]
    fn masks_all_but_last_four_digits() {
        assert_eq!(mask_phone("05326127244"), "***7244");
        assert_eq!(mask_phone("12"), "***12");
    }

    #[test]
    fn credentials_require_enabled_and_complete_settings() {
        let mut settings = SmsSettings {
            provider: "netgsm".into(),
            username: Some("8502223344".into()),
            password: Some("secret".into()),
            sender_id: Some("KLINIK".into()),
            enabled: false,
            updated_at: Utc::now(),
        };
        assert!(settings.credentials().is_none());

        settings.enabled = true;
        assert_eq!(settings.credentials(), Some(("8502223344", "secret", "KLINIK")));

        settings.password = Some(String::new());
        assert!(settings.credentials().is_none());
    }
}
