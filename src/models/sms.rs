use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SmsSettings {
    pub provider: String,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub sender_id: Option<String>,
    pub enabled: bool,
    pub updated_at: DateTime<Utc>,
}

impl SmsSettings {
    /// Credentials usable for sending, if the provider is enabled and complete.
    pub fn credentials(&self) -> Option<(&str, &str, &str)> {
        if !self.enabled {
            return None;
        }
        let username = self.username.as_deref().filter(|s| !s.is_empty())?;
        let password = self.password.as_deref().filter(|s| !s.is_empty())?;
        let sender = self.sender_id.as_deref().filter(|s| !s.is_empty())?;
        Some((username, password, sender))
    }
}

/// Admin view; the password is never echoed back.
#[derive(Debug, Serialize)]
pub struct SmsSettingsView {
    pub provider: String,
    pub username: Option<String>,
    pub password_set: bool,
    pub sender_id: Option<String>,
    pub enabled: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<SmsSettings> for SmsSettingsView {
    fn from(s: SmsSettings) -> Self {
        Self {
            password_set: s.password.as_deref().is_some_and(|p| !p.is_empty()),
            provider: s.provider,
            username: s.username,
            sender_id: s.sender_id,
            enabled: s.enabled,
            updated_at: s.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateSmsSettingsRequest {
    pub provider: Option<String>,
    pub username: Option<String>,
    /// Omitted or empty keeps the stored password.
    pub password: Option<String>,
    pub sender_id: Option<String>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct TestSmsRequest {
    pub phone: String,
}
