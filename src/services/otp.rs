use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::{
    models::otp::{NewChallenge, NewPatientUser, PatientLink, VerifiedPatient},
    services::{
        otp_store::OtpStore,
        sms::{mask_phone, SmsSender},
    },
};

pub const CODE_TTL_MINUTES: i64 = 5;
pub const MAX_ATTEMPTS: i32 = 3;
const CODE_MIN: u32 = 100_000;
const CODE_MAX: u32 = 999_999;

/// Why an OTP request or verification did not succeed. The display text is
/// shown to the patient as-is.
#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    #[error("Bu telefon numarasına kayıtlı hasta bulunamadı.")]
    NotFound,
    #[error("Kodun süresi dolmuş veya geçersiz. Lütfen yeni kod isteyin.")]
    ExpiredOrInvalid,
    #[error("Geçersiz kod. {remaining} deneme hakkınız kaldı.")]
    InvalidCode { remaining: i32 },
    #[error("Çok fazla hatalı deneme. Lütfen yeni kod isteyin.")]
    TooManyAttempts,
    #[error("Bir hata oluştu. Lütfen daha sonra tekrar deneyin.")]
    Store(#[from] anyhow::Error),
}

impl OtpError {
    /// Machine-checkable outcome name.
    pub fn outcome(&self) -> &'static str {
        match self {
            OtpError::NotFound => "not_found",
            OtpError::ExpiredOrInvalid => "expired_or_invalid",
            OtpError::InvalidCode { .. } => "invalid_code",
            OtpError::TooManyAttempts => "too_many_attempts",
            OtpError::Store(_) => "error",
        }
    }

    pub fn remaining_attempts(&self) -> Option<i32> {
        match self {
            OtpError::InvalidCode { remaining } => Some(*remaining),
            _ => None,
        }
    }
}

/// Strip whitespace and dashes: "0532 612-72 44" → "05326127244".
pub fn normalize_phone(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}

/// Uniform over 100000..=999999; no leading zeros.
pub fn generate_code() -> String {
    rand::thread_rng().gen_range(CODE_MIN..=CODE_MAX).to_string()
}

fn synthetic_email(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    format!("{digits}@hasta.local")
}

/// Issues and verifies phone login codes for patients and provisions their
/// user account on first successful verification.
pub struct OtpManager {
    store: Arc<dyn OtpStore>,
    sms: Arc<dyn SmsSender>,
    log_fallback: bool,
}

impl OtpManager {
    pub fn new(store: Arc<dyn OtpStore>, sms: Arc<dyn SmsSender>, log_fallback: bool) -> Self {
        Self {
            store,
            sms,
            log_fallback,
        }
    }

    /// Send a fresh code to the patient owning `phone`. Any live code for the
    /// phone stops working. Returns the new code's expiry.
    pub async fn issue_challenge(&self, phone: &str) -> Result<DateTime<Utc>, OtpError> {
        self.issue_challenge_at(phone, Utc::now()).await
    }

    async fn issue_challenge_at(
        &self,
        raw_phone: &str,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, OtpError> {
        let phone = normalize_phone(raw_phone);
        if phone.is_empty() {
            return Err(OtpError::NotFound);
        }

        self.store
            .find_patient_by_phone(&phone)
            .await?
            .ok_or(OtpError::NotFound)?;

        let code = generate_code();
        let challenge = self
            .store
            .replace_live_challenge(NewChallenge {
                phone: phone.clone(),
                code: code.clone(),
                created_at: now,
                expires_at: now + Duration::minutes(CODE_TTL_MINUTES),
            })
            .await?;

        let body = format!(
            "Giriş kodunuz: {code}. Kod {CODE_TTL_MINUTES} dakika geçerlidir. Kimseyle paylaşmayın."
        );

        // Delivery failures are not surfaced; the patient can ask for a new code.
        if let Err(e) = self.sms.send(&phone, &body).await {
            if self.log_fallback {
                tracing::warn!("OTP SMS not delivered ({e}); code for {phone} is {code}");
            } else {
                tracing::warn!("OTP SMS not delivered to {}: {e}", mask_phone(&phone));
            }
        }

        tracing::info!(
            "OTP challenge {} issued for {}",
            challenge.id,
            mask_phone(&phone)
        );
        Ok(challenge.expires_at)
    }

    /// Check `code` against the phone's live challenge. On success the
    /// challenge is consumed and the patient's user id is returned, creating
    /// the user on first login.
    pub async fn verify_challenge(
        &self,
        phone: &str,
        code: &str,
    ) -> Result<VerifiedPatient, OtpError> {
        self.verify_challenge_at(phone, code, Utc::now()).await
    }

    async fn verify_challenge_at(
        &self,
        raw_phone: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<VerifiedPatient, OtpError> {
        let phone = normalize_phone(raw_phone);

        if let Some(latest) = self.store.latest_challenge(&phone).await? {
            if latest.attempts >= MAX_ATTEMPTS {
                if !latest.verified {
                    self.store.mark_verified(latest.id).await?;
                }
                return Err(OtpError::TooManyAttempts);
            }
        }

        let challenge = self
            .store
            .live_challenge(&phone, now)
            .await?
            .ok_or(OtpError::ExpiredOrInvalid)?;

        if challenge.code != code.trim() {
            let attempts = self.store.record_failed_attempt(challenge.id).await?;
            if attempts >= MAX_ATTEMPTS {
                self.store.mark_verified(challenge.id).await?;
                tracing::warn!(
                    "OTP challenge {} locked after {attempts} failed attempts",
                    challenge.id
                );
                return Err(OtpError::TooManyAttempts);
            }
            return Err(OtpError::InvalidCode {
                remaining: MAX_ATTEMPTS - attempts,
            });
        }

        if !self.store.consume(challenge.id).await? {
            return Err(OtpError::ExpiredOrInvalid);
        }

        let patient = self
            .store
            .find_patient_by_phone(&phone)
            .await?
            .ok_or(OtpError::NotFound)?;

        let (user_id, user_created) = match patient.user_id {
            Some(id) => (id, false),
            None => self.provision_user(&patient).await?,
        };

        tracing::info!(
            "OTP verified for patient {} (user {user_id}, created: {user_created})",
            patient.id
        );

        Ok(VerifiedPatient {
            patient_id: patient.id,
            user_id,
            user_created,
        })
    }

    /// Bind a user to a patient that has none. An orphaned `patient` user
    /// with the phone as username is reused; any other account is left alone.
    async fn provision_user(&self, patient: &PatientLink) -> anyhow::Result<(Uuid, bool)> {
        let existing = self.store.find_unlinked_patient_user(&patient.phone).await?;

        let (user_id, created) = match existing {
            Some(id) => (id, false),
            None => {
                // Shared family emails fall back to the synthetic address.
                let email = match patient.email.as_deref().filter(|e| !e.is_empty()) {
                    Some(email) => {
                        if self.store.email_in_use(email).await? {
                            synthetic_email(&patient.phone)
                        } else {
                            email.to_string()
                        }
                    }
                    None => synthetic_email(&patient.phone),
                };
                let id = self
                    .store
                    .create_patient_user(NewPatientUser {
                        username: patient.phone.clone(),
                        email,
                        full_name: patient.full_name.clone(),
                        phone: patient.phone.clone(),
                    })
                    .await?;
                (id, true)
            }
        };

        self.store.link_patient_user(patient.id, user_id).await?;
        Ok((user_id, created))
    }

    /// Delete every challenge whose expiry has passed.
    pub async fn sweep(&self) -> anyhow::Result<u64> {
        self.store.delete_expired(Utc::now()).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::{
        models::otp::OtpChallenge,
        services::{otp_store::MemoryOtpStore, sms::SmsError},
    };

    const PHONE: &str = "05326127244";
    const WRONG: &str = "000000";

    #[derive(Default)]
    struct RecordingSms {
        sent: Mutex<Vec<(String, String)>>,
    }

    impl RecordingSms {
        fn count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }

        fn last_code(&self) -> String {
            let sent = self.sent.lock().unwrap();
            let (_, body) = sent.last().expect("no sms sent");
            body.split(|c: char| !c.is_ascii_digit())
                .find(|s| s.len() == 6)
                .expect("no code in sms body")
                .to_string()
        }
    }

    #[async_trait]
    impl SmsSender for RecordingSms {
        async fn send(&self, phone: &str, body: &str) -> Result<(), SmsError> {
            self.sent
                .lock()
                .unwrap()
                .push((phone.to_string(), body.to_string()));
            Ok(())
        }
    }

    struct UnconfiguredSms;

    #[async_trait]
    impl SmsSender for UnconfiguredSms {
        async fn send(&self, _phone: &str, _body: &str) -> Result<(), SmsError> {
            Err(SmsError::NotConfigured)
        }
    }

    fn setup() -> (OtpManager, Arc<MemoryOtpStore>, Arc<RecordingSms>, Uuid) {
        let store = Arc::new(MemoryOtpStore::new());
        let patient_id = store.add_patient("Ayşe Yılmaz", PHONE, None).unwrap();
        let sms = Arc::new(RecordingSms::default());
        let manager = OtpManager::new(store.clone(), sms.clone(), false);
        (manager, store, sms, patient_id)
    }

    #[test]
    fn generated_codes_are_six_digits_in_range() {
        for _ in 0..2000 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.bytes().all(|b| b.is_ascii_digit()));
            let n: u32 = code.parse().unwrap();
            assert!((CODE_MIN..=CODE_MAX).contains(&n));
        }
    }

    #[test]
    fn normalizes_spaces_and_dashes() {
        assert_eq!(normalize_phone(" 0532 612-72 44 "), "05326127244");
        assert_eq!(normalize_phone("0532\t6127244"), "05326127244");
    }

    #[tokio::test]
    async fn code_verifies_exactly_once() {
        let (manager, _, sms, patient_id) = setup();

        manager.issue_challenge(PHONE).await.unwrap();
        let code = sms.last_code();

        let verified = manager.verify_challenge(PHONE, &code).await.unwrap();
        assert_eq!(verified.patient_id, patient_id);

        let again = manager.verify_challenge(PHONE, &code).await;
        assert!(matches!(again, Err(OtpError::ExpiredOrInvalid)));
    }

    #[tokio::test]
    async fn new_code_supersedes_previous_one() {
        let (manager, store, sms, _) = setup();

        manager.issue_challenge(PHONE).await.unwrap();
        let first = sms.last_code();
        manager.issue_challenge(PHONE).await.unwrap();
        let second = sms.last_code();

        let live: Vec<_> = store
            .challenges()
            .into_iter()
            .filter(|c| c.is_live(Utc::now()))
            .collect();
        assert_eq!(live.len(), 1);

        if first != second {
            let res = manager.verify_challenge(PHONE, &first).await;
            assert!(matches!(res, Err(OtpError::InvalidCode { .. })));
        }
        assert!(manager.verify_challenge(PHONE, &second).await.is_ok());
    }

    #[tokio::test]
    async fn three_wrong_codes_lock_the_challenge() {
        let (manager, _, sms, _) = setup();

        manager.issue_challenge(PHONE).await.unwrap();
        let code = sms.last_code();

        let first = manager.verify_challenge(PHONE, WRONG).await.unwrap_err();
        assert_eq!(first.remaining_attempts(), Some(2));
        assert_eq!(first.to_string(), "Geçersiz kod. 2 deneme hakkınız kaldı.");

        let second = manager.verify_challenge(PHONE, WRONG).await.unwrap_err();
        assert_eq!(second.remaining_attempts(), Some(1));

        let third = manager.verify_challenge(PHONE, WRONG).await.unwrap_err();
        assert!(matches!(third, OtpError::TooManyAttempts));

        let correct = manager.verify_challenge(PHONE, &code).await.unwrap_err();
        assert!(matches!(correct, OtpError::TooManyAttempts));
    }

    #[tokio::test]
    async fn expired_code_is_rejected() {
        let (manager, _, sms, _) = setup();
        let issued_at = Utc::now() - Duration::minutes(CODE_TTL_MINUTES + 1);

        manager.issue_challenge_at(PHONE, issued_at).await.unwrap();
        let code = sms.last_code();

        let res = manager.verify_challenge_at(PHONE, &code, Utc::now()).await;
        assert!(matches!(res, Err(OtpError::ExpiredOrInvalid)));
    }

    #[tokio::test]
    async fn unknown_phone_is_not_found_and_sends_nothing() {
        let (manager, _, sms, _) = setup();

        let res = manager.issue_challenge("05550000000").await;
        assert!(matches!(res, Err(OtpError::NotFound)));
        assert_eq!(sms.count(), 0);
    }

    #[tokio::test]
    async fn formatted_phone_matches_stored_patient() {
        let (manager, _, sms, _) = setup();

        manager.issue_challenge("0532 612-72 44").await.unwrap();
        let code = sms.last_code();
        assert!(manager.verify_challenge("0532-612-7244", &code).await.is_ok());
    }

    #[tokio::test]
    async fn first_login_provisions_a_single_user() {
        let (manager, store, sms, patient_id) = setup();

        manager.issue_challenge(PHONE).await.unwrap();
        let first = manager
            .verify_challenge(PHONE, &sms.last_code())
            .await
            .unwrap();
        assert!(first.user_created);

        let users = store.users();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].role, "patient");
        assert_eq!(users[0].username, PHONE);
        assert_eq!(users[0].email, "05326127244@hasta.local");
        assert_eq!(store.patient(patient_id).unwrap().user_id, Some(first.user_id));

        manager.issue_challenge(PHONE).await.unwrap();
        let second = manager
            .verify_challenge(PHONE, &sms.last_code())
            .await
            .unwrap();
        assert!(!second.user_created);
        assert_eq!(second.user_id, first.user_id);
        assert_eq!(store.users().len(), 1);
    }

    #[tokio::test]
    async fn delivery_failure_still_issues_a_code() {
        let store = Arc::new(MemoryOtpStore::new());
        store.add_patient("Mehmet Demir", PHONE, Some("mehmet@example.com")).unwrap();
        let manager = OtpManager::new(store.clone(), Arc::new(UnconfiguredSms), true);

        assert!(manager.issue_challenge(PHONE).await.is_ok());

        let code = store.challenges()[0].code.clone();
        let verified = manager.verify_challenge(PHONE, &code).await.unwrap();
        assert!(verified.user_created);
        assert_eq!(store.users()[0].email, "mehmet@example.com");
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_challenges() {
        let (manager, store, _, _) = setup();
        store.add_patient("Can Kaya", "05441112233", None).unwrap();

        let old = Utc::now() - Duration::hours(2);
        manager.issue_challenge_at("05441112233", old).await.unwrap();
        manager.issue_challenge(PHONE).await.unwrap();

        assert_eq!(manager.sweep().await.unwrap(), 1);
        let remaining = store.challenges();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].phone, PHONE);
    }

    #[tokio::test]
    async fn same_instant_challenges_resolve_to_highest_id() {
        let (manager, store, sms, _) = setup();
        let t = Utc::now();

        manager.issue_challenge_at(PHONE, t).await.unwrap();
        let first = sms.last_code();
        manager.issue_challenge_at(PHONE, t).await.unwrap();
        let second = sms.last_code();

        let rows = store.challenges();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].created_at, rows[1].created_at);
        let newest_id = rows.iter().map(|c| c.id).max().unwrap();

        let latest = store.latest_challenge(PHONE).await.unwrap().unwrap();
        assert_eq!(latest.id, newest_id);
        let live = store.live_challenge(PHONE, t).await.unwrap().unwrap();
        assert_eq!(live.id, newest_id);
        assert_eq!(live.code, second);

        if first != second {
            let res = manager.verify_challenge_at(PHONE, &first, t).await;
            assert!(matches!(res, Err(OtpError::InvalidCode { .. })));
        }
        assert!(manager.verify_challenge_at(PHONE, &second, t).await.is_ok());
    }

    #[tokio::test]
    async fn patients_sharing_an_email_get_separate_users() {
        let store = Arc::new(MemoryOtpStore::new());
        let parent = store.add_patient("Zeynep Aydın", PHONE, Some("aile@example.com")).unwrap();
        let child = store
            .add_patient("Emre Aydın", "05441112233", Some("aile@example.com"))
            .unwrap();
        let sms = Arc::new(RecordingSms::default());
        let manager = OtpManager::new(store.clone(), sms.clone(), false);

        manager.issue_challenge(PHONE).await.unwrap();
        let a = manager.verify_challenge(PHONE, &sms.last_code()).await.unwrap();
        manager.issue_challenge("05441112233").await.unwrap();
        let b = manager
            .verify_challenge("05441112233", &sms.last_code())
            .await
            .unwrap();

        assert!(a.user_created && b.user_created);
        assert_ne!(a.user_id, b.user_id);
        assert_eq!(store.patient(parent).unwrap().user_id, Some(a.user_id));
        assert_eq!(store.patient(child).unwrap().user_id, Some(b.user_id));

        let users = store.users();
        assert_eq!(users.len(), 2);
        let child_user = users.iter().find(|u| u.id == b.user_id).unwrap();
        assert_eq!(child_user.email, "05441112233@hasta.local");
    }

    #[tokio::test]
    async fn staff_account_is_never_bound_to_a_patient() {
        let store = Arc::new(MemoryOtpStore::new());
        let staff = store.add_user(PHONE, "ayse@klinik.com", "therapist").unwrap();
        store.add_patient("Ayşe Yılmaz", "05441112233", Some("ayse@klinik.com")).unwrap();
        let sms = Arc::new(RecordingSms::default());
        let manager = OtpManager::new(store.clone(), sms.clone(), false);

        manager.issue_challenge("05441112233").await.unwrap();
        let verified = manager
            .verify_challenge("05441112233", &sms.last_code())
            .await
            .unwrap();
        assert!(verified.user_created);
        assert_ne!(verified.user_id, staff);
    }

    /// Replays the first live-challenge read, as a second request that
    /// loaded the row before the first one consumed it would see.
    struct StaleReadStore {
        inner: Arc<MemoryOtpStore>,
        seen: Mutex<Option<OtpChallenge>>,
    }

    #[async_trait]
    impl OtpStore for StaleReadStore {
        async fn find_patient_by_phone(&self, phone: &str) -> anyhow::Result<Option<PatientLink>> {
            self.inner.find_patient_by_phone(phone).await
        }
        async fn replace_live_challenge(&self, new: NewChallenge) -> anyhow::Result<OtpChallenge> {
            self.inner.replace_live_challenge(new).await
        }
        async fn latest_challenge(&self, phone: &str) -> anyhow::Result<Option<OtpChallenge>> {
            self.inner.latest_challenge(phone).await
        }
        async fn live_challenge(
            &self,
            phone: &str,
            now: DateTime<Utc>,
        ) -> anyhow::Result<Option<OtpChallenge>> {
            if let Some(c) = self.seen.lock().unwrap().clone() {
                return Ok(Some(c));
            }
            let live = self.inner.live_challenge(phone, now).await?;
            *self.seen.lock().unwrap() = live.clone();
            Ok(live)
        }
        async fn record_failed_attempt(&self, id: i64) -> anyhow::Result<i32> {
            self.inner.record_failed_attempt(id).await
        }
        async fn mark_verified(&self, id: i64) -> anyhow::Result<()> {
            self.inner.mark_verified(id).await
        }
        async fn consume(&self, id: i64) -> anyhow::Result<bool> {
            self.inner.consume(id).await
        }
        async fn delete_expired(&self, now: DateTime<Utc>) -> anyhow::Result<u64> {
            self.inner.delete_expired(now).await
        }
        async fn find_unlinked_patient_user(&self, username: &str) -> anyhow::Result<Option<Uuid>> {
            self.inner.find_unlinked_patient_user(username).await
        }
        async fn email_in_use(&self, email: &str) -> anyhow::Result<bool> {
            self.inner.email_in_use(email).await
        }
        async fn create_patient_user(&self, user: NewPatientUser) -> anyhow::Result<Uuid> {
            self.inner.create_patient_user(user).await
        }
        async fn link_patient_user(&self, patient_id: Uuid, user_id: Uuid) -> anyhow::Result<()> {
            self.inner.link_patient_user(patient_id, user_id).await
        }
    }

    #[tokio::test]
    async fn racing_verifications_succeed_once() {
        let inner = Arc::new(MemoryOtpStore::new());
        inner.add_patient("Ayşe Yılmaz", PHONE, None).unwrap();
        let store = Arc::new(StaleReadStore {
            inner: inner.clone(),
            seen: Mutex::new(None),
        });
        let sms = Arc::new(RecordingSms::default());
        let manager = OtpManager::new(store, sms.clone(), false);

        manager.issue_challenge(PHONE).await.unwrap();
        let code = sms.last_code();

        assert!(manager.verify_challenge(PHONE, &code).await.is_ok());
        let second = manager.verify_challenge(PHONE, &code).await;
        assert!(matches!(second, Err(OtpError::ExpiredOrInvalid)));
        assert_eq!(inner.users().len(), 1);
    }
}
