use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::otp::{NewChallenge, NewPatientUser, OtpChallenge, PatientLink};

/// Persistence contract for the OTP flow: challenge rows plus the patient and
/// user lookups needed to provision a login on first verification.
#[async_trait]
pub trait OtpStore: Send + Sync {
    async fn find_patient_by_phone(&self, phone: &str) -> anyhow::Result<Option<PatientLink>>;

    /// Kill every unverified challenge for the phone and insert the new one,
    /// as a single unit.
    async fn replace_live_challenge(&self, new: NewChallenge) -> anyhow::Result<OtpChallenge>;

    /// Most recent challenge regardless of state (created_at DESC, id DESC).
    async fn latest_challenge(&self, phone: &str) -> anyhow::Result<Option<OtpChallenge>>;

    /// Most recent challenge with verified = false and expires_at > now.
    async fn live_challenge(
        &self,
        phone: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<OtpChallenge>>;

    /// Atomically bump the attempt counter; returns the new value.
    async fn record_failed_attempt(&self, id: i64) -> anyhow::Result<i32>;

    async fn mark_verified(&self, id: i64) -> anyhow::Result<()>;

    /// Flip an unverified challenge to verified. Returns false when another
    /// request got there first.
    async fn consume(&self, id: i64) -> anyhow::Result<bool>;

    async fn delete_expired(&self, now: DateTime<Utc>) -> anyhow::Result<u64>;

    /// A `patient` user with this username that no patient record points to.
    async fn find_unlinked_patient_user(&self, username: &str) -> anyhow::Result<Option<Uuid>>;

    async fn email_in_use(&self, email: &str) -> anyhow::Result<bool>;

    async fn create_patient_user(&self, user: NewPatientUser) -> anyhow::Result<Uuid>;

    async fn link_patient_user(&self, patient_id: Uuid, user_id: Uuid) -> anyhow::Result<()>;
}

pub struct PgOtpStore {
    pool: PgPool,
}

impl PgOtpStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OtpStore for PgOtpStore {
    async fn find_patient_by_phone(&self, phone: &str) -> anyhow::Result<Option<PatientLink>> {
        let patient = sqlx::query_as::<_, PatientLink>(
            "SELECT id, full_name, phone, email, user_id
             FROM patients WHERE phone = $1
             ORDER BY created_at ASC LIMIT 1",
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;
        Ok(patient)
    }

    async fn replace_live_challenge(&self, new: NewChallenge) -> anyhow::Result<OtpChallenge> {
        let mut tx = self.pool.begin().await?;

        // Expired-but-unverified rows are killed too so the partial unique
        // index on (phone) WHERE verified = FALSE holds.
        sqlx::query("UPDATE otp_challenges SET verified = TRUE WHERE phone = $1 AND verified = FALSE")
            .bind(&new.phone)
            .execute(&mut *tx)
            .await?;

        let challenge = sqlx::query_as::<_, OtpChallenge>(
            "INSERT INTO otp_challenges (phone, code, created_at, expires_at)
             VALUES ($1, $2, $3, $4)
             RETURNING id, phone, code, attempts, verified, created_at, expires_at",
        )
        .bind(&new.phone)
        .bind(&new.code)
        .bind(new.created_at)
        .bind(new.expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(challenge)
    }

    async fn latest_challenge(&self, phone: &str) -> anyhow::Result<Option<OtpChallenge>> {
        let challenge = sqlx::query_as::<_, OtpChallenge>(
            "SELECT id, phone, code, attempts, verified, created_at, expires_at
             FROM otp_challenges WHERE phone = $1
             ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;
        Ok(challenge)
    }

    async fn live_challenge(
        &self,
        phone: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<OtpChallenge>> {
        let challenge = sqlx::query_as::<_, OtpChallenge>(
            "SELECT id, phone, code, attempts, verified, created_at, expires_at
             FROM otp_challenges
             WHERE phone = $1 AND verified = FALSE AND expires_at > $2
             ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .bind(phone)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(challenge)
    }

    async fn record_failed_attempt(&self, id: i64) -> anyhow::Result<i32> {
        let attempts: i32 = sqlx::query_scalar(
            "UPDATE otp_challenges SET attempts = attempts + 1 WHERE id = $1 RETURNING attempts",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(attempts)
    }

    async fn mark_verified(&self, id: i64) -> anyhow::Result<()> {
        sqlx::query("UPDATE otp_challenges SET verified = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn consume(&self, id: i64) -> anyhow::Result<bool> {
        let consumed: Option<i64> = sqlx::query_scalar(
            "UPDATE otp_challenges SET verified = TRUE
             WHERE id = $1 AND verified = FALSE
             RETURNING id",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(consumed.is_some())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM otp_challenges WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn find_unlinked_patient_user(&self, username: &str) -> anyhow::Result<Option<Uuid>> {
        let id = sqlx::query_scalar(
            "SELECT u.id FROM users u
             WHERE u.username = $1 AND u.role = 'patient'
               AND NOT EXISTS(SELECT 1 FROM patients p WHERE p.user_id = u.id)",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    async fn email_in_use(&self, email: &str) -> anyhow::Result<bool> {
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(taken)
    }

    async fn create_patient_user(&self, user: NewPatientUser) -> anyhow::Result<Uuid> {
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO users (username, email, password_hash, full_name, phone, role, is_verified)
             VALUES ($1, $2, '', $3, $4, 'patient', TRUE)
             RETURNING id",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.phone)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn link_patient_user(&self, patient_id: Uuid, user_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE patients SET user_id = $1, updated_at = NOW() WHERE id = $2")
            .bind(user_id)
            .bind(patient_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// A user row as kept by [`MemoryOtpStore`].
#[derive(Debug, Clone)]
pub struct MemoryUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: &'static str,
}

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    challenges: Vec<OtpChallenge>,
    patients: Vec<PatientLink>,
    users: Vec<MemoryUser>,
}

/// Process-local store, for tests and single-instance demos.
#[derive(Default)]
pub struct MemoryOtpStore {
    state: Mutex<MemoryState>,
}

impl MemoryOtpStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> anyhow::Result<std::sync::MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| anyhow::anyhow!("otp memory store poisoned"))
    }

    /// Register a patient the way clinic staff would; phone must be normalized.
    pub fn add_patient(&self, full_name: &str, phone: &str, email: Option<&str>) -> anyhow::Result<Uuid> {
        let id = Uuid::new_v4();
        self.lock()?.patients.push(PatientLink {
            id,
            full_name: full_name.to_string(),
            phone: phone.to_string(),
            email: email.map(str::to_string),
            user_id: None,
        });
        Ok(id)
    }

    /// Insert a user directly, bypassing the OTP flow.
    pub fn add_user(&self, username: &str, email: &str, role: &'static str) -> anyhow::Result<Uuid> {
        let id = Uuid::new_v4();
        self.lock()?.users.push(MemoryUser {
            id,
            username: username.to_string(),
            email: email.to_string(),
            full_name: username.to_string(),
            role,
        });
        Ok(id)
    }

    pub fn patient(&self, id: Uuid) -> Option<PatientLink> {
        self.lock().ok()?.patients.iter().find(|p| p.id == id).cloned()
    }

    pub fn users(&self) -> Vec<MemoryUser> {
        self.lock().map(|s| s.users.clone()).unwrap_or_default()
    }

    pub fn challenges(&self) -> Vec<OtpChallenge> {
        self.lock().map(|s| s.challenges.clone()).unwrap_or_default()
    }
}

fn newest<'a>(it: impl Iterator<Item = &'a OtpChallenge>) -> Option<&'a OtpChallenge> {
    it.max_by_key(|c| (c.created_at, c.id))
}

#[async_trait]
impl OtpStore for MemoryOtpStore {
    async fn find_patient_by_phone(&self, phone: &str) -> anyhow::Result<Option<PatientLink>> {
        Ok(self.lock()?.patients.iter().find(|p| p.phone == phone).cloned())
    }

    async fn replace_live_challenge(&self, new: NewChallenge) -> anyhow::Result<OtpChallenge> {
        let mut state = self.lock()?;
        for c in state
            .challenges
            .iter_mut()
            .filter(|c| c.phone == new.phone && !c.verified)
        {
            c.verified = true;
        }
        state.next_id += 1;
        let challenge = OtpChallenge {
            id: state.next_id,
            phone: new.phone,
            code: new.code,
            attempts: 0,
            verified: false,
            created_at: new.created_at,
            expires_at: new.expires_at,
        };
        state.challenges.push(challenge.clone());
        Ok(challenge)
    }

    async fn latest_challenge(&self, phone: &str) -> anyhow::Result<Option<OtpChallenge>> {
        let state = self.lock()?;
        Ok(newest(state.challenges.iter().filter(|c| c.phone == phone)).cloned())
    }

    async fn live_challenge(
        &self,
        phone: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<OtpChallenge>> {
        let state = self.lock()?;
        Ok(newest(
            state
                .challenges
                .iter()
                .filter(|c| c.phone == phone && c.is_live(now)),
        )
        .cloned())
    }

    async fn record_failed_attempt(&self, id: i64) -> anyhow::Result<i32> {
        let mut state = self.lock()?;
        let challenge = state
            .challenges
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| anyhow::anyhow!("otp challenge {id} not found"))?;
        challenge.attempts += 1;
        Ok(challenge.attempts)
    }

    async fn mark_verified(&self, id: i64) -> anyhow::Result<()> {
        let mut state = self.lock()?;
        if let Some(c) = state.challenges.iter_mut().find(|c| c.id == id) {
            c.verified = true;
        }
        Ok(())
    }

    async fn consume(&self, id: i64) -> anyhow::Result<bool> {
        let mut state = self.lock()?;
        match state.challenges.iter_mut().find(|c| c.id == id && !c.verified) {
            Some(c) => {
                c.verified = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> anyhow::Result<u64> {
        let mut state = self.lock()?;
        let before = state.challenges.len();
        state.challenges.retain(|c| c.expires_at >= now);
        Ok((before - state.challenges.len()) as u64)
    }

    async fn find_unlinked_patient_user(&self, username: &str) -> anyhow::Result<Option<Uuid>> {
        let state = self.lock()?;
        Ok(state
            .users
            .iter()
            .find(|u| {
                u.username == username
                    && u.role == "patient"
                    && !state.patients.iter().any(|p| p.user_id == Some(u.id))
            })
            .map(|u| u.id))
    }

    async fn email_in_use(&self, email: &str) -> anyhow::Result<bool> {
        Ok(self
            .lock()?
            .users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(email)))
    }

    async fn create_patient_user(&self, user: NewPatientUser) -> anyhow::Result<Uuid> {
        let mut state = self.lock()?;
        if state.users.iter().any(|u| u.username == user.username) {
            anyhow::bail!("username {} already taken", user.username);
        }
        let id = Uuid::new_v4();
        state.users.push(MemoryUser {
            id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            role: "patient",
        });
        Ok(id)
    }

    async fn link_patient_user(&self, patient_id: Uuid, user_id: Uuid) -> anyhow::Result<()> {
        let mut state = self.lock()?;
        let patient = state
            .patients
            .iter_mut()
            .find(|p| p.id == patient_id)
            .ok_or_else(|| anyhow::anyhow!("patient {patient_id} not found"))?;
        patient.user_id = Some(user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[tokio::test]
    async fn challenge_is_consumed_only_once() {
        let store = MemoryOtpStore::new();
        let now = Utc::now();
        let challenge = store
            .replace_live_challenge(NewChallenge {
                phone: "05326127244".into(),
                code: "482913".into(),
                created_at: now,
                expires_at: now + Duration::minutes(5),
            })
            .await
            .unwrap();

        assert!(store.consume(challenge.id).await.unwrap());
        assert!(!store.consume(challenge.id).await.unwrap());
    }

    #[tokio::test]
    async fn linked_or_staff_users_are_not_reusable() {
        let store = MemoryOtpStore::new();
        store.add_user("05326127244", "resepsiyon@klinik.com", "receptionist").unwrap();
        assert_eq!(store.find_unlinked_patient_user("05326127244").await.unwrap(), None);

        let free = store.add_user("05441112233", "a@hasta.local", "patient").unwrap();
        assert_eq!(store.find_unlinked_patient_user("05441112233").await.unwrap(), Some(free));

        let patient = store.add_patient("Can Kaya", "05441112233", None).unwrap();
        store.link_patient_user(patient, free).await.unwrap();
        assert_eq!(store.find_unlinked_patient_user("05441112233").await.unwrap(), None);
    }
}
