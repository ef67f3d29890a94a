use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    auth::Claims,
    user::{LoginResponse, User, UserProfile, UserRole},
};

pub const BCRYPT_COST: u32 = 12;

pub(crate) const USER_COLUMNS: &str = "id, username, email, password_hash, full_name, phone, role,
    is_verified, is_active, created_at, updated_at";

pub struct AuthService;

impl AuthService {
    /// Username/password login for staff accounts.
    /// Patients have no password and must use the phone code flow.
    pub async fn login(
        pool: &PgPool,
        username: &str,
        password: &str,
        jwt_secret: &str,
        access_ttl: u64,
    ) -> anyhow::Result<LoginResponse> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND is_active = TRUE"
        ))
        .bind(username.trim())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Kullanıcı adı veya şifre hatalı"))?;

        if user.password_hash.is_empty() {
            anyhow::bail!("Kullanıcı adı veya şifre hatalı");
        }

        let valid = bcrypt::verify(password, &user.password_hash)
            .map_err(|_| anyhow::anyhow!("Kullanıcı adı veya şifre hatalı"))?;
        if !valid {
            anyhow::bail!("Kullanıcı adı veya şifre hatalı");
        }

        let role: UserRole = user.role.parse()?;
        let access_token = Self::generate_access_token(user.id, role, jwt_secret, access_ttl)?;

        tracing::info!("User {} logged in as {}", user.id, role);

        Ok(LoginResponse {
            access_token,
            user: user.into(),
        })
    }

    /// Issue a token for a patient who just proved ownership of their phone.
    pub async fn login_verified_patient(
        pool: &PgPool,
        user_id: Uuid,
        jwt_secret: &str,
        access_ttl: u64,
    ) -> anyhow::Result<LoginResponse> {
        let user = Self::find_user(pool, user_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Kullanıcı bulunamadı"))?;
        if !user.is_active {
            anyhow::bail!("Hesap devre dışı");
        }

        let access_token =
            Self::generate_access_token(user.id, UserRole::Patient, jwt_secret, access_ttl)?;

        Ok(LoginResponse {
            access_token,
            user: user.into(),
        })
    }

    pub async fn find_user(pool: &PgPool, user_id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(user)
    }

    pub async fn profile(pool: &PgPool, user_id: Uuid) -> anyhow::Result<Option<UserProfile>> {
        Ok(Self::find_user(pool, user_id).await?.map(UserProfile::from))
    }

    pub fn generate_access_token(
        user_id: Uuid,
        role: UserRole,
        secret: &str,
        ttl_seconds: u64,
    ) -> anyhow::Result<String> {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: user_id.to_string(),
            role,
            iat: now,
            exp: now + ttl_seconds as usize,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )?;
        Ok(token)
    }

    pub fn hash_password(password: &str) -> anyhow::Result<String> {
        if password.chars().count() < 8 {
            anyhow::bail!("Şifre en az 8 karakter olmalıdır");
        }
        Ok(bcrypt::hash(password, BCRYPT_COST)?)
    }
}
