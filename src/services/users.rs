use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    models::user::{CreateUserRequest, UpdateUserRequest, User, UserProfile},
    services::auth::{AuthService, USER_COLUMNS},
};

pub struct UserService;

impl UserService {
    pub async fn list(pool: &PgPool) -> anyhow::Result<Vec<UserProfile>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY role, full_name"
        ))
        .fetch_all(pool)
        .await?;
        Ok(users.into_iter().map(UserProfile::from).collect())
    }

    pub async fn create(pool: &PgPool, req: &CreateUserRequest) -> anyhow::Result<UserProfile> {
        let username = req.username.trim();
        if username.is_empty() {
            anyhow::bail!("Kullanıcı adı gerekli");
        }
        let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
            .bind(username)
            .fetch_one(pool)
            .await?;
        if taken {
            anyhow::bail!("Bu kullanıcı adı zaten kullanılıyor");
        }

        let hash = AuthService::hash_password(&req.password)?;
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, password_hash, full_name, phone, role, is_verified)
             VALUES ($1, $2, $3, $4, $5, $6, TRUE)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(username)
        .bind(&req.email)
        .bind(&hash)
        .bind(&req.full_name)
        .bind(&req.phone)
        .bind(req.role.as_str())
        .fetch_one(pool)
        .await?;

        tracing::info!("User {} created with role {}", user.id, req.role);
        Ok(user.into())
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        req: &UpdateUserRequest,
    ) -> anyhow::Result<Option<UserProfile>> {
        let hash = match req.password.as_deref().filter(|p| !p.is_empty()) {
            Some(p) => Some(AuthService::hash_password(p)?),
            None => None,
        };

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET email         = COALESCE($1, email),
                 full_name     = COALESCE($2, full_name),
                 phone         = COALESCE($3, phone),
                 role          = COALESCE($4, role),
                 is_active     = COALESCE($5, is_active),
                 password_hash = COALESCE($6, password_hash),
                 updated_at    = NOW()
             WHERE id = $7
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&req.email)
        .bind(&req.full_name)
        .bind(&req.phone)
        .bind(req.role.map(|r| r.as_str()))
        .bind(req.is_active)
        .bind(hash)
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(user.map(UserProfile::from))
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
