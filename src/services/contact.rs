use sqlx::PgPool;
use uuid::Uuid;

use crate::models::contact::{ContactMessage, ContactRequest};

pub struct ContactService;

impl ContactService {
    pub async fn create(pool: &PgPool, req: &ContactRequest) -> anyhow::Result<ContactMessage> {
        let message = sqlx::query_as::<_, ContactMessage>(
            "INSERT INTO contact_messages (full_name, email, phone, subject, message)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(req.full_name.trim())
        .bind(req.email.trim())
        .bind(&req.phone)
        .bind(&req.subject)
        .bind(&req.message)
        .fetch_one(pool)
        .await?;
        Ok(message)
    }

    pub async fn list(pool: &PgPool) -> anyhow::Result<Vec<ContactMessage>> {
        let messages = sqlx::query_as::<_, ContactMessage>(
            "SELECT * FROM contact_messages ORDER BY is_read, created_at DESC",
        )
        .fetch_all(pool)
        .await?;
        Ok(messages)
    }

    pub async fn mark_read(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("UPDATE contact_messages SET is_read = TRUE WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM contact_messages WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
