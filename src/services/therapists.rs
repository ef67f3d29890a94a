use sqlx::PgPool;
use uuid::Uuid;

use crate::models::therapist::{
    CreateTherapistRequest, TeamMember, Therapist, UpdateTherapistRequest,
};

pub struct TherapistService;

impl TherapistService {
    pub async fn list(pool: &PgPool) -> anyhow::Result<Vec<Therapist>> {
        let therapists = sqlx::query_as::<_, Therapist>(
            "SELECT * FROM therapists ORDER BY full_name",
        )
        .fetch_all(pool)
        .await?;
        Ok(therapists)
    }

    pub async fn list_team(pool: &PgPool) -> anyhow::Result<Vec<TeamMember>> {
        let team = sqlx::query_as::<_, TeamMember>(
            "SELECT id, full_name, title, specialization, bio, photo_url
             FROM therapists WHERE is_active = TRUE
             ORDER BY full_name",
        )
        .fetch_all(pool)
        .await?;
        Ok(team)
    }

    pub async fn find_by_user(pool: &PgPool, user_id: Uuid) -> anyhow::Result<Option<Therapist>> {
        let therapist = sqlx::query_as::<_, Therapist>(
            "SELECT * FROM therapists WHERE user_id = $1 AND is_active = TRUE",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(therapist)
    }

    pub async fn create(pool: &PgPool, req: &CreateTherapistRequest) -> anyhow::Result<Therapist> {
        let therapist = sqlx::query_as::<_, Therapist>(
            "INSERT INTO therapists
                (user_id, full_name, title, specialization, bio, photo_url, phone, email)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(req.user_id)
        .bind(&req.full_name)
        .bind(&req.title)
        .bind(&req.specialization)
        .bind(&req.bio)
        .bind(&req.photo_url)
        .bind(&req.phone)
        .bind(&req.email)
        .fetch_one(pool)
        .await?;
        Ok(therapist)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        req: &UpdateTherapistRequest,
    ) -> anyhow::Result<Option<Therapist>> {
        let therapist = sqlx::query_as::<_, Therapist>(
            "UPDATE therapists
             SET user_id        = COALESCE($1, user_id),
                 full_name      = COALESCE($2, full_name),
                 title          = COALESCE($3, title),
                 specialization = COALESCE($4, specialization),
                 bio            = COALESCE($5, bio),
                 photo_url      = COALESCE($6, photo_url),
                 phone          = COALESCE($7, phone),
                 email          = COALESCE($8, email),
                 is_active      = COALESCE($9, is_active),
                 updated_at     = NOW()
             WHERE id = $10
             RETURNING *",
        )
        .bind(req.user_id)
        .bind(&req.full_name)
        .bind(&req.title)
        .bind(&req.specialization)
        .bind(&req.bio)
        .bind(&req.photo_url)
        .bind(&req.phone)
        .bind(&req.email)
        .bind(req.is_active)
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(therapist)
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM therapists WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
