use sqlx::PgPool;
use uuid::Uuid;

use crate::models::testimonial::{CreateTestimonialRequest, Testimonial, UpdateTestimonialRequest};

pub struct TestimonialService;

impl TestimonialService {
    pub async fn list_approved(pool: &PgPool) -> anyhow::Result<Vec<Testimonial>> {
        let items = sqlx::query_as::<_, Testimonial>(
            "SELECT * FROM testimonials WHERE approved = TRUE ORDER BY created_at DESC",
        )
        .fetch_all(pool)
        .await?;
        Ok(items)
    }

    pub async fn list_all(pool: &PgPool) -> anyhow::Result<Vec<Testimonial>> {
        let items = sqlx::query_as::<_, Testimonial>(
            "SELECT * FROM testimonials ORDER BY approved, created_at DESC",
        )
        .fetch_all(pool)
        .await?;
        Ok(items)
    }

    /// Visitor submission; hidden until an admin approves it.
    pub async fn submit(pool: &PgPool, req: &CreateTestimonialRequest) -> anyhow::Result<Testimonial> {
        if !(1..=5).contains(&req.rating) {
            anyhow::bail!("Puan 1 ile 5 arasında olmalıdır");
        }
        let item = sqlx::query_as::<_, Testimonial>(
            "INSERT INTO testimonials (full_name, content, rating, treatment, approved)
             VALUES ($1, $2, $3, $4, FALSE)
             RETURNING *",
        )
        .bind(req.full_name.trim())
        .bind(&req.content)
        .bind(req.rating)
        .bind(&req.treatment)
        .fetch_one(pool)
        .await?;
        Ok(item)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        req: &UpdateTestimonialRequest,
    ) -> anyhow::Result<Option<Testimonial>> {
        if let Some(rating) = req.rating {
            if !(1..=5).contains(&rating) {
                anyhow::bail!("Puan 1 ile 5 arasında olmalıdır");
            }
        }
        let item = sqlx::query_as::<_, Testimonial>(
            "UPDATE testimonials
             SET full_name = COALESCE($1, full_name),
                 content   = COALESCE($2, content),
                 rating    = COALESCE($3, rating),
                 treatment = COALESCE($4, treatment),
                 approved  = COALESCE($5, approved)
             WHERE id = $6
             RETURNING *",
        )
        .bind(&req.full_name)
        .bind(&req.content)
        .bind(req.rating)
        .bind(&req.treatment)
        .bind(req.approved)
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(item)
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM testimonials WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
