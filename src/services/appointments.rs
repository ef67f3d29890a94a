use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    models::appointment::{
        Appointment, AppointmentStatus, CreateAppointmentRequest, UpdateAppointmentRequest,
    },
    services::otp::normalize_phone,
};

pub struct AppointmentService;

impl AppointmentService {
    pub async fn list(
        pool: &PgPool,
        status: Option<AppointmentStatus>,
    ) -> anyhow::Result<Vec<Appointment>> {
        let appointments = sqlx::query_as::<_, Appointment>(
            "SELECT * FROM appointments
             WHERE ($1::TEXT IS NULL OR status = $1)
             ORDER BY preferred_date DESC, created_at DESC",
        )
        .bind(status.map(|s| s.as_str()))
        .fetch_all(pool)
        .await?;
        Ok(appointments)
    }

    /// Public appointment request; always starts as pending.
    pub async fn create(
        pool: &PgPool,
        req: &CreateAppointmentRequest,
    ) -> anyhow::Result<Appointment> {
        let appointment = sqlx::query_as::<_, Appointment>(
            "INSERT INTO appointments
                (full_name, phone, email, service, preferred_date, preferred_time, message, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending')
             RETURNING *",
        )
        .bind(req.full_name.trim())
        .bind(normalize_phone(&req.phone))
        .bind(&req.email)
        .bind(&req.service)
        .bind(req.preferred_date)
        .bind(&req.preferred_time)
        .bind(&req.message)
        .fetch_one(pool)
        .await?;
        Ok(appointment)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        req: &UpdateAppointmentRequest,
    ) -> anyhow::Result<Option<Appointment>> {
        let appointment = sqlx::query_as::<_, Appointment>(
            "UPDATE appointments
             SET status         = COALESCE($1, status),
                 preferred_date = COALESCE($2, preferred_date),
                 preferred_time = COALESCE($3, preferred_time),
                 admin_notes    = COALESCE($4, admin_notes),
                 updated_at     = NOW()
             WHERE id = $5
             RETURNING *",
        )
        .bind(req.status.map(|s| s.as_str()))
        .bind(req.preferred_date)
        .bind(&req.preferred_time)
        .bind(&req.admin_notes)
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(appointment)
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM appointments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
