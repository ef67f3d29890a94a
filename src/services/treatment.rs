use sqlx::PgPool;
use uuid::Uuid;

use crate::models::treatment::{
    CreateSessionNoteRequest, CreateTreatmentPlanRequest, SessionNote, TreatmentPlan,
    UpdateTreatmentPlanRequest,
};

pub struct TreatmentPlanService;

impl TreatmentPlanService {
    pub async fn list_for_patient(
        pool: &PgPool,
        patient_id: Uuid,
    ) -> anyhow::Result<Vec<TreatmentPlan>> {
        let plans = sqlx::query_as::<_, TreatmentPlan>(
            "SELECT * FROM treatment_plans WHERE patient_id = $1 ORDER BY start_date DESC",
        )
        .bind(patient_id)
        .fetch_all(pool)
        .await?;
        Ok(plans)
    }

    pub async fn get(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<TreatmentPlan>> {
        let plan = sqlx::query_as::<_, TreatmentPlan>("SELECT * FROM treatment_plans WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(plan)
    }

    pub async fn create(
        pool: &PgPool,
        req: &CreateTreatmentPlanRequest,
        therapist_id: Option<Uuid>,
    ) -> anyhow::Result<TreatmentPlan> {
        if let Some(end) = req.end_date {
            if end < req.start_date {
                anyhow::bail!("Bitiş tarihi başlangıç tarihinden önce olamaz");
            }
        }
        let plan = sqlx::query_as::<_, TreatmentPlan>(
            "INSERT INTO treatment_plans
                (patient_id, therapist_id, title, diagnosis, goals, start_date, end_date)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING *",
        )
        .bind(req.patient_id)
        .bind(therapist_id)
        .bind(&req.title)
        .bind(&req.diagnosis)
        .bind(&req.goals)
        .bind(req.start_date)
        .bind(req.end_date)
        .fetch_one(pool)
        .await?;
        Ok(plan)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        req: &UpdateTreatmentPlanRequest,
    ) -> anyhow::Result<Option<TreatmentPlan>> {
        let plan = sqlx::query_as::<_, TreatmentPlan>(
            "UPDATE treatment_plans
             SET title      = COALESCE($1, title),
                 diagnosis  = COALESCE($2, diagnosis),
                 goals      = COALESCE($3, goals),
                 start_date = COALESCE($4, start_date),
                 end_date   = COALESCE($5, end_date),
                 status     = COALESCE($6, status),
                 updated_at = NOW()
             WHERE id = $7
             RETURNING *",
        )
        .bind(&req.title)
        .bind(&req.diagnosis)
        .bind(&req.goals)
        .bind(req.start_date)
        .bind(req.end_date)
        .bind(req.status.map(|s| s.as_str()))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(plan)
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM treatment_plans WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

pub struct SessionNoteService;

impl SessionNoteService {
    pub async fn list_for_patient(
        pool: &PgPool,
        patient_id: Uuid,
    ) -> anyhow::Result<Vec<SessionNote>> {
        let notes = sqlx::query_as::<_, SessionNote>(
            "SELECT * FROM session_notes WHERE patient_id = $1 ORDER BY session_date DESC, created_at DESC",
        )
        .bind(patient_id)
        .fetch_all(pool)
        .await?;
        Ok(notes)
    }

    pub async fn list_for_therapist(
        pool: &PgPool,
        therapist_id: Uuid,
    ) -> anyhow::Result<Vec<SessionNote>> {
        let notes = sqlx::query_as::<_, SessionNote>(
            "SELECT * FROM session_notes WHERE therapist_id = $1 ORDER BY session_date DESC, created_at DESC",
        )
        .bind(therapist_id)
        .fetch_all(pool)
        .await?;
        Ok(notes)
    }

    pub async fn get(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<SessionNote>> {
        let note = sqlx::query_as::<_, SessionNote>("SELECT * FROM session_notes WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(note)
    }

    /// Record a session. With a purchase, one of its sessions is consumed;
    /// the purchase completes when the last one is used.
    pub async fn create(
        pool: &PgPool,
        req: &CreateSessionNoteRequest,
        therapist_id: Option<Uuid>,
    ) -> anyhow::Result<SessionNote> {
        if let Some(level) = req.pain_level {
            if !(0..=10).contains(&level) {
                anyhow::bail!("Ağrı seviyesi 0 ile 10 arasında olmalıdır");
            }
        }

        let mut tx = pool.begin().await?;

        if let Some(purchase_id) = req.purchase_id {
            let consumed: Option<Uuid> = sqlx::query_scalar(
                "UPDATE purchases
                 SET sessions_used = sessions_used + 1,
                     status = CASE WHEN sessions_used + 1 >= sessions_total THEN 'completed' ELSE status END
                 WHERE id = $1 AND patient_id = $2 AND status = 'active'
                   AND sessions_used < sessions_total
                 RETURNING id",
            )
            .bind(purchase_id)
            .bind(req.patient_id)
            .fetch_optional(&mut *tx)
            .await?;

            if consumed.is_none() {
                anyhow::bail!("Bu pakette kullanılabilir seans kalmadı");
            }
        }

        let note = sqlx::query_as::<_, SessionNote>(
            "INSERT INTO session_notes
                (patient_id, therapist_id, treatment_plan_id, purchase_id, session_date, notes, pain_level)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING *",
        )
        .bind(req.patient_id)
        .bind(therapist_id)
        .bind(req.treatment_plan_id)
        .bind(req.purchase_id)
        .bind(req.session_date)
        .bind(&req.notes)
        .bind(req.pain_level)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(note)
    }

    /// Delete a note and give its session back to the purchase.
    pub async fn delete(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let mut tx = pool.begin().await?;

        let purchase_id: Option<Option<Uuid>> =
            sqlx::query_scalar("DELETE FROM session_notes WHERE id = $1 RETURNING purchase_id")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(purchase_id) = purchase_id else {
            return Ok(false);
        };

        if let Some(purchase_id) = purchase_id {
            sqlx::query(
                "UPDATE purchases
                 SET sessions_used = GREATEST(sessions_used - 1, 0),
                     status = CASE WHEN status = 'completed' THEN 'active' ELSE status END
                 WHERE id = $1",
            )
            .bind(purchase_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }
}
