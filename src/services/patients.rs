use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    models::patient::{CreatePatientRequest, LeadStatus, Patient, UpdatePatientRequest},
    services::otp::normalize_phone,
};

pub struct PatientService;

impl PatientService {
    pub async fn list(pool: &PgPool) -> anyhow::Result<Vec<Patient>> {
        let patients = sqlx::query_as::<_, Patient>(
            "SELECT * FROM patients ORDER BY created_at DESC",
        )
        .fetch_all(pool)
        .await?;
        Ok(patients)
    }

    pub async fn list_for_therapist(
        pool: &PgPool,
        therapist_id: Uuid,
    ) -> anyhow::Result<Vec<Patient>> {
        let patients = sqlx::query_as::<_, Patient>(
            "SELECT * FROM patients WHERE therapist_id = $1 ORDER BY full_name",
        )
        .bind(therapist_id)
        .fetch_all(pool)
        .await?;
        Ok(patients)
    }

    pub async fn get(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<Patient>> {
        let patient = sqlx::query_as::<_, Patient>("SELECT * FROM patients WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(patient)
    }

    /// The patient record linked to a (patient-role) user account.
    pub async fn find_by_user(pool: &PgPool, user_id: Uuid) -> anyhow::Result<Option<Patient>> {
        let patient = sqlx::query_as::<_, Patient>("SELECT * FROM patients WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
        Ok(patient)
    }

    pub async fn create(pool: &PgPool, req: &CreatePatientRequest) -> anyhow::Result<Patient> {
        let phone = normalize_phone(&req.phone);
        if phone.is_empty() {
            anyhow::bail!("Telefon numarası gerekli");
        }

        let patient = sqlx::query_as::<_, Patient>(
            "INSERT INTO patients
                (full_name, phone, email, birth_date, gender, address, medical_notes, therapist_id, source)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING *",
        )
        .bind(req.full_name.trim())
        .bind(&phone)
        .bind(&req.email)
        .bind(req.birth_date)
        .bind(&req.gender)
        .bind(&req.address)
        .bind(&req.medical_notes)
        .bind(req.therapist_id)
        .bind(&req.source)
        .fetch_one(pool)
        .await?;

        tracing::info!("Patient {} registered (source: {:?})", patient.id, patient.source);
        Ok(patient)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        req: &UpdatePatientRequest,
    ) -> anyhow::Result<Option<Patient>> {
        let phone = req.phone.as_deref().map(normalize_phone);
        let patient = sqlx::query_as::<_, Patient>(
            "UPDATE patients
             SET full_name     = COALESCE($1, full_name),
                 phone         = COALESCE($2, phone),
                 email         = COALESCE($3, email),
                 birth_date    = COALESCE($4, birth_date),
                 gender        = COALESCE($5, gender),
                 address       = COALESCE($6, address),
                 medical_notes = COALESCE($7, medical_notes),
                 therapist_id  = COALESCE($8, therapist_id),
                 source        = COALESCE($9, source),
                 updated_at    = NOW()
             WHERE id = $10
             RETURNING *",
        )
        .bind(&req.full_name)
        .bind(phone)
        .bind(&req.email)
        .bind(req.birth_date)
        .bind(&req.gender)
        .bind(&req.address)
        .bind(&req.medical_notes)
        .bind(req.therapist_id)
        .bind(&req.source)
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(patient)
    }

    pub async fn set_lead_status(
        pool: &PgPool,
        id: Uuid,
        status: LeadStatus,
    ) -> anyhow::Result<Option<Patient>> {
        let patient = sqlx::query_as::<_, Patient>(
            "UPDATE patients SET lead_status = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
        )
        .bind(status.as_str())
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(patient)
    }

    pub async fn is_assigned_to(
        pool: &PgPool,
        patient_id: Uuid,
        therapist_id: Uuid,
    ) -> anyhow::Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM patients WHERE id = $1 AND therapist_id = $2)",
        )
        .bind(patient_id)
        .bind(therapist_id)
        .fetch_one(pool)
        .await?;
        Ok(exists)
    }

    /// Hard-delete; purchases, plans and notes cascade.
    pub async fn delete(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM patients WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
