use sqlx::PgPool;
use uuid::Uuid;

use crate::models::package::{
    CreatePackageRequest, CreatePurchaseRequest, Package, Purchase, PurchaseWithPackage,
    UpdatePackageRequest, UpdatePurchaseRequest,
};

const PURCHASE_LISTING: &str = "SELECT pu.id, pu.patient_id, pa.full_name AS patient_name,
        pu.package_id, pk.name AS package_name, pu.sessions_total, pu.sessions_used,
        pu.amount_paid, pu.payment_method, pu.status, pu.purchased_at
     FROM purchases pu
     JOIN patients pa ON pa.id = pu.patient_id
     JOIN packages pk ON pk.id = pu.package_id";

fn check_session_count(count: i32) -> anyhow::Result<()> {
    if count <= 0 {
        anyhow::bail!("Seans sayısı pozitif olmalıdır");
    }
    Ok(())
}

pub struct PackageService;

impl PackageService {
    pub async fn list(pool: &PgPool, active_only: bool) -> anyhow::Result<Vec<Package>> {
        let packages = sqlx::query_as::<_, Package>(
            "SELECT * FROM packages WHERE ($1 = FALSE OR is_active = TRUE) ORDER BY price",
        )
        .bind(active_only)
        .fetch_all(pool)
        .await?;
        Ok(packages)
    }

    pub async fn create(pool: &PgPool, req: &CreatePackageRequest) -> anyhow::Result<Package> {
        check_session_count(req.session_count)?;
        let package = sqlx::query_as::<_, Package>(
            "INSERT INTO packages (name, description, session_count, price)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(&req.name)
        .bind(&req.description)
        .bind(req.session_count)
        .bind(req.price)
        .fetch_one(pool)
        .await?;
        Ok(package)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        req: &UpdatePackageRequest,
    ) -> anyhow::Result<Option<Package>> {
        if let Some(count) = req.session_count {
            check_session_count(count)?;
        }
        let package = sqlx::query_as::<_, Package>(
            "UPDATE packages
             SET name          = COALESCE($1, name),
                 description   = COALESCE($2, description),
                 session_count = COALESCE($3, session_count),
                 price         = COALESCE($4, price),
                 is_active     = COALESCE($5, is_active),
                 updated_at    = NOW()
             WHERE id = $6
             RETURNING *",
        )
        .bind(&req.name)
        .bind(&req.description)
        .bind(req.session_count)
        .bind(req.price)
        .bind(req.is_active)
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(package)
    }

    /// Packages with sales are deactivated instead of removed.
    pub async fn delete(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let sold: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM purchases WHERE package_id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await?;

        let res = if sold {
            sqlx::query("UPDATE packages SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(pool)
                .await?
        } else {
            sqlx::query("DELETE FROM packages WHERE id = $1")
                .bind(id)
                .execute(pool)
                .await?
        };
        Ok(res.rows_affected() > 0)
    }
}

pub struct PurchaseService;

impl PurchaseService {
    pub async fn list(
        pool: &PgPool,
        patient_id: Option<Uuid>,
    ) -> anyhow::Result<Vec<PurchaseWithPackage>> {
        let purchases = sqlx::query_as::<_, PurchaseWithPackage>(&format!(
            "{PURCHASE_LISTING}
             WHERE ($1::UUID IS NULL OR pu.patient_id = $1)
             ORDER BY pu.purchased_at DESC"
        ))
        .bind(patient_id)
        .fetch_all(pool)
        .await?;
        Ok(purchases)
    }

    /// Record a sale: sessions come from the package and the patient's lead
    /// moves to `converted`.
    pub async fn create(
        pool: &PgPool,
        req: &CreatePurchaseRequest,
        sold_by: Uuid,
    ) -> anyhow::Result<Purchase> {
        let mut tx = pool.begin().await?;

        let package = sqlx::query_as::<_, Package>(
            "SELECT * FROM packages WHERE id = $1 AND is_active = TRUE",
        )
        .bind(req.package_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Paket bulunamadı"))?;

        let purchase = sqlx::query_as::<_, Purchase>(
            "INSERT INTO purchases
                (patient_id, package_id, sessions_total, amount_paid, payment_method, sold_by)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(req.patient_id)
        .bind(package.id)
        .bind(package.session_count)
        .bind(req.amount_paid.unwrap_or(package.price))
        .bind(&req.payment_method)
        .bind(sold_by)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE patients SET lead_status = 'converted', updated_at = NOW() WHERE id = $1")
            .bind(req.patient_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            "Purchase {} recorded: patient {} bought package {}",
            purchase.id,
            purchase.patient_id,
            purchase.package_id
        );
        Ok(purchase)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        req: &UpdatePurchaseRequest,
    ) -> anyhow::Result<Option<Purchase>> {
        let purchase = sqlx::query_as::<_, Purchase>(
            "UPDATE purchases
             SET amount_paid    = COALESCE($1, amount_paid),
                 payment_method = COALESCE($2, payment_method),
                 status         = COALESCE($3, status)
             WHERE id = $4
             RETURNING *",
        )
        .bind(req.amount_paid)
        .bind(&req.payment_method)
        .bind(req.status.map(|s| s.as_str()))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(purchase)
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM purchases WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_count_must_be_positive() {
        assert!(check_session_count(10).is_ok());
        assert_eq!(
            check_session_count(0).unwrap_err().to_string(),
            "Seans sayısı pozitif olmalıdır"
        );
        assert!(check_session_count(-3).is_err());
    }
}
