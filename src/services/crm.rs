use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::PgPool;

use crate::models::{
    crm::{FunnelStats, StageCount},
    patient::LeadStatus,
};

fn day_start(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc())
}

/// Assemble funnel stats; every lead status is listed, missing ones as 0.
pub fn build_funnel(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    registrations: i64,
    stage_rows: &[(String, i64)],
    sales: i64,
    converted_patients: i64,
) -> FunnelStats {
    let stages = LeadStatus::ALL
        .iter()
        .map(|status| StageCount {
            lead_status: status.as_str().to_string(),
            count: stage_rows
                .iter()
                .find(|(s, _)| s == status.as_str())
                .map(|(_, n)| *n)
                .unwrap_or(0),
        })
        .collect();

    let conversion_rate = if registrations > 0 {
        converted_patients as f64 / registrations as f64
    } else {
        0.0
    };

    FunnelStats {
        from,
        to,
        registrations,
        stages,
        sales,
        converted_patients,
        conversion_rate,
    }
}

pub struct CrmService;

impl CrmService {
    /// Registrations → sales funnel. `to` is inclusive.
    pub async fn funnel(
        pool: &PgPool,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> anyhow::Result<FunnelStats> {
        let start = from.and_then(day_start);
        let end = to.and_then(day_start).map(|d| d + Duration::days(1));

        let stage_rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT lead_status, COUNT(*)::BIGINT
             FROM patients
             WHERE ($1::TIMESTAMPTZ IS NULL OR created_at >= $1)
               AND ($2::TIMESTAMPTZ IS NULL OR created_at < $2)
             GROUP BY lead_status",
        )
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await?;
        let registrations = stage_rows.iter().map(|(_, n)| n).sum();

        let sales: i64 = sqlx::query_scalar(
            "SELECT COUNT(*)::BIGINT FROM purchases
             WHERE ($1::TIMESTAMPTZ IS NULL OR purchased_at >= $1)
               AND ($2::TIMESTAMPTZ IS NULL OR purchased_at < $2)",
        )
        .bind(start)
        .bind(end)
        .fetch_one(pool)
        .await?;

        let converted: i64 = sqlx::query_scalar(
            "SELECT COUNT(*)::BIGINT FROM patients p
             WHERE ($1::TIMESTAMPTZ IS NULL OR p.created_at >= $1)
               AND ($2::TIMESTAMPTZ IS NULL OR p.created_at < $2)
               AND EXISTS(SELECT 1 FROM purchases pu WHERE pu.patient_id = p.id)",
        )
        .bind(start)
        .bind(end)
        .fetch_one(pool)
        .await?;

        Ok(build_funnel(from, to, registrations, &stage_rows, sales, converted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_stage_in_funnel_order() {
        let rows = vec![("converted".to_string(), 2), ("new".to_string(), 5)];
        let stats = build_funnel(None, None, 7, &rows, 3, 2);

        let names: Vec<_> = stats.stages.iter().map(|s| s.lead_status.as_str()).collect();
        assert_eq!(names, ["new", "contacted", "scheduled", "converted", "lost"]);
        assert_eq!(stats.stages[0].count, 5);
        assert_eq!(stats.stages[1].count, 0);
        assert_eq!(stats.stages[3].count, 2);
        assert!((stats.conversion_rate - 2.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn empty_range_has_zero_rate() {
        let stats = build_funnel(None, None, 0, &[], 0, 0);
        assert_eq!(stats.conversion_rate, 0.0);
        assert!(stats.stages.iter().all(|s| s.count == 0));
    }
}
