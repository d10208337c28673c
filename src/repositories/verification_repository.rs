//! Persistencia del flujo de verificación de vehículos

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use crate::models::vehicle::{StatusChange, VehicleIdentity, VehicleRecord, VerificationStatus};
use crate::models::verification::{
    DashboardCounts, DuplicateField, FraudCheckResult, InspectionPlan, RecentSubmission,
    UrgentItem, VehicleInspection, VehicleSummary, VerificationDashboard,
    VerificationHistoryEntry,
};
use crate::repositories::rows::decode_lenient;
use crate::utils::errors::{not_found_error, AppResult};

/// Operaciones de almacenamiento que necesita el motor de verificación
#[async_trait]
pub trait VerificationStore: Send + Sync {
    async fn find_vehicle(&self, vehicle_id: i64) -> AppResult<Option<VehicleRecord>>;

    /// Aplica el cambio y agrega la entrada de historial en una transacción.
    /// Devuelve el estado previo.
    async fn apply_status_change(&self, vehicle_id: i64, change: &StatusChange) -> AppResult<String>;

    async fn schedule_inspection(&self, plan: &InspectionPlan) -> AppResult<VehicleInspection>;

    async fn find_identity(&self, vehicle_id: i64) -> AppResult<Option<VehicleIdentity>>;

    async fn count_duplicates(
        &self,
        field: DuplicateField,
        value: &str,
        exclude_vehicle_id: i64,
    ) -> AppResult<i64>;

    async fn record_fraud_check(&self, result: &FraudCheckResult) -> AppResult<()>;

    async fn vehicles_by_status(&self, status: VerificationStatus) -> AppResult<Vec<VehicleSummary>>;

    async fn pending_queue(&self) -> AppResult<Vec<VehicleSummary>>;

    async fn history(&self, vehicle_id: i64) -> AppResult<Vec<VerificationHistoryEntry>>;

    async fn dashboard(&self) -> AppResult<VerificationDashboard>;
}

const SUMMARY_SELECT: &str = r#"
    SELECT v.id, v.registration_number, v.brand, v.model,
           v.verification_status, v.verification_substatus, v.operational_status,
           COALESCE(fo.company_name, u.full_name) AS owner_name,
           CASE WHEN fo.company_name IS NOT NULL THEN 'company' ELSE 'individual' END AS owner_type,
           v.created_at,
           EXTRACT(DAY FROM (NOW() - v.created_at))::INT AS days_waiting
    FROM vehicles v
    LEFT JOIN fleet_owners fo ON fo.id = v.fleet_owner_id
    LEFT JOIN users u ON u.id = fo.user_id
"#;

pub struct VerificationRepository {
    pool: PgPool,
}

impl VerificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VerificationStore for VerificationRepository {
    async fn find_vehicle(&self, vehicle_id: i64) -> AppResult<Option<VehicleRecord>> {
        let vehicle = sqlx::query_as::<_, VehicleRecord>(
            r#"
            SELECT id, fleet_owner_id, registration_number, chassis_number, engine_number,
                   brand, model, verification_status, verification_substatus, operational_status,
                   requires_inspection, inspection_scheduled_at, verified_by, verified_at,
                   verification_notes, created_at
            FROM vehicles
            WHERE id = $1
            "#,
        )
        .bind(vehicle_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(vehicle)
    }

    async fn apply_status_change(&self, vehicle_id: i64, change: &StatusChange) -> AppResult<String> {
        let mut tx = self.pool.begin().await?;

        // FOR UPDATE: el estado previo del historial es el que quedó confirmado
        let previous_status: String = sqlx::query_scalar(
            "SELECT verification_status FROM vehicles WHERE id = $1 FOR UPDATE",
        )
        .bind(vehicle_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| not_found_error("Vehicle", vehicle_id))?;

        change.guard.check(vehicle_id, &previous_status)?;

        sqlx::query(
            r#"
            UPDATE vehicles
            SET verification_status = $1,
                verification_substatus = $2,
                operational_status = $3,
                verification_notes = $4,
                verified_by = $5,
                verified_at = NOW(),
                updated_at = NOW()
            WHERE id = $6
            "#,
        )
        .bind(change.verification_status.as_str())
        .bind(change.substatus.as_str())
        .bind(change.operational_status.as_str())
        .bind(&change.notes)
        .bind(change.admin_id)
        .bind(vehicle_id)
        .execute(&mut *tx)
        .await?;

        let correction_items = if change.correction_items.is_empty() {
            None
        } else {
            Some(Json(&change.correction_items))
        };

        sqlx::query(
            r#"
            INSERT INTO verification_history
                (vehicle_id, admin_id, previous_status, new_status, substatus, admin_notes, correction_items)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(vehicle_id)
        .bind(change.admin_id)
        .bind(&previous_status)
        .bind(change.history_status.as_str())
        .bind(change.substatus.as_str())
        .bind(&change.notes)
        .bind(correction_items)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(previous_status)
    }

    async fn schedule_inspection(&self, plan: &InspectionPlan) -> AppResult<VehicleInspection> {
        let mut tx = self.pool.begin().await?;

        sqlx::query_scalar::<_, i64>("SELECT id FROM vehicles WHERE id = $1 FOR UPDATE")
            .bind(plan.vehicle_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| not_found_error("Vehicle", plan.vehicle_id))?;

        sqlx::query(
            r#"
            UPDATE vehicles
            SET verification_substatus = 'pending_inspection',
                inspection_scheduled_at = $1,
                requires_inspection = TRUE,
                updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(plan.scheduled_at)
        .bind(plan.vehicle_id)
        .execute(&mut *tx)
        .await?;

        let notes = Some(plan.notes.as_str()).filter(|n| !n.trim().is_empty());

        let inspection = sqlx::query_as::<_, VehicleInspection>(
            r#"
            INSERT INTO vehicle_inspections
                (vehicle_id, inspector_id, inspection_type, scheduled_at, location, result, notes)
            VALUES ($1, $2, 'physical', $3, $4, 'pending', $5)
            RETURNING id, vehicle_id, inspector_id, inspection_type, scheduled_at,
                      location, result, completed_at, notes
            "#,
        )
        .bind(plan.vehicle_id)
        .bind(plan.admin_id)
        .bind(plan.scheduled_at)
        .bind(&plan.location)
        .bind(notes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(inspection)
    }

    async fn find_identity(&self, vehicle_id: i64) -> AppResult<Option<VehicleIdentity>> {
        let identity = sqlx::query_as::<_, VehicleIdentity>(
            "SELECT id, registration_number, chassis_number, engine_number FROM vehicles WHERE id = $1",
        )
        .bind(vehicle_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(identity)
    }

    async fn count_duplicates(
        &self,
        field: DuplicateField,
        value: &str,
        exclude_vehicle_id: i64,
    ) -> AppResult<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM vehicles WHERE {} = $1 AND id != $2",
            field.column()
        );

        let count: i64 = sqlx::query_scalar(&sql)
            .bind(value)
            .bind(exclude_vehicle_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn record_fraud_check(&self, result: &FraudCheckResult) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO fraud_checks (vehicle_id, check_type, result, confidence_score, details, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(result.vehicle_id)
        .bind(result.check_type.as_str())
        .bind(result.status.as_str())
        .bind(result.confidence_score)
        .bind(Json(&result.details))
        .bind(result.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn vehicles_by_status(&self, status: VerificationStatus) -> AppResult<Vec<VehicleSummary>> {
        let sql = format!(
            "{} WHERE v.verification_status = $1 OR v.verification_substatus = $1 ORDER BY v.created_at DESC",
            SUMMARY_SELECT
        );

        let rows = sqlx::query(&sql)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?;

        Ok(decode_lenient(
            "vehicles_by_status",
            rows.iter().map(VehicleSummary::from_row),
        ))
    }

    async fn pending_queue(&self) -> AppResult<Vec<VehicleSummary>> {
        let sql = format!(
            r#"{}
            WHERE v.verification_status IN ('pending', 'submitted')
               OR v.verification_substatus IN ('awaiting_review', 'needs_correction', 'under_review')
            ORDER BY v.created_at ASC"#,
            SUMMARY_SELECT
        );

        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        Ok(decode_lenient(
            "pending_queue",
            rows.iter().map(VehicleSummary::from_row),
        ))
    }

    async fn history(&self, vehicle_id: i64) -> AppResult<Vec<VerificationHistoryEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT h.id, h.vehicle_id, h.admin_id, u.full_name AS admin_name,
                   h.previous_status, h.new_status, h.substatus, h.admin_notes,
                   h.correction_items, h.verified_at
            FROM verification_history h
            LEFT JOIN users u ON u.id = h.admin_id
            WHERE h.vehicle_id = $1
            ORDER BY h.verified_at DESC, h.id DESC
            "#,
        )
        .bind(vehicle_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(decode_lenient(
            "verification_history",
            rows.iter().map(VerificationHistoryEntry::from_row),
        ))
    }

    async fn dashboard(&self) -> AppResult<VerificationDashboard> {
        let counts = sqlx::query_as::<_, DashboardCounts>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE verification_status IN ('pending', 'submitted')
                    OR verification_substatus IN ('awaiting_review', 'needs_correction', 'under_review')) AS pending_count,
                COUNT(*) FILTER (WHERE verification_substatus = 'needs_correction') AS needs_correction_count,
                COUNT(*) FILTER (WHERE verification_substatus = 'under_review') AS under_review_count,
                COUNT(*) FILTER (WHERE verification_status = 'approved' AND DATE(verified_at) = CURRENT_DATE) AS approved_today,
                COUNT(*) FILTER (WHERE verification_status = 'rejected' AND DATE(verified_at) = CURRENT_DATE) AS rejected_today
            FROM vehicles
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let recent_rows = sqlx::query(
            r#"
            SELECT v.id, v.registration_number,
                   COALESCE(fo.company_name, u.full_name) AS owner_name,
                   CASE WHEN fo.company_name IS NOT NULL THEN 'company' ELSE 'individual' END AS owner_type,
                   v.verification_status, v.verification_substatus,
                   v.created_at AS submitted_at,
                   EXTRACT(DAY FROM (NOW() - v.created_at))::INT AS days_waiting
            FROM vehicles v
            LEFT JOIN fleet_owners fo ON fo.id = v.fleet_owner_id
            LEFT JOIN users u ON u.id = fo.user_id
            WHERE v.verification_status IN ('pending', 'submitted', 'needs_correction', 'under_review')
            ORDER BY v.created_at DESC
            LIMIT 10
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let urgent_rows = sqlx::query(
            r#"
            SELECT v.id AS vehicle_id, v.registration_number,
                   EXTRACT(DAY FROM (NOW() - v.created_at))::INT AS days_overdue
            FROM vehicles v
            WHERE v.verification_status IN ('pending', 'submitted', 'under_review')
              AND v.created_at < NOW() - INTERVAL '7 days'
            ORDER BY v.created_at ASC
            LIMIT 5
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let recent_submissions = decode_lenient(
            "recent_submissions",
            recent_rows.iter().map(RecentSubmission::from_row),
        )
        .into_iter()
        .map(RecentSubmission::with_priority)
        .collect();

        let urgent_items = decode_lenient("urgent_items", urgent_rows.iter().map(UrgentItem::from_row))
            .into_iter()
            .map(UrgentItem::overdue)
            .collect();

        Ok(VerificationDashboard {
            counts,
            recent_submissions,
            urgent_items,
        })
    }
}
