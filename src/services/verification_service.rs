//! Motor de verificación de vehículos
//!
//! Transiciones de estado, solicitudes de corrección, inspecciones y
//! cross-checks. Cada cambio de estado se confirma junto con su entrada de
//! historial; la notificación al dueño se encola después del commit y nunca
//! afecta la respuesta.

use std::sync::Arc;

use chrono::Utc;

use crate::dto::verification_dto::TransitionReceipt;
use crate::models::notification::TemplateKey;
use crate::models::vehicle::{StatusChange, TransitionTarget, VehicleRecord, VerificationStatus};
use crate::models::verification::{
    CheckType, FraudCheckResult, InspectionPlan, VehicleInspection, VehicleSummary,
    VerificationDashboard, VerificationHistoryEntry,
};
use crate::repositories::verification_repository::VerificationStore;
use crate::services::cross_check::{duplicate_check, RegistryChecks};
use crate::services::notification_service::{NotificationDispatcher, NotificationJob};
use crate::utils::errors::{bad_request_error, not_found_error, AppResult};
use crate::utils::sanitize::sanitize_for_log;
use crate::utils::validation::parse_inspection_date;

pub struct VerificationService {
    store: Arc<dyn VerificationStore>,
    dispatcher: Arc<NotificationDispatcher>,
    registry_checks: RegistryChecks,
}

impl VerificationService {
    pub fn new(store: Arc<dyn VerificationStore>, dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self::with_registry_checks(store, dispatcher, RegistryChecks::simulated())
    }

    pub fn with_registry_checks(
        store: Arc<dyn VerificationStore>,
        dispatcher: Arc<NotificationDispatcher>,
        registry_checks: RegistryChecks,
    ) -> Self {
        Self {
            store,
            dispatcher,
            registry_checks,
        }
    }

    pub async fn find_vehicle(&self, vehicle_id: i64) -> AppResult<VehicleRecord> {
        self.store
            .find_vehicle(vehicle_id)
            .await?
            .ok_or_else(|| not_found_error("Vehicle", vehicle_id))
    }

    /// Transición genérica. El estado destino se valida antes de tocar nada.
    ///
    /// Notifica al dueño según el destino: `approved`, `rejected` (notas como
    /// motivo) y `needs_correction` (notas como puntos a corregir). `under_review`
    /// y `pending_inspection` no envían nada.
    pub async fn transition(
        &self,
        vehicle_id: i64,
        status: &str,
        notes: &str,
        admin_id: i64,
    ) -> AppResult<TransitionReceipt> {
        let target: TransitionTarget = status.parse()?;
        let change = StatusChange::transition(target, notes.to_string(), admin_id);

        let previous_status = self.store.apply_status_change(vehicle_id, &change).await?;

        log::info!(
            "✅ Vehículo {}: {} -> {} (admin {})",
            vehicle_id,
            sanitize_for_log(&previous_status),
            change.verification_status,
            admin_id
        );

        if let Some(job) = transition_notification(vehicle_id, target, notes) {
            self.dispatcher.enqueue(job);
        }

        Ok(receipt(vehicle_id, previous_status, &change))
    }

    /// Fuerza pending/needs_correction sin importar el estado actual
    pub async fn request_correction(
        &self,
        vehicle_id: i64,
        correction_items: &[String],
        notes: &str,
        admin_id: i64,
    ) -> AppResult<TransitionReceipt> {
        let items: Vec<String> = correction_items
            .iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect();

        if items.is_empty() {
            return Err(bad_request_error("At least one correction item is required"));
        }

        let change = StatusChange::correction(items, notes.to_string(), admin_id);
        let previous_status = self.store.apply_status_change(vehicle_id, &change).await?;

        log::info!(
            "✏️ Corrección solicitada para vehículo {} ({} ítems, admin {})",
            vehicle_id,
            change.correction_items.len(),
            admin_id
        );

        self.dispatcher.enqueue(
            NotificationJob::new(vehicle_id, TemplateKey::NeedsCorrection)
                .with_variable("correction_items", change.correction_items.join(", "))
                .with_variable("notes", notes),
        );

        Ok(receipt(vehicle_id, previous_status, &change))
    }

    pub async fn schedule_inspection(
        &self,
        vehicle_id: i64,
        inspection_date: &str,
        location: &str,
        notes: &str,
        admin_id: i64,
    ) -> AppResult<VehicleInspection> {
        let scheduled_at = parse_inspection_date(inspection_date)?;

        let plan = InspectionPlan {
            vehicle_id,
            admin_id,
            scheduled_at,
            location: location.trim().to_string(),
            notes: notes.to_string(),
        };

        let inspection = self.store.schedule_inspection(&plan).await?;

        log::info!(
            "🔍 Inspección programada para vehículo {} el {}",
            vehicle_id,
            scheduled_at.format("%Y-%m-%d %H:%M")
        );

        self.dispatcher.enqueue(
            NotificationJob::new(vehicle_id, TemplateKey::InspectionScheduled)
                .with_variable("date", scheduled_at.format("%Y-%m-%d %H:%M").to_string())
                .with_variable("location", plan.location.clone()),
        );

        Ok(inspection)
    }

    /// El resultado se devuelve aunque falle su persistencia
    pub async fn cross_check(&self, vehicle_id: i64, check_type: &str) -> AppResult<FraudCheckResult> {
        let check_type: CheckType = check_type.parse()?;

        let identity = self
            .store
            .find_identity(vehicle_id)
            .await?
            .ok_or_else(|| not_found_error("Vehicle", vehicle_id))?;

        let finding = match check_type {
            CheckType::Samsat => self.registry_checks.samsat.run(&identity).await?,
            CheckType::Kir => self.registry_checks.kir.run(&identity).await?,
            CheckType::Insurance => self.registry_checks.insurance.run(&identity).await?,
            CheckType::Duplicate => duplicate_check(self.store.as_ref(), &identity).await?,
        };

        let result = FraudCheckResult {
            vehicle_id,
            check_type,
            status: finding.status,
            confidence_score: finding.confidence,
            message: finding.message,
            details: finding.details,
            created_at: Utc::now(),
        };

        if let Err(e) = self.store.record_fraud_check(&result).await {
            log::error!(
                "❌ No se guardó el cross-check {} del vehículo {}: {}",
                check_type,
                vehicle_id,
                sanitize_for_log(&e.to_string())
            );
        }

        Ok(result)
    }

    pub async fn vehicles_by_status(&self, status: &str) -> AppResult<(VerificationStatus, Vec<VehicleSummary>)> {
        let status: VerificationStatus = status.parse()?;
        let vehicles = self.store.vehicles_by_status(status).await?;
        Ok((status, vehicles))
    }

    pub async fn pending_queue(&self) -> AppResult<Vec<VehicleSummary>> {
        self.store.pending_queue().await
    }

    pub async fn history(&self, vehicle_id: i64) -> AppResult<Vec<VerificationHistoryEntry>> {
        self.find_vehicle(vehicle_id).await?;
        self.store.history(vehicle_id).await
    }

    pub async fn dashboard(&self) -> AppResult<VerificationDashboard> {
        self.store.dashboard().await
    }
}

/// Plantilla por destino; under_review y pending_inspection no tienen plantilla propia
fn transition_notification(vehicle_id: i64, target: TransitionTarget, notes: &str) -> Option<NotificationJob> {
    match target {
        TransitionTarget::Approved => Some(NotificationJob::new(vehicle_id, TemplateKey::Approved)),
        TransitionTarget::Rejected => Some(
            NotificationJob::new(vehicle_id, TemplateKey::Rejected).with_variable("reason", notes),
        ),
        TransitionTarget::NeedsCorrection => Some(
            NotificationJob::new(vehicle_id, TemplateKey::NeedsCorrection)
                .with_variable("correction_items", notes)
                .with_variable("notes", notes),
        ),
        TransitionTarget::UnderReview | TransitionTarget::PendingInspection => None,
    }
}

fn receipt(vehicle_id: i64, previous_status: String, change: &StatusChange) -> TransitionReceipt {
    TransitionReceipt {
        vehicle_id,
        previous_status,
        new_status: change.verification_status,
        substatus: change.substatus,
        operational_status: change.operational_status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_per_target() {
        let approved = transition_notification(1, TransitionTarget::Approved, "ok").unwrap();
        assert_eq!(approved.template, TemplateKey::Approved);

        let rejected = transition_notification(1, TransitionTarget::Rejected, "STNK palsu").unwrap();
        assert_eq!(rejected.template, TemplateKey::Rejected);
        assert_eq!(rejected.variables.get("reason").map(String::as_str), Some("STNK palsu"));

        let correction =
            transition_notification(1, TransitionTarget::NeedsCorrection, "foto STNK borrosa").unwrap();
        assert_eq!(correction.template, TemplateKey::NeedsCorrection);
        assert_eq!(
            correction.variables.get("correction_items").map(String::as_str),
            Some("foto STNK borrosa")
        );

        assert!(transition_notification(1, TransitionTarget::UnderReview, "").is_none());
        assert!(transition_notification(1, TransitionTarget::PendingInspection, "").is_none());
    }
}
