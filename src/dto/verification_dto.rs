use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::vehicle::{OperationalStatus, VerificationStatus, VerificationSubstatus};
use crate::models::verification::{
    FraudCheckResult, VehicleInspection, VehicleSummary, VerificationDashboard,
    VerificationHistoryEntry,
};

// Request para cambiar el estado de verificación
#[derive(Debug, Deserialize, Validate)]
pub struct VerifyVehicleRequest {
    #[validate(length(min = 1))]
    pub status: String,
    #[serde(default)]
    pub notes: String,
}

// Request para solicitar correcciones al dueño
#[derive(Debug, Deserialize, Validate)]
pub struct CorrectionRequest {
    #[serde(default)]
    pub notes: String,
    #[validate(length(min = 1, message = "At least one correction item is required"))]
    pub correction_items: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CrossCheckRequest {
    #[validate(length(min = 1))]
    pub check_type: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ScheduleInspectionRequest {
    #[validate(length(min = 1))]
    pub inspection_date: String,
    #[validate(length(min = 1, max = 255))]
    pub location: String,
    #[serde(default)]
    pub notes: String,
}

/// Resultado de una transición aplicada
#[derive(Debug, Clone, Serialize)]
pub struct TransitionReceipt {
    pub vehicle_id: i64,
    pub previous_status: String,
    pub new_status: VerificationStatus,
    pub substatus: VerificationSubstatus,
    pub operational_status: OperationalStatus,
}

#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    pub message: String,
    #[serde(flatten)]
    pub receipt: TransitionReceipt,
}

#[derive(Debug, Serialize)]
pub struct VehicleListResponse {
    pub vehicles: Vec<VehicleSummary>,
    pub status: VerificationStatus,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct PendingQueueResponse {
    pub vehicles: Vec<VehicleSummary>,
    pub count: usize,
}

// Entrada de historial con la lista de correcciones ya decodificada
#[derive(Debug, Serialize)]
pub struct HistoryEntryResponse {
    pub id: i64,
    pub admin_id: i64,
    pub admin_name: Option<String>,
    pub previous_status: String,
    pub new_status: String,
    pub substatus: Option<String>,
    pub admin_notes: Option<String>,
    pub correction_items: Vec<String>,
    pub verified_at: DateTime<Utc>,
}

impl From<VerificationHistoryEntry> for HistoryEntryResponse {
    fn from(entry: VerificationHistoryEntry) -> Self {
        Self {
            id: entry.id,
            admin_id: entry.admin_id,
            admin_name: entry.admin_name,
            previous_status: entry.previous_status,
            new_status: entry.new_status,
            substatus: entry.substatus,
            admin_notes: entry.admin_notes,
            correction_items: entry.correction_items.map(|items| items.0).unwrap_or_default(),
            verified_at: entry.verified_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub vehicle_id: i64,
    pub history: Vec<HistoryEntryResponse>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub dashboard: VerificationDashboard,
}

#[derive(Debug, Serialize)]
pub struct CrossCheckResponse {
    pub result: FraudCheckResult,
}

#[derive(Debug, Serialize)]
pub struct InspectionScheduledResponse {
    pub message: String,
    pub inspection_date: DateTime<Utc>,
    pub location: String,
    pub inspection: VehicleInspection,
}
