//! Modelos del flujo de verificación
//!
//! Historial de transiciones, resultados de cross-check, inspecciones
//! y las vistas de lectura del panel de administración.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;

use crate::utils::errors::AppError;

/// Entrada del historial de verificación (solo se inserta, nunca se modifica)
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct VerificationHistoryEntry {
    pub id: i64,
    pub vehicle_id: i64,
    pub admin_id: i64,
    pub admin_name: Option<String>,
    pub previous_status: String,
    pub new_status: String,
    pub substatus: Option<String>,
    pub admin_notes: Option<String>,
    pub correction_items: Option<Json<Vec<String>>>,
    pub verified_at: DateTime<Utc>,
}

/// Tipos de cross-check disponibles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckType {
    Samsat,
    Kir,
    Insurance,
    Duplicate,
}

impl CheckType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckType::Samsat => "samsat",
            CheckType::Kir => "kir",
            CheckType::Insurance => "insurance",
            CheckType::Duplicate => "duplicate",
        }
    }
}

impl fmt::Display for CheckType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "samsat" => Ok(CheckType::Samsat),
            "kir" => Ok(CheckType::Kir),
            "insurance" => Ok(CheckType::Insurance),
            "duplicate" => Ok(CheckType::Duplicate),
            other => Err(AppError::UnknownCheckType(format!(
                "Invalid check type '{}'. Must be one of: samsat, kir, insurance, duplicate",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Passed,
    Failed,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Passed => "passed",
            CheckStatus::Failed => "failed",
        }
    }
}

/// Resultado de un cross-check, tal como se devuelve y se persiste
#[derive(Debug, Clone, Serialize)]
pub struct FraudCheckResult {
    pub vehicle_id: i64,
    pub check_type: CheckType,
    pub status: CheckStatus,
    pub confidence_score: f64,
    pub message: String,
    pub details: Value,
    pub created_at: DateTime<Utc>,
}

/// Campo comparado en la detección de duplicados, en orden de evaluación
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateField {
    RegistrationNumber,
    ChassisNumber,
    EngineNumber,
}

impl DuplicateField {
    pub const ORDER: [DuplicateField; 3] = [
        DuplicateField::RegistrationNumber,
        DuplicateField::ChassisNumber,
        DuplicateField::EngineNumber,
    ];

    /// Nombre de la columna; solo valores fijos, nunca entrada de usuario
    pub fn column(&self) -> &'static str {
        match self {
            DuplicateField::RegistrationNumber => "registration_number",
            DuplicateField::ChassisNumber => "chassis_number",
            DuplicateField::EngineNumber => "engine_number",
        }
    }
}

/// Inspección física programada
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct VehicleInspection {
    pub id: i64,
    pub vehicle_id: i64,
    pub inspector_id: i64,
    pub inspection_type: String,
    pub scheduled_at: DateTime<Utc>,
    pub location: String,
    pub result: String,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Datos para programar una inspección
#[derive(Debug, Clone)]
pub struct InspectionPlan {
    pub vehicle_id: i64,
    pub admin_id: i64,
    pub scheduled_at: DateTime<Utc>,
    pub location: String,
    pub notes: String,
}

/// Fila de las listas de vehículos del panel de verificación
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct VehicleSummary {
    pub id: i64,
    pub registration_number: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub verification_status: String,
    pub verification_substatus: Option<String>,
    pub operational_status: String,
    pub owner_name: Option<String>,
    pub owner_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub days_waiting: i32,
}

/// Prioridad de una solicitud según los días de espera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Urgent,
    High,
    Normal,
}

impl Priority {
    pub fn from_days_waiting(days: i32) -> Self {
        if days > 7 {
            Priority::Urgent
        } else if days > 3 {
            Priority::High
        } else {
            Priority::Normal
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RecentSubmission {
    pub id: i64,
    pub registration_number: String,
    pub owner_name: Option<String>,
    pub owner_type: Option<String>,
    pub verification_status: String,
    pub verification_substatus: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub days_waiting: i32,
    #[sqlx(skip)]
    pub priority: Option<Priority>,
}

impl RecentSubmission {
    pub fn with_priority(mut self) -> Self {
        self.priority = Some(Priority::from_days_waiting(self.days_waiting));
        self
    }
}

/// Verificación atrasada más de siete días
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UrgentItem {
    pub vehicle_id: i64,
    pub registration_number: String,
    pub days_overdue: i32,
    #[sqlx(skip)]
    pub urgency_type: String,
    #[sqlx(skip)]
    pub message: String,
}

impl UrgentItem {
    pub fn overdue(mut self) -> Self {
        self.urgency_type = OVERDUE_VERIFICATION.to_string();
        self.message = format!("Verificación pendiente desde hace {} días", self.days_overdue);
        self
    }
}

/// Contadores del panel
#[derive(Debug, Clone, Default, Serialize, FromRow)]
pub struct DashboardCounts {
    pub pending_count: i64,
    pub needs_correction_count: i64,
    pub under_review_count: i64,
    pub approved_today: i64,
    pub rejected_today: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VerificationDashboard {
    #[serde(flatten)]
    pub counts: DashboardCounts,
    pub recent_submissions: Vec<RecentSubmission>,
    pub urgent_items: Vec<UrgentItem>,
}

pub const OVERDUE_VERIFICATION: &str = "overdue_verification";
