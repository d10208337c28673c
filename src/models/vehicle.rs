//! Modelo de Vehicle
//!
//! Estados de verificación del vehículo y la tabla fija que deriva
//! el estado operativo y el subestado a partir del estado destino.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::errors::AppError;

/// Estado principal de verificación (columna `verification_status`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Submitted,
    NeedsCorrection,
    UnderReview,
    PendingInspection,
    Approved,
    Rejected,
}

impl VerificationStatus {
    pub const ALL: [VerificationStatus; 7] = [
        VerificationStatus::Pending,
        VerificationStatus::Submitted,
        VerificationStatus::NeedsCorrection,
        VerificationStatus::UnderReview,
        VerificationStatus::PendingInspection,
        VerificationStatus::Approved,
        VerificationStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Submitted => "submitted",
            VerificationStatus::NeedsCorrection => "needs_correction",
            VerificationStatus::UnderReview => "under_review",
            VerificationStatus::PendingInspection => "pending_inspection",
            VerificationStatus::Approved => "approved",
            VerificationStatus::Rejected => "rejected",
        }
    }

    /// approved y rejected cierran el flujo
    pub fn is_terminal(&self) -> bool {
        matches!(self, VerificationStatus::Approved | VerificationStatus::Rejected)
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VerificationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| AppError::InvalidStatus(format!("Invalid verification status: {}", s)))
    }
}

/// Subestado de verificación (columna `verification_substatus`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationSubstatus {
    AwaitingReview,
    NeedsCorrection,
    UnderReview,
    PendingInspection,
    Approved,
    Rejected,
}

impl VerificationSubstatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationSubstatus::AwaitingReview => "awaiting_review",
            VerificationSubstatus::NeedsCorrection => "needs_correction",
            VerificationSubstatus::UnderReview => "under_review",
            VerificationSubstatus::PendingInspection => "pending_inspection",
            VerificationSubstatus::Approved => "approved",
            VerificationSubstatus::Rejected => "rejected",
        }
    }
}

/// Estado operativo del vehículo (columna `operational_status`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationalStatus {
    Active,
    Inactive,
    PendingVerification,
}

impl OperationalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationalStatus::Active => "active",
            OperationalStatus::Inactive => "inactive",
            OperationalStatus::PendingVerification => "pending_verification",
        }
    }
}

/// Estados a los que un admin puede llevar un vehículo con la transición genérica
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionTarget {
    Approved,
    Rejected,
    NeedsCorrection,
    UnderReview,
    PendingInspection,
}

impl TransitionTarget {
    pub const ALL: [TransitionTarget; 5] = [
        TransitionTarget::Approved,
        TransitionTarget::Rejected,
        TransitionTarget::NeedsCorrection,
        TransitionTarget::UnderReview,
        TransitionTarget::PendingInspection,
    ];

    pub fn status(&self) -> VerificationStatus {
        match self {
            TransitionTarget::Approved => VerificationStatus::Approved,
            TransitionTarget::Rejected => VerificationStatus::Rejected,
            TransitionTarget::NeedsCorrection => VerificationStatus::NeedsCorrection,
            TransitionTarget::UnderReview => VerificationStatus::UnderReview,
            TransitionTarget::PendingInspection => VerificationStatus::PendingInspection,
        }
    }

    /// Tabla fija: estado destino -> (estado operativo, subestado)
    pub fn derived(&self) -> (OperationalStatus, VerificationSubstatus) {
        match self {
            TransitionTarget::Approved => (OperationalStatus::Active, VerificationSubstatus::Approved),
            TransitionTarget::Rejected => (OperationalStatus::Inactive, VerificationSubstatus::Rejected),
            TransitionTarget::NeedsCorrection => (
                OperationalStatus::PendingVerification,
                VerificationSubstatus::NeedsCorrection,
            ),
            TransitionTarget::UnderReview => (
                OperationalStatus::PendingVerification,
                VerificationSubstatus::UnderReview,
            ),
            TransitionTarget::PendingInspection => (
                OperationalStatus::PendingVerification,
                VerificationSubstatus::PendingInspection,
            ),
        }
    }
}

impl FromStr for TransitionTarget {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransitionTarget::ALL
            .into_iter()
            .find(|target| target.status().as_str() == s)
            .ok_or_else(|| {
                AppError::InvalidStatus(format!(
                    "Invalid status '{}'. Must be one of: approved, rejected, needs_correction, under_review, pending_inspection",
                    s
                ))
            })
    }
}

/// Qué hacer si el vehículo ya está en un estado terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalGuard {
    Reject,
    Allow,
}

impl TerminalGuard {
    pub fn check(&self, vehicle_id: i64, current: &str) -> Result<(), AppError> {
        let terminal = current
            .parse::<VerificationStatus>()
            .map(|status| status.is_terminal())
            .unwrap_or(false);

        if *self == TerminalGuard::Reject && terminal {
            return Err(AppError::Conflict(format!(
                "Vehicle {} is already {} and cannot change status",
                vehicle_id, current
            )));
        }
        Ok(())
    }
}

/// Cambio de estado completo que se aplica en una sola transacción
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub verification_status: VerificationStatus,
    pub substatus: VerificationSubstatus,
    pub operational_status: OperationalStatus,
    /// `new_status` que queda en el historial
    pub history_status: VerificationStatus,
    pub notes: String,
    pub admin_id: i64,
    pub correction_items: Vec<String>,
    pub guard: TerminalGuard,
}

impl StatusChange {
    /// Transición genérica según la tabla fija
    pub fn transition(target: TransitionTarget, notes: String, admin_id: i64) -> Self {
        let (operational_status, substatus) = target.derived();
        Self {
            verification_status: target.status(),
            substatus,
            operational_status,
            history_status: target.status(),
            notes,
            admin_id,
            correction_items: Vec::new(),
            guard: TerminalGuard::Reject,
        }
    }

    /// Solicitud de corrección: siempre pending/needs_correction, sin importar el estado actual
    pub fn correction(items: Vec<String>, notes: String, admin_id: i64) -> Self {
        Self {
            verification_status: VerificationStatus::Pending,
            substatus: VerificationSubstatus::NeedsCorrection,
            operational_status: OperationalStatus::PendingVerification,
            history_status: VerificationStatus::NeedsCorrection,
            notes,
            admin_id,
            correction_items: items,
            guard: TerminalGuard::Allow,
        }
    }
}

/// Identificadores usados en la detección de duplicados
#[derive(Debug, Clone, FromRow)]
pub struct VehicleIdentity {
    pub id: i64,
    pub registration_number: String,
    pub chassis_number: String,
    pub engine_number: String,
}

/// Fila de vehículo con los campos de verificación
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct VehicleRecord {
    pub id: i64,
    pub fleet_owner_id: i64,
    pub registration_number: String,
    pub chassis_number: String,
    pub engine_number: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub verification_status: String,
    pub verification_substatus: String,
    pub operational_status: String,
    pub requires_inspection: bool,
    pub inspection_scheduled_at: Option<DateTime<Utc>>,
    pub verified_by: Option<i64>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verification_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
