//! Registro de vehículos para instalación de GPS

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::errors::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GpsRegistration {
    pub id: i64,
    pub registration_number: String,
    pub vehicle_type: String,
    pub capacity_tons: f64,
    pub operator_notes: Option<String>,
    pub status: String,
    pub admin_notes: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewGpsRegistration {
    pub registration_number: String,
    pub vehicle_type: String,
    pub capacity_tons: f64,
    pub operator_notes: Option<String>,
}

/// Decisión del admin sobre un registro
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationDecision {
    Approved,
    Rejected,
}

impl RegistrationDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationDecision::Approved => "approved",
            RegistrationDecision::Rejected => "rejected",
        }
    }
}

impl FromStr for RegistrationDecision {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(RegistrationDecision::Approved),
            "rejected" => Ok(RegistrationDecision::Rejected),
            other => Err(AppError::InvalidStatus(format!(
                "Invalid decision '{}'. Must be approved or rejected",
                other
            ))),
        }
    }
}
