//! Modelos de seguimiento GPS
//!
//! Dispositivos, puntos de seguimiento, estado de movimiento derivado
//! y los eventos que se envían a los suscriptores en vivo.

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::errors::AppError;

/// Minutos sin señal a partir de los cuales un dispositivo está offline
pub const OFFLINE_AFTER_MINUTES: i64 = 30;
/// Velocidad por debajo de la cual un vehículo se considera detenido
pub const STOPPED_BELOW_SPEED: f64 = 5.0;
/// Máximo de puntos devueltos por el historial
pub const HISTORY_LIMIT: i64 = 100;

/// Ciclo de vida del dispositivo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    PendingInstallation,
    Installed,
    Active,
    Inactive,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::PendingInstallation => "pending_installation",
            DeviceStatus::Installed => "installed",
            DeviceStatus::Active => "active",
            DeviceStatus::Inactive => "inactive",
        }
    }
}

impl FromStr for DeviceStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_installation" => Ok(DeviceStatus::PendingInstallation),
            "installed" => Ok(DeviceStatus::Installed),
            "active" => Ok(DeviceStatus::Active),
            "inactive" => Ok(DeviceStatus::Inactive),
            other => Err(AppError::InvalidStatus(format!(
                "Invalid device status '{}'. Must be one of: pending_installation, installed, active, inactive",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GpsDevice {
    pub id: i64,
    pub device_id: String,
    pub vehicle_id: Option<i64>,
    pub registration_id: Option<i64>,
    pub status: String,
    pub installed_date: Option<DateTime<Utc>>,
    pub last_signal: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Identificador físico del dispositivo creado al aprobar un registro
pub fn device_id_for_registration(registration_id: i64) -> String {
    format!("GPS{:06}", registration_id)
}

/// Punto ya validado, listo para insertar
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrackingPoint {
    pub device_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub speed: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TrackingPoint {
    pub id: i64,
    pub device_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub speed: f64,
    pub timestamp: DateTime<Utc>,
}

/// Estado de movimiento derivado del último punto (no se persiste)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementStatus {
    Moving,
    Stopped,
    Offline,
}

impl MovementStatus {
    pub fn derive(speed: f64, last_point_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if now - last_point_at > Duration::minutes(OFFLINE_AFTER_MINUTES) {
            MovementStatus::Offline
        } else if speed < STOPPED_BELOW_SPEED {
            MovementStatus::Stopped
        } else {
            MovementStatus::Moving
        }
    }
}

/// Último punto conocido de un dispositivo activo
#[derive(Debug, Clone, FromRow)]
pub struct LatestPositionRow {
    pub device_id: String,
    pub vehicle_id: Option<i64>,
    pub registration_number: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub speed: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivePosition {
    pub device_id: String,
    pub vehicle_id: Option<i64>,
    pub registration_number: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub speed: f64,
    pub timestamp: DateTime<Utc>,
    pub status: MovementStatus,
}

impl LivePosition {
    pub fn from_row(row: LatestPositionRow, now: DateTime<Utc>) -> Self {
        let status = MovementStatus::derive(row.speed, row.timestamp, now);
        Self {
            device_id: row.device_id,
            vehicle_id: row.vehicle_id,
            registration_number: row.registration_number,
            latitude: row.latitude,
            longitude: row.longitude,
            speed: row.speed,
            timestamp: row.timestamp,
            status,
        }
    }
}

/// Evento enviado por el hub a los suscriptores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveEvent {
    GpsUpdate {
        device_id: String,
        latitude: f64,
        longitude: f64,
        speed: f64,
        timestamp: DateTime<Utc>,
    },
    PositionsUpdate {
        positions: Vec<LivePosition>,
        timestamp: DateTime<Utc>,
    },
}

impl From<&TrackingPoint> for LiveEvent {
    fn from(point: &TrackingPoint) -> Self {
        LiveEvent::GpsUpdate {
            device_id: point.device_id.clone(),
            latitude: point.latitude,
            longitude: point.longitude,
            speed: point.speed,
            timestamp: point.timestamp,
        }
    }
}
