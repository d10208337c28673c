use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::gps::{GpsDevice, LivePosition, TrackingPoint};
use crate::models::gps_registration::GpsRegistration;
use crate::utils::validation::validate_not_blank;

// Reporte de posición enviado por un dispositivo
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GpsReport {
    #[validate(length(min = 1, max = 50), custom = "validate_not_blank")]
    pub device_id: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    #[validate(range(min = 0.0))]
    pub speed: Option<f64>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BatchReportRequest {
    pub data: Vec<GpsReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub total: usize,
    pub success: usize,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub message: String,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub message: String,
    pub point: TrackingPoint,
}

#[derive(Debug, Serialize)]
pub struct PositionsResponse {
    pub positions: Vec<LivePosition>,
    pub count: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub hours: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeviceHistory {
    pub device_id: String,
    pub hours: i64,
    pub history: Vec<TrackingPoint>,
}

// Solicitud de instalación de GPS
#[derive(Debug, Deserialize, Validate)]
pub struct CreateGpsRegistrationRequest {
    #[validate(length(min = 3, max = 20), custom = "validate_not_blank")]
    pub registration_number: String,
    #[validate(length(min = 1, max = 50), custom = "validate_not_blank")]
    pub vehicle_type: String,
    #[validate(range(min = 1.0))]
    pub capacity_tons: f64,
    pub operator_notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegistrationDecisionRequest {
    #[validate(length(min = 1))]
    pub status: String,
    pub admin_notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegistrationResponse {
    pub message: String,
    pub registration: GpsRegistration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<GpsDevice>,
}

#[derive(Debug, Serialize)]
pub struct RegistrationListResponse {
    pub registrations: Vec<GpsRegistration>,
    pub count: usize,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AssignDeviceRequest {
    #[validate(length(min = 1, max = 50), custom = "validate_not_blank")]
    pub device_id: String,
    #[validate(range(min = 1))]
    pub vehicle_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DeviceStatusRequest {
    #[validate(length(min = 1))]
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct DeviceListResponse {
    pub devices: Vec<GpsDevice>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct DeviceResponse {
    pub message: String,
    pub device: GpsDevice,
}
