#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::types::Json;

use fleet_tms::config::EnvironmentConfig;
use fleet_tms::middleware::auth::JwtKeys;
use fleet_tms::models::auth::UserRole;
use fleet_tms::models::gps::{
    DeviceStatus, GpsDevice, LatestPositionRow, NewTrackingPoint, TrackingPoint, HISTORY_LIMIT,
};
use fleet_tms::models::gps_registration::{GpsRegistration, NewGpsRegistration, RegistrationDecision};
use fleet_tms::models::notification::{NewNotification, Notification, NotificationTemplate, Recipient};
use fleet_tms::models::vehicle::{StatusChange, VehicleIdentity, VehicleRecord, VerificationStatus};
use fleet_tms::models::verification::{
    DuplicateField, FraudCheckResult, InspectionPlan, VehicleInspection, VehicleSummary,
    VerificationDashboard, VerificationHistoryEntry,
};
use fleet_tms::repositories::{
    DeviceStore, NotificationStore, RegistrationStore, TrackingStore, VerificationStore,
};
use fleet_tms::services::{BackgroundTask, HubConfig, TrackingHub};
use fleet_tms::state::{AppState, Stores};
use fleet_tms::utils::errors::{not_found_error, AppResult};

pub const JWT_SECRET: &str = "integration-test-secret";

// ---------------------------------------------------------------------------
// Verificación
// ---------------------------------------------------------------------------

#[derive(Default)]
struct VerificationData {
    vehicles: HashMap<i64, VehicleRecord>,
    history: Vec<VerificationHistoryEntry>,
    inspections: Vec<VehicleInspection>,
    fraud_checks: Vec<FraudCheckResult>,
}

#[derive(Default)]
pub struct MemoryVerificationStore {
    data: Mutex<VerificationData>,
}

impl MemoryVerificationStore {
    pub fn add_vehicle(&self, id: i64, registration: &str, chassis: &str, engine: &str, status: &str) {
        let vehicle = VehicleRecord {
            id,
            fleet_owner_id: 1,
            registration_number: registration.to_string(),
            chassis_number: chassis.to_string(),
            engine_number: engine.to_string(),
            brand: Some("Hino".to_string()),
            model: Some("Dutro".to_string()),
            verification_status: status.to_string(),
            verification_substatus: "awaiting_review".to_string(),
            operational_status: "pending_verification".to_string(),
            requires_inspection: false,
            inspection_scheduled_at: None,
            verified_by: None,
            verified_at: None,
            verification_notes: None,
            created_at: Utc::now() - Duration::days(2),
        };
        self.data.lock().unwrap().vehicles.insert(id, vehicle);
    }

    pub fn vehicle(&self, id: i64) -> VehicleRecord {
        self.data.lock().unwrap().vehicles[&id].clone()
    }

    pub fn history_for(&self, id: i64) -> Vec<VerificationHistoryEntry> {
        self.data
            .lock()
            .unwrap()
            .history
            .iter()
            .filter(|entry| entry.vehicle_id == id)
            .cloned()
            .collect()
    }

    pub fn fraud_checks(&self) -> Vec<FraudCheckResult> {
        self.data.lock().unwrap().fraud_checks.clone()
    }

    pub fn inspections(&self) -> Vec<VehicleInspection> {
        self.data.lock().unwrap().inspections.clone()
    }

    fn summary(vehicle: &VehicleRecord) -> VehicleSummary {
        VehicleSummary {
            id: vehicle.id,
            registration_number: vehicle.registration_number.clone(),
            brand: vehicle.brand.clone(),
            model: vehicle.model.clone(),
            verification_status: vehicle.verification_status.clone(),
            verification_substatus: Some(vehicle.verification_substatus.clone()),
            operational_status: vehicle.operational_status.clone(),
            owner_name: Some("PT Logistik Nusantara".to_string()),
            owner_type: Some("company".to_string()),
            created_at: vehicle.created_at,
            days_waiting: (Utc::now() - vehicle.created_at).num_days() as i32,
        }
    }
}

#[async_trait]
impl VerificationStore for MemoryVerificationStore {
    async fn find_vehicle(&self, vehicle_id: i64) -> AppResult<Option<VehicleRecord>> {
        Ok(self.data.lock().unwrap().vehicles.get(&vehicle_id).cloned())
    }

    async fn apply_status_change(&self, vehicle_id: i64, change: &StatusChange) -> AppResult<String> {
        let mut data = self.data.lock().unwrap();

        let vehicle = data
            .vehicles
            .get_mut(&vehicle_id)
            .ok_or_else(|| not_found_error("Vehicle", vehicle_id))?;

        let previous_status = vehicle.verification_status.clone();
        change.guard.check(vehicle_id, &previous_status)?;

        vehicle.verification_status = change.verification_status.as_str().to_string();
        vehicle.verification_substatus = change.substatus.as_str().to_string();
        vehicle.operational_status = change.operational_status.as_str().to_string();
        vehicle.verification_notes = Some(change.notes.clone());
        vehicle.verified_by = Some(change.admin_id);
        vehicle.verified_at = Some(Utc::now());

        let id = data.history.len() as i64 + 1;
        data.history.push(VerificationHistoryEntry {
            id,
            vehicle_id,
            admin_id: change.admin_id,
            admin_name: Some("Admin Verifikasi".to_string()),
            previous_status: previous_status.clone(),
            new_status: change.history_status.as_str().to_string(),
            substatus: Some(change.substatus.as_str().to_string()),
            admin_notes: Some(change.notes.clone()),
            correction_items: (!change.correction_items.is_empty())
                .then(|| Json(change.correction_items.clone())),
            verified_at: Utc::now(),
        });

        Ok(previous_status)
    }

    async fn schedule_inspection(&self, plan: &InspectionPlan) -> AppResult<VehicleInspection> {
        let mut data = self.data.lock().unwrap();

        let vehicle = data
            .vehicles
            .get_mut(&plan.vehicle_id)
            .ok_or_else(|| not_found_error("Vehicle", plan.vehicle_id))?;

        vehicle.verification_substatus = "pending_inspection".to_string();
        vehicle.inspection_scheduled_at = Some(plan.scheduled_at);
        vehicle.requires_inspection = true;

        let inspection = VehicleInspection {
            id: data.inspections.len() as i64 + 1,
            vehicle_id: plan.vehicle_id,
            inspector_id: plan.admin_id,
            inspection_type: "physical".to_string(),
            scheduled_at: plan.scheduled_at,
            location: plan.location.clone(),
            result: "pending".to_string(),
            completed_at: None,
            notes: Some(plan.notes.clone()).filter(|n| !n.trim().is_empty()),
        };
        data.inspections.push(inspection.clone());

        Ok(inspection)
    }

    async fn find_identity(&self, vehicle_id: i64) -> AppResult<Option<VehicleIdentity>> {
        Ok(self.data.lock().unwrap().vehicles.get(&vehicle_id).map(|v| VehicleIdentity {
            id: v.id,
            registration_number: v.registration_number.clone(),
            chassis_number: v.chassis_number.clone(),
            engine_number: v.engine_number.clone(),
        }))
    }

    async fn count_duplicates(
        &self,
        field: DuplicateField,
        value: &str,
        exclude_vehicle_id: i64,
    ) -> AppResult<i64> {
        let data = self.data.lock().unwrap();
        let count = data
            .vehicles
            .values()
            .filter(|v| v.id != exclude_vehicle_id)
            .filter(|v| match field {
                DuplicateField::RegistrationNumber => v.registration_number == value,
                DuplicateField::ChassisNumber => v.chassis_number == value,
                DuplicateField::EngineNumber => v.engine_number == value,
            })
            .count();
        Ok(count as i64)
    }

    async fn record_fraud_check(&self, result: &FraudCheckResult) -> AppResult<()> {
        self.data.lock().unwrap().fraud_checks.push(result.clone());
        Ok(())
    }

    async fn vehicles_by_status(&self, status: VerificationStatus) -> AppResult<Vec<VehicleSummary>> {
        let data = self.data.lock().unwrap();
        Ok(data
            .vehicles
            .values()
            .filter(|v| v.verification_status == status.as_str())
            .map(Self::summary)
            .collect())
    }

    async fn pending_queue(&self) -> AppResult<Vec<VehicleSummary>> {
        let data = self.data.lock().unwrap();
        let mut queue: Vec<VehicleSummary> = data
            .vehicles
            .values()
            .filter(|v| {
                matches!(v.verification_status.as_str(), "pending" | "submitted")
                    || matches!(
                        v.verification_substatus.as_str(),
                        "awaiting_review" | "needs_correction" | "under_review"
                    )
            })
            .map(Self::summary)
            .collect();
        queue.sort_by_key(|v| v.created_at);
        Ok(queue)
    }

    async fn history(&self, vehicle_id: i64) -> AppResult<Vec<VerificationHistoryEntry>> {
        let mut entries = self.history_for(vehicle_id);
        entries.reverse();
        Ok(entries)
    }

    async fn dashboard(&self) -> AppResult<VerificationDashboard> {
        let data = self.data.lock().unwrap();
        let mut dashboard = VerificationDashboard::default();
        for vehicle in data.vehicles.values() {
            match vehicle.verification_status.as_str() {
                "pending" | "submitted" => dashboard.counts.pending_count += 1,
                "needs_correction" => dashboard.counts.needs_correction_count += 1,
                "under_review" => dashboard.counts.under_review_count += 1,
                _ => {}
            }
        }
        Ok(dashboard)
    }
}

// ---------------------------------------------------------------------------
// Seguimiento GPS
// ---------------------------------------------------------------------------

#[derive(Default)]
struct TrackingData {
    devices: HashMap<String, (DeviceStatus, Option<DateTime<Utc>>)>,
    points: Vec<TrackingPoint>,
}

#[derive(Default)]
pub struct MemoryTrackingStore {
    data: Mutex<TrackingData>,
}

impl MemoryTrackingStore {
    pub fn add_device(&self, device_id: &str, status: DeviceStatus) {
        self.data
            .lock()
            .unwrap()
            .devices
            .insert(device_id.to_string(), (status, None));
    }

    pub fn push_point(&self, device_id: &str, speed: f64, timestamp: DateTime<Utc>) {
        let mut data = self.data.lock().unwrap();
        let id = data.points.len() as i64 + 1;
        data.points.push(TrackingPoint {
            id,
            device_id: device_id.to_string(),
            latitude: -6.2,
            longitude: 106.8,
            speed,
            timestamp,
        });
    }

    pub fn point_count(&self) -> usize {
        self.data.lock().unwrap().points.len()
    }

    pub fn last_signal(&self, device_id: &str) -> Option<DateTime<Utc>> {
        self.data.lock().unwrap().devices.get(device_id).and_then(|(_, signal)| *signal)
    }
}

#[async_trait]
impl TrackingStore for MemoryTrackingStore {
    async fn insert_point(&self, point: &NewTrackingPoint) -> AppResult<TrackingPoint> {
        let mut data = self.data.lock().unwrap();

        // Igual que la FK gps_tracking.device_id -> gps_devices.device_id
        if !data.devices.contains_key(&point.device_id) {
            return Err(not_found_error("GPS device", &point.device_id));
        }

        let stored = TrackingPoint {
            id: data.points.len() as i64 + 1,
            device_id: point.device_id.clone(),
            latitude: point.latitude,
            longitude: point.longitude,
            speed: point.speed,
            timestamp: point.timestamp,
        };
        data.points.push(stored.clone());
        Ok(stored)
    }

    async fn touch_device(&self, device_id: &str, signal_at: DateTime<Utc>) -> AppResult<()> {
        if let Some(device) = self.data.lock().unwrap().devices.get_mut(device_id) {
            device.1 = Some(signal_at);
        }
        Ok(())
    }

    async fn latest_positions(&self) -> AppResult<Vec<LatestPositionRow>> {
        let data = self.data.lock().unwrap();
        let mut latest: HashMap<&str, &TrackingPoint> = HashMap::new();

        for point in &data.points {
            let active = matches!(data.devices.get(&point.device_id), Some((DeviceStatus::Active, _)));
            if !active {
                continue;
            }
            let entry = latest.entry(point.device_id.as_str()).or_insert(point);
            if point.timestamp > entry.timestamp {
                *entry = point;
            }
        }

        let mut rows: Vec<LatestPositionRow> = latest
            .into_values()
            .map(|point| LatestPositionRow {
                device_id: point.device_id.clone(),
                vehicle_id: None,
                registration_number: None,
                latitude: point.latitude,
                longitude: point.longitude,
                speed: point.speed,
                timestamp: point.timestamp,
            })
            .collect();
        rows.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        Ok(rows)
    }

    async fn history(&self, device_id: &str, since: DateTime<Utc>) -> AppResult<Vec<TrackingPoint>> {
        let data = self.data.lock().unwrap();
        let mut points: Vec<TrackingPoint> = data
            .points
            .iter()
            .filter(|p| p.device_id == device_id && p.timestamp >= since)
            .cloned()
            .collect();
        points.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        points.truncate(HISTORY_LIMIT as usize);
        Ok(points)
    }
}

// ---------------------------------------------------------------------------
// Notificaciones
// ---------------------------------------------------------------------------

#[derive(Default)]
struct NotificationData {
    recipients: HashMap<i64, Recipient>,
    templates: HashMap<String, NotificationTemplate>,
    notifications: Vec<Notification>,
}

pub struct MemoryNotificationStore {
    data: Mutex<NotificationData>,
}

impl Default for MemoryNotificationStore {
    fn default() -> Self {
        let templates = [
            ("approved", "Kendaraan {plate} disetujui", "Halo {owner_name}, pengajuan {application_id} telah disetujui."),
            ("rejected", "Kendaraan {plate} ditolak", "Pengajuan {application_id} ditolak: {reason}"),
            ("needs_correction", "Perbaikan data {plate}", "Mohon perbaiki: {correction_items}"),
            ("inspection_scheduled", "Inspeksi {plate}", "Inspeksi dijadwalkan {date} di {location}"),
        ]
        .into_iter()
        .map(|(key, title, message)| {
            (
                key.to_string(),
                NotificationTemplate {
                    template_key: key.to_string(),
                    title: title.to_string(),
                    message: message.to_string(),
                    channels: Json(vec!["in_app".to_string(), "email".to_string()]),
                },
            )
        })
        .collect();

        Self {
            data: Mutex::new(NotificationData {
                templates,
                ..Default::default()
            }),
        }
    }
}

impl MemoryNotificationStore {
    pub fn add_recipient(&self, vehicle_id: i64, user_id: i64, owner_name: &str, plate: &str) {
        self.data.lock().unwrap().recipients.insert(
            vehicle_id,
            Recipient {
                user_id,
                owner_name: owner_name.to_string(),
                registration_number: plate.to_string(),
            },
        );
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.data.lock().unwrap().notifications.clone()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn recipient(&self, vehicle_id: i64) -> AppResult<Option<Recipient>> {
        Ok(self.data.lock().unwrap().recipients.get(&vehicle_id).cloned())
    }

    async fn template(&self, template_key: &str) -> AppResult<Option<NotificationTemplate>> {
        Ok(self.data.lock().unwrap().templates.get(template_key).cloned())
    }

    async fn insert(&self, notification: &NewNotification) -> AppResult<Notification> {
        let mut data = self.data.lock().unwrap();
        let stored = Notification {
            id: data.notifications.len() as i64 + 1,
            user_id: notification.user_id,
            title: notification.title.clone(),
            message: notification.message.clone(),
            channels: Json(notification.channels.clone()),
            read: false,
            created_at: Utc::now(),
        };
        data.notifications.push(stored.clone());
        Ok(stored)
    }

    async fn list_for_user(&self, user_id: i64, limit: i64) -> AppResult<Vec<Notification>> {
        let data = self.data.lock().unwrap();
        Ok(data
            .notifications
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn mark_read(&self, notification_id: i64, user_id: i64) -> AppResult<bool> {
        let mut data = self.data.lock().unwrap();
        match data
            .notifications
            .iter_mut()
            .find(|n| n.id == notification_id && n.user_id == user_id)
        {
            Some(notification) => {
                notification.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// ---------------------------------------------------------------------------
// Dispositivos y registros
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryDeviceStore {
    devices: Mutex<Vec<GpsDevice>>,
    vehicles: Mutex<HashSet<i64>>,
    pub fail_create: Mutex<bool>,
}

impl MemoryDeviceStore {
    pub fn devices(&self) -> Vec<GpsDevice> {
        self.devices.lock().unwrap().clone()
    }

    pub fn add_vehicle(&self, vehicle_id: i64) {
        self.vehicles.lock().unwrap().insert(vehicle_id);
    }
}

#[async_trait]
impl DeviceStore for MemoryDeviceStore {
    async fn create_device(&self, device_id: &str, registration_id: Option<i64>) -> AppResult<GpsDevice> {
        if *self.fail_create.lock().unwrap() {
            return Err(fleet_tms::utils::AppError::Internal("duplicate device_id".to_string()));
        }

        let mut devices = self.devices.lock().unwrap();
        let device = GpsDevice {
            id: devices.len() as i64 + 1,
            device_id: device_id.to_string(),
            vehicle_id: None,
            registration_id,
            status: DeviceStatus::PendingInstallation.as_str().to_string(),
            installed_date: None,
            last_signal: None,
            created_at: Utc::now(),
        };
        devices.push(device.clone());
        Ok(device)
    }

    async fn list_devices(&self) -> AppResult<Vec<GpsDevice>> {
        Ok(self.devices())
    }

    async fn vehicle_exists(&self, vehicle_id: i64) -> AppResult<bool> {
        Ok(self.vehicles.lock().unwrap().contains(&vehicle_id))
    }

    async fn assign_to_vehicle(&self, device_id: &str, vehicle_id: i64) -> AppResult<Option<GpsDevice>> {
        let mut devices = self.devices.lock().unwrap();
        Ok(devices.iter_mut().find(|d| d.device_id == device_id).map(|device| {
            device.vehicle_id = Some(vehicle_id);
            device.status = DeviceStatus::Installed.as_str().to_string();
            device.installed_date = Some(Utc::now());
            device.clone()
        }))
    }

    async fn update_status(&self, device_id: &str, status: DeviceStatus) -> AppResult<Option<GpsDevice>> {
        let mut devices = self.devices.lock().unwrap();
        Ok(devices.iter_mut().find(|d| d.device_id == device_id).map(|device| {
            device.status = status.as_str().to_string();
            device.clone()
        }))
    }
}

#[derive(Default)]
pub struct MemoryRegistrationStore {
    registrations: Mutex<Vec<GpsRegistration>>,
}

#[async_trait]
impl RegistrationStore for MemoryRegistrationStore {
    async fn create_registration(&self, registration: &NewGpsRegistration) -> AppResult<GpsRegistration> {
        let mut registrations = self.registrations.lock().unwrap();
        let created = GpsRegistration {
            id: registrations.len() as i64 + 1,
            registration_number: registration.registration_number.clone(),
            vehicle_type: registration.vehicle_type.clone(),
            capacity_tons: registration.capacity_tons,
            operator_notes: registration.operator_notes.clone(),
            status: "pending".to_string(),
            admin_notes: None,
            approved_at: None,
            approved_by: None,
            created_at: Utc::now(),
        };
        registrations.push(created.clone());
        Ok(created)
    }

    async fn list_registrations(&self, only_pending: bool) -> AppResult<Vec<GpsRegistration>> {
        let registrations = self.registrations.lock().unwrap();
        Ok(registrations
            .iter()
            .filter(|r| !only_pending || r.status == "pending")
            .cloned()
            .collect())
    }

    async fn find_registration(&self, id: i64) -> AppResult<Option<GpsRegistration>> {
        Ok(self.registrations.lock().unwrap().iter().find(|r| r.id == id).cloned())
    }

    async fn decide_registration(
        &self,
        id: i64,
        decision: RegistrationDecision,
        admin_notes: Option<&str>,
        admin_id: i64,
    ) -> AppResult<Option<GpsRegistration>> {
        let mut registrations = self.registrations.lock().unwrap();
        Ok(registrations.iter_mut().find(|r| r.id == id).map(|registration| {
            registration.status = decision.as_str().to_string();
            registration.admin_notes = admin_notes.map(str::to_string);
            registration.approved_at = Some(Utc::now());
            registration.approved_by = Some(admin_id);
            registration.clone()
        }))
    }
}

// ---------------------------------------------------------------------------
// Aplicación de prueba
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub state: AppState,
    pub verification: Arc<MemoryVerificationStore>,
    pub tracking: Arc<MemoryTrackingStore>,
    pub notifications: Arc<MemoryNotificationStore>,
    pub devices: Arc<MemoryDeviceStore>,
    pub registrations: Arc<MemoryRegistrationStore>,
    pub hub_task: BackgroundTask,
}

impl TestApp {
    pub fn new() -> Self {
        let verification = Arc::new(MemoryVerificationStore::default());
        let tracking = Arc::new(MemoryTrackingStore::default());
        let notifications = Arc::new(MemoryNotificationStore::default());
        let devices = Arc::new(MemoryDeviceStore::default());
        let registrations = Arc::new(MemoryRegistrationStore::default());

        let (hub, hub_task) = TrackingHub::start(HubConfig::default());

        let stores = Stores {
            verification: verification.clone(),
            tracking: tracking.clone(),
            notifications: notifications.clone(),
            devices: devices.clone(),
            registrations: registrations.clone(),
        };

        let state = AppState::new(EnvironmentConfig::for_tests(JWT_SECRET), stores, hub);

        Self {
            state,
            verification,
            tracking,
            notifications,
            devices,
            registrations,
            hub_task,
        }
    }

    /// Vacía la cola de notificaciones para poder inspeccionar lo enviado
    pub async fn drain_notifications(&self) {
        self.state.dispatcher.shutdown().await;
    }

    pub fn token(&self, user_id: i64, role: UserRole) -> String {
        JwtKeys::new(JWT_SECRET)
            .issue(user_id, "tester", role, 3600)
            .unwrap()
    }
}
