//! Registro de dispositivos GPS y solicitudes de instalación

use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::gps::{DeviceStatus, GpsDevice};
use crate::models::gps_registration::{GpsRegistration, NewGpsRegistration, RegistrationDecision};
use crate::utils::errors::AppResult;

const DEVICE_COLUMNS: &str =
    "id, device_id, vehicle_id, registration_id, status, installed_date, last_signal, created_at";

const REGISTRATION_COLUMNS: &str = "id, registration_number, vehicle_type, capacity_tons, operator_notes, \
     status, admin_notes, approved_at, approved_by, created_at";

#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// Alta en `pending_installation`
    async fn create_device(&self, device_id: &str, registration_id: Option<i64>) -> AppResult<GpsDevice>;

    async fn list_devices(&self) -> AppResult<Vec<GpsDevice>>;

    async fn vehicle_exists(&self, vehicle_id: i64) -> AppResult<bool>;

    /// Asigna a un vehículo y pasa a `installed`; `None` si el dispositivo no existe
    async fn assign_to_vehicle(&self, device_id: &str, vehicle_id: i64) -> AppResult<Option<GpsDevice>>;

    async fn update_status(&self, device_id: &str, status: DeviceStatus) -> AppResult<Option<GpsDevice>>;
}

#[async_trait]
pub trait RegistrationStore: Send + Sync {
    async fn create_registration(&self, registration: &NewGpsRegistration) -> AppResult<GpsRegistration>;

    async fn list_registrations(&self, only_pending: bool) -> AppResult<Vec<GpsRegistration>>;

    async fn find_registration(&self, id: i64) -> AppResult<Option<GpsRegistration>>;

    async fn decide_registration(
        &self,
        id: i64,
        decision: RegistrationDecision,
        admin_notes: Option<&str>,
        admin_id: i64,
    ) -> AppResult<Option<GpsRegistration>>;
}

pub struct GpsDeviceRepository {
    pool: PgPool,
}

impl GpsDeviceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeviceStore for GpsDeviceRepository {
    async fn create_device(&self, device_id: &str, registration_id: Option<i64>) -> AppResult<GpsDevice> {
        let sql = format!(
            "INSERT INTO gps_devices (device_id, registration_id, status) VALUES ($1, $2, $3) RETURNING {}",
            DEVICE_COLUMNS
        );

        let device = sqlx::query_as::<_, GpsDevice>(&sql)
            .bind(device_id)
            .bind(registration_id)
            .bind(DeviceStatus::PendingInstallation.as_str())
            .fetch_one(&self.pool)
            .await?;

        Ok(device)
    }

    async fn list_devices(&self) -> AppResult<Vec<GpsDevice>> {
        let sql = format!("SELECT {} FROM gps_devices ORDER BY created_at DESC", DEVICE_COLUMNS);

        let devices = sqlx::query_as::<_, GpsDevice>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(devices)
    }

    async fn vehicle_exists(&self, vehicle_id: i64) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM vehicles WHERE id = $1)")
            .bind(vehicle_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    async fn assign_to_vehicle(&self, device_id: &str, vehicle_id: i64) -> AppResult<Option<GpsDevice>> {
        let sql = format!(
            r#"
            UPDATE gps_devices
            SET vehicle_id = $1, status = $2, installed_date = NOW()
            WHERE device_id = $3
            RETURNING {}
            "#,
            DEVICE_COLUMNS
        );

        let device = sqlx::query_as::<_, GpsDevice>(&sql)
            .bind(vehicle_id)
            .bind(DeviceStatus::Installed.as_str())
            .bind(device_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(device)
    }

    async fn update_status(&self, device_id: &str, status: DeviceStatus) -> AppResult<Option<GpsDevice>> {
        let sql = format!(
            "UPDATE gps_devices SET status = $1 WHERE device_id = $2 RETURNING {}",
            DEVICE_COLUMNS
        );

        let device = sqlx::query_as::<_, GpsDevice>(&sql)
            .bind(status.as_str())
            .bind(device_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(device)
    }
}

pub struct GpsRegistrationRepository {
    pool: PgPool,
}

impl GpsRegistrationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RegistrationStore for GpsRegistrationRepository {
    async fn create_registration(&self, registration: &NewGpsRegistration) -> AppResult<GpsRegistration> {
        let sql = format!(
            r#"
            INSERT INTO gps_registrations (registration_number, vehicle_type, capacity_tons, operator_notes)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            REGISTRATION_COLUMNS
        );

        let created = sqlx::query_as::<_, GpsRegistration>(&sql)
            .bind(&registration.registration_number)
            .bind(&registration.vehicle_type)
            .bind(registration.capacity_tons)
            .bind(&registration.operator_notes)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    async fn list_registrations(&self, only_pending: bool) -> AppResult<Vec<GpsRegistration>> {
        let filter = if only_pending { "WHERE status = 'pending'" } else { "" };
        let sql = format!(
            "SELECT {} FROM gps_registrations {} ORDER BY created_at DESC",
            REGISTRATION_COLUMNS, filter
        );

        let registrations = sqlx::query_as::<_, GpsRegistration>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(registrations)
    }

    async fn find_registration(&self, id: i64) -> AppResult<Option<GpsRegistration>> {
        let sql = format!("SELECT {} FROM gps_registrations WHERE id = $1", REGISTRATION_COLUMNS);

        let registration = sqlx::query_as::<_, GpsRegistration>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(registration)
    }

    async fn decide_registration(
        &self,
        id: i64,
        decision: RegistrationDecision,
        admin_notes: Option<&str>,
        admin_id: i64,
    ) -> AppResult<Option<GpsRegistration>> {
        let sql = format!(
            r#"
            UPDATE gps_registrations
            SET status = $1, admin_notes = $2, approved_at = NOW(), approved_by = $3
            WHERE id = $4
            RETURNING {}
            "#,
            REGISTRATION_COLUMNS
        );

        let registration = sqlx::query_as::<_, GpsRegistration>(&sql)
            .bind(decision.as_str())
            .bind(admin_notes)
            .bind(admin_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(registration)
    }
}
