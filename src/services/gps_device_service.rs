//! Registro de instalaciones GPS y administración de dispositivos

use std::sync::Arc;

use crate::models::gps::{device_id_for_registration, DeviceStatus, GpsDevice};
use crate::models::gps_registration::{GpsRegistration, NewGpsRegistration, RegistrationDecision};
use crate::repositories::gps_device_repository::{DeviceStore, RegistrationStore};
use crate::utils::errors::{not_found_error, AppResult};
use crate::utils::sanitize::sanitize_for_log;

pub struct GpsDeviceService {
    devices: Arc<dyn DeviceStore>,
    registrations: Arc<dyn RegistrationStore>,
}

impl GpsDeviceService {
    pub fn new(devices: Arc<dyn DeviceStore>, registrations: Arc<dyn RegistrationStore>) -> Self {
        Self {
            devices,
            registrations,
        }
    }

    pub async fn register(&self, registration: NewGpsRegistration) -> AppResult<GpsRegistration> {
        let created = self.registrations.create_registration(&registration).await?;
        log::info!(
            "🚚 Registro GPS {} creado para {}",
            created.id,
            sanitize_for_log(&created.registration_number)
        );
        Ok(created)
    }

    pub async fn list_registrations(&self, only_pending: bool) -> AppResult<Vec<GpsRegistration>> {
        self.registrations.list_registrations(only_pending).await
    }

    pub async fn get_registration(&self, id: i64) -> AppResult<GpsRegistration> {
        self.registrations
            .find_registration(id)
            .await?
            .ok_or_else(|| not_found_error("GPS registration", id))
    }

    /// Al aprobar se da de alta el dispositivo; si esa alta falla la decisión se mantiene
    pub async fn decide(
        &self,
        id: i64,
        decision: &str,
        admin_notes: Option<&str>,
        admin_id: i64,
    ) -> AppResult<(GpsRegistration, Option<GpsDevice>)> {
        let decision: RegistrationDecision = decision.parse()?;

        let registration = self
            .registrations
            .decide_registration(id, decision, admin_notes, admin_id)
            .await?
            .ok_or_else(|| not_found_error("GPS registration", id))?;

        log::info!("📝 Registro GPS {} marcado como {}", id, decision.as_str());

        if decision != RegistrationDecision::Approved {
            return Ok((registration, None));
        }

        let device_id = device_id_for_registration(id);
        match self.devices.create_device(&device_id, Some(id)).await {
            Ok(device) => {
                log::info!("📟 Dispositivo {} creado, pendiente de instalación", device.device_id);
                Ok((registration, Some(device)))
            }
            Err(e) => {
                log::error!(
                    "❌ No se pudo crear el dispositivo {}: {}",
                    device_id,
                    sanitize_for_log(&e.to_string())
                );
                Ok((registration, None))
            }
        }
    }

    pub async fn list_devices(&self) -> AppResult<Vec<GpsDevice>> {
        self.devices.list_devices().await
    }

    pub async fn assign(&self, device_id: &str, vehicle_id: i64) -> AppResult<GpsDevice> {
        if !self.devices.vehicle_exists(vehicle_id).await? {
            return Err(not_found_error("Vehicle", vehicle_id));
        }

        let device = self
            .devices
            .assign_to_vehicle(device_id, vehicle_id)
            .await?
            .ok_or_else(|| not_found_error("GPS device", sanitize_for_log(device_id)))?;

        log::info!("🔧 Dispositivo {} instalado en vehículo {}", device.device_id, vehicle_id);
        Ok(device)
    }

    pub async fn update_status(&self, device_id: &str, status: &str) -> AppResult<GpsDevice> {
        let status: DeviceStatus = status.parse()?;

        self.devices
            .update_status(device_id, status)
            .await?
            .ok_or_else(|| not_found_error("GPS device", sanitize_for_log(device_id)))
    }
}
