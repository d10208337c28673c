//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum. Los servicios reciben sus almacenes como
//! traits para que los tests puedan sustituir PostgreSQL.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::environment::EnvironmentConfig;
use crate::middleware::auth::JwtKeys;
use crate::repositories::{
    DeviceStore, GpsDeviceRepository, GpsRegistrationRepository, NotificationRepository,
    NotificationStore, RegistrationStore, TrackingRepository, TrackingStore,
    VerificationRepository, VerificationStore,
};
use crate::services::{
    GpsDeviceService, HubHandle, NotificationDispatcher, NotificationService, TrackingService,
    VerificationService,
};

/// Almacenes de datos usados por los servicios
#[derive(Clone)]
pub struct Stores {
    pub verification: Arc<dyn VerificationStore>,
    pub tracking: Arc<dyn TrackingStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub devices: Arc<dyn DeviceStore>,
    pub registrations: Arc<dyn RegistrationStore>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            verification: Arc::new(VerificationRepository::new(pool.clone())),
            tracking: Arc::new(TrackingRepository::new(pool.clone())),
            notifications: Arc::new(NotificationRepository::new(pool.clone())),
            devices: Arc::new(GpsDeviceRepository::new(pool.clone())),
            registrations: Arc::new(GpsRegistrationRepository::new(pool)),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: EnvironmentConfig,
    pub jwt: JwtKeys,
    pub verification: Arc<VerificationService>,
    pub tracking: Arc<TrackingService>,
    pub devices: Arc<GpsDeviceService>,
    pub notifications: Arc<NotificationService>,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub hub: HubHandle,
}

impl AppState {
    /// Arranca el despachador de notificaciones; el hub ya debe estar en marcha
    pub fn new(config: EnvironmentConfig, stores: Stores, hub: HubHandle) -> Self {
        let notifications = Arc::new(NotificationService::new(stores.notifications));
        let dispatcher = Arc::new(NotificationDispatcher::start(
            notifications.clone(),
            config.notification_workers,
            config.notification_queue_capacity,
        ));

        Self {
            jwt: JwtKeys::new(&config.jwt_secret),
            verification: Arc::new(VerificationService::new(stores.verification, dispatcher.clone())),
            tracking: Arc::new(TrackingService::new(stores.tracking, hub.clone())),
            devices: Arc::new(GpsDeviceService::new(stores.devices, stores.registrations)),
            notifications,
            dispatcher,
            hub,
            config,
        }
    }
}
