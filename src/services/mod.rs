//! Services module
//!
//! Este módulo contiene la lógica de negocio de la aplicación: el motor de
//! verificación, la ingesta GPS, el hub de difusión en vivo y las notificaciones.

pub mod broadcast_hub;
pub mod cross_check;
pub mod gps_device_service;
pub mod gps_tracking_service;
pub mod notification_service;
pub mod verification_service;

pub use broadcast_hub::{BackgroundTask, HubConfig, HubHandle, PositionPoller, TrackingHub};
pub use gps_device_service::GpsDeviceService;
pub use gps_tracking_service::TrackingService;
pub use notification_service::{NotificationDispatcher, NotificationService};
pub use verification_service::VerificationService;
