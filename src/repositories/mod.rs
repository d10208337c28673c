//! Repositorios
//!
//! Acceso a PostgreSQL detrás de traits para que los servicios
//! se puedan probar con almacenes en memoria.

pub mod gps_device_repository;
pub mod notification_repository;
pub mod rows;
pub mod tracking_repository;
pub mod verification_repository;

pub use gps_device_repository::{DeviceStore, GpsDeviceRepository, GpsRegistrationRepository, RegistrationStore};
pub use notification_repository::{NotificationRepository, NotificationStore};
pub use tracking_repository::{TrackingRepository, TrackingStore};
pub use verification_repository::{VerificationRepository, VerificationStore};
