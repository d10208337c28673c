//! Modelos del sistema
//! 
//! Este módulo contiene los modelos de datos que mapean al schema PostgreSQL
//! y los tipos de dominio del flujo de verificación y del seguimiento GPS.

pub mod auth;
pub mod gps;
pub mod gps_registration;
pub mod notification;
pub mod vehicle;
pub mod verification;
