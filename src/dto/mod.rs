//! Objetos de transferencia de la API

pub mod gps_dto;
pub mod notification_dto;
pub mod verification_dto;
