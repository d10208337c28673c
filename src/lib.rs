//! Backend TMS de flotas
//!
//! Verificación de vehículos por administradores, ingesta y difusión en vivo
//! de posiciones GPS, y notificaciones a los dueños de flota.

pub mod config;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
