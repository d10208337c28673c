//! Middleware del sistema
//!
//! Este módulo contiene el middleware de autenticación, autorización de
//! admins y CORS.

pub mod auth;
pub mod cors;

pub use auth::*;
pub use cors::*;
