//! Utilidades del sistema
//! 
//! Este módulo contiene utilidades para manejo de errores, validación
//! y saneamiento de texto antes de escribirlo en los logs.

pub mod errors;
pub mod sanitize;
pub mod validation;

pub use errors::{AppError, AppResult};
pub use sanitize::sanitize_for_log;
