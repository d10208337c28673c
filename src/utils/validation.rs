//! Utilidades de validación
//!
//! Este módulo contiene funciones helper para validación de datos
//! y conversión de tipos.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use validator::ValidationError;

use crate::utils::errors::AppError;

/// Ventana por defecto del historial GPS, en horas
pub const DEFAULT_HISTORY_HOURS: i64 = 24;
/// Ventana máxima del historial GPS (una semana)
pub const MAX_HISTORY_HOURS: i64 = 168;

/// Validar y convertir string a datetime
pub fn validate_datetime(value: &str) -> Result<DateTime<Utc>, ValidationError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            let mut error = ValidationError::new("datetime");
            error.add_param("value".into(), &value.to_string());
            error.add_param("format".into(), &"RFC3339".to_string());
            error
        })
}

/// Rechaza textos vacíos o formados solo por espacios
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Timestamp de un reporte GPS: RFC3339 o, si falta o no se puede leer, `now`
pub fn report_timestamp_or(value: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    value
        .and_then(|raw| validate_datetime(raw).ok())
        .unwrap_or(now)
}

/// Fecha de inspección: RFC3339 (`2025-03-01T10:00:00Z`) o `2025-03-01 10:00:00` en UTC
pub fn parse_inspection_date(value: &str) -> Result<DateTime<Utc>, AppError> {
    if let Ok(parsed) = validate_datetime(value) {
        return Ok(parsed);
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|_| {
            AppError::InvalidDateFormat(
                "Invalid date format. Use YYYY-MM-DDTHH:MM:SSZ or YYYY-MM-DD HH:MM:SS".to_string(),
            )
        })
}

/// Ventana del historial en horas; fuera de [1, 168] o ilegible vuelve a 24
pub fn history_hours(raw: Option<&str>) -> i64 {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|hours| (1..=MAX_HISTORY_HOURS).contains(hours))
        .unwrap_or(DEFAULT_HISTORY_HOURS)
}

/// Límite de paginación: dentro de [1, max] o el valor por defecto
pub fn page_limit(raw: Option<i64>, default: i64, max: i64) -> i64 {
    raw.filter(|limit| (1..=max).contains(limit)).unwrap_or(default)
}
