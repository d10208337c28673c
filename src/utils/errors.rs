//! Sistema de manejo de errores
//!
//! Este módulo define todos los tipos de errores del sistema
//! y su conversión a respuestas HTTP apropiadas.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::utils::sanitize::sanitize_for_log;

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Unknown check type: {0}")]
    UnknownCheckType(String),

    #[error("Invalid date format: {0}")]
    InvalidDateFormat(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Respuesta de error para la API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl ErrorResponse {
    fn new(error: &str, message: String, code: &str) -> Self {
        Self {
            error: error.to_string(),
            message,
            details: None,
            code: Some(code.to_string()),
        }
    }
}

impl AppError {
    /// Código HTTP asociado al error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_)
            | AppError::BadRequest(_)
            | AppError::InvalidStatus(_)
            | AppError::UnknownCheckType(_)
            | AppError::InvalidDateFormat(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_response = match self {
            AppError::Database(e) => {
                tracing::error!("❌ Error de base de datos: {}", sanitize_for_log(&e.to_string()));
                ErrorResponse::new(
                    "Database Error",
                    "An error occurred while accessing the database".to_string(),
                    "DB_ERROR",
                )
            }

            AppError::Validation(e) => {
                tracing::warn!("⚠️ Error de validación: {}", sanitize_for_log(&e.to_string()));
                ErrorResponse {
                    details: Some(json!(e)),
                    ..ErrorResponse::new(
                        "Validation Error",
                        "The provided data is invalid".to_string(),
                        "VALIDATION_ERROR",
                    )
                }
            }

            AppError::Unauthorized(msg) => ErrorResponse::new("Unauthorized", msg, "UNAUTHORIZED"),
            AppError::Forbidden(msg) => ErrorResponse::new("Forbidden", msg, "FORBIDDEN"),
            AppError::NotFound(msg) => ErrorResponse::new("Not Found", msg, "NOT_FOUND"),
            AppError::Conflict(msg) => ErrorResponse::new("Conflict", msg, "CONFLICT"),
            AppError::BadRequest(msg) => ErrorResponse::new("Bad Request", msg, "BAD_REQUEST"),
            AppError::InvalidStatus(msg) => {
                ErrorResponse::new("Invalid Status", msg, "INVALID_STATUS")
            }
            AppError::UnknownCheckType(msg) => {
                ErrorResponse::new("Invalid Check Type", msg, "INVALID_CHECK_TYPE")
            }
            AppError::InvalidDateFormat(msg) => {
                ErrorResponse::new("Invalid Date Format", msg, "INVALID_DATE_FORMAT")
            }

            AppError::Internal(msg) => {
                tracing::error!("❌ Error interno: {}", sanitize_for_log(&msg));
                ErrorResponse::new(
                    "Internal Server Error",
                    "An unexpected error occurred".to_string(),
                    "INTERNAL_ERROR",
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;

/// Función helper para crear errores de recurso no encontrado
pub fn not_found_error(resource: &str, id: impl std::fmt::Display) -> AppError {
    AppError::NotFound(format!("{} with id '{}' not found", resource, id))
}

/// Función helper para crear errores de solicitud incorrecta
pub fn bad_request_error(message: &str) -> AppError {
    AppError::BadRequest(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors_map_to_400() {
        assert_eq!(AppError::InvalidStatus("deleted".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::UnknownCheckType("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidDateFormat("x".into()).status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_auth_errors() {
        assert_eq!(AppError::Unauthorized("x".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden("x".into()).status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_database_error_is_500() {
        let err = AppError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_not_found_helper() {
        let err = not_found_error("Vehicle", 42);
        assert!(matches!(err, AppError::NotFound(ref m) if m.contains("42")));
    }
}
