//! Rutas HTTP
//!
//! Todo cuelga de `/api/v1`. Cada grupo se protege con su propia capa:
//! públicas, autenticadas y de administración.

pub mod admin_routes;
pub mod gps_routes;
pub mod notification_routes;

use axum::{
    extract::rejection::JsonRejection,
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

use crate::middleware::auth::{require_admin, require_auth};
use crate::state::AppState;
use crate::utils::errors::{bad_request_error, AppError, AppResult};

/// Router completo de la aplicación, con el estado ya aplicado
pub fn create_app_router(state: AppState) -> Router {
    let public = gps_routes::create_gps_public_router();

    let authenticated = Router::new()
        .merge(gps_routes::create_gps_router())
        .merge(notification_routes::create_notification_router())
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let admin = Router::new()
        .nest("/admin", admin_routes::create_admin_router())
        .merge(gps_routes::create_gps_admin_router())
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let api = Router::new().merge(public).merge(authenticated).merge(admin);

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "fleet-tms",
        "timestamp": chrono::Utc::now(),
    }))
}

/// Convierte el rechazo del extractor JSON en un 400 con el formato de error común
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

/// Identificadores numéricos positivos en el path
pub(crate) fn parse_id(raw: &str, resource: &str) -> AppResult<i64> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(bad_request_error(&format!("Invalid {} id", resource))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42", "vehicle").unwrap(), 42);
        assert!(parse_id("0", "vehicle").is_err());
        assert!(parse_id("-3", "vehicle").is_err());
        assert!(parse_id("abc", "vehicle").is_err());
    }
}
