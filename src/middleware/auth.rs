//! Middleware de autenticación JWT
//!
//! Este módulo maneja la autenticación JWT, extracción de tokens
//! y verificación de usuarios autenticados. Los tokens los emite el
//! servicio de cuentas; aquí solo se validan.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    models::auth::{AuthenticatedUser, Claims, UserRole},
    state::AppState,
    utils::{errors::AppError, sanitize::sanitize_for_log},
};

/// Claves HS256 derivadas de `JWT_SECRET`
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Solo para tests y herramientas internas
    pub fn issue(&self, user_id: i64, username: &str, role: UserRole, ttl_secs: i64) -> Result<String, AppError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            user_id,
            username: username.to_string(),
            role: role.as_str().to_string(),
            exp: now + ttl_secs,
            iat: now,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Error generando JWT: {}", e)))
    }

    pub fn verify(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let token_data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

        let claims = token_data.claims;
        let role = UserRole::from_claim(&claims.role)
            .ok_or_else(|| AppError::Unauthorized("Invalid token role".to_string()))?;

        Ok(AuthenticatedUser {
            user_id: claims.user_id,
            username: claims.username,
            role,
        })
    }
}

/// Middleware de autenticación JWT
///
/// El token llega en `Authorization: Bearer ...` o, para el upgrade del
/// WebSocket, en el parámetro `token` de la query.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())
        .or_else(|| query_token(request.uri().query()))
        .ok_or_else(|| {
            log_rejected(request.headers(), "token ausente");
            AppError::Unauthorized("Authorization token required".to_string())
        })?;

    let user = state.jwt.verify(&token).map_err(|e| {
        log_rejected(request.headers(), "token inválido");
        e
    })?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Middleware para verificar permisos de admin
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| AppError::Unauthorized("Authorization token required".to_string()))?;

    if !user.is_admin() {
        log::warn!(
            "🚫 Acceso admin denegado a {} ({})",
            sanitize_for_log(&user.username),
            user.role.as_str()
        );
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }

    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

fn query_token(query: Option<&str>) -> Option<String> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "token")
        .map(|(_, value)| value.to_string())
        .filter(|token| !token.is_empty())
}

fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|value| value.to_str().ok()))
        .map(|ip| ip.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn log_rejected(headers: &HeaderMap, reason: &str) {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    log::warn!(
        "🔒 Autenticación rechazada ({}) ip={} ua={}",
        reason,
        sanitize_for_log(&client_ip(headers)),
        sanitize_for_log(user_agent)
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_issue_and_verify() {
        let keys = JwtKeys::new("test-secret");
        let token = keys.issue(7, "siti", UserRole::Admin, 3600).unwrap();

        let user = keys.verify(&token).unwrap();
        assert_eq!(user.user_id, 7);
        assert_eq!(user.username, "siti");
        assert!(user.is_admin());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = JwtKeys::new("a").issue(1, "budi", UserRole::FleetOwner, 3600).unwrap();
        let err = JwtKeys::new("b").verify(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let keys = JwtKeys::new("secret");
        let token = keys.issue(1, "budi", UserRole::Driver, -3600).unwrap();
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn test_token_sources() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def.ghi"));

        assert_eq!(query_token(Some("foo=1&token=xyz")).as_deref(), Some("xyz"));
        assert_eq!(query_token(Some("token=")), None);
        assert_eq!(query_token(None), None);
    }

    #[test]
    fn test_client_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.1, 10.0.0.2"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        assert_eq!(client_ip(&headers), "10.0.0.1");

        headers.remove("x-forwarded-for");
        assert_eq!(client_ip(&headers), "10.0.0.9");
        assert_eq!(client_ip(&HeaderMap::new()), "unknown");
    }
}
