//! Modelos de autenticación
//!
//! El token lo emite el servicio de cuentas; aquí solo se consume.

use serde::{Deserialize, Serialize};

/// Roles de usuario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    FleetOwner,
    Driver,
    Operator,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::FleetOwner => "fleet_owner",
            UserRole::Driver => "driver",
            UserRole::Operator => "operator",
        }
    }

    pub fn from_claim(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(UserRole::Admin),
            "fleet_owner" => Some(UserRole::FleetOwner),
            "driver" => Some(UserRole::Driver),
            "operator" => Some(UserRole::Operator),
            _ => None,
        }
    }
}

/// Claims del JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub username: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

/// Usuario autenticado que se inyecta en las requests
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub username: String,
    pub role: UserRole,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}
