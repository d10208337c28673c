//! Modelos de notificaciones

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// Plantillas conocidas por el flujo de verificación
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKey {
    Approved,
    Rejected,
    NeedsCorrection,
    InspectionScheduled,
}

impl TemplateKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKey::Approved => "approved",
            TemplateKey::Rejected => "rejected",
            TemplateKey::NeedsCorrection => "needs_correction",
            TemplateKey::InspectionScheduled => "inspection_scheduled",
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct NotificationTemplate {
    pub template_key: String,
    pub title: String,
    pub message: String,
    pub channels: Json<Vec<String>>,
}

/// Dueño del vehículo que recibe la notificación
#[derive(Debug, Clone, FromRow)]
pub struct Recipient {
    pub user_id: i64,
    pub owner_name: String,
    pub registration_number: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub message: String,
    pub channels: Json<Vec<String>>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Notificación ya renderizada, pendiente de guardar
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub user_id: i64,
    pub title: String,
    pub message: String,
    pub channels: Vec<String>,
}

/// Sustituye cada `{clave}` por su valor; las claves sin valor quedan tal cual.
///
/// Una sola pasada sobre la plantilla: los valores insertados nunca se vuelven
/// a interpretar como marcadores.
pub fn render_template(template: &str, variables: &HashMap<String, String>) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        rendered.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        let Some(end) = after.find('}') else {
            rendered.push_str(&rest[start..]);
            return rendered;
        };

        let key = &after[..end];
        if key.contains('{') {
            rendered.push('{');
            rest = after;
            continue;
        }

        match variables.get(key) {
            Some(value) => rendered.push_str(value),
            None => {
                rendered.push('{');
                rendered.push_str(key);
                rendered.push('}');
            }
        }
        rest = &after[end + 1..];
    }

    rendered.push_str(rest);
    rendered
}

/// Identificador de solicitud que ve el dueño
pub fn application_id(vehicle_id: i64) -> String {
    format!("V-{}", vehicle_id)
}
