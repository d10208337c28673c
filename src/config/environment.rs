//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y variables de configuración.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::services::broadcast_hub::HubConfig;

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub jwt_secret: String,
    pub cors_origins: Vec<String>,
    pub log_level: String,
    pub hub_broadcast_capacity: usize,
    pub hub_poll_interval: Duration,
    pub hub_write_timeout: Duration,
    pub notification_workers: usize,
    pub notification_queue_capacity: usize,
}

impl EnvironmentConfig {
    /// Lee la configuración del proceso; solo `JWT_SECRET` es obligatorio
    pub fn from_env() -> Result<Self> {
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if jwt_secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }

        let config = Self {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            port: parse_or("PORT", 8080)?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            jwt_secret,
            cors_origins: parse_origins(&env::var("CORS_ORIGINS").unwrap_or_default()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            hub_broadcast_capacity: parse_or("HUB_BROADCAST_CAPACITY", 256)?,
            hub_poll_interval: Duration::from_secs(parse_or("HUB_POLL_INTERVAL_SECS", 10)?),
            hub_write_timeout: Duration::from_millis(parse_or("HUB_WRITE_TIMEOUT_MS", 2000)?),
            notification_workers: parse_or("NOTIFICATION_WORKERS", 2)?,
            notification_queue_capacity: parse_or("NOTIFICATION_QUEUE_CAPACITY", 128)?,
        };

        config.check()?;
        Ok(config)
    }

    /// Rechaza intervalos y tamaños en cero
    pub fn check(&self) -> Result<()> {
        anyhow::ensure!(
            !self.hub_poll_interval.is_zero(),
            "HUB_POLL_INTERVAL_SECS must be greater than zero"
        );
        anyhow::ensure!(
            !self.hub_write_timeout.is_zero(),
            "HUB_WRITE_TIMEOUT_MS must be greater than zero"
        );
        anyhow::ensure!(
            self.notification_workers > 0,
            "NOTIFICATION_WORKERS must be greater than zero"
        );
        anyhow::ensure!(
            self.notification_queue_capacity > 0,
            "NOTIFICATION_QUEUE_CAPACITY must be greater than zero"
        );
        Ok(())
    }

    /// Configuración para tests: sin entorno, con el secreto dado
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            environment: "test".to_string(),
            port: 0,
            host: "127.0.0.1".to_string(),
            jwt_secret: jwt_secret.to_string(),
            cors_origins: Vec::new(),
            log_level: "debug".to_string(),
            hub_broadcast_capacity: 256,
            hub_poll_interval: Duration::from_secs(10),
            hub_write_timeout: Duration::from_millis(2000),
            notification_workers: 1,
            notification_queue_capacity: 16,
        }
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Obtener la URL del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            broadcast_capacity: self.hub_broadcast_capacity,
            write_timeout: self.hub_write_timeout,
        }
    }
}

pub(crate) fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number", key)),
        _ => Ok(default),
    }
}

/// Lista separada por comas; vacía o `*` significa permisivo
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().to_string())
        .filter(|origin| !origin.is_empty() && origin != "*")
        .collect()
}
