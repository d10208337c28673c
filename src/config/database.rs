//! Pool de PostgreSQL
//!
//! Tamaño y timeouts del pool, ajustables por entorno.

use std::env;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::environment::parse_or;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl DatabaseConfig {
    /// `DATABASE_URL` es obligatoria; el resto tiene valores por defecto
    pub fn from_env() -> Result<Self> {
        let url = env::var("DATABASE_URL").context("DATABASE_URL must be set in environment variables")?;

        let config = Self {
            url,
            max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 20)?,
            min_connections: parse_or("DATABASE_MIN_CONNECTIONS", 5)?,
            acquire_timeout: Duration::from_secs(parse_or("DATABASE_ACQUIRE_TIMEOUT_SECS", 30)?),
            idle_timeout: Duration::from_secs(300),
            max_lifetime: Duration::from_secs(3600),
        };
        config.check()?;

        Ok(config)
    }

    fn check(&self) -> Result<()> {
        ensure!(self.max_connections > 0, "DATABASE_MAX_CONNECTIONS must be positive");
        ensure!(
            self.min_connections <= self.max_connections,
            "DATABASE_MIN_CONNECTIONS ({}) exceeds DATABASE_MAX_CONNECTIONS ({})",
            self.min_connections,
            self.max_connections
        );
        Ok(())
    }

    pub async fn create_pool(&self) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.acquire_timeout)
            .idle_timeout(self.idle_timeout)
            .max_lifetime(self.max_lifetime)
            .connect(&self.url)
            .await
    }
}
