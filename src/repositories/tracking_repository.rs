//! Persistencia de puntos de seguimiento GPS

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crate::models::gps::{LatestPositionRow, NewTrackingPoint, TrackingPoint, HISTORY_LIMIT};
use crate::repositories::rows::decode_lenient;
use crate::utils::errors::AppResult;

#[async_trait]
pub trait TrackingStore: Send + Sync {
    async fn insert_point(&self, point: &NewTrackingPoint) -> AppResult<TrackingPoint>;

    /// Actualiza `last_signal` del dispositivo
    async fn touch_device(&self, device_id: &str, signal_at: DateTime<Utc>) -> AppResult<()>;

    /// Último punto de cada dispositivo activo con al menos un punto
    async fn latest_positions(&self) -> AppResult<Vec<LatestPositionRow>>;

    /// Hasta `HISTORY_LIMIT` puntos desde `since`, del más reciente al más antiguo
    async fn history(&self, device_id: &str, since: DateTime<Utc>) -> AppResult<Vec<TrackingPoint>>;
}

pub struct TrackingRepository {
    pool: PgPool,
}

impl TrackingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TrackingStore for TrackingRepository {
    async fn insert_point(&self, point: &NewTrackingPoint) -> AppResult<TrackingPoint> {
        let inserted = sqlx::query_as::<_, TrackingPoint>(
            r#"
            INSERT INTO gps_tracking (device_id, latitude, longitude, speed, timestamp)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, device_id, latitude, longitude, speed, timestamp
            "#,
        )
        .bind(&point.device_id)
        .bind(point.latitude)
        .bind(point.longitude)
        .bind(point.speed)
        .bind(point.timestamp)
        .fetch_one(&self.pool)
        .await?;

        Ok(inserted)
    }

    async fn touch_device(&self, device_id: &str, signal_at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE gps_devices SET last_signal = $1 WHERE device_id = $2")
            .bind(signal_at)
            .bind(device_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn latest_positions(&self) -> AppResult<Vec<LatestPositionRow>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT ON (d.device_id)
                   d.device_id, d.vehicle_id, v.registration_number,
                   t.latitude, t.longitude, t.speed, t.timestamp
            FROM gps_devices d
            JOIN gps_tracking t ON t.device_id = d.device_id
            LEFT JOIN vehicles v ON v.id = d.vehicle_id
            WHERE d.status = 'active' AND t.timestamp IS NOT NULL
            ORDER BY d.device_id, t.timestamp DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(decode_lenient(
            "latest_positions",
            rows.iter().map(LatestPositionRow::from_row),
        ))
    }

    async fn history(&self, device_id: &str, since: DateTime<Utc>) -> AppResult<Vec<TrackingPoint>> {
        let points = sqlx::query_as::<_, TrackingPoint>(
            r#"
            SELECT id, device_id, latitude, longitude, speed, timestamp
            FROM gps_tracking
            WHERE device_id = $1 AND timestamp >= $2
            ORDER BY timestamp DESC
            LIMIT $3
            "#,
        )
        .bind(device_id)
        .bind(since)
        .bind(HISTORY_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(points)
    }
}
