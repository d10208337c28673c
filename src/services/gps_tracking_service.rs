//! Ingesta y consulta de posiciones GPS

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use validator::Validate;

use crate::dto::gps_dto::{BatchOutcome, DeviceHistory, GpsReport};
use crate::models::gps::{LiveEvent, LivePosition, NewTrackingPoint, TrackingPoint};
use crate::repositories::tracking_repository::TrackingStore;
use crate::services::broadcast_hub::{HubHandle, PositionSource};
use crate::utils::errors::AppResult;
use crate::utils::sanitize::sanitize_for_log;
use crate::utils::validation::{history_hours, report_timestamp_or};

pub struct TrackingService {
    store: Arc<dyn TrackingStore>,
    hub: HubHandle,
}

impl TrackingService {
    pub fn new(store: Arc<dyn TrackingStore>, hub: HubHandle) -> Self {
        Self { store, hub }
    }

    /// Valida, guarda el punto, actualiza `last_signal` y lo publica en el hub
    pub async fn ingest(&self, report: &GpsReport) -> AppResult<TrackingPoint> {
        report.validate()?;

        let point = NewTrackingPoint {
            device_id: report.device_id.trim().to_string(),
            latitude: report.latitude,
            longitude: report.longitude,
            speed: report.speed.unwrap_or(0.0),
            timestamp: report_timestamp_or(report.timestamp.as_deref(), Utc::now()),
        };

        let stored = self.store.insert_point(&point).await?;

        if let Err(e) = self.store.touch_device(&stored.device_id, stored.timestamp).await {
            log::warn!(
                "⚠️ No se actualizó last_signal de {}: {}",
                sanitize_for_log(&stored.device_id),
                sanitize_for_log(&e.to_string())
            );
        }

        self.hub.publish(&LiveEvent::from(&stored));

        Ok(stored)
    }

    /// Cada reporte se procesa por separado; un fallo no detiene el lote
    pub async fn ingest_batch(&self, reports: &[GpsReport]) -> BatchOutcome {
        let mut success = 0;

        for report in reports {
            match self.ingest(report).await {
                Ok(_) => success += 1,
                Err(e) => log::warn!(
                    "⚠️ Punto descartado en lote ({}): {}",
                    sanitize_for_log(&report.device_id),
                    sanitize_for_log(&e.to_string())
                ),
            }
        }

        log::info!("📍 Lote GPS procesado: {}/{} puntos", success, reports.len());

        BatchOutcome {
            total: reports.len(),
            success,
        }
    }

    pub async fn latest_positions(&self) -> AppResult<Vec<LivePosition>> {
        let now = Utc::now();
        let rows = self.store.latest_positions().await?;
        Ok(rows.into_iter().map(|row| LivePosition::from_row(row, now)).collect())
    }

    pub async fn history(&self, device_id: &str, hours: Option<&str>) -> AppResult<DeviceHistory> {
        let hours = history_hours(hours);
        let since = Utc::now() - Duration::hours(hours);
        let history = self.store.history(device_id, since).await?;

        Ok(DeviceHistory {
            device_id: device_id.to_string(),
            hours,
            history,
        })
    }
}

#[async_trait]
impl PositionSource for TrackingService {
    async fn latest_positions(&self) -> AppResult<Vec<LivePosition>> {
        TrackingService::latest_positions(self).await
    }
}
