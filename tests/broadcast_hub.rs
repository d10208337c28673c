use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;

use fleet_tms::models::gps::{LiveEvent, LivePosition, MovementStatus};
use fleet_tms::services::broadcast_hub::{
    PositionSource, PublishOutcome, SinkError, SubscriberSink,
};
use fleet_tms::services::{HubConfig, PositionPoller, TrackingHub};
use fleet_tms::utils::errors::AppResult;

#[derive(Clone, Default)]
struct RecordingSink {
    received: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl SubscriberSink for RecordingSink {
    async fn send_text(&mut self, payload: String) -> Result<(), SinkError> {
        self.received.lock().unwrap().push(payload);
        Ok(())
    }

    async fn close(&mut self) {}
}

struct FailingSink;

#[async_trait]
impl SubscriberSink for FailingSink {
    async fn send_text(&mut self, _payload: String) -> Result<(), SinkError> {
        Err(SinkError::Closed)
    }

    async fn close(&mut self) {}
}

/// Se queda colgado en la escritura hasta que el hub lo corta por timeout
struct StalledSink {
    writing: Arc<Notify>,
}

#[async_trait]
impl SubscriberSink for StalledSink {
    async fn send_text(&mut self, _payload: String) -> Result<(), SinkError> {
        self.writing.notify_one();
        std::future::pending::<()>().await;
        Ok(())
    }

    async fn close(&mut self) {}
}

struct FixedSource;

#[async_trait]
impl PositionSource for FixedSource {
    async fn latest_positions(&self) -> AppResult<Vec<LivePosition>> {
        Ok(vec![LivePosition {
            device_id: "GPS000001".to_string(),
            vehicle_id: Some(7),
            registration_number: Some("B 1234 XYZ".to_string()),
            latitude: -6.2,
            longitude: 106.8,
            speed: 38.0,
            timestamp: Utc::now(),
            status: MovementStatus::Moving,
        }])
    }
}

fn gps_update(device_id: &str) -> LiveEvent {
    LiveEvent::GpsUpdate {
        device_id: device_id.to_string(),
        latitude: -6.2,
        longitude: 106.8,
        speed: 40.0,
        timestamp: Utc::now(),
    }
}

async fn wait_for_messages(sink: &RecordingSink, expected: usize) -> Vec<String> {
    for _ in 0..200 {
        let received = sink.received.lock().unwrap().clone();
        if received.len() >= expected {
            return received;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    sink.received.lock().unwrap().clone()
}

#[tokio::test]
async fn test_published_event_reaches_every_subscriber() {
    let (hub, task) = TrackingHub::start(HubConfig::default());
    let first = RecordingSink::default();
    let second = RecordingSink::default();

    hub.register(Box::new(first.clone())).await.unwrap();
    hub.register(Box::new(second.clone())).await.unwrap();

    assert_eq!(hub.publish(&gps_update("GPS000001")), PublishOutcome::Queued);

    for sink in [&first, &second] {
        let received = wait_for_messages(sink, 1).await;
        assert_eq!(received.len(), 1);

        let json: serde_json::Value = serde_json::from_str(&received[0]).unwrap();
        assert_eq!(json["type"], "gps_update");
        assert_eq!(json["device_id"], "GPS000001");
        assert_eq!(json["speed"], 40.0);
    }

    task.shutdown().await;
}

#[tokio::test]
async fn test_failing_subscriber_is_pruned() {
    let (hub, task) = TrackingHub::start(HubConfig::default());
    let healthy = RecordingSink::default();

    hub.register(Box::new(FailingSink)).await.unwrap();
    hub.register(Box::new(healthy.clone())).await.unwrap();
    assert_eq!(hub.subscriber_count().await.unwrap(), 2);

    hub.publish(&gps_update("GPS000002"));
    wait_for_messages(&healthy, 1).await;

    assert_eq!(hub.subscriber_count().await.unwrap(), 1);

    hub.publish(&gps_update("GPS000002"));
    assert_eq!(wait_for_messages(&healthy, 2).await.len(), 2);

    task.shutdown().await;
}

#[tokio::test]
async fn test_full_channel_drops_updates_and_slow_subscriber_is_pruned() {
    let config = HubConfig {
        broadcast_capacity: 1,
        write_timeout: Duration::from_millis(200),
    };
    let (hub, task) = TrackingHub::start(config);
    let writing = Arc::new(Notify::new());

    hub.register(Box::new(StalledSink { writing: writing.clone() }))
        .await
        .unwrap();

    // El hub queda bloqueado escribiendo el primer evento
    assert_eq!(hub.publish(&gps_update("GPS000003")), PublishOutcome::Queued);
    writing.notified().await;

    assert_eq!(hub.publish(&gps_update("GPS000003")), PublishOutcome::Queued);
    assert_eq!(hub.publish(&gps_update("GPS000003")), PublishOutcome::Dropped);

    let mut remaining = usize::MAX;
    for _ in 0..100 {
        remaining = hub.subscriber_count().await.unwrap();
        if remaining == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(remaining, 0);

    task.shutdown().await;
}

#[tokio::test]
async fn test_poller_publishes_positions_update() {
    let (hub, hub_task) = TrackingHub::start(HubConfig::default());
    let sink = RecordingSink::default();
    hub.register(Box::new(sink.clone())).await.unwrap();

    let poller = PositionPoller::start(Arc::new(FixedSource), hub.clone(), Duration::from_millis(20));

    let received = wait_for_messages(&sink, 1).await;
    assert!(!received.is_empty());

    let json: serde_json::Value = serde_json::from_str(&received[0]).unwrap();
    assert_eq!(json["type"], "positions_update");
    assert_eq!(json["positions"][0]["device_id"], "GPS000001");
    assert_eq!(json["positions"][0]["status"], "moving");

    poller.shutdown().await;
    hub_task.shutdown().await;
}

#[tokio::test]
async fn test_poller_with_zero_period_still_runs() {
    let (hub, hub_task) = TrackingHub::start(HubConfig::default());
    let sink = RecordingSink::default();
    hub.register(Box::new(sink.clone())).await.unwrap();

    let poller = PositionPoller::start(Arc::new(FixedSource), hub.clone(), Duration::ZERO);

    let received = wait_for_messages(&sink, 1).await;
    assert!(!received.is_empty());
    let json: serde_json::Value = serde_json::from_str(&received[0]).unwrap();
    assert_eq!(json["type"], "positions_update");

    poller.shutdown().await;
    hub_task.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_closes_hub() {
    let (hub, task) = TrackingHub::start(HubConfig::default());
    hub.register(Box::new(RecordingSink::default())).await.unwrap();

    task.shutdown().await;

    assert_eq!(hub.publish(&gps_update("GPS000004")), PublishOutcome::Closed);
    assert!(hub.register(Box::new(RecordingSink::default())).await.is_err());
}
