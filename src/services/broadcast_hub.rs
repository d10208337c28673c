//! Hub de difusión de posiciones en vivo
//!
//! Un único task es dueño del conjunto de suscriptores; registro, baja y
//! difusión llegan por canales y se atienden en un `select!`. La publicación
//! nunca bloquea: si el canal de difusión está lleno, la actualización se
//! descarta. Un suscriptor cuya escritura falla o excede el timeout se elimina.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use chrono::Utc;
use futures::stream::SplitSink;
use futures::SinkExt;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::gps::{LiveEvent, LivePosition};
use crate::utils::errors::AppResult;
use crate::utils::sanitize::sanitize_for_log;

pub type SubscriberId = Uuid;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("broadcast hub is not running")]
    Stopped,
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("subscriber connection closed")]
    Closed,
    #[error("transport error: {0}")]
    Transport(String),
}

/// Conexión de un suscriptor en vivo
#[async_trait]
pub trait SubscriberSink: Send {
    async fn send_text(&mut self, payload: String) -> Result<(), SinkError>;

    async fn close(&mut self);
}

#[async_trait]
impl SubscriberSink for SplitSink<WebSocket, Message> {
    async fn send_text(&mut self, payload: String) -> Result<(), SinkError> {
        self.send(Message::Text(payload))
            .await
            .map_err(|e| SinkError::Transport(e.to_string()))
    }

    async fn close(&mut self) {
        let _ = SinkExt::close(self).await;
    }
}

/// Resultado de una publicación no bloqueante
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Queued,
    Dropped,
    Closed,
}

#[derive(Debug, Clone)]
pub struct HubConfig {
    pub broadcast_capacity: usize,
    pub write_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 256,
            write_timeout: Duration::from_millis(2000),
        }
    }
}

enum HubCommand {
    Register {
        id: SubscriberId,
        sink: Box<dyn SubscriberSink>,
    },
    Unregister(SubscriberId),
    Count(oneshot::Sender<usize>),
}

/// Handle clonable para hablar con el hub
#[derive(Clone)]
pub struct HubHandle {
    commands: mpsc::Sender<HubCommand>,
    broadcast: mpsc::Sender<String>,
}

impl HubHandle {
    pub async fn register(&self, sink: Box<dyn SubscriberSink>) -> Result<SubscriberId, HubError> {
        let id = Uuid::new_v4();
        self.commands
            .send(HubCommand::Register { id, sink })
            .await
            .map_err(|_| HubError::Stopped)?;
        Ok(id)
    }

    pub async fn unregister(&self, id: SubscriberId) {
        if self.commands.send(HubCommand::Unregister(id)).await.is_err() {
            debug!("Hub detenido, baja de {} ignorada", id);
        }
    }

    /// Encola el evento sin esperar; si el canal está lleno se descarta
    pub fn publish(&self, event: &LiveEvent) -> PublishOutcome {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("⚠️ No se pudo serializar el evento: {}", e);
                return PublishOutcome::Dropped;
            }
        };

        match self.broadcast.try_send(payload) {
            Ok(()) => PublishOutcome::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("Canal de difusión lleno, actualización descartada");
                PublishOutcome::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(_)) => PublishOutcome::Closed,
        }
    }

    pub async fn subscriber_count(&self) -> Result<usize, HubError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(HubCommand::Count(tx))
            .await
            .map_err(|_| HubError::Stopped)?;
        rx.await.map_err(|_| HubError::Stopped)
    }
}

/// Task de fondo con apagado explícito
pub struct BackgroundTask {
    name: &'static str,
    shutdown: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl BackgroundTask {
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(()).await;
        if let Err(e) = self.handle.await {
            warn!("⚠️ {} terminó con error: {}", self.name, e);
        }
        info!("🛑 {} detenido", self.name);
    }
}

pub struct TrackingHub {
    subscribers: HashMap<SubscriberId, Box<dyn SubscriberSink>>,
    write_timeout: Duration,
    commands: mpsc::Receiver<HubCommand>,
    broadcast: mpsc::Receiver<String>,
    shutdown: mpsc::Receiver<()>,
}

impl TrackingHub {
    /// Arranca el bucle del hub y devuelve el handle y el task
    pub fn start(config: HubConfig) -> (HubHandle, BackgroundTask) {
        let (command_tx, command_rx) = mpsc::channel(64);
        let (broadcast_tx, broadcast_rx) = mpsc::channel(config.broadcast_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let hub = TrackingHub {
            subscribers: HashMap::new(),
            write_timeout: config.write_timeout,
            commands: command_rx,
            broadcast: broadcast_rx,
            shutdown: shutdown_rx,
        };

        let handle = tokio::spawn(hub.run());
        info!("📡 Hub de seguimiento iniciado");

        (
            HubHandle {
                commands: command_tx,
                broadcast: broadcast_tx,
            },
            BackgroundTask {
                name: "Hub de seguimiento",
                shutdown: shutdown_tx,
                handle,
            },
        )
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                _ = self.shutdown.recv() => break,
                Some(command) = self.commands.recv() => self.handle_command(command).await,
                Some(payload) = self.broadcast.recv() => self.broadcast_payload(payload).await,
                else => break,
            }
        }

        for (_, mut sink) in self.subscribers.drain() {
            sink.close().await;
        }
    }

    async fn handle_command(&mut self, command: HubCommand) {
        match command {
            HubCommand::Register { id, sink } => {
                self.subscribers.insert(id, sink);
                info!("🔌 Suscriptor {} conectado ({} activos)", id, self.subscribers.len());
            }
            HubCommand::Unregister(id) => {
                if let Some(mut sink) = self.subscribers.remove(&id) {
                    sink.close().await;
                    info!("🔌 Suscriptor {} desconectado ({} activos)", id, self.subscribers.len());
                }
            }
            HubCommand::Count(reply) => {
                let _ = reply.send(self.subscribers.len());
            }
        }
    }

    async fn broadcast_payload(&mut self, payload: String) {
        let mut dead = Vec::new();

        for (id, sink) in self.subscribers.iter_mut() {
            match timeout(self.write_timeout, sink.send_text(payload.clone())).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("⚠️ Escritura fallida a {}: {}", id, sanitize_for_log(&e.to_string()));
                    dead.push(*id);
                }
                Err(_) => {
                    warn!("⚠️ Timeout escribiendo a {}", id);
                    dead.push(*id);
                }
            }
        }

        for id in dead {
            if let Some(mut sink) = self.subscribers.remove(&id) {
                sink.close().await;
            }
        }
    }
}

/// Origen de las posiciones que difunde el poller
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn latest_positions(&self) -> AppResult<Vec<LivePosition>>;
}

/// Consulta las últimas posiciones y las publica como `positions_update`
pub async fn publish_latest_positions(
    source: &dyn PositionSource,
    hub: &HubHandle,
) -> AppResult<PublishOutcome> {
    let positions = source.latest_positions().await?;
    Ok(hub.publish(&LiveEvent::PositionsUpdate {
        positions,
        timestamp: Utc::now(),
    }))
}

/// Periodo mínimo del poller; `interval` no admite cero
pub const MIN_POLL_PERIOD: Duration = Duration::from_millis(100);

pub struct PositionPoller;

impl PositionPoller {
    /// El primer envío ocurre un `period` después de arrancar
    pub fn start(source: Arc<dyn PositionSource>, hub: HubHandle, period: Duration) -> BackgroundTask {
        let period = period.max(MIN_POLL_PERIOD);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = ticker.tick() => {
                        match publish_latest_positions(source.as_ref(), &hub).await {
                            Ok(PublishOutcome::Closed) => break,
                            Ok(_) => {}
                            Err(e) => warn!(
                                "⚠️ No se pudieron obtener las posiciones: {}",
                                sanitize_for_log(&e.to_string())
                            ),
                        }
                    }
                }
            }
        });

        info!("⏱️ Poller de posiciones iniciado (cada {:?})", period);

        BackgroundTask {
            name: "Poller de posiciones",
            shutdown: shutdown_tx,
            handle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

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

    #[tokio::test]
    async fn test_register_and_count() {
        let (hub, task) = TrackingHub::start(HubConfig::default());
        let received = Arc::new(Mutex::new(Vec::new()));

        let id = hub
            .register(Box::new(RecordingSink { received: received.clone() }))
            .await
            .unwrap();
        assert_eq!(hub.subscriber_count().await.unwrap(), 1);

        hub.unregister(id).await;
        assert_eq!(hub.subscriber_count().await.unwrap(), 0);

        task.shutdown().await;
    }

    #[tokio::test]
    async fn test_publish_after_shutdown_is_closed() {
        let (hub, task) = TrackingHub::start(HubConfig::default());
        task.shutdown().await;

        let event = LiveEvent::PositionsUpdate { positions: vec![], timestamp: Utc::now() };
        assert_eq!(hub.publish(&event), PublishOutcome::Closed);
        assert!(hub.subscriber_count().await.is_err());
    }
}
