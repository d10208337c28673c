//! Notificaciones al dueño del vehículo
//!
//! `NotificationService` resuelve destinatario y plantilla, renderiza y
//! guarda. `NotificationDispatcher` desacopla ese trabajo de la request:
//! una cola acotada atendida por un número fijo de workers. Si la cola está
//! llena el trabajo se descarta con un warning; los fallos no se reintentan.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::models::notification::{
    application_id, render_template, NewNotification, Notification, TemplateKey,
};
use crate::repositories::notification_repository::NotificationStore;
use crate::utils::errors::{not_found_error, AppError, AppResult};
use crate::utils::sanitize::sanitize_for_log;
use crate::utils::validation::page_limit;

pub const DEFAULT_NOTIFICATION_LIMIT: i64 = 20;
pub const MAX_NOTIFICATION_LIMIT: i64 = 100;

/// Envío de notificaciones ligadas a un vehículo
#[async_trait]
pub trait VehicleNotifier: Send + Sync {
    async fn send_vehicle_notification(
        &self,
        vehicle_id: i64,
        template: TemplateKey,
        variables: HashMap<String, String>,
    ) -> AppResult<()>;
}

pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    pub async fn list_for_user(&self, user_id: i64, limit: Option<i64>) -> AppResult<Vec<Notification>> {
        let limit = page_limit(limit, DEFAULT_NOTIFICATION_LIMIT, MAX_NOTIFICATION_LIMIT);
        self.store.list_for_user(user_id, limit).await
    }

    pub async fn mark_read(&self, notification_id: i64, user_id: i64) -> AppResult<()> {
        if self.store.mark_read(notification_id, user_id).await? {
            Ok(())
        } else {
            Err(not_found_error("Notification", notification_id))
        }
    }
}

#[async_trait]
impl VehicleNotifier for NotificationService {
    async fn send_vehicle_notification(
        &self,
        vehicle_id: i64,
        template: TemplateKey,
        variables: HashMap<String, String>,
    ) -> AppResult<()> {
        let recipient = self
            .store
            .recipient(vehicle_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Owner of vehicle {} not found", vehicle_id)))?;

        let stored_template = self
            .store
            .template(template.as_str())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Template '{}' not found", template.as_str())))?;

        let mut all_variables = HashMap::from([
            ("plate".to_string(), recipient.registration_number.clone()),
            ("application_id".to_string(), application_id(vehicle_id)),
            ("owner_name".to_string(), recipient.owner_name.clone()),
        ]);
        all_variables.extend(variables);

        let notification = NewNotification {
            user_id: recipient.user_id,
            title: render_template(&stored_template.title, &all_variables),
            message: render_template(&stored_template.message, &all_variables),
            channels: stored_template.channels.0.clone(),
        };

        log::info!(
            "📨 NOTIFICATION [{}] to user {}: {}",
            notification.channels.join(","),
            notification.user_id,
            sanitize_for_log(&notification.title)
        );

        self.store.insert(&notification).await?;
        Ok(())
    }
}

/// Trabajo pendiente para la cola de notificaciones
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationJob {
    pub vehicle_id: i64,
    pub template: TemplateKey,
    pub variables: HashMap<String, String>,
}

impl NotificationJob {
    pub fn new(vehicle_id: i64, template: TemplateKey) -> Self {
        Self {
            vehicle_id,
            template,
            variables: HashMap::new(),
        }
    }

    pub fn with_variable(mut self, key: &str, value: impl Into<String>) -> Self {
        self.variables.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Queued,
    Dropped,
    Closed,
}

pub struct NotificationDispatcher {
    sender: Mutex<Option<mpsc::Sender<NotificationJob>>>,
    workers: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl NotificationDispatcher {
    pub fn start(notifier: Arc<dyn VehicleNotifier>, workers: usize, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let handles = (0..workers.max(1))
            .map(|worker_id| tokio::spawn(worker_loop(worker_id, rx.clone(), notifier.clone())))
            .collect();

        log::info!(
            "📨 Despachador de notificaciones iniciado ({} workers, cola de {})",
            workers.max(1),
            capacity.max(1)
        );

        Self {
            sender: Mutex::new(Some(tx)),
            workers: tokio::sync::Mutex::new(handles),
        }
    }

    /// No bloquea nunca: con la cola llena el trabajo se descarta
    pub fn enqueue(&self, job: NotificationJob) -> EnqueueOutcome {
        let guard = self.sender.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let Some(sender) = guard.as_ref() else {
            return EnqueueOutcome::Closed;
        };

        match sender.try_send(job) {
            Ok(()) => EnqueueOutcome::Queued,
            Err(TrySendError::Full(job)) => {
                log::warn!(
                    "⚠️ Cola de notificaciones llena, se descarta '{}' del vehículo {}",
                    job.template.as_str(),
                    job.vehicle_id
                );
                EnqueueOutcome::Dropped
            }
            Err(TrySendError::Closed(_)) => EnqueueOutcome::Closed,
        }
    }

    /// Cierra la cola, deja que los workers la vacíen y espera a que terminen
    pub async fn shutdown(&self) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        drop(sender);

        let handles = std::mem::take(&mut *self.workers.lock().await);
        for handle in handles {
            if let Err(e) = handle.await {
                log::warn!("⚠️ Worker de notificaciones terminó con error: {}", e);
            }
        }

        log::info!("🛑 Despachador de notificaciones detenido");
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<tokio::sync::Mutex<mpsc::Receiver<NotificationJob>>>,
    notifier: Arc<dyn VehicleNotifier>,
) {
    loop {
        let job = { queue.lock().await.recv().await };
        let Some(job) = job else { break };

        if let Err(e) = notifier
            .send_vehicle_notification(job.vehicle_id, job.template, job.variables)
            .await
        {
            log::warn!(
                "⚠️ [worker {}] Notificación '{}' del vehículo {} no enviada: {}",
                worker_id,
                job.template.as_str(),
                job.vehicle_id,
                sanitize_for_log(&e.to_string())
            );
        }
    }
}
