//! Persistencia de notificaciones y plantillas

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::notification::{NewNotification, Notification, NotificationTemplate, Recipient};
use crate::utils::errors::AppResult;

#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Usuario dueño del vehículo, vía fleet_owners
    async fn recipient(&self, vehicle_id: i64) -> AppResult<Option<Recipient>>;

    async fn template(&self, template_key: &str) -> AppResult<Option<NotificationTemplate>>;

    async fn insert(&self, notification: &NewNotification) -> AppResult<Notification>;

    async fn list_for_user(&self, user_id: i64, limit: i64) -> AppResult<Vec<Notification>>;

    /// `false` si la notificación no existe o no es del usuario
    async fn mark_read(&self, notification_id: i64, user_id: i64) -> AppResult<bool>;
}

pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for NotificationRepository {
    async fn recipient(&self, vehicle_id: i64) -> AppResult<Option<Recipient>> {
        let recipient = sqlx::query_as::<_, Recipient>(
            r#"
            SELECT u.id AS user_id,
                   COALESCE(u.full_name, u.username) AS owner_name,
                   v.registration_number
            FROM vehicles v
            JOIN fleet_owners fo ON fo.id = v.fleet_owner_id
            JOIN users u ON u.id = fo.user_id
            WHERE v.id = $1
            "#,
        )
        .bind(vehicle_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(recipient)
    }

    async fn template(&self, template_key: &str) -> AppResult<Option<NotificationTemplate>> {
        let template = sqlx::query_as::<_, NotificationTemplate>(
            "SELECT template_key, title, message, channels FROM notification_templates WHERE template_key = $1",
        )
        .bind(template_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(template)
    }

    async fn insert(&self, notification: &NewNotification) -> AppResult<Notification> {
        let stored = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_id, title, message, channels)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, title, message, channels, read, created_at
            "#,
        )
        .bind(notification.user_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(Json(&notification.channels))
        .fetch_one(&self.pool)
        .await?;

        Ok(stored)
    }

    async fn list_for_user(&self, user_id: i64, limit: i64) -> AppResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, title, message, channels, read, created_at
            FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    async fn mark_read(&self, notification_id: i64, user_id: i64) -> AppResult<bool> {
        let result = sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1 AND user_id = $2")
            .bind(notification_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
