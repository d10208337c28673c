use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Extension, Json, Router,
};
use serde_json::{json, Value};

use crate::dto::notification_dto::{NotificationListResponse, NotificationQuery};
use crate::models::auth::AuthenticatedUser;
use crate::routes::parse_id;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_notification_router() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/:id/read", put(mark_read))
}

async fn list_notifications(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<NotificationListResponse>, AppError> {
    let notifications = state
        .notifications
        .list_for_user(user.user_id, query.limit)
        .await?;

    Ok(Json(NotificationListResponse {
        count: notifications.len(),
        notifications,
    }))
}

async fn mark_read(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&id, "notification")?;
    state.notifications.mark_read(id, user.user_id).await?;
    Ok(Json(json!({ "message": "Notification marked as read" })))
}
