use axum::{
    extract::{
        rejection::JsonRejection,
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::StatusCode,
    response::Response,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use validator::Validate;

use crate::dto::gps_dto::{
    AssignDeviceRequest, BatchReportRequest, BatchResponse, CreateGpsRegistrationRequest,
    DeviceHistory, DeviceListResponse, DeviceResponse, DeviceStatusRequest, GpsReport,
    HistoryQuery, IngestResponse, PositionsResponse, RegistrationDecisionRequest,
    RegistrationListResponse, RegistrationResponse,
};
use crate::models::auth::AuthenticatedUser;
use crate::models::gps::{LiveEvent, LivePosition};
use crate::models::gps_registration::NewGpsRegistration;
use crate::routes::{json_body, parse_id};
use crate::services::broadcast_hub::HubHandle;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Rutas públicas: ingesta desde los dispositivos y alta de registros
pub fn create_gps_public_router() -> Router<AppState> {
    Router::new()
        .route("/gps/data", post(ingest_point))
        .route("/gps/data/batch", post(ingest_batch))
        .route("/gps-registration", post(create_registration))
}

/// Rutas para cualquier usuario autenticado
pub fn create_gps_router() -> Router<AppState> {
    Router::new()
        .route("/gps/positions", get(latest_positions))
        .route("/gps/history/:device_id", get(device_history))
        .route("/gps/live", get(live_tracking))
        .route("/gps-registration/:id", get(get_registration))
}

/// Rutas de administración de registros y dispositivos
pub fn create_gps_admin_router() -> Router<AppState> {
    Router::new()
        .route("/gps-registration", get(list_registrations))
        .route("/gps-registration/pending", get(list_pending_registrations))
        .route("/gps-registration/:id/approve", put(decide_registration))
        .route("/gps-devices", get(list_devices))
        .route("/gps-devices/assign", post(assign_device))
        .route("/gps-devices/:device_id/status", put(update_device_status))
}

async fn ingest_point(
    State(state): State<AppState>,
    payload: Result<Json<GpsReport>, JsonRejection>,
) -> Result<(StatusCode, Json<IngestResponse>), AppError> {
    let report = json_body(payload)?;
    let point = state.tracking.ingest(&report).await?;

    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            message: "GPS data received".to_string(),
            point,
        }),
    ))
}

async fn ingest_batch(
    State(state): State<AppState>,
    payload: Result<Json<BatchReportRequest>, JsonRejection>,
) -> Result<Json<BatchResponse>, AppError> {
    let request = json_body(payload)?;
    let outcome = state.tracking.ingest_batch(&request.data).await;

    Ok(Json(BatchResponse {
        message: "Batch GPS data processed".to_string(),
        outcome,
    }))
}

async fn latest_positions(State(state): State<AppState>) -> Result<Json<PositionsResponse>, AppError> {
    let positions = state.tracking.latest_positions().await?;

    Ok(Json(PositionsResponse {
        count: positions.len(),
        positions,
        timestamp: Utc::now(),
    }))
}

async fn device_history(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<DeviceHistory>, AppError> {
    let history = state
        .tracking
        .history(&device_id, query.hours.as_deref())
        .await?;
    Ok(Json(history))
}

async fn live_tracking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ws: WebSocketUpgrade,
) -> Response {
    let hub = state.hub.clone();
    let initial = state.tracking.latest_positions().await.ok();

    log::info!("🔌 Upgrade de seguimiento en vivo para usuario {}", user.user_id);

    ws.on_upgrade(move |socket| handle_live_socket(socket, hub, initial))
}

async fn handle_live_socket(
    socket: WebSocket,
    hub: HubHandle,
    initial: Option<Vec<LivePosition>>,
) {
    let (mut sink, mut stream) = socket.split();

    if let Some(positions) = initial {
        let snapshot = LiveEvent::PositionsUpdate {
            positions,
            timestamp: Utc::now(),
        };
        if let Ok(payload) = serde_json::to_string(&snapshot) {
            if sink.send(Message::Text(payload)).await.is_err() {
                return;
            }
        }
    }

    let id = match hub.register(Box::new(sink)).await {
        Ok(id) => id,
        Err(e) => {
            log::warn!("⚠️ No se pudo registrar el suscriptor: {}", e);
            return;
        }
    };

    // El cliente no envía datos; se lee solo para detectar el cierre
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    hub.unregister(id).await;
}

async fn create_registration(
    State(state): State<AppState>,
    payload: Result<Json<CreateGpsRegistrationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegistrationResponse>), AppError> {
    let request = json_body(payload)?;
    request.validate()?;

    let registration = state
        .devices
        .register(NewGpsRegistration {
            registration_number: request.registration_number.trim().to_uppercase(),
            vehicle_type: request.vehicle_type.trim().to_string(),
            capacity_tons: request.capacity_tons,
            operator_notes: request.operator_notes,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegistrationResponse {
            message: "GPS registration submitted".to_string(),
            registration,
            device: None,
        }),
    ))
}

async fn get_registration(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RegistrationResponse>, AppError> {
    let id = parse_id(&id, "registration")?;
    let registration = state.devices.get_registration(id).await?;

    Ok(Json(RegistrationResponse {
        message: "GPS registration found".to_string(),
        registration,
        device: None,
    }))
}

async fn list_registrations(State(state): State<AppState>) -> Result<Json<RegistrationListResponse>, AppError> {
    let registrations = state.devices.list_registrations(false).await?;

    Ok(Json(RegistrationListResponse {
        count: registrations.len(),
        registrations,
    }))
}

async fn list_pending_registrations(
    State(state): State<AppState>,
) -> Result<Json<RegistrationListResponse>, AppError> {
    let registrations = state.devices.list_registrations(true).await?;

    Ok(Json(RegistrationListResponse {
        count: registrations.len(),
        registrations,
    }))
}

async fn decide_registration(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    payload: Result<Json<RegistrationDecisionRequest>, JsonRejection>,
) -> Result<Json<RegistrationResponse>, AppError> {
    let id = parse_id(&id, "registration")?;
    let request = json_body(payload)?;
    request.validate()?;

    let (registration, device) = state
        .devices
        .decide(id, request.status.trim(), request.admin_notes.as_deref(), admin.user_id)
        .await?;

    Ok(Json(RegistrationResponse {
        message: format!("GPS registration {}", registration.status),
        registration,
        device,
    }))
}

async fn list_devices(State(state): State<AppState>) -> Result<Json<DeviceListResponse>, AppError> {
    let devices = state.devices.list_devices().await?;

    Ok(Json(DeviceListResponse {
        count: devices.len(),
        devices,
    }))
}

async fn assign_device(
    State(state): State<AppState>,
    payload: Result<Json<AssignDeviceRequest>, JsonRejection>,
) -> Result<Json<DeviceResponse>, AppError> {
    let request = json_body(payload)?;
    request.validate()?;

    let device = state
        .devices
        .assign(request.device_id.trim(), request.vehicle_id)
        .await?;

    Ok(Json(DeviceResponse {
        message: "GPS device assigned to vehicle".to_string(),
        device,
    }))
}

async fn update_device_status(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    payload: Result<Json<DeviceStatusRequest>, JsonRejection>,
) -> Result<Json<DeviceResponse>, AppError> {
    let request = json_body(payload)?;
    request.validate()?;

    let device = state
        .devices
        .update_status(&device_id, request.status.trim())
        .await?;

    Ok(Json(DeviceResponse {
        message: "GPS device status updated".to_string(),
        device,
    }))
}
