use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use validator::Validate;

use crate::dto::verification_dto::{
    CorrectionRequest, CrossCheckRequest, CrossCheckResponse, DashboardResponse,
    HistoryEntryResponse, HistoryResponse, InspectionScheduledResponse, PendingQueueResponse,
    ScheduleInspectionRequest, TransitionResponse, VehicleListResponse, VerifyVehicleRequest,
};
use crate::models::auth::AuthenticatedUser;
use crate::models::vehicle::VehicleRecord;
use crate::routes::{json_body, parse_id};
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Rutas de verificación; requieren `require_auth` + `require_admin`
pub fn create_admin_router() -> Router<AppState> {
    Router::new()
        .route("/vehicles/pending", get(pending_queue))
        .route("/vehicles/status/:status", get(vehicles_by_status))
        .route("/vehicles/:id", get(get_vehicle))
        .route("/vehicles/:id/verify", put(verify_vehicle))
        .route("/vehicles/:id/correction", put(request_correction))
        .route("/vehicles/:id/cross-check", post(cross_check))
        .route("/vehicles/:id/schedule-inspection", post(schedule_inspection))
        .route("/vehicles/:id/history", get(vehicle_history))
        .route("/verification-dashboard", get(verification_dashboard))
}

/// PUT /vehicles/:id/verify
///
/// A diferencia de `/correction`, acepta cualquier destino válido. Solo
/// approved, rejected y needs_correction generan notificación al dueño.
async fn verify_vehicle(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    payload: Result<Json<VerifyVehicleRequest>, JsonRejection>,
) -> Result<Json<TransitionResponse>, AppError> {
    let vehicle_id = parse_id(&id, "vehicle")?;
    let request = json_body(payload)?;
    request.validate()?;

    let receipt = state
        .verification
        .transition(vehicle_id, request.status.trim(), &request.notes, admin.user_id)
        .await?;

    Ok(Json(TransitionResponse {
        message: format!("Vehicle status updated to {}", receipt.new_status),
        receipt,
    }))
}

async fn request_correction(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    payload: Result<Json<CorrectionRequest>, JsonRejection>,
) -> Result<Json<TransitionResponse>, AppError> {
    let vehicle_id = parse_id(&id, "vehicle")?;
    let request = json_body(payload)?;
    request.validate()?;

    let receipt = state
        .verification
        .request_correction(vehicle_id, &request.correction_items, &request.notes, admin.user_id)
        .await?;

    Ok(Json(TransitionResponse {
        message: "Correction request sent successfully".to_string(),
        receipt,
    }))
}

async fn cross_check(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<CrossCheckRequest>, JsonRejection>,
) -> Result<Json<CrossCheckResponse>, AppError> {
    let vehicle_id = parse_id(&id, "vehicle")?;
    let request = json_body(payload)?;
    request.validate()?;

    let result = state
        .verification
        .cross_check(vehicle_id, request.check_type.trim())
        .await?;

    Ok(Json(CrossCheckResponse { result }))
}

async fn schedule_inspection(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    payload: Result<Json<ScheduleInspectionRequest>, JsonRejection>,
) -> Result<Json<InspectionScheduledResponse>, AppError> {
    let vehicle_id = parse_id(&id, "vehicle")?;
    let request = json_body(payload)?;
    request.validate()?;

    let inspection = state
        .verification
        .schedule_inspection(
            vehicle_id,
            request.inspection_date.trim(),
            &request.location,
            &request.notes,
            admin.user_id,
        )
        .await?;

    Ok(Json(InspectionScheduledResponse {
        message: "Inspection scheduled successfully".to_string(),
        inspection_date: inspection.scheduled_at,
        location: inspection.location.clone(),
        inspection,
    }))
}

async fn vehicles_by_status(
    State(state): State<AppState>,
    Path(status): Path<String>,
) -> Result<Json<VehicleListResponse>, AppError> {
    let (status, vehicles) = state.verification.vehicles_by_status(&status).await?;

    Ok(Json(VehicleListResponse {
        count: vehicles.len(),
        vehicles,
        status,
    }))
}

async fn pending_queue(State(state): State<AppState>) -> Result<Json<PendingQueueResponse>, AppError> {
    let vehicles = state.verification.pending_queue().await?;

    Ok(Json(PendingQueueResponse {
        count: vehicles.len(),
        vehicles,
    }))
}

async fn get_vehicle(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<VehicleRecord>, AppError> {
    let vehicle_id = parse_id(&id, "vehicle")?;
    let vehicle = state.verification.find_vehicle(vehicle_id).await?;
    Ok(Json(vehicle))
}

async fn vehicle_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<HistoryResponse>, AppError> {
    let vehicle_id = parse_id(&id, "vehicle")?;
    let history = state.verification.history(vehicle_id).await?;

    Ok(Json(HistoryResponse {
        vehicle_id,
        history: history.into_iter().map(HistoryEntryResponse::from).collect(),
    }))
}

async fn verification_dashboard(State(state): State<AppState>) -> Result<Json<DashboardResponse>, AppError> {
    let dashboard = state.verification.dashboard().await?;
    Ok(Json(DashboardResponse { dashboard }))
}
