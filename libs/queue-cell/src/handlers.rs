use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{PauseRequest, ReorderRequest, WalkInRequest};
use crate::services::registry::QueueRegistry;

/// Dates travel as path segments in canonical `YYYY-MM-DD`; anything else is
/// rejected here rather than guessed at.
fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::ValidationError(format!("invalid date '{}', expected YYYY-MM-DD", raw)))
}

pub async fn start_queue(
    State(registry): State<Arc<QueueRegistry>>,
    Path((doctor_id, date)): Path<(Uuid, String)>,
) -> Result<Json<Value>, AppError> {
    let date = parse_date(&date)?;
    info!("Start queue request for doctor {} on {}", doctor_id, date);
    let queue = registry.start(doctor_id, date).await?;
    Ok(Json(json!({ "success": true, "queue": queue })))
}

pub async fn pause_queue(
    State(registry): State<Arc<QueueRegistry>>,
    Path((doctor_id, date)): Path<(Uuid, String)>,
    Json(request): Json<PauseRequest>,
) -> Result<Json<Value>, AppError> {
    let date = parse_date(&date)?;
    info!("Pause queue request for doctor {} on {}", doctor_id, date);
    let queue = registry.pause(doctor_id, date, request.reason).await?;
    Ok(Json(json!({ "success": true, "queue": queue })))
}

pub async fn resume_queue(
    State(registry): State<Arc<QueueRegistry>>,
    Path((doctor_id, date)): Path<(Uuid, String)>,
) -> Result<Json<Value>, AppError> {
    let date = parse_date(&date)?;
    info!("Resume queue request for doctor {} on {}", doctor_id, date);
    let queue = registry.resume(doctor_id, date).await?;
    Ok(Json(json!({ "success": true, "queue": queue })))
}

pub async fn stop_queue(
    State(registry): State<Arc<QueueRegistry>>,
    Path((doctor_id, date)): Path<(Uuid, String)>,
) -> Result<Json<Value>, AppError> {
    let date = parse_date(&date)?;
    info!("Stop queue request for doctor {} on {}", doctor_id, date);
    let queue = registry.stop(doctor_id, date).await?;
    Ok(Json(json!({ "success": true, "queue": queue })))
}

pub async fn get_queue_status(
    State(registry): State<Arc<QueueRegistry>>,
    Path((doctor_id, date)): Path<(Uuid, String)>,
) -> Result<Json<Value>, AppError> {
    let date = parse_date(&date)?;
    let status = registry.get_status(doctor_id, date).await?;
    Ok(Json(json!(status)))
}

pub async fn call_next(
    State(registry): State<Arc<QueueRegistry>>,
    Path((doctor_id, date)): Path<(Uuid, String)>,
) -> Result<Json<Value>, AppError> {
    let date = parse_date(&date)?;
    info!("Call-next request for doctor {} on {}", doctor_id, date);
    let appointment = registry.call_next(doctor_id, date).await?;
    Ok(Json(json!({ "success": true, "appointment": appointment })))
}

pub async fn start_session(
    State(registry): State<Arc<QueueRegistry>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    info!("Start session request for appointment {}", appointment_id);
    let appointment = registry.start_session(appointment_id).await?;
    Ok(Json(json!({ "success": true, "appointment": appointment })))
}

pub async fn complete_session(
    State(registry): State<Arc<QueueRegistry>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    info!("Complete session request for appointment {}", appointment_id);
    let appointment = registry.complete_session(appointment_id).await?;
    Ok(Json(json!({ "success": true, "appointment": appointment })))
}

pub async fn skip_patient(
    State(registry): State<Arc<QueueRegistry>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    info!("Skip request for appointment {}", appointment_id);
    let appointment = registry.skip_patient(appointment_id).await?;
    Ok(Json(json!({ "success": true, "appointment": appointment })))
}

pub async fn requeue_skipped(
    State(registry): State<Arc<QueueRegistry>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    info!("Requeue request for appointment {}", appointment_id);
    let appointment = registry.requeue_skipped(appointment_id).await?;
    Ok(Json(json!({ "success": true, "appointment": appointment })))
}

pub async fn cancel_appointment(
    State(registry): State<Arc<QueueRegistry>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    info!("Cancel request for appointment {}", appointment_id);
    let appointment = registry.cancel_appointment(appointment_id).await?;
    Ok(Json(json!({ "success": true, "appointment": appointment })))
}

pub async fn reorder_queue(
    State(registry): State<Arc<QueueRegistry>>,
    Path((doctor_id, date)): Path<(Uuid, String)>,
    Json(request): Json<ReorderRequest>,
) -> Result<Json<Value>, AppError> {
    let date = parse_date(&date)?;
    info!(
        "Reorder request for doctor {} on {} ({} ids)",
        doctor_id,
        date,
        request.ordered_ids.len()
    );
    let reordered = registry
        .reorder_queue(doctor_id, date, &request.ordered_ids)
        .await?;
    Ok(Json(json!({ "success": true, "waiting": reordered })))
}

pub async fn add_walk_in(
    State(registry): State<Arc<QueueRegistry>>,
    Path((doctor_id, date)): Path<(Uuid, String)>,
    Json(request): Json<WalkInRequest>,
) -> Result<Json<Value>, AppError> {
    let date = parse_date(&date)?;
    info!("Walk-in request for doctor {} on {}", doctor_id, date);
    let appointment = registry.add_walk_in(doctor_id, date, request).await?;
    Ok(Json(json!({ "success": true, "appointment": appointment })))
}

pub async fn apply_queue_rules(
    State(registry): State<Arc<QueueRegistry>>,
    Path((doctor_id, date)): Path<(Uuid, String)>,
) -> Result<Json<Value>, AppError> {
    let date = parse_date(&date)?;
    info!("Apply-rules request for doctor {} on {}", doctor_id, date);
    let waiting = registry.apply_queue_rules(doctor_id, date).await?;
    Ok(Json(json!({ "success": true, "waiting": waiting })))
}

pub async fn get_patient_queue_info(
    State(registry): State<Arc<QueueRegistry>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let info = registry.patient_queue_info(appointment_id).await?;
    Ok(Json(json!(info)))
}

pub async fn get_queue_analytics(
    State(registry): State<Arc<QueueRegistry>>,
    Path((doctor_id, date)): Path<(Uuid, String)>,
) -> Result<Json<Value>, AppError> {
    let date = parse_date(&date)?;
    let analytics = registry.queue_analytics(doctor_id, date).await?;
    Ok(Json(json!(analytics)))
}
