use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{
    add_walk_in, apply_queue_rules, call_next, cancel_appointment, complete_session,
    get_patient_queue_info, get_queue_analytics, get_queue_status, pause_queue, requeue_skipped,
    reorder_queue, resume_queue, skip_patient, start_queue, start_session, stop_queue,
};
use crate::services::registry::QueueRegistry;

pub fn create_queue_router(registry: Arc<QueueRegistry>) -> Router {
    Router::new()
        .route("/queue/{doctor_id}/{date}/start", post(start_queue))
        .route("/queue/{doctor_id}/{date}/pause", post(pause_queue))
        .route("/queue/{doctor_id}/{date}/resume", post(resume_queue))
        .route("/queue/{doctor_id}/{date}/stop", post(stop_queue))
        .route("/queue/{doctor_id}/{date}", get(get_queue_status))
        .route("/queue/{doctor_id}/{date}/call-next", post(call_next))
        .route("/queue/{doctor_id}/{date}/walk-in", post(add_walk_in))
        .route("/queue/{doctor_id}/{date}/reorder", post(reorder_queue))
        .route("/queue/{doctor_id}/{date}/apply-rules", post(apply_queue_rules))
        .route("/queue/{doctor_id}/{date}/analytics", get(get_queue_analytics))
        .route("/appointments/{appointment_id}/start", post(start_session))
        .route("/appointments/{appointment_id}/complete", post(complete_session))
        .route("/appointments/{appointment_id}/skip", post(skip_patient))
        .route("/appointments/{appointment_id}/requeue", post(requeue_skipped))
        .route("/appointments/{appointment_id}/cancel", post(cancel_appointment))
        .route(
            "/appointments/{appointment_id}/queue-info",
            get(get_patient_queue_info),
        )
        .with_state(registry)
}
