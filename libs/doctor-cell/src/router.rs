use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use shared_config::AppConfig;

use crate::handlers;

pub fn doctor_routes(state: Arc<AppConfig>) -> Router {
    // Slot lookups are public so the booking UI can render them before sign-in
    Router::new()
        .route("/{doctor_id}/available-slots", get(handlers::get_available_slots_public))
        .route("/{doctor_id}/serves", get(handlers::get_doctor_serves_date))
        .with_state(state)
}
