// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::Local;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, BookAppointmentRequest,
    ConflictCheckRequest, RescheduleAppointmentRequest, UpdateStatusRequest,
};
use crate::services::booking::AppointmentBookingService;
use crate::services::conflict::ConflictDetectionService;

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound => AppError::NotFound(err.to_string()),
            AppointmentError::DoctorNotFound => AppError::NotFound(err.to_string()),
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::OutsideAvailability(_) => AppError::BadRequest(err.to_string()),
            AppointmentError::DoctorNotAvailable
            | AppointmentError::ConflictDetected
            | AppointmentError::InvalidStatusTransition { .. }
            | AppointmentError::CannotReschedule(_)
            | AppointmentError::CannotCancelPaid
            | AppointmentError::AlreadyCancelled
            | AppointmentError::AppointmentInPast => AppError::Conflict(err.to_string()),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

fn ensure_can_access(user: &User, appointment: &Appointment) -> Result<(), AppError> {
    if user.is_staff() || appointment.patient_id.to_string() == user.id {
        Ok(())
    } else {
        Err(AppError::Forbidden("Not authorized to access this appointment".to_string()))
    }
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    // Patients book for themselves; clinic staff book for anyone
    if !user.is_staff() && request.patient_id.to_string() != user.id {
        return Err(AppError::Forbidden("Not authorized to book appointment for this patient".to_string()));
    }

    let booking_service = AppointmentBookingService::new(&state);
    let appointment = booking_service.book_appointment(request, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let booking_service = AppointmentBookingService::new(&state);
    let appointment = booking_service.get_appointment(appointment_id, auth.token()).await?;
    ensure_can_access(&user, &appointment)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let booking_service = AppointmentBookingService::new(&state);

    let existing = booking_service.get_appointment(appointment_id, token).await?;
    ensure_can_access(&user, &existing)?;

    let appointment = booking_service.reschedule_appointment(appointment_id, request, token).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
    })))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let booking_service = AppointmentBookingService::new(&state);

    let existing = booking_service.get_appointment(appointment_id, token).await?;
    ensure_can_access(&user, &existing)?;

    // Patients may only cancel; every other transition is a clinic decision
    if !user.is_staff() && request.status != AppointmentStatus::Cancelled {
        return Err(AppError::Forbidden("Only clinic staff can change this status".to_string()));
    }

    let today = Local::now().date_naive();
    let appointment = booking_service
        .update_status(appointment_id, request.status, today, token)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
    })))
}

#[axum::debug_handler]
pub async fn check_appointment_conflicts(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<ConflictCheckRequest>,
) -> Result<Json<Value>, AppError> {
    let conflict_service = ConflictDetectionService::new(&state);

    let response = conflict_service.check_conflicts(
        request.doctor_id,
        request.start_time,
        request.end_time,
        request.exclude_appointment_id,
        auth.token(),
    ).await?;

    Ok(Json(json!(response)))
}
