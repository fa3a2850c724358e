use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{DoctorError, SlotGranularity, SlotRequest};
use crate::services::availability::{day_of_week, is_date_served_by_doctor};
use crate::services::doctor::DoctorService;

#[derive(Debug, Deserialize)]
pub struct AvailableSlotsQuery {
    pub date: NaiveDate,
    pub granularity_minutes: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ServesDateQuery {
    pub date: NaiveDate,
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
            DoctorError::ValidationError(msg) => AppError::ValidationError(msg),
            DoctorError::InvalidAvailability(e) => AppError::Internal(e.to_string()),
            DoctorError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

#[axum::debug_handler]
pub async fn get_available_slots_public(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<AvailableSlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let granularity = SlotGranularity::new(
        query.granularity_minutes.unwrap_or(state.slot_granularity_minutes),
    )
    .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let doctor_service = DoctorService::new(&state);
    let slots = doctor_service
        .get_available_slots(doctor_id, SlotRequest::new(query.date, granularity), None)
        .await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "date": query.date,
        "granularity_minutes": granularity.minutes(),
        "total": slots.len(),
        "slots": slots,
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_serves_date(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<ServesDateQuery>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);
    let doctor = doctor_service.get_doctor(doctor_id, None).await?;

    let served = doctor.status.accepts_bookings()
        && is_date_served_by_doctor(&doctor.availability, query.date);

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "date": query.date,
        "day_of_week": day_of_week(query.date),
        "status": doctor.status,
        "served": served,
    })))
}
