// libs/appointment-cell/src/services/booking.rs
use chrono::NaiveDate;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::{is_date_served_by_doctor, Doctor, DoctorService};
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    format_timestamp, Appointment, AppointmentError, AppointmentStatus, BookAppointmentRequest,
    BookingInterval, PaymentStatus, RescheduleAppointmentRequest, MAX_DURATION_MINUTES,
};
use crate::services::conflict::ConflictDetectionService;
use crate::services::lifecycle::AppointmentLifecycleService;

pub struct AppointmentBookingService {
    supabase: SupabaseClient,
    doctor_service: DoctorService,
    conflict_service: ConflictDetectionService,
    lifecycle_service: AppointmentLifecycleService,
    default_duration_minutes: i64,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            doctor_service: DoctorService::new(config),
            conflict_service: ConflictDetectionService::new(config),
            lifecycle_service: AppointmentLifecycleService::new(),
            default_duration_minutes: config.slot_granularity_minutes,
        }
    }

    /// Book a new appointment after checking the doctor's window and calendar.
    ///
    /// The conflict check here does not serialize concurrent bookings; the
    /// datastore's exclusion constraint is the final guard against a race.
    pub async fn book_appointment(
        &self,
        request: BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let duration_minutes = request.duration_minutes.unwrap_or(self.default_duration_minutes);
        validate_duration(duration_minutes)?;

        debug!("Booking doctor {} at {} for {} minutes",
               request.doctor_id, request.start_time, duration_minutes);

        let doctor = self.doctor_service.get_doctor(request.doctor_id, Some(auth_token)).await?;
        let interval = BookingInterval::from_duration(request.start_time, duration_minutes)?;
        ensure_within_availability(&doctor, &interval)?;

        self.ensure_no_conflict(doctor.id, &interval, None, auth_token).await?;

        let appointment_data = json!({
            "clinic_id": doctor.clinic_id,
            "doctor_id": doctor.id,
            "patient_id": request.patient_id,
            "start_time": format_timestamp(request.start_time),
            "duration_minutes": duration_minutes,
            "status": AppointmentStatus::Pending,
            "payment_status": PaymentStatus::Unpaid,
            "notes": request.notes,
        });

        let result: Vec<Appointment> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/appointments",
            Some(auth_token),
            Some(appointment_data),
            Some(SupabaseClient::return_representation()),
        ).await?;

        let appointment = result.into_iter().next().ok_or_else(|| {
            AppointmentError::DatabaseError("Failed to create appointment".to_string())
        })?;

        info!("Appointment {} booked with doctor {} at {}",
              appointment.id, appointment.doctor_id, appointment.start_time);
        Ok(appointment)
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Appointment> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        result.into_iter().next().ok_or(AppointmentError::NotFound)
    }

    /// Move an appointment to a new time. The appointment's own slot is ignored in the conflict check.
    pub async fn reschedule_appointment(
        &self,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_appointment(appointment_id, auth_token).await?;

        if !appointment.status.can_reschedule() {
            warn!("Attempt to reschedule {} appointment {}", appointment.status, appointment_id);
            return Err(AppointmentError::CannotReschedule(appointment.status));
        }

        let duration_minutes = request.new_duration_minutes.unwrap_or(appointment.duration_minutes);
        validate_duration(duration_minutes)?;

        let doctor = self.doctor_service.get_doctor(appointment.doctor_id, Some(auth_token)).await?;
        let interval = BookingInterval::from_duration(request.new_start_time, duration_minutes)?;
        ensure_within_availability(&doctor, &interval)?;

        self.ensure_no_conflict(doctor.id, &interval, Some(appointment_id), auth_token).await?;

        let updated = self.patch_appointment(
            appointment_id,
            json!({
                "start_time": format_timestamp(request.new_start_time),
                "duration_minutes": duration_minutes,
            }),
            auth_token,
        ).await?;

        info!("Appointment {} rescheduled from {} to {}",
              appointment_id, appointment.start_time, updated.start_time);
        Ok(updated)
    }

    /// Apply a status transition after the lifecycle guards pass.
    pub async fn update_status(
        &self,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
        today: NaiveDate,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_appointment(appointment_id, auth_token).await?;

        self.lifecycle_service.validate_status_transition(&appointment, new_status, today)?;

        // A reactivated appointment takes its slot back, which may have been rebooked meanwhile
        if appointment.status == AppointmentStatus::Cancelled {
            self.ensure_no_conflict(
                appointment.doctor_id,
                &appointment.interval()?,
                Some(appointment_id),
                auth_token,
            ).await?;
        }

        let updated = self.patch_appointment(
            appointment_id,
            json!({ "status": new_status }),
            auth_token,
        ).await?;

        info!("Appointment {} moved from {} to {}", appointment_id, appointment.status, new_status);
        Ok(updated)
    }

    async fn ensure_no_conflict(
        &self,
        doctor_id: Uuid,
        interval: &BookingInterval,
        exclude_appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        let taken = self.conflict_service.is_interval_taken(
            doctor_id,
            interval,
            exclude_appointment_id,
            auth_token,
        ).await?;

        if taken {
            return Err(AppointmentError::ConflictDetected);
        }
        Ok(())
    }

    async fn patch_appointment(
        &self,
        appointment_id: Uuid,
        update: Value,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Appointment> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(update),
            Some(SupabaseClient::return_representation()),
        ).await?;

        result.into_iter().next().ok_or(AppointmentError::NotFound)
    }
}

fn validate_duration(duration_minutes: i64) -> Result<(), AppointmentError> {
    if duration_minutes <= 0 || duration_minutes > MAX_DURATION_MINUTES {
        return Err(AppointmentError::ValidationError(format!(
            "Duration must be between 1 and {} minutes, got {}",
            MAX_DURATION_MINUTES, duration_minutes
        )));
    }
    Ok(())
}

/// The whole interval must sit inside the doctor's window on a day they work.
pub fn ensure_within_availability(
    doctor: &Doctor,
    interval: &BookingInterval,
) -> Result<(), AppointmentError> {
    if !doctor.status.accepts_bookings() {
        return Err(AppointmentError::DoctorNotAvailable);
    }

    let date = interval.start.date();
    if !is_date_served_by_doctor(&doctor.availability, date) {
        return Err(AppointmentError::OutsideAvailability(format!(
            "{} does not work on {}s",
            doctor.full_name,
            date.format("%A")
        )));
    }

    let (window_start, window_end) = doctor.availability.window_on(date);
    if interval.start < window_start || interval.end > window_end {
        return Err(AppointmentError::OutsideAvailability(format!(
            "{} - {} is outside working hours {} - {}",
            interval.start.format("%H:%M"),
            interval.end.format("%H:%M"),
            window_start.format("%H:%M"),
            window_end.format("%H:%M"),
        )));
    }

    Ok(())
}
