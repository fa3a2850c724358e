use chrono::{Duration, NaiveDateTime};
use reqwest::Method;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    format_timestamp, Appointment, AppointmentError, BookingInterval, ConflictCheckResponse,
    MAX_DURATION_MINUTES,
};

/// Half-open overlap test: touching intervals do not conflict.
pub fn intervals_overlap(a: &BookingInterval, b: &BookingInterval) -> bool {
    a.start < b.end && b.start < a.end
}

/// True when `[requested_start, requested_end)` overlaps any existing booking.
pub fn has_conflict(
    requested_start: NaiveDateTime,
    requested_end: NaiveDateTime,
    existing_bookings: &[BookingInterval],
) -> bool {
    let requested = BookingInterval::new(requested_start, requested_end);
    existing_bookings.iter().any(|existing| intervals_overlap(&requested, existing))
}

pub struct ConflictDetectionService {
    supabase: SupabaseClient,
}

impl ConflictDetectionService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Check a proposed interval against the doctor's calendar.
    ///
    /// `exclude_appointment_id` drops the appointment being rescheduled so it
    /// does not conflict with its own old slot.
    pub async fn check_conflicts(
        &self,
        doctor_id: Uuid,
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
        exclude_appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<ConflictCheckResponse, AppointmentError> {
        debug!("Checking conflicts for doctor {} from {} to {}",
               doctor_id, start_time, end_time);

        let requested = BookingInterval::new(start_time, end_time);
        let conflicting_appointments: Vec<Appointment> = self
            .get_occupying_appointments(doctor_id, &requested, exclude_appointment_id, auth_token)
            .await?
            .into_iter()
            .filter(|(_, interval)| intervals_overlap(&requested, interval))
            .map(|(appointment, _)| appointment)
            .collect();

        let has_conflict = !conflicting_appointments.is_empty();
        if has_conflict {
            warn!("Conflict detected for doctor {} - {} conflicting appointments",
                  doctor_id, conflicting_appointments.len());
        }

        Ok(ConflictCheckResponse {
            has_conflict,
            conflicting_appointments,
        })
    }

    /// Re-check run right before a booking write.
    pub async fn is_interval_taken(
        &self,
        doctor_id: Uuid,
        requested: &BookingInterval,
        exclude_appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<bool, AppointmentError> {
        let existing: Vec<BookingInterval> = self
            .get_occupying_appointments(doctor_id, requested, exclude_appointment_id, auth_token)
            .await?
            .into_iter()
            .map(|(_, interval)| interval)
            .collect();

        let taken = has_conflict(requested.start, requested.end, &existing);
        if taken {
            warn!("Doctor {} already booked between {} and {}",
                  doctor_id, requested.start, requested.end);
        }
        Ok(taken)
    }

    /// Appointments still holding time that could overlap the interval, paired with their intervals.
    async fn get_occupying_appointments(
        &self,
        doctor_id: Uuid,
        requested: &BookingInterval,
        exclude_appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Vec<(Appointment, BookingInterval)>, AppointmentError> {
        if requested.end <= requested.start {
            return Err(AppointmentError::ValidationError(
                "End time must be after start time".to_string(),
            ));
        }

        // An appointment never runs longer than a day, so nothing starting earlier can reach in
        let earliest_start = requested
            .start
            .checked_sub_signed(Duration::minutes(MAX_DURATION_MINUTES))
            .unwrap_or(NaiveDateTime::MIN);

        self.get_doctor_appointments_in_range(
            doctor_id,
            earliest_start,
            requested.end,
            exclude_appointment_id,
            auth_token,
        )
        .await?
        .into_iter()
        .filter(|a| Some(a.id) != exclude_appointment_id && a.status.occupies_time())
        .map(|a| a.interval().map(|interval| (a, interval)))
        .collect()
    }

    /// One datastore query for the doctor's non-cancelled appointments starting in `[from, until)`.
    async fn get_doctor_appointments_in_range(
        &self,
        doctor_id: Uuid,
        from: NaiveDateTime,
        until: NaiveDateTime,
        exclude_appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut query_parts = vec![
            format!("doctor_id=eq.{}", doctor_id),
            format!("start_time=gte.{}", format_timestamp(from)),
            format!("start_time=lt.{}", format_timestamp(until)),
            "status=neq.cancelled".to_string(),
        ];

        if let Some(exclude_id) = exclude_appointment_id {
            query_parts.push(format!("id=neq.{}", exclude_id));
        }

        let path = format!("/rest/v1/appointments?{}&order=start_time.asc",
                           query_parts.join("&"));

        let appointments: Vec<Appointment> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        Ok(appointments)
    }
}
