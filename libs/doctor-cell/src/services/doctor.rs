// libs/doctor-cell/src/services/doctor.rs
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{AvailableSlot, Doctor, DoctorError, DoctorRecord, SlotRequest};
use crate::services::availability::generate_slots;

#[derive(Debug, Deserialize)]
struct BookedStart {
    start_time: NaiveDateTime,
}

pub struct DoctorService {
    supabase: SupabaseClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Load a doctor together with a validated weekly window.
    pub async fn get_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor: {}", doctor_id);

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<DoctorRecord> = self.supabase.request(
            Method::GET,
            &path,
            auth_token,
            None,
        ).await?;

        let record = result.into_iter().next().ok_or(DoctorError::NotFound)?;

        Doctor::try_from(record).map_err(|e| {
            warn!("Doctor {} has an unusable availability window: {}", doctor_id, e);
            DoctorError::from(e)
        })
    }

    /// Start times of the doctor's non-cancelled appointments on `date`.
    pub async fn get_booked_starts(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: Option<&str>,
    ) -> Result<Vec<NaiveDateTime>, DoctorError> {
        let next_day = date
            .succ_opt()
            .ok_or_else(|| DoctorError::ValidationError(format!("Date out of range: {}", date)))?;

        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&start_time=gte.{}T00:00:00&start_time=lt.{}T00:00:00&status=neq.cancelled&select=start_time&order=start_time.asc",
            doctor_id, date, next_day
        );

        let rows: Vec<BookedStart> = self.supabase.request(
            Method::GET,
            &path,
            auth_token,
            None,
        ).await?;

        Ok(rows.into_iter().map(|row| row.start_time).collect())
    }

    /// Bookable slots for one doctor on one date. Doctors who are not active have none.
    pub async fn get_available_slots(
        &self,
        doctor_id: Uuid,
        request: SlotRequest,
        auth_token: Option<&str>,
    ) -> Result<Vec<AvailableSlot>, DoctorError> {
        debug!(
            "Calculating available slots for doctor {} on {} every {}",
            doctor_id, request.date, request.granularity
        );

        let doctor = self.get_doctor(doctor_id, auth_token).await?;

        if !doctor.status.accepts_bookings() {
            debug!("Doctor {} is {}, no slots offered", doctor_id, doctor.status);
            return Ok(vec![]);
        }

        let booked = self.get_booked_starts(doctor_id, request.date, auth_token).await?;
        let slots: Vec<AvailableSlot> = generate_slots(&doctor.availability, &request, booked).collect();

        debug!("Found {} available slots", slots.len());
        Ok(slots)
    }
}
