use std::fmt;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ==============================================================================
// WEEKLY AVAILABILITY
// ==============================================================================

/// A recurring weekly working window. Days count from Sunday = 0.
///
/// The day range may wrap the week boundary (`from_week_day > to_week_day`,
/// e.g. Friday through Monday). The time range always lies within one day;
/// a window whose `to_time` is not after `from_time` simply yields no slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeeklyAvailability {
    from_week_day: u8,
    to_week_day: u8,
    from_time: NaiveTime,
    to_time: NaiveTime,
}

impl WeeklyAvailability {
    pub fn new(
        from_week_day: i64,
        to_week_day: i64,
        from_time: NaiveTime,
        to_time: NaiveTime,
    ) -> Result<Self, AvailabilityError> {
        Ok(Self {
            from_week_day: validate_week_day(from_week_day)?,
            to_week_day: validate_week_day(to_week_day)?,
            from_time,
            to_time,
        })
    }

    /// Builds a window from the `"HH:MM"` strings stored on the doctor record.
    pub fn parse(
        from_week_day: i64,
        to_week_day: i64,
        from_time: &str,
        to_time: &str,
    ) -> Result<Self, AvailabilityError> {
        Self::new(
            from_week_day,
            to_week_day,
            parse_time_of_day(from_time)?,
            parse_time_of_day(to_time)?,
        )
    }

    pub fn from_week_day(&self) -> u8 {
        self.from_week_day
    }

    pub fn to_week_day(&self) -> u8 {
        self.to_week_day
    }

    pub fn from_time(&self) -> NaiveTime {
        self.from_time
    }

    pub fn to_time(&self) -> NaiveTime {
        self.to_time
    }

    pub fn wraps_week(&self) -> bool {
        self.from_week_day > self.to_week_day
    }

    /// Start and end of the working window on `date`.
    pub fn window_on(&self, date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        (date.and_time(self.from_time), date.and_time(self.to_time))
    }
}

fn validate_week_day(day: i64) -> Result<u8, AvailabilityError> {
    match u8::try_from(day) {
        Ok(d) if d <= 6 => Ok(d),
        _ => Err(AvailabilityError::InvalidWeekDay(day)),
    }
}

/// Accepts `HH:MM` as entered by clinic staff and `HH:MM:SS` as returned by the datastore.
pub fn parse_time_of_day(raw: &str) -> Result<NaiveTime, AvailabilityError> {
    let trimmed = raw.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_| AvailabilityError::InvalidTime(raw.to_string()))
}

// ==============================================================================
// SLOT QUERY MODELS
// ==============================================================================

/// Largest slot step accepted: one slot per day.
pub const MAX_SLOT_GRANULARITY_MINUTES: i64 = 24 * 60;

/// Minutes between consecutive candidate slot starts, between 1 and a full day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotGranularity(i64);

impl SlotGranularity {
    pub fn new(minutes: i64) -> Result<Self, AvailabilityError> {
        if minutes <= 0 || minutes > MAX_SLOT_GRANULARITY_MINUTES {
            return Err(AvailabilityError::InvalidGranularity(minutes));
        }
        Ok(Self(minutes))
    }

    pub fn minutes(&self) -> i64 {
        self.0
    }

    pub fn as_duration(&self) -> Duration {
        Duration::minutes(self.0)
    }
}

impl fmt::Display for SlotGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRequest {
    pub date: NaiveDate,
    pub granularity: SlotGranularity,
}

impl SlotRequest {
    pub fn new(date: NaiveDate, granularity: SlotGranularity) -> Self {
        Self { date, granularity }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AvailableSlot {
    pub start_time: NaiveDateTime,
}

impl AvailableSlot {
    pub fn time(&self) -> NaiveTime {
        self.start_time.time()
    }
}

// ==============================================================================
// DOCTOR MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DoctorStatus {
    Active,
    OnLeave,
    Inactive,
}

impl DoctorStatus {
    pub fn accepts_bookings(&self) -> bool {
        match self {
            DoctorStatus::Active => true,
            DoctorStatus::OnLeave | DoctorStatus::Inactive => false,
        }
    }
}

impl fmt::Display for DoctorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DoctorStatus::Active => write!(f, "active"),
            DoctorStatus::OnLeave => write!(f, "on_leave"),
            DoctorStatus::Inactive => write!(f, "inactive"),
        }
    }
}

/// Doctor row as stored in the `doctors` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorRecord {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub full_name: String,
    pub specialty: Option<String>,
    pub status: DoctorStatus,
    pub available_from_week_day: i64,
    pub available_to_week_day: i64,
    pub available_from_time: String,
    pub available_to_time: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Doctor {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub full_name: String,
    pub specialty: Option<String>,
    pub status: DoctorStatus,
    pub availability: WeeklyAvailability,
}

impl TryFrom<DoctorRecord> for Doctor {
    type Error = AvailabilityError;

    fn try_from(record: DoctorRecord) -> Result<Self, Self::Error> {
        let availability = WeeklyAvailability::parse(
            record.available_from_week_day,
            record.available_to_week_day,
            &record.available_from_time,
            &record.available_to_time,
        )?;

        Ok(Self {
            id: record.id,
            clinic_id: record.clinic_id,
            full_name: record.full_name,
            specialty: record.specialty,
            status: record.status,
            availability,
        })
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

/// Caller contract violations, rejected before any slot computation starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AvailabilityError {
    #[error("Day of week must be between 0 (Sunday) and 6 (Saturday), got {0}")]
    InvalidWeekDay(i64),

    #[error("Invalid time of day '{0}', expected HH:MM")]
    InvalidTime(String),

    #[error("Slot granularity must be between 1 and 1440 minutes, got {0}")]
    InvalidGranularity(i64),
}

#[derive(Error, Debug)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Doctor has an invalid availability window: {0}")]
    InvalidAvailability(#[from] AvailabilityError),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for DoctorError {
    fn from(err: anyhow::Error) -> Self {
        DoctorError::DatabaseError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_week_day_out_of_range_rejected() {
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let five = NaiveTime::from_hms_opt(17, 0, 0).unwrap();

        assert_matches!(
            WeeklyAvailability::new(1, 7, nine, five),
            Err(AvailabilityError::InvalidWeekDay(7))
        );
        assert_matches!(
            WeeklyAvailability::new(-1, 5, nine, five),
            Err(AvailabilityError::InvalidWeekDay(-1))
        );
        assert!(WeeklyAvailability::new(5, 1, nine, five).unwrap().wraps_week());
    }

    #[test]
    fn test_time_parsing_accepts_both_formats() {
        assert_eq!(parse_time_of_day("08:30").unwrap(), NaiveTime::from_hms_opt(8, 30, 0).unwrap());
        assert_eq!(parse_time_of_day("17:00:00").unwrap(), NaiveTime::from_hms_opt(17, 0, 0).unwrap());
        assert_matches!(parse_time_of_day("8am"), Err(AvailabilityError::InvalidTime(_)));
    }

    #[test]
    fn test_granularity_must_be_positive() {
        assert_matches!(SlotGranularity::new(0), Err(AvailabilityError::InvalidGranularity(0)));
        assert_matches!(SlotGranularity::new(-15), Err(AvailabilityError::InvalidGranularity(-15)));
        assert_eq!(SlotGranularity::new(30).unwrap().as_duration(), Duration::minutes(30));
    }

    #[test]
    fn test_granularity_capped_at_one_day() {
        assert_eq!(
            SlotGranularity::new(MAX_SLOT_GRANULARITY_MINUTES).unwrap().as_duration(),
            Duration::days(1)
        );
        assert_matches!(
            SlotGranularity::new(MAX_SLOT_GRANULARITY_MINUTES + 1),
            Err(AvailabilityError::InvalidGranularity(1441))
        );
        assert_matches!(
            SlotGranularity::new(i64::MAX),
            Err(AvailabilityError::InvalidGranularity(i64::MAX))
        );
    }

    #[test]
    fn test_doctor_record_conversion() {
        let record: DoctorRecord = serde_json::from_value(serde_json::json!({
            "id": "d5cfacac-cb98-46f0-bde0-41d8f6a2424c",
            "clinic_id": "7c9e6679-7425-40de-944b-e07fc1f90ae7",
            "full_name": "Dr. Ana Ruiz",
            "specialty": null,
            "status": "on_leave",
            "available_from_week_day": 1,
            "available_to_week_day": 5,
            "available_from_time": "08:00:00",
            "available_to_time": "16:30"
        }))
        .unwrap();

        let doctor = Doctor::try_from(record).unwrap();
        assert_eq!(doctor.status, DoctorStatus::OnLeave);
        assert!(!doctor.status.accepts_bookings());
        assert_eq!(doctor.availability.to_time(), NaiveTime::from_hms_opt(16, 30, 0).unwrap());
    }
}
