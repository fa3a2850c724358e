// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::fmt;
use thiserror::Error;

use doctor_cell::DoctorError;

/// Longest single appointment: one full day.
pub const MAX_DURATION_MINUTES: i64 = 24 * 60;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub start_time: NaiveDateTime,
    pub duration_minutes: i64,
    pub status: AppointmentStatus,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
}

impl Appointment {
    /// Errors when the stored duration pushes the end past the representable range.
    pub fn end_time(&self) -> Result<NaiveDateTime, AppointmentError> {
        add_minutes(self.start_time, self.duration_minutes).ok_or_else(|| {
            AppointmentError::DatabaseError(format!(
                "Appointment {} has an out-of-range duration of {} minutes",
                self.id, self.duration_minutes
            ))
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.start_time.date()
    }

    pub fn interval(&self) -> Result<BookingInterval, AppointmentError> {
        Ok(BookingInterval::new(self.start_time, self.end_time()?))
    }
}

fn add_minutes(start: NaiveDateTime, minutes: i64) -> Option<NaiveDateTime> {
    Duration::try_minutes(minutes).and_then(|d| start.checked_add_signed(d))
}

/// Timestamp layout used in PostgREST filters and row bodies.
pub(crate) fn format_timestamp(timestamp: NaiveDateTime) -> String {
    timestamp.format("%Y-%m-%dT%H:%M:%S").to_string()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// Whether an appointment in this status still holds its time on the doctor's calendar.
    pub fn occupies_time(&self) -> bool {
        match self {
            AppointmentStatus::Pending | AppointmentStatus::Confirmed | AppointmentStatus::Completed => true,
            AppointmentStatus::Cancelled => false,
        }
    }

    pub fn can_reschedule(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    PartiallyPaid,
    Paid,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Unpaid => write!(f, "unpaid"),
            PaymentStatus::PartiallyPaid => write!(f, "partially_paid"),
            PaymentStatus::Paid => write!(f, "paid"),
        }
    }
}

/// Half-open time interval `[start, end)` occupied by a booking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookingInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl BookingInterval {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    pub fn from_duration(start: NaiveDateTime, duration_minutes: i64) -> Result<Self, AppointmentError> {
        let end = add_minutes(start, duration_minutes).ok_or_else(|| {
            AppointmentError::ValidationError(format!(
                "{} minutes after {} is out of range", duration_minutes, start
            ))
        })?;
        Ok(Self::new(start, end))
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub start_time: NaiveDateTime,
    /// Defaults to the configured slot granularity.
    pub duration_minutes: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub new_start_time: NaiveDateTime,
    pub new_duration_minutes: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
}

// ==============================================================================
// CONFLICT DETECTION MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictCheckRequest {
    pub doctor_id: Uuid,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub exclude_appointment_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictCheckResponse {
    pub has_conflict: bool,
    pub conflicting_appointments: Vec<Appointment>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Doctor is not accepting appointments")]
    DoctorNotAvailable,

    #[error("Requested time is outside the doctor's availability: {0}")]
    OutsideAvailability(String),

    #[error("Appointment conflicts with existing booking")]
    ConflictDetected,

    #[error("Cannot change appointment status from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Appointments that are {0} cannot be rescheduled")]
    CannotReschedule(AppointmentStatus),

    #[error("Paid appointments cannot be cancelled")]
    CannotCancelPaid,

    #[error("Appointment is already cancelled")]
    AlreadyCancelled,

    #[error("Appointments in the past cannot be reactivated")]
    AppointmentInPast,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for AppointmentError {
    fn from(err: anyhow::Error) -> Self {
        AppointmentError::DatabaseError(err.to_string())
    }
}

impl From<DoctorError> for AppointmentError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound => AppointmentError::DoctorNotFound,
            DoctorError::ValidationError(msg) => AppointmentError::ValidationError(msg),
            DoctorError::InvalidAvailability(e) => AppointmentError::DatabaseError(e.to_string()),
            DoctorError::DatabaseError(msg) => AppointmentError::DatabaseError(msg),
        }
    }
}
