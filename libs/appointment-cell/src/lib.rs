pub mod handlers;
pub mod router;
pub mod models;
pub mod services;

pub use models::{
    Appointment, AppointmentError, AppointmentStatus, BookingInterval, PaymentStatus,
};
pub use services::{
    has_conflict, AppointmentBookingService, AppointmentLifecycleService, ConflictDetectionService,
};
