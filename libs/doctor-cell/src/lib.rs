pub mod handlers;
pub mod router;
pub mod models;
pub mod services;

pub use models::{
    AvailabilityError, AvailableSlot, Doctor, DoctorError, DoctorStatus,
    SlotGranularity, SlotRequest, WeeklyAvailability, MAX_SLOT_GRANULARITY_MINUTES,
};
pub use services::{day_of_week, generate_slots, is_date_served_by_doctor, DoctorService, Slots};
