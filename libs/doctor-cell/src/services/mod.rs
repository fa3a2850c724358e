pub mod availability;
pub mod doctor;

pub use availability::{day_of_week, generate_slots, is_date_served_by_doctor, Slots};
pub use doctor::DoctorService;
