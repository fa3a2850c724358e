pub mod booking;
pub mod conflict;
pub mod lifecycle;

pub use booking::AppointmentBookingService;
pub use conflict::{has_conflict, intervals_overlap, ConflictDetectionService};
pub use lifecycle::AppointmentLifecycleService;
