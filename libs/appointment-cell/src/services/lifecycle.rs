// libs/appointment-cell/src/services/lifecycle.rs
use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::models::{Appointment, AppointmentError, AppointmentStatus, PaymentStatus};

/// Status transition rules for appointments.
///
/// pending -> confirmed | cancelled
/// confirmed -> completed | cancelled
/// cancelled -> confirmed (reactivation, only for dates not yet passed)
/// completed is terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> &'static [AppointmentStatus] {
        match current_status {
            AppointmentStatus::Pending => &[AppointmentStatus::Confirmed, AppointmentStatus::Cancelled],
            AppointmentStatus::Confirmed => &[AppointmentStatus::Completed, AppointmentStatus::Cancelled],
            AppointmentStatus::Cancelled => &[AppointmentStatus::Confirmed],
            AppointmentStatus::Completed => &[],
        }
    }

    /// Validate moving `appointment` into `new_status`. `today` is the clinic's current date.
    pub fn validate_status_transition(
        &self,
        appointment: &Appointment,
        new_status: AppointmentStatus,
        today: NaiveDate,
    ) -> Result<(), AppointmentError> {
        let current_status = appointment.status;
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if new_status == AppointmentStatus::Cancelled {
            if current_status == AppointmentStatus::Cancelled {
                return Err(AppointmentError::AlreadyCancelled);
            }
            if appointment.payment_status == PaymentStatus::Paid {
                warn!("Refusing to cancel paid appointment {}", appointment.id);
                return Err(AppointmentError::CannotCancelPaid);
            }
        }

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition {
                from: current_status,
                to: new_status,
            });
        }

        if current_status == AppointmentStatus::Cancelled && appointment.date() < today {
            warn!("Refusing to reactivate past appointment {}", appointment.id);
            return Err(AppointmentError::AppointmentInPast);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use uuid::Uuid;

    fn appointment(status: AppointmentStatus, payment_status: PaymentStatus, date: NaiveDate) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            clinic_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            start_time: date.and_hms_opt(10, 0, 0).unwrap(),
            duration_minutes: 30,
            status,
            payment_status,
            notes: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 16).unwrap()
    }

    fn tomorrow() -> NaiveDate {
        today().succ_opt().unwrap()
    }

    fn yesterday() -> NaiveDate {
        today().pred_opt().unwrap()
    }

    #[test]
    fn test_happy_path() {
        let lifecycle = AppointmentLifecycleService::new();
        let pending = appointment(AppointmentStatus::Pending, PaymentStatus::Unpaid, tomorrow());
        let confirmed = appointment(AppointmentStatus::Confirmed, PaymentStatus::Paid, tomorrow());

        assert!(lifecycle.validate_status_transition(&pending, AppointmentStatus::Confirmed, today()).is_ok());
        assert!(lifecycle.validate_status_transition(&confirmed, AppointmentStatus::Completed, today()).is_ok());
    }

    #[test]
    fn test_reactivation_only_for_future_dates() {
        let lifecycle = AppointmentLifecycleService::new();
        let future = appointment(AppointmentStatus::Cancelled, PaymentStatus::Unpaid, tomorrow());
        let same_day = appointment(AppointmentStatus::Cancelled, PaymentStatus::Unpaid, today());
        let past = appointment(AppointmentStatus::Cancelled, PaymentStatus::Unpaid, yesterday());

        assert!(lifecycle.validate_status_transition(&future, AppointmentStatus::Confirmed, today()).is_ok());
        assert!(lifecycle.validate_status_transition(&same_day, AppointmentStatus::Confirmed, today()).is_ok());
        assert_matches!(
            lifecycle.validate_status_transition(&past, AppointmentStatus::Confirmed, today()),
            Err(AppointmentError::AppointmentInPast)
        );
    }

    #[test]
    fn test_cancelled_only_moves_to_confirmed() {
        let lifecycle = AppointmentLifecycleService::new();
        let cancelled = appointment(AppointmentStatus::Cancelled, PaymentStatus::Unpaid, tomorrow());

        assert_matches!(
            lifecycle.validate_status_transition(&cancelled, AppointmentStatus::Completed, today()),
            Err(AppointmentError::InvalidStatusTransition { from: AppointmentStatus::Cancelled, to: AppointmentStatus::Completed })
        );
        assert_matches!(
            lifecycle.validate_status_transition(&cancelled, AppointmentStatus::Pending, today()),
            Err(AppointmentError::InvalidStatusTransition { .. })
        );
        assert_matches!(
            lifecycle.validate_status_transition(&cancelled, AppointmentStatus::Cancelled, today()),
            Err(AppointmentError::AlreadyCancelled)
        );
    }

    #[test]
    fn test_paid_appointments_cannot_be_cancelled() {
        let lifecycle = AppointmentLifecycleService::new();
        let paid = appointment(AppointmentStatus::Confirmed, PaymentStatus::Paid, tomorrow());
        let partially = appointment(AppointmentStatus::Confirmed, PaymentStatus::PartiallyPaid, tomorrow());

        assert_matches!(
            lifecycle.validate_status_transition(&paid, AppointmentStatus::Cancelled, today()),
            Err(AppointmentError::CannotCancelPaid)
        );
        assert!(lifecycle.validate_status_transition(&partially, AppointmentStatus::Cancelled, today()).is_ok());
    }

    #[test]
    fn test_completed_is_terminal() {
        let lifecycle = AppointmentLifecycleService::new();
        let completed = appointment(AppointmentStatus::Completed, PaymentStatus::Unpaid, yesterday());

        assert!(lifecycle.get_valid_transitions(AppointmentStatus::Completed).is_empty());
        for next in [AppointmentStatus::Pending, AppointmentStatus::Confirmed, AppointmentStatus::Cancelled] {
            assert!(lifecycle.validate_status_transition(&completed, next, today()).is_err());
        }
    }

    #[test]
    fn test_pending_cannot_skip_to_completed() {
        let lifecycle = AppointmentLifecycleService::new();
        let pending = appointment(AppointmentStatus::Pending, PaymentStatus::Unpaid, tomorrow());

        assert_matches!(
            lifecycle.validate_status_transition(&pending, AppointmentStatus::Completed, today()),
            Err(AppointmentError::InvalidStatusTransition { .. })
        );
    }
}
