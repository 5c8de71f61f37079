use crate::error::{BookingError, BookingResult};
use crate::models::BookingStatus;

/// Decides which status changes an administrator may apply.
pub struct ChangeHandler;

impl ChangeHandler {
    pub fn can_transition(from: BookingStatus, to: BookingStatus) -> bool {
        use BookingStatus::*;

        from == to
            || matches!(
                (from, to),
                (Pending, Confirmed)
                    | (Pending, Cancelled)
                    | (Confirmed, Cancelled)
                    | (Confirmed, Completed)
                    | (Completed, Cancelled)
            )
    }

    pub fn check_transition(from: BookingStatus, to: BookingStatus) -> BookingResult<()> {
        if Self::can_transition(from, to) {
            Ok(())
        } else {
            Err(BookingError::Validation(format!(
                "Cannot change booking status from {} to {}",
                from, to
            )))
        }
    }

    /// Statuses a new booking may start in.
    pub fn check_initial(status: BookingStatus) -> BookingResult<()> {
        match status {
            BookingStatus::Pending | BookingStatus::Confirmed => Ok(()),
            other => Err(BookingError::Validation(format!(
                "A booking cannot be created with status {}",
                other
            ))),
        }
    }
}
