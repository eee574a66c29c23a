use chrono::NaiveDateTime;

/// A customer's test-drive reservation. `slot_id` is `None` for legacy
/// bookings made directly against a dealer and vehicle.
#[derive(Debug, Clone)]
pub struct Booking {
    pub id: String,
    pub dealer_id: i64,
    pub customer_id: i64,
    pub vehicle_id: i64,
    pub schedule_time: NaiveDateTime,
    pub slot_id: Option<String>,
    pub status: BookingStatus,
    pub note: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingStatus {
    Requested,
    Confirmed,
    Done,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Requested => "REQUESTED",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Done => "DONE",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "REQUESTED" => Some(BookingStatus::Requested),
            "CONFIRMED" => Some(BookingStatus::Confirmed),
            "DONE" => Some(BookingStatus::Done),
            "CANCELLED" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    /// DONE and CANCELLED are end states.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Done | BookingStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (Requested, Confirmed) | (Requested, Cancelled) | (Confirmed, Done) | (Confirmed, Cancelled)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(BookingStatus::parse("confirmed"), Some(BookingStatus::Confirmed));
        assert_eq!(BookingStatus::parse("DONE"), Some(BookingStatus::Done));
        assert_eq!(BookingStatus::parse("archived"), None);
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        let all = [
            BookingStatus::Requested,
            BookingStatus::Confirmed,
            BookingStatus::Done,
            BookingStatus::Cancelled,
        ];
        for next in all {
            assert!(!BookingStatus::Done.can_transition_to(next));
            assert!(!BookingStatus::Cancelled.can_transition_to(next));
        }
    }

    #[test]
    fn test_forward_transitions() {
        assert!(BookingStatus::Requested.can_transition_to(BookingStatus::Confirmed));
        assert!(BookingStatus::Requested.can_transition_to(BookingStatus::Cancelled));
        assert!(BookingStatus::Confirmed.can_transition_to(BookingStatus::Done));
        assert!(BookingStatus::Confirmed.can_transition_to(BookingStatus::Cancelled));
        assert!(!BookingStatus::Requested.can_transition_to(BookingStatus::Done));
        assert!(!BookingStatus::Confirmed.can_transition_to(BookingStatus::Requested));
        assert!(!BookingStatus::Requested.can_transition_to(BookingStatus::Requested));
    }
}
