pub mod account;
pub mod itinerary;
pub mod repository;
pub mod reservation;
pub mod search;
pub mod session;

use std::fmt;

pub use itinerary::{ItineraryRef, ItineraryTable};
pub use reservation::{Cancellation, Payment, Reservation, ReservationDetails, ReservationId};
pub use search::{Flight, FlightId, Itinerary, SearchQuery};
pub use session::{Session, SessionStore};

/// Constraint backing the one-reservation-per-user-per-day rule.
pub const SAME_DAY_CONSTRAINT: &str = "reservations_username_day_key";

/// Primary key of the users table.
pub const USERNAME_CONSTRAINT: &str = "users_pkey";

/// Reason carried by `InvalidAccount` when the username already exists.
pub const USERNAME_TAKEN: &str = "username taken";

/// Failures reported by a store implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("serialization conflict: {0}")]
    SerializationConflict(String),
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },
    #[error("store invariant violated: {0}")]
    Invariant(String),
    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    /// Conflict aborts are the only failures worth re-running.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::SerializationConflict(_))
    }

    pub fn violates(&self, name: &str) -> bool {
        matches!(self, StoreError::UniqueViolation { constraint } if constraint == name)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Something a caller pointed at that does not resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    Itinerary(i64),
    Flight(FlightId),
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Itinerary(ordinal) => write!(f, "itinerary {}", ordinal),
            Reference::Flight(fid) => write!(f, "flight {}", fid),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Not logged in")]
    NotAuthenticated,
    #[error("User already logged in")]
    AlreadyLoggedIn,
    #[error("Login failed")]
    LoginFailed,
    #[error("Failed to create user: {0}")]
    InvalidAccount(String),
    #[error("No such {0}")]
    InvalidReference(Reference),
    #[error("Booking failed: flight {flight_id} is full")]
    CapacityExhausted { flight_id: FlightId },
    #[error("You cannot book two flights in the same day (day {day})")]
    SameDayConflict { day: i32 },
    #[error("User has only {balance} in account but itinerary costs {cost}")]
    InsufficientFunds { balance: i64, cost: i64 },
    #[error("Cannot find reservation {reservation_id} under user: {username}")]
    NotFound {
        reservation_id: ReservationId,
        username: String,
    },
    /// Payment found no reservation with that id that the user still owes.
    #[error("Cannot find unpaid reservation {reservation_id} under user: {username}")]
    UnpaidNotFound {
        reservation_id: ReservationId,
        username: String,
    },
    #[error("Operation failed")]
    StoreFailure(#[from] StoreError),
}

impl EngineError {
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::StoreFailure(e) if e.is_transient())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_conflicts_are_transient() {
        let conflict = EngineError::from(StoreError::SerializationConflict("40001".into()));
        assert!(conflict.is_transient());

        let broken = EngineError::from(StoreError::Database("connection reset".into()));
        assert!(!broken.is_transient());
        assert!(!EngineError::SameDayConflict { day: 5 }.is_transient());
    }

    #[test]
    fn test_store_failure_message_hides_detail() {
        let err = EngineError::from(StoreError::Database("relation \"users\" does not exist".into()));
        assert_eq!(err.to_string(), "Operation failed");
    }

    #[test]
    fn test_messages_carry_identifiers() {
        let err = EngineError::InsufficientFunds { balance: 20, cost: 80 };
        assert_eq!(err.to_string(), "User has only 20 in account but itinerary costs 80");

        let err = EngineError::InvalidReference(Reference::Itinerary(7));
        assert_eq!(err.to_string(), "No such itinerary 7");

        let err = EngineError::NotFound {
            reservation_id: ReservationId(3),
            username: "ada".into(),
        };
        assert_eq!(err.to_string(), "Cannot find reservation 3 under user: ada");

        let err = EngineError::UnpaidNotFound {
            reservation_id: ReservationId(3),
            username: "ada".into(),
        };
        assert_eq!(err.to_string(), "Cannot find unpaid reservation 3 under user: ada");
    }
}
