use serde::{Deserialize, Serialize};
use std::fmt;

use crate::search::{Flight, FlightId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationId(pub i64);

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub username: String,
    pub first_flight: FlightId,
    pub second_flight: Option<FlightId>,
    pub day_of_month: i32,
    pub paid: bool,
}

impl Reservation {
    pub fn flight_ids(&self) -> impl Iterator<Item = FlightId> {
        std::iter::once(self.first_flight).chain(self.second_flight)
    }
}

/// A reservation as listed back to its owner.
#[derive(Debug, Clone, Serialize)]
pub struct ReservationDetails {
    pub id: ReservationId,
    pub paid: bool,
    pub day_of_month: i32,
    pub flights: Vec<Flight>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Payment {
    pub reservation_id: ReservationId,
    pub cost: i64,
    pub remaining_balance: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Cancellation {
    pub reservation_id: ReservationId,
    /// Amount credited back when the reservation had been paid.
    pub refunded: Option<i64>,
}
