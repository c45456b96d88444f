use serde::{Deserialize, Serialize};

use crate::search::{FlightId, Itinerary};
use crate::{EngineError, EngineResult, Reference};

/// Session-scoped pointer to a search result. Carries no capacity guarantee;
/// seats are checked again when the itinerary is booked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItineraryRef {
    pub ordinal: usize,
    pub total_duration: i32,
    pub day_of_month: i32,
    pub first_flight: FlightId,
    pub second_flight: Option<FlightId>,
}

impl ItineraryRef {
    pub fn direct(ordinal: usize, day_of_month: i32, total_duration: i32, fid: FlightId) -> Self {
        Self {
            ordinal,
            total_duration,
            day_of_month,
            first_flight: fid,
            second_flight: None,
        }
    }

    pub fn flight_ids(&self) -> impl Iterator<Item = FlightId> {
        std::iter::once(self.first_flight).chain(self.second_flight)
    }

    pub fn is_direct(&self) -> bool {
        self.second_flight.is_none()
    }
}

impl TryFrom<&Itinerary> for ItineraryRef {
    type Error = EngineError;

    fn try_from(itinerary: &Itinerary) -> EngineResult<Self> {
        let first_flight = itinerary
            .first_flight()
            .ok_or(EngineError::InvalidReference(Reference::Itinerary(itinerary.ordinal as i64)))?;

        Ok(Self {
            ordinal: itinerary.ordinal,
            total_duration: itinerary.total_duration,
            day_of_month: itinerary.day_of_month,
            first_flight,
            second_flight: itinerary.second_flight(),
        })
    }
}

/// The references produced by the most recent search of one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItineraryTable {
    entries: Vec<ItineraryRef>,
}

impl ItineraryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidate every earlier reference and keep only these results.
    pub fn replace(&mut self, itineraries: &[Itinerary]) -> EngineResult<()> {
        let entries = itineraries
            .iter()
            .map(ItineraryRef::try_from)
            .collect::<EngineResult<Vec<_>>>()?;
        self.entries = entries;
        Ok(())
    }

    pub fn get(&self, ordinal: i64) -> EngineResult<&ItineraryRef> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|idx| self.entries.get(idx))
            .ok_or(EngineError::InvalidReference(Reference::Itinerary(ordinal)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
