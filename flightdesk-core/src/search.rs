use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlightId(pub i32);

impl fmt::Display for FlightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference data owned by the store. Never mutated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    pub fid: FlightId,
    pub day_of_month: i32,
    pub carrier_id: String,
    pub flight_num: String,
    pub origin_city: String,
    pub dest_city: String,
    pub duration: i32,
    pub capacity: i32,
    pub price: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    pub origin_city: String,
    pub dest_city: String,
    #[serde(default)]
    pub direct_only: bool,
    pub day_of_month: i32,
    pub limit: usize,
}

/// One search result: a direct flight or a same-day one-stop pair.
#[derive(Debug, Clone, Serialize)]
pub struct Itinerary {
    pub ordinal: usize,
    pub total_duration: i32,
    pub day_of_month: i32,
    pub flights: Vec<Flight>,
}

impl Itinerary {
    pub fn direct(flight: Flight) -> Self {
        Self {
            ordinal: 0,
            total_duration: flight.duration,
            day_of_month: flight.day_of_month,
            flights: vec![flight],
        }
    }

    pub fn connecting(first: Flight, second: Flight) -> Self {
        Self {
            ordinal: 0,
            total_duration: first.duration + second.duration,
            day_of_month: first.day_of_month,
            flights: vec![first, second],
        }
    }

    pub fn first_flight(&self) -> Option<FlightId> {
        self.flights.first().map(|f| f.fid)
    }

    pub fn second_flight(&self) -> Option<FlightId> {
        self.flights.get(1).map(|f| f.fid)
    }

    fn sort_key(&self) -> (i32, Option<FlightId>, Option<FlightId>) {
        (self.total_duration, self.first_flight(), self.second_flight())
    }
}

/// Merge store candidates into the ordered, numbered result of one search.
///
/// Directs fill the result first; connecting itineraries only take the slots
/// left under `limit`, and only when the query allows them. The merged list
/// is ordered by total duration with flight ids breaking ties.
pub fn compose_itineraries(
    direct: Vec<Itinerary>,
    connecting: Vec<Itinerary>,
    query: &SearchQuery,
) -> Vec<Itinerary> {
    let mut results: Vec<Itinerary> = direct.into_iter().take(query.limit).collect();

    if !query.direct_only {
        let remaining = query.limit - results.len();
        results.extend(connecting.into_iter().take(remaining));
    }

    results.sort_by_key(Itinerary::sort_key);
    for (ordinal, itinerary) in results.iter_mut().enumerate() {
        itinerary.ordinal = ordinal;
    }
    results
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn flight(fid: i32, origin: &str, dest: &str, duration: i32) -> Flight {
        Flight {
            fid: FlightId(fid),
            day_of_month: 5,
            carrier_id: "AS".to_string(),
            flight_num: format!("{}", 100 + fid),
            origin_city: origin.to_string(),
            dest_city: dest.to_string(),
            duration,
            capacity: 3,
            price: 100,
        }
    }

    fn query(direct_only: bool, limit: usize) -> SearchQuery {
        SearchQuery {
            origin_city: "Seattle WA".to_string(),
            dest_city: "Boston MA".to_string(),
            direct_only,
            day_of_month: 5,
            limit,
        }
    }

    #[test]
    fn test_search_query_deserialization() {
        let json = r#"
            {
                "origin_city": "Seattle WA",
                "dest_city": "Boston MA",
                "day_of_month": 5,
                "limit": 3
            }
        "#;
        let q: SearchQuery = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(q.origin_city, "Seattle WA");
        assert!(!q.direct_only);
        assert_eq!(q.limit, 3);
    }

    #[test]
    fn test_directs_fill_before_connecting() {
        let direct = vec![
            Itinerary::direct(flight(1, "Seattle WA", "Boston MA", 300)),
            Itinerary::direct(flight(2, "Seattle WA", "Boston MA", 320)),
        ];
        let connecting = vec![
            Itinerary::connecting(
                flight(3, "Seattle WA", "Chicago IL", 100),
                flight(4, "Chicago IL", "Boston MA", 100),
            ),
            Itinerary::connecting(
                flight(5, "Seattle WA", "Denver CO", 150),
                flight(6, "Denver CO", "Boston MA", 150),
            ),
        ];

        let results = compose_itineraries(direct, connecting, &query(false, 3));

        assert_eq!(results.len(), 3);
        // the 200-minute connection sorts ahead, the 300-minute one is cut by the limit
        assert_eq!(results[0].first_flight(), Some(FlightId(3)));
        assert_eq!(results[0].total_duration, 200);
        assert_eq!(results[1].first_flight(), Some(FlightId(1)));
        assert_eq!(results[2].first_flight(), Some(FlightId(2)));
        let ordinals: Vec<usize> = results.iter().map(|i| i.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
    }

    #[test]
    fn test_direct_only_ignores_connections() {
        let direct = vec![Itinerary::direct(flight(1, "Seattle WA", "Boston MA", 300))];
        let connecting = vec![Itinerary::connecting(
            flight(3, "Seattle WA", "Chicago IL", 100),
            flight(4, "Chicago IL", "Boston MA", 100),
        )];

        let results = compose_itineraries(direct, connecting, &query(true, 5));

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].second_flight(), None);
    }

    #[test]
    fn test_limit_caps_directs() {
        let direct = (1..=4)
            .map(|fid| Itinerary::direct(flight(fid, "Seattle WA", "Boston MA", 300 - fid)))
            .collect();

        let results = compose_itineraries(direct, Vec::new(), &query(false, 2));

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].first_flight(), Some(FlightId(2)));
        assert_eq!(results[1].first_flight(), Some(FlightId(1)));
    }

    #[test]
    fn test_ties_break_on_flight_id() {
        let direct = vec![
            Itinerary::direct(flight(9, "Seattle WA", "Boston MA", 300)),
            Itinerary::direct(flight(4, "Seattle WA", "Boston MA", 300)),
        ];

        let results = compose_itineraries(direct, Vec::new(), &query(false, 5));

        assert_eq!(results[0].first_flight(), Some(FlightId(4)));
        assert_eq!(results[1].first_flight(), Some(FlightId(9)));
    }
}
