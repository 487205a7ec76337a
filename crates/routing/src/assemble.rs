use chrono::{DateTime, NaiveDate, Utc};
use model::{
    flight::Flight,
    graph::Edge,
    itinerary::{Itinerary, SegmentDetail},
    route::TransportKind,
};

/// Maps a path of edges onto concrete flights for a travel date.
///
/// A time cursor starts at midnight of the requested date (or `now` when the
/// date is missing) and advances to each chosen flight's arrival. Flight
/// selection is best-effort by design: a request is never rejected just
/// because the exact date has no departures. Only an edge with no flights at
/// all ends assembly with nothing.
pub fn assemble_itinerary(
    edges: &[Edge],
    from_city: &str,
    to_city: &str,
    date: Option<NaiveDate>,
    passengers: u32,
    now: DateTime<Utc>,
) -> Option<Itinerary> {
    if edges.is_empty() {
        return None;
    }

    let mut cursor = date
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .unwrap_or(now);

    let mut segments: Vec<SegmentDetail> = Vec::with_capacity(edges.len());
    let mut transport_kinds: Vec<TransportKind> = Vec::new();

    for (position, edge) in edges.iter().enumerate() {
        let flight = select_flight(&edge.flights, cursor)?.clone();

        let duration_minutes = flight.duration_minutes();
        let price = flight.price * passengers as f64;
        // the chosen flight may lie before the cursor; the clamp is
        // authoritative, a negative wait is never surfaced
        let transfer_minutes = if position == 0 {
            0
        } else {
            (flight.departure - cursor).num_minutes().max(0)
        };

        cursor = flight.arrival;
        if !transport_kinds.contains(&edge.segment.kind) {
            transport_kinds.push(edge.segment.kind);
        }
        segments.push(SegmentDetail {
            segment: edge.segment.clone(),
            departure: flight.departure,
            arrival: flight.arrival,
            duration_minutes,
            price,
            transfer_minutes,
            flight,
        });
    }

    let total_duration_minutes = segments
        .iter()
        .map(|segment| segment.duration_minutes + segment.transfer_minutes)
        .sum();
    let total_price = segments.iter().map(|segment| segment.price).sum();
    let transfer_count = segments
        .iter()
        .filter(|segment| segment.transfer_minutes > 0)
        .count();

    Some(Itinerary {
        from_city: from_city.to_owned(),
        to_city: to_city.to_owned(),
        date,
        passengers,
        departure: segments.first().map(|segment| segment.departure)?,
        arrival: segments.last().map(|segment| segment.arrival)?,
        total_duration_minutes,
        total_price,
        transfer_count,
        transport_kinds,
        segments,
    })
}

/// Selection cascade: the earliest boardable departure at or after the
/// cursor; failing that the earliest future departure even without seats;
/// failing that the earliest departure with seats regardless of the cursor;
/// failing that the earliest departure there is.
fn select_flight(flights: &[Flight], cursor: DateTime<Utc>) -> Option<&Flight> {
    fn earliest(mut candidates: Vec<&Flight>) -> Option<&Flight> {
        candidates.sort_by_key(|flight| flight.departure);
        candidates.into_iter().next()
    }

    earliest(
        flights
            .iter()
            .filter(|flight| flight.departure >= cursor && flight.has_seats())
            .collect(),
    )
    .or_else(|| {
        earliest(
            flights
                .iter()
                .filter(|flight| flight.departure >= cursor)
                .collect(),
        )
    })
    .or_else(|| {
        earliest(flights.iter().filter(|flight| flight.has_seats()).collect())
    })
    .or_else(|| earliest(flights.iter().collect()))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use model::{flight::FlightStatus, graph::Segment};
    use utility::id::Id;

    use super::*;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, minute, 0).unwrap()
    }

    fn flight(
        id: &str,
        departure: DateTime<Utc>,
        duration_min: i64,
        price: f64,
        seats: u32,
    ) -> Flight {
        Flight {
            id: Id::new(id.to_owned()),
            route_id: Id::new("r-1".to_owned()),
            from_stop_id: Id::new("a".to_owned()),
            to_stop_id: Id::new("b".to_owned()),
            departure,
            arrival: departure + chrono::Duration::minutes(duration_min),
            price,
            seats_available: seats,
            status: FlightStatus::Scheduled,
        }
    }

    fn edge(
        from: &str,
        to: &str,
        kind: TransportKind,
        flights: Vec<Flight>,
    ) -> Edge {
        Edge {
            from: Id::new(from.to_owned()),
            to: Id::new(to.to_owned()),
            segment: Segment {
                segment_id: format!("{from}-{to}"),
                route_id: Id::new("r-1".to_owned()),
                kind,
                is_virtual: false,
                distance_km: None,
                duration_estimate_min: None,
                base_price: None,
            },
            weight: 60.0,
            flights,
        }
    }

    #[test]
    fn walks_edges_and_accumulates_totals() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let edges = vec![
            edge(
                "a",
                "b",
                TransportKind::Bus,
                vec![flight("f1", at(10, 8, 0), 60, 500.0, 20)],
            ),
            edge(
                "b",
                "c",
                TransportKind::Train,
                vec![flight("f2", at(10, 9, 30), 120, 1500.0, 20)],
            ),
        ];
        let itinerary =
            assemble_itinerary(&edges, "якутск", "алдан", Some(date), 2, at(1, 0, 0))
                .unwrap();

        assert_eq!(itinerary.segments.len(), 2);
        assert_eq!(itinerary.segments[0].transfer_minutes, 0);
        assert_eq!(itinerary.segments[1].transfer_minutes, 30);
        assert_eq!(itinerary.total_duration_minutes, 60 + 30 + 120);
        assert_eq!(itinerary.total_price, 2.0 * (500.0 + 1500.0));
        assert_eq!(itinerary.transfer_count, 1);
        assert_eq!(
            itinerary.transport_kinds,
            vec![TransportKind::Bus, TransportKind::Train]
        );
        assert_eq!(itinerary.departure, at(10, 8, 0));
        assert_eq!(itinerary.arrival, at(10, 11, 30));
    }

    #[test]
    fn segments_never_depart_before_the_previous_arrival() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let edges = vec![
            edge(
                "a",
                "b",
                TransportKind::Bus,
                vec![flight("f1", at(10, 8, 0), 60, 500.0, 20)],
            ),
            edge(
                "b",
                "c",
                TransportKind::Bus,
                vec![
                    // departs before the first leg arrives, must be skipped
                    flight("f2", at(10, 8, 30), 60, 500.0, 20),
                    flight("f3", at(10, 10, 0), 60, 500.0, 20),
                ],
            ),
        ];
        let itinerary =
            assemble_itinerary(&edges, "якутск", "алдан", Some(date), 1, at(1, 0, 0))
                .unwrap();
        for pair in itinerary.segments.windows(2) {
            assert!(pair[1].departure >= pair[0].arrival);
        }
        assert_eq!(itinerary.segments[1].flight.id.raw(), "f3");
    }

    #[test]
    fn seatless_future_flights_beat_past_flights() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let edges = vec![edge(
            "a",
            "b",
            TransportKind::Bus,
            vec![
                flight("past", at(5, 8, 0), 60, 500.0, 10),
                flight("full", at(12, 8, 0), 60, 500.0, 0),
            ],
        )];
        let itinerary =
            assemble_itinerary(&edges, "якутск", "покровск", Some(date), 1, at(1, 0, 0))
                .unwrap();
        assert_eq!(itinerary.segments[0].flight.id.raw(), "full");
    }

    #[test]
    fn past_flights_are_still_usable_and_the_clamp_holds() {
        // every flight lies before the requested date
        let date = NaiveDate::from_ymd_opt(2026, 3, 20).unwrap();
        let edges = vec![
            edge(
                "a",
                "b",
                TransportKind::Bus,
                vec![flight("f1", at(10, 8, 0), 60, 500.0, 5)],
            ),
            edge(
                "b",
                "c",
                TransportKind::Bus,
                vec![flight("f2", at(10, 7, 0), 60, 500.0, 5)],
            ),
        ];
        let itinerary =
            assemble_itinerary(&edges, "якутск", "алдан", Some(date), 1, at(1, 0, 0))
                .unwrap();
        // the second flight departs before the cursor; the raw difference is
        // negative but the documented clamp keeps it at zero
        assert_eq!(itinerary.segments[1].transfer_minutes, 0);
        assert_eq!(itinerary.transfer_count, 0);
    }

    #[test]
    fn an_edge_without_flights_yields_nothing() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let edges = vec![
            edge(
                "a",
                "b",
                TransportKind::Bus,
                vec![flight("f1", at(10, 8, 0), 60, 500.0, 5)],
            ),
            edge("b", "c", TransportKind::Bus, vec![]),
        ];
        assert!(assemble_itinerary(
            &edges,
            "якутск",
            "алдан",
            Some(date),
            1,
            at(1, 0, 0)
        )
        .is_none());
    }

    #[test]
    fn missing_date_falls_back_to_now() {
        let now = at(10, 7, 0);
        let edges = vec![edge(
            "a",
            "b",
            TransportKind::Bus,
            vec![
                flight("early", at(10, 6, 0), 60, 500.0, 5),
                flight("later", at(10, 8, 0), 60, 500.0, 5),
            ],
        )];
        let itinerary =
            assemble_itinerary(&edges, "якутск", "покровск", None, 1, now).unwrap();
        assert_eq!(itinerary.segments[0].flight.id.raw(), "later");
    }
}
