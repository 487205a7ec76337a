use async_trait::async_trait;
use model::dataset::SourceMode;

use crate::{
    FlightQuote, RawFlight, RawRoute, RawStop, Result, UpstreamProvider,
    UpstreamSnapshot,
};

/// In-process provider used when no upstream endpoint is configured and in
/// tests. The snapshot is fixed at construction, so repeated fetches hash
/// identically.
pub struct MockProvider {
    snapshot: UpstreamSnapshot,
}

impl MockProvider {
    pub fn new(snapshot: UpstreamSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn empty() -> Self {
        Self::new(UpstreamSnapshot::default())
    }

    /// Small deterministic network around the hub: two bus runs and a river
    /// crossing, enough for the engine to produce real itineraries locally.
    pub fn seeded() -> Self {
        let stops = vec![
            raw_stop("s-1", "Автовокзал Якутск", 62.0187, 129.7422, "Якутск"),
            raw_stop("s-2", "Автостанция Покровск", 61.4844, 129.1480, "Покровск"),
            raw_stop("s-3", "Автостанция Майя", 61.7333, 130.2833, "Майя"),
            raw_stop("s-4", "Речной порт Якутск", 62.0402, 129.7536, "Якутск"),
        ];
        let routes = vec![
            raw_route("r-1", &["s-1", "s-2"], "bus", Some(450.0)),
            raw_route("r-2", &["s-1", "s-3"], "bus", Some(520.0)),
            raw_route("r-3", &["s-4", "s-3"], "ferry", Some(700.0)),
        ];
        let flights = vec![
            raw_flight("f-1", "r-1", "s-1", "s-2", "08:30", "09:45", 450.0, 38),
            raw_flight("f-2", "r-1", "s-1", "s-2", "17:00", "18:15", 450.0, 41),
            raw_flight("f-3", "r-2", "s-1", "s-3", "09:10", "10:20", 520.0, 29),
            raw_flight("f-4", "r-3", "s-4", "s-3", "11:00", "13:30", 700.0, 60),
        ];
        Self::new(UpstreamSnapshot {
            stops,
            routes,
            flights,
        })
    }
}

fn raw_stop(
    id: &str,
    name: &str,
    latitude: f64,
    longitude: f64,
    city: &str,
) -> RawStop {
    RawStop {
        external_id: id.to_owned(),
        name: name.to_owned(),
        latitude: Some(latitude),
        longitude: Some(longitude),
        city: city.to_owned(),
        kind: None,
    }
}

fn raw_route(
    id: &str,
    stop_ids: &[&str],
    kind: &str,
    base_fare: Option<f64>,
) -> RawRoute {
    RawRoute {
        external_id: id.to_owned(),
        stop_external_ids: stop_ids.iter().map(|s| s.to_string()).collect(),
        kind: Some(kind.to_owned()),
        number: None,
        operator: Some("ГУП ЖКХ Транс".to_owned()),
        base_fare,
    }
}

#[allow(clippy::too_many_arguments)]
fn raw_flight(
    id: &str,
    route: &str,
    from: &str,
    to: &str,
    departure: &str,
    arrival: &str,
    price: f64,
    seats: u32,
) -> RawFlight {
    RawFlight {
        external_id: id.to_owned(),
        route_external_id: route.to_owned(),
        from_stop_external_id: from.to_owned(),
        to_stop_external_id: to.to_owned(),
        departure: departure.to_owned(),
        arrival: arrival.to_owned(),
        price: Some(price),
        seats_available: Some(seats),
        status: None,
    }
}

#[async_trait]
impl UpstreamProvider for MockProvider {
    fn mode(&self) -> SourceMode {
        SourceMode::Mock
    }

    async fn fetch_all(&self) -> Result<UpstreamSnapshot> {
        Ok(self.snapshot.clone())
    }

    async fn flight_quote(
        &self,
        external_id: &str,
    ) -> Result<Option<FlightQuote>> {
        Ok(self
            .snapshot
            .flights
            .iter()
            .find(|flight| flight.external_id == external_id)
            .map(|flight| FlightQuote {
                price: flight.price,
                seats_available: flight.seats_available,
            }))
    }
}
