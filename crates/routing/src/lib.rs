//! From a path in the graph to something a passenger can ride: flight
//! selection, timing, pricing, and the routing service facade.

pub mod assemble;
pub mod service;

pub use assemble::assemble_itinerary;
pub use service::{RouteQuery, RoutePlan, RoutingError, RoutingService};
