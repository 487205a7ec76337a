//! Read-only reference data for the regional network and the normalization
//! and validation rules built on top of it. The tables are compiled in and
//! never change at runtime.

pub mod cities;
pub mod normalize;
pub mod validate;

pub use cities::{reference_cities, reference_city, ReferenceCity, HUB_CITY};
pub use normalize::{
    is_reference_city, normalize_city, virtual_route_id, virtual_stop_id,
};
pub use validate::{validate_stop, Validation};
