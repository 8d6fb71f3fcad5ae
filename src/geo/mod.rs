//! Location helpers: reverse geocoding and proximity queries

pub mod geocoder;
pub mod proximity;

pub use geocoder::{NominatimGeocoder, ReverseGeocoder, ADDRESS_NOT_FOUND};
pub use proximity::{cluster_points, haversine_km, within_radius};
