//! District resolution for records whose source tags carry no district.
//!
//! Two models are available: nearest center within a radius in meters
//! ([`ProximityResolver`], the default) and point-in-polygon against named
//! boundaries ([`PolygonResolver`]).

mod boundary;
mod polygon;
mod proximity;

pub use boundary::{load_district_boundaries, parse_district_boundaries, DistrictBoundary};
pub use polygon::{boundary_contains, polygon_contains, PolygonResolver};
pub use proximity::{DistrictCenter, ProximityResolver};

use crate::models::GeoPoint;

/// Maps a coordinate to a district name
pub trait DistrictResolver: Send + Sync {
    fn resolve(&self, point: GeoPoint) -> Option<String>;
}

/// Resolver that never answers; used when inference is switched off
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResolver;

impl DistrictResolver for NoResolver {
    fn resolve(&self, _point: GeoPoint) -> Option<String> {
        None
    }
}
