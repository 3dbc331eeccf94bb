//! Core data models for the mosque explorer.

pub mod place;
pub mod raw;

pub use place::{osm_url, Attributes, ExternalRefs, GeoPoint, Mosque, OsmType};
pub use raw::{
    FlatRow, GeoJsonFeature, OverpassElement, OverpassResponse, RawRecord, SnapshotEntry, Tags,
};
