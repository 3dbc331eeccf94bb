//! Minaret - explorer core for Istanbul mosques from OpenStreetMap
//!
//! Fetches or loads mosque records, fills in districts, deduplicates and
//! ranks them by distance, and derives the state a map/list view consumes.
//! Shared by the `explore` and `snapshot` binaries.

pub mod config;
pub mod district;
pub mod fetch;
pub mod geo;
pub mod location;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod rank;
pub mod source;
pub mod store;
pub mod view;

pub use models::{GeoPoint, Mosque, OsmType};
