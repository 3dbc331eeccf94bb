//! Point-in-polygon district lookup.

use std::sync::Arc;

use geo_types::{LineString, Polygon};
use rstar::{RTree, RTreeObject, AABB};
use tracing::info;

use super::{DistrictBoundary, DistrictResolver};
use crate::models::GeoPoint;

/// Even-odd ray casting against one ring.
///
/// Edges are counted with the half-open rule `(yi > y) != (yj > y)`, so a
/// ray passing exactly through a vertex is counted once.
fn ring_crossings(ring: &LineString<f64>, x: f64, y: f64) -> bool {
    let points = &ring.0;
    let n = points.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (points[i].x, points[i].y);
        let (xj, yj) = (points[j].x, points[j].y);

        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Ray casting over a polygon; holes flip the parity back.
pub fn polygon_contains(polygon: &Polygon<f64>, point: GeoPoint) -> bool {
    let (x, y) = (point.lon, point.lat);
    let mut inside = ring_crossings(polygon.exterior(), x, y);
    for hole in polygon.interiors() {
        if ring_crossings(hole, x, y) {
            inside = !inside;
        }
    }
    inside
}

pub fn boundary_contains(boundary: &DistrictBoundary, point: GeoPoint) -> bool {
    boundary
        .geometry
        .0
        .iter()
        .any(|polygon| polygon_contains(polygon, point))
}

/// R-tree entry remembering the boundary's position in the table
#[derive(Clone)]
struct IndexedBoundary {
    order: usize,
    boundary: Arc<DistrictBoundary>,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedBoundary {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl IndexedBoundary {
    fn new(order: usize, boundary: DistrictBoundary) -> Option<Self> {
        let (min_x, min_y, max_x, max_y) = boundary.bbox()?;
        Some(Self {
            order,
            boundary: Arc::new(boundary),
            envelope: AABB::from_corners([min_x, min_y], [max_x, max_y]),
        })
    }
}

/// Resolves a point to the first boundary (in table order) containing it.
pub struct PolygonResolver {
    tree: RTree<IndexedBoundary>,
}

impl PolygonResolver {
    /// Build spatial index from district boundaries
    pub fn build(boundaries: Vec<DistrictBoundary>) -> Self {
        let indexed: Vec<IndexedBoundary> = boundaries
            .into_iter()
            .enumerate()
            .filter_map(|(order, b)| IndexedBoundary::new(order, b))
            .collect();

        let tree = RTree::bulk_load(indexed);
        info!("District polygon index built with {} entries", tree.size());

        Self { tree }
    }

    /// Boundary containing the point with the lowest table position
    pub fn lookup(&self, point: GeoPoint) -> Option<Arc<DistrictBoundary>> {
        let query_envelope = AABB::from_point([point.lon, point.lat]);

        // Envelope candidates first, then the exact ray-casting test
        self.tree
            .locate_in_envelope_intersecting(&query_envelope)
            .filter(|ib| boundary_contains(&ib.boundary, point))
            .min_by_key(|ib| ib.order)
            .map(|ib| Arc::clone(&ib.boundary))
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl DistrictResolver for PolygonResolver {
    fn resolve(&self, point: GeoPoint) -> Option<String> {
        self.lookup(point).map(|b| b.name.clone())
    }
}
