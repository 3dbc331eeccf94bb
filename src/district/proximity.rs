//! Nearest-center district lookup with per-district radii in meters.

use tracing::debug;

use super::DistrictResolver;
use crate::geo::distance_meters;
use crate::models::GeoPoint;

/// A district approximated by a center and a radius
#[derive(Debug, Clone, PartialEq)]
pub struct DistrictCenter {
    pub name: String,
    pub center: GeoPoint,
    /// Radius in meters, compared against haversine distance
    pub radius_meters: f64,
}

impl DistrictCenter {
    pub fn new(name: &str, lat: f64, lon: f64, radius_meters: f64) -> Self {
        Self {
            name: name.to_string(),
            center: GeoPoint::new(lat, lon),
            radius_meters,
        }
    }
}

/// Istanbul's 39 districts: (name, center lat, center lon, radius meters)
const ISTANBUL_DISTRICTS: &[(&str, f64, f64, f64)] = &[
    ("Adalar", 40.876, 29.126, 8000.0),
    ("Arnavutköy", 41.185, 28.740, 12000.0),
    ("Ataşehir", 40.983, 29.127, 6000.0),
    ("Avcılar", 40.980, 28.722, 7000.0),
    ("Bağcılar", 41.039, 28.856, 5000.0),
    ("Bahçelievler", 41.002, 28.859, 4000.0),
    ("Bakırköy", 40.980, 28.872, 5000.0),
    ("Başakşehir", 41.093, 28.802, 8000.0),
    ("Bayrampaşa", 41.047, 28.912, 3000.0),
    ("Beşiktaş", 41.043, 29.009, 4000.0),
    ("Beykoz", 41.127, 29.100, 12000.0),
    ("Beylikdüzü", 41.002, 28.642, 6000.0),
    ("Beyoğlu", 41.037, 28.977, 3000.0),
    ("Büyükçekmece", 41.020, 28.585, 10000.0),
    ("Çatalca", 41.143, 28.460, 20000.0),
    ("Çekmeköy", 41.033, 29.188, 7000.0),
    ("Esenler", 41.043, 28.876, 3000.0),
    ("Esenyurt", 41.033, 28.673, 7000.0),
    ("Eyüpsultan", 41.085, 28.930, 8000.0),
    ("Fatih", 41.019, 28.940, 4000.0),
    ("Gaziosmanpaşa", 41.063, 28.912, 4000.0),
    ("Güngören", 41.020, 28.876, 3000.0),
    ("Kadıköy", 40.990, 29.034, 5000.0),
    ("Kağıthane", 41.080, 28.973, 4000.0),
    ("Kartal", 40.906, 29.188, 6000.0),
    ("Küçükçekmece", 41.000, 28.780, 6000.0),
    ("Maltepe", 40.935, 29.130, 6000.0),
    ("Pendik", 40.880, 29.250, 10000.0),
    ("Sancaktepe", 41.000, 29.230, 6000.0),
    ("Sarıyer", 41.167, 29.050, 10000.0),
    ("Silivri", 41.073, 28.246, 15000.0),
    ("Sultanbeyli", 40.963, 29.262, 4000.0),
    ("Sultangazi", 41.107, 28.867, 5000.0),
    ("Şile", 41.176, 29.613, 20000.0),
    ("Şişli", 41.060, 28.987, 4000.0),
    ("Tuzla", 40.820, 29.300, 8000.0),
    ("Ümraniye", 41.020, 29.120, 6000.0),
    ("Üsküdar", 41.023, 29.015, 6000.0),
    ("Zeytinburnu", 41.003, 28.903, 3000.0),
];

/// Resolves a point to the nearest district whose radius contains it, or to
/// the globally nearest center when no radius does.
///
/// The second branch means a point far outside the city still gets a
/// district. Callers that need a strict answer should use
/// [`ProximityResolver::resolve_within_radius`].
#[derive(Debug, Clone)]
pub struct ProximityResolver {
    districts: Vec<DistrictCenter>,
}

impl ProximityResolver {
    pub fn new(districts: Vec<DistrictCenter>) -> Self {
        Self { districts }
    }

    /// Resolver over the built-in Istanbul table
    pub fn istanbul() -> Self {
        Self::new(
            ISTANBUL_DISTRICTS
                .iter()
                .map(|(name, lat, lon, radius)| DistrictCenter::new(name, *lat, *lon, *radius))
                .collect(),
        )
    }

    pub fn districts(&self) -> &[DistrictCenter] {
        &self.districts
    }

    /// Nearest district whose radius contains the point
    pub fn resolve_within_radius(&self, point: GeoPoint) -> Option<&DistrictCenter> {
        self.nearest(point, |d, distance| distance <= d.radius_meters)
    }

    /// Nearest center regardless of radius
    pub fn resolve_nearest(&self, point: GeoPoint) -> Option<&DistrictCenter> {
        self.nearest(point, |_, _| true)
    }

    fn nearest<F>(&self, point: GeoPoint, accept: F) -> Option<&DistrictCenter>
    where
        F: Fn(&DistrictCenter, f64) -> bool,
    {
        let mut best: Option<(&DistrictCenter, f64)> = None;

        for district in &self.districts {
            let distance = distance_meters(point, district.center);
            if !accept(district, distance) {
                continue;
            }
            // Strict comparison keeps the earlier entry on ties
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((district, distance));
            }
        }

        best.map(|(district, _)| district)
    }
}

impl Default for ProximityResolver {
    fn default() -> Self {
        Self::istanbul()
    }
}

impl DistrictResolver for ProximityResolver {
    fn resolve(&self, point: GeoPoint) -> Option<String> {
        if let Some(district) = self.resolve_within_radius(point) {
            return Some(district.name.clone());
        }

        let fallback = self.resolve_nearest(point)?;
        debug!(
            "({}, {}) outside every district radius, using nearest center {}",
            point.lat, point.lon, fallback.name
        );
        Some(fallback.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_has_39_districts() {
        assert_eq!(ProximityResolver::istanbul().districts().len(), 39);
    }

    #[test]
    fn test_every_center_resolves_to_itself() {
        let resolver = ProximityResolver::istanbul();
        for district in resolver.districts() {
            assert_eq!(
                resolver.resolve(district.center).as_deref(),
                Some(district.name.as_str())
            );
        }
    }

    #[test]
    fn test_overlapping_radii_pick_nearest() {
        // Between Üsküdar (6 km) and Beşiktaş (4 km), closer to Beşiktaş
        let resolver = ProximityResolver::istanbul();
        let point = GeoPoint::new(41.041, 29.007);
        assert_eq!(resolver.resolve(point).as_deref(), Some("Beşiktaş"));
    }

    #[test]
    fn test_far_point_falls_back_to_nearest_center() {
        // Known approximation: Ankara is nowhere near Istanbul, yet it still
        // gets the nearest Istanbul district.
        let resolver = ProximityResolver::istanbul();
        let ankara = GeoPoint::new(39.93, 32.85);
        assert!(resolver.resolve_within_radius(ankara).is_none());
        assert_eq!(resolver.resolve(ankara).as_deref(), Some("Şile"));
    }

    #[test]
    fn test_empty_table_resolves_nothing() {
        let resolver = ProximityResolver::new(vec![]);
        assert_eq!(resolver.resolve(GeoPoint::new(41.0, 29.0)), None);
    }

    #[test]
    fn test_ties_keep_table_order() {
        let resolver = ProximityResolver::new(vec![
            DistrictCenter::new("First", 41.0, 29.0, 1000.0),
            DistrictCenter::new("Second", 41.0, 29.0, 1000.0),
        ]);
        assert_eq!(
            resolver.resolve(GeoPoint::new(41.0, 29.0)).as_deref(),
            Some("First")
        );
    }
}
