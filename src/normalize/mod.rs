//! Raw record -> canonical [`Mosque`] conversion.
//!
//! Each source shape has its own extraction function producing a [`Draft`];
//! drafts share district normalization and inference.

pub mod text;

use std::sync::Arc;

use hashbrown::HashSet;
use serde_json::Value;
use tracing::debug;

use crate::district::{DistrictResolver, ProximityResolver};
use crate::models::raw::{as_number, composite_type, extract_id};
use crate::models::{
    osm_url, Attributes, ExternalRefs, FlatRow, GeoJsonFeature, GeoPoint, Mosque, OsmType,
    OverpassElement, RawRecord, SnapshotEntry, Tags,
};

pub use text::{fold_search_text, title_case, turkish_cmp, CollationKey};

/// Name used when a record carries no usable name tag
pub const UNNAMED_MOSQUE: &str = "İsimsiz Cami";

const NAME_KEYS: &[&str] = &["name:tr", "name"];
const DISTRICT_KEYS: &[&str] = &["addr:district", "district"];
const NEIGHBORHOOD_KEYS: &[&str] = &["addr:suburb", "suburb", "neighbourhood"];

/// Fields extracted from one raw record before district handling
struct Draft {
    id: i64,
    osm_type: Option<OsmType>,
    position: GeoPoint,
    name: String,
    district: Option<String>,
    neighborhood: Option<String>,
    street: Option<String>,
    refs: ExternalRefs,
    attributes: Option<Attributes>,
}

fn point_from(lat: Option<&Value>, lon: Option<&Value>) -> Option<GeoPoint> {
    GeoPoint::checked(as_number(lat)?, as_number(lon)?)
}

fn name_from(tags: &Tags) -> String {
    tags.first_of(NAME_KEYS)
        .unwrap_or_else(|| UNNAMED_MOSQUE.to_string())
}

fn refs_from(tags: &Tags, osm_type: Option<OsmType>, id: i64) -> ExternalRefs {
    ExternalRefs {
        wikidata: tags.get("wikidata"),
        wikipedia: tags.get("wikipedia"),
        source_url: osm_type.map(|t| osm_url(t, id)),
    }
}

fn attributes_from(tags: &Tags) -> Option<Attributes> {
    let attributes = Attributes {
        architect: tags.get("architect"),
        capacity: tags.get("capacity"),
        website: tags.first_of(&["website", "contact:website"]),
        image: tags.get("image"),
        accessibility: tags.get("wheelchair"),
    };
    (!attributes.is_empty()).then_some(attributes)
}

fn from_overpass(element: &OverpassElement) -> Option<Draft> {
    let center = element.center.as_ref();
    let lat = element
        .lat
        .as_ref()
        .or_else(|| center.and_then(|c| c.lat.as_ref()));
    let lon = element
        .lon
        .as_ref()
        .or_else(|| center.and_then(|c| c.lon.as_ref()));
    let position = point_from(lat, lon)?;

    let tags = &element.tags;
    let osm_type = element
        .element_type
        .as_deref()
        .and_then(|t| t.parse().ok());

    Some(Draft {
        id: element.id,
        osm_type,
        position,
        name: name_from(tags),
        district: tags.first_of(DISTRICT_KEYS),
        neighborhood: tags.first_of(NEIGHBORHOOD_KEYS),
        street: tags.get("addr:street"),
        refs: refs_from(tags, osm_type, element.id),
        attributes: None,
    })
}

fn from_flat(row: &FlatRow) -> Option<Draft> {
    let position = point_from(row.latitude.as_ref(), row.longitude.as_ref())?;
    let id = row.osm_id.as_ref().and_then(extract_id)?;

    let tags = &row.tags;
    let osm_type = row.osm_type.as_deref().and_then(|t| t.parse().ok());

    Some(Draft {
        id,
        osm_type,
        position,
        name: name_from(tags),
        district: tags.first_of(DISTRICT_KEYS),
        neighborhood: tags.first_of(NEIGHBORHOOD_KEYS),
        street: tags.get("addr:street"),
        refs: refs_from(tags, osm_type, id),
        attributes: attributes_from(tags),
    })
}

fn from_feature(feature: &GeoJsonFeature) -> Option<Draft> {
    let geometry = feature.geometry.as_ref()?;
    if geometry.get("type").and_then(Value::as_str) != Some("Point") {
        return None;
    }
    // GeoJSON order is [lon, lat]
    let coordinates = geometry.get("coordinates")?.as_array()?;
    let position = point_from(coordinates.get(1), coordinates.get(0))?;

    let props = &feature.properties;
    let id_value = feature
        .id
        .as_ref()
        .filter(|v| !v.is_null())
        .or_else(|| props.raw("@id"))
        .or_else(|| props.raw("osm_id"))?;
    let id = extract_id(id_value)?;

    let osm_type = composite_type(id_value)
        .map(str::to_string)
        .or_else(|| props.first_of(&["osm_type", "@type"]))
        .and_then(|t| t.parse().ok());

    let mut refs = refs_from(props, osm_type, id);
    if refs.source_url.is_none() {
        refs.source_url = props.first_of(&["osm_url", "osmUrl"]);
    }

    Some(Draft {
        id,
        osm_type,
        position,
        name: name_from(props),
        district: props.first_of(DISTRICT_KEYS),
        neighborhood: props.first_of(NEIGHBORHOOD_KEYS),
        street: props.get("addr:street"),
        refs,
        attributes: attributes_from(props),
    })
}

fn from_snapshot(entry: &SnapshotEntry) -> Option<Draft> {
    let position = point_from(Some(&entry.lat), Some(&entry.lon))?;
    let osm_type = entry.osm_type.as_deref().and_then(|t| t.parse().ok());

    let name = if entry.name.is_empty() {
        UNNAMED_MOSQUE.to_string()
    } else {
        entry.name.clone()
    };

    Some(Draft {
        id: entry.id,
        osm_type,
        position,
        name,
        district: entry.district.clone(),
        neighborhood: entry.neighborhood.clone().filter(|n| !n.is_empty()),
        street: entry.street.clone().filter(|s| !s.is_empty()),
        refs: ExternalRefs {
            wikidata: entry.wikidata.clone().filter(|w| !w.is_empty()),
            wikipedia: entry.wikipedia.clone().filter(|w| !w.is_empty()),
            source_url: entry
                .osm_url
                .clone()
                .or_else(|| osm_type.map(|t| osm_url(t, entry.id))),
        },
        attributes: None,
    })
}

/// Converts raw records into canonical mosques.
///
/// Holds the district resolver used for records without a district tag.
#[derive(Clone)]
pub struct Normalizer {
    resolver: Arc<dyn DistrictResolver>,
}

impl Normalizer {
    pub fn new(resolver: Arc<dyn DistrictResolver>) -> Self {
        Self { resolver }
    }

    /// Normalize one record; `None` when it has no usable coordinates or id.
    pub fn normalize(&self, raw: &RawRecord) -> Option<Mosque> {
        let draft = match raw {
            RawRecord::Overpass(element) => from_overpass(element),
            RawRecord::Flat(row) => from_flat(row),
            RawRecord::Feature(feature) => from_feature(feature),
            RawRecord::Snapshot(entry) => from_snapshot(entry),
        }?;

        let district = draft
            .district
            .as_deref()
            .and_then(title_case)
            .or_else(|| self.resolver.resolve(draft.position));

        Some(Mosque {
            id: draft.id,
            osm_type: draft.osm_type,
            name: draft.name,
            position: draft.position,
            district,
            neighborhood: draft.neighborhood,
            street: draft.street,
            refs: draft.refs,
            attributes: draft.attributes,
        })
    }

    /// Normalize a batch: drop rejects, deduplicate, sort by name.
    pub fn normalize_batch<I>(&self, records: I) -> Vec<Mosque>
    where
        I: IntoIterator<Item = RawRecord>,
    {
        let mut total = 0usize;
        let mosques: Vec<Mosque> = records
            .into_iter()
            .inspect(|_| total += 1)
            .filter_map(|raw| self.normalize(&raw))
            .collect();

        let rejected = total - mosques.len();
        if rejected > 0 {
            debug!("Dropped {} of {} records without usable coordinates", rejected, total);
        }

        let mut unique = deduplicate(mosques);
        sort_by_name(&mut unique);
        unique
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(Arc::new(ProximityResolver::istanbul()))
    }
}

/// Keep the first record for each coordinate pair and each `(type, id)`.
pub fn deduplicate(mosques: Vec<Mosque>) -> Vec<Mosque> {
    let mut seen_points = HashSet::new();
    let mut seen_ids = HashSet::new();
    let before = mosques.len();

    let unique: Vec<Mosque> = mosques
        .into_iter()
        .filter(|m| {
            let point = m.position.bits();
            let key = (m.osm_type, m.id);
            // A dropped record must not claim either key
            if seen_points.contains(&point) || seen_ids.contains(&key) {
                return false;
            }
            seen_points.insert(point);
            seen_ids.insert(key);
            true
        })
        .collect();

    if unique.len() < before {
        debug!("Removed {} duplicate records", before - unique.len());
    }

    unique
}

/// Stable sort by name in Turkish collation order
pub fn sort_by_name(mosques: &mut [Mosque]) {
    mosques.sort_by_cached_key(|m| CollationKey::new(&m.name));
}
