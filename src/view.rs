//! Derived view state for a synchronized map and list.
//!
//! Everything here is a pure function of the canonical list, the user's
//! choices and the current position.

use std::fmt;
use std::str::FromStr;

use hashbrown::HashSet;

use crate::location::UserPosition;
use crate::models::Mosque;
use crate::normalize::{fold_search_text, title_case, turkish_cmp};
use crate::rank::rank_by_distance;

pub const LIST_LIMIT_MIN: usize = 5;
pub const LIST_LIMIT_MAX: usize = 500;
pub const LIST_LIMIT_DEFAULT: usize = 10;

pub fn clamp_list_limit(limit: usize) -> usize {
    limit.clamp(LIST_LIMIT_MIN, LIST_LIMIT_MAX)
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DistrictFilter {
    #[default]
    All,
    Named(String),
}

impl DistrictFilter {
    fn accepts(&self, mosque: &Mosque) -> bool {
        match self {
            Self::All => true,
            Self::Named(name) => mosque.district.as_deref() == Some(name.as_str()),
        }
    }
}

impl FromStr for DistrictFilter {
    type Err = std::convert::Infallible;

    /// `"all"` or blank selects everything; anything else is title-cased
    /// the same way district tags are.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        Ok(title_case(s).map_or(Self::All, Self::Named))
    }
}

impl fmt::Display for DistrictFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// User choices driving the view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub district: DistrictFilter,
    list_limit: usize,
    pub search: Option<String>,
    pub selected: Option<i64>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            district: DistrictFilter::All,
            list_limit: LIST_LIMIT_DEFAULT,
            search: None,
            selected: None,
        }
    }
}

impl ViewState {
    pub fn list_limit(&self) -> usize {
        self.list_limit
    }

    pub fn set_list_limit(&mut self, limit: usize) {
        self.list_limit = clamp_list_limit(limit);
    }

    pub fn with_list_limit(mut self, limit: usize) -> Self {
        self.set_list_limit(limit);
        self
    }

    pub fn reset_filter(&mut self) {
        self.district = DistrictFilter::All;
    }
}

/// Caption explaining what the list is ranked against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeoStatus {
    Locating,
    ByPosition,
    ByCityCenter { reason: Option<String> },
}

impl GeoStatus {
    pub fn from_position(position: Option<&UserPosition>) -> Self {
        match position {
            None => Self::Locating,
            Some(p) if p.is_fallback() => Self::ByCityCenter {
                reason: p.reason.clone(),
            },
            Some(_) => Self::ByPosition,
        }
    }
}

impl fmt::Display for GeoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Locating => f.write_str("Determining your location..."),
            Self::ByPosition => f.write_str("Listed by distance from your position."),
            Self::ByCityCenter { reason: Some(reason) } => {
                write!(f, "Listed by distance from the Istanbul city center ({reason}).")
            }
            Self::ByCityCenter { reason: None } => {
                f.write_str("Listed by distance from the Istanbul city center.")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExplorerView<'a> {
    /// Distinct districts of the whole list, Turkish-collated
    pub district_options: Vec<String>,
    /// District and search filters applied, baseline order
    pub filtered: Vec<&'a Mosque>,
    /// `filtered` ranked by distance
    pub ranked: Vec<&'a Mosque>,
    /// Head of `ranked` up to the list limit
    pub displayed: Vec<&'a Mosque>,
    pub selected: Option<&'a Mosque>,
    pub total_count: usize,
    pub list_limit: usize,
    pub truncated: bool,
    pub geo_status: GeoStatus,
}

impl ExplorerView<'_> {
    pub fn filtered_count(&self) -> usize {
        self.filtered.len()
    }

    pub fn displayed_count(&self) -> usize {
        self.displayed.len()
    }

    /// Data loaded but the filters leave nothing
    pub fn is_filtered_empty(&self) -> bool {
        self.total_count > 0 && self.filtered.is_empty()
    }
}

pub fn district_options(mosques: &[Mosque]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut options: Vec<String> = mosques
        .iter()
        .filter_map(|m| m.district.as_deref())
        .filter(|d| seen.insert(*d))
        .map(str::to_string)
        .collect();
    options.sort_by(|a, b| turkish_cmp(a, b));
    options
}

pub fn derive_view<'a>(
    mosques: &'a [Mosque],
    state: &ViewState,
    position: Option<&UserPosition>,
) -> ExplorerView<'a> {
    let needle = state
        .search
        .as_deref()
        .map(fold_search_text)
        .filter(|s| !s.trim().is_empty());

    let filtered: Vec<&Mosque> = mosques
        .iter()
        .filter(|m| state.district.accepts(m))
        .filter(|m| {
            needle
                .as_deref()
                .map_or(true, |n| fold_search_text(&m.name).contains(n.trim()))
        })
        .collect();

    let ranked = rank_by_distance(&filtered, position.map(|p| p.coords));

    let list_limit = clamp_list_limit(state.list_limit);
    let displayed: Vec<&Mosque> = ranked.iter().take(list_limit).copied().collect();

    let selected = state
        .selected
        .and_then(|id| ranked.iter().find(|m| m.id == id).copied())
        .or_else(|| ranked.first().copied());

    ExplorerView {
        district_options: district_options(mosques),
        truncated: ranked.len() > displayed.len(),
        total_count: mosques.len(),
        list_limit,
        geo_status: GeoStatus::from_position(position),
        filtered,
        ranked,
        displayed,
        selected,
    }
}
