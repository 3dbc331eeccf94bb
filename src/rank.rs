//! Distance ranking relative to the user position.

use std::borrow::Borrow;

use crate::geo::distance_meters;
use crate::models::{GeoPoint, Mosque};

/// Copy of `items` ordered by ascending distance from `user`.
///
/// Without a position the input order is kept. The sort is stable, so
/// equidistant records stay in their baseline (name) order.
pub fn rank_by_distance<T>(items: &[T], user: Option<GeoPoint>) -> Vec<T>
where
    T: Borrow<Mosque> + Clone,
{
    let Some(user) = user else {
        return items.to_vec();
    };

    let mut decorated: Vec<(f64, &T)> = items
        .iter()
        .map(|item| (distance_meters(item.borrow().position, user), item))
        .collect();
    decorated.sort_by(|a, b| a.0.total_cmp(&b.0));
    decorated.into_iter().map(|(_, item)| item.clone()).collect()
}

/// Distance from `user` to each record, in the same order
pub fn distances_from(items: &[Mosque], user: GeoPoint) -> Vec<f64> {
    items
        .iter()
        .map(|m| distance_meters(m.position, user))
        .collect()
}
