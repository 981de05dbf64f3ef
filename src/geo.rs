// SPDX-License-Identifier: MIT OR Apache-2.0

//! Great-circle distance between GPS fixes.

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two points (degrees) via the haversine
/// formula, in meters, rounded half-to-even to the nearest integer.
pub fn haversine_m(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> i64 {
    let (lat1, lng1, lat2, lng2) = (
        lat1.to_radians(),
        lng1.to_radians(),
        lat2.to_radians(),
        lng2.to_radians(),
    );
    let dlat = lat2 - lat1;
    let dlng = lng2 - lng1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    round_half_even(EARTH_RADIUS_M * c)
}

/// Rounds `x` to the nearest integer, breaking ties to even — matching
/// `f64::round_ties_even`, spelled out here since every caller needs the
/// same deterministic tie-breaking rule.
pub fn round_half_even(x: f64) -> i64 {
    x.round_ties_even() as i64
}
