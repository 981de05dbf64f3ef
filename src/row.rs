// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parses one CSV line into a [`Sample`].

use base::{bail_t, Error};

/// One GPS fix belonging to a ride.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub ride_id: i64,
    pub lat: f64,
    pub lng: f64,
    pub ts: i64,
}

/// Parses a single CSV row of the form `rideId,lat,lng,ts`.
///
/// Trailing whitespace (including the line's `\n`/`\r\n`) is trimmed before
/// splitting. Exactly four comma-separated fields are required; lat/lng are
/// not range-checked here (that happens downstream in the ride folder).
pub fn parse_row(line: &str) -> Result<Sample, Error> {
    let line = line.trim_end();
    let mut fields = line.split(',');
    let ride_id = next_field(&mut fields, line, "rideId")?;
    let lat = next_field(&mut fields, line, "lat")?;
    let lng = next_field(&mut fields, line, "lng")?;
    let ts = next_field(&mut fields, line, "ts")?;
    if fields.next().is_some() {
        bail_t!(Parse, "expected 4 fields, row has more: {line:?}");
    }
    Ok(Sample {
        ride_id,
        lat,
        lng,
        ts,
    })
}

fn next_field<'a, T, I>(fields: &mut I, line: &str, name: &str) -> Result<T, Error>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    I: Iterator<Item = &'a str>,
{
    let raw = fields
        .next()
        .ok_or_else(|| base::format_err_t!(Parse, "missing field {name:?} in row {line:?}"))?;
    raw.parse::<T>().map_err(|e| {
        base::format_err_t!(Parse, "can't parse field {name:?} ({raw:?}) in row {line:?}: {e}")
    })
}
