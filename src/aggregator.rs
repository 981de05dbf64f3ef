// SPDX-License-Identifier: MIT OR Apache-2.0

//! The bucketed aggregator (component D): routes [`RideSummary`]s into a
//! 24 (hour) × 8 (distance band) grid of duration samples, then reduces
//! each cell to its 95th-percentile duration.

use crate::folder::RideSummary;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Distance bands in km, ascending; the last absorbs everything above 21 km.
pub const BANDS: [i64; 8] = [1, 2, 3, 5, 8, 13, 21, i64::MAX];

pub const HOURS: usize = 24;
pub const NUM_BANDS: usize = BANDS.len();

#[derive(Default)]
struct Cell(Mutex<Vec<i64>>);

impl Cell {
    fn push(&self, duration_s: i64) {
        self.0.lock().unwrap().push(duration_s);
    }
}

/// The 24×8 grid of per-bucket 95th-percentile durations, produced by
/// [`Aggregator::finish`].
pub struct Matrix {
    pub p95: [[i64; NUM_BANDS]; HOURS],
}

pub struct Aggregator {
    cells: Arc<[[Cell; NUM_BANDS]; HOURS]>,
}

impl Aggregator {
    pub fn new() -> Self {
        Aggregator {
            cells: Arc::new(std::array::from_fn(|_| std::array::from_fn(|_| Cell::default()))),
        }
    }

    /// Spawns `workers` tasks draining `rx` (shared behind a mutex, since
    /// `mpsc::Receiver` is single-consumer) and routing each ride into its
    /// cell. Returns once every worker has exited, i.e. once `rx` has
    /// closed and drained.
    pub async fn run(&self, rx: mpsc::Receiver<RideSummary>, workers: usize) {
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let mut handles = Vec::with_capacity(workers);
        for i in 0..workers {
            let rx = rx.clone();
            let cells = self.cells.clone();
            handles.push(
                tokio::task::Builder::new()
                    .name(&format!("aggregator-worker-{i}"))
                    .spawn(async move {
                        loop {
                            let ride = {
                                let mut rx = rx.lock().await;
                                rx.recv().await
                            };
                            match ride {
                                Some(r) => route(&cells, r),
                                None => break,
                            }
                        }
                    })
                    .expect("spawning aggregator worker"),
            );
        }
        for h in handles {
            let _ = h.await;
        }
    }

    /// Sorts every cell's durations and reduces each to its 95th
    /// percentile. Runs the sorts on the blocking pool since a cell can
    /// hold an unbounded number of samples.
    pub async fn finish(self) -> Matrix {
        let cells = self.cells;
        tokio::task::spawn_blocking(move || {
            let mut p95 = [[0i64; NUM_BANDS]; HOURS];
            for (h, row) in cells.iter().enumerate() {
                for (b, cell) in row.iter().enumerate() {
                    let mut durations = cell.0.lock().unwrap();
                    durations.sort_unstable();
                    p95[h][b] = percentile_95(&durations);
                }
            }
            Matrix { p95 }
        })
        .await
        .expect("aggregator finish task panicked")
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

fn route(cells: &[[Cell; NUM_BANDS]; HOURS], r: RideSummary) {
    if r.distance_m < 0 || r.start_ts < 0 || r.duration_s < 0 {
        tracing::warn!(
            ride_id = r.ride_id,
            distance_m = r.distance_m,
            start_ts = r.start_ts,
            duration_s = r.duration_s,
            "dropping ride summary with a negative field"
        );
        return;
    }
    let hour = utc_hour(r.start_ts);
    let km = crate::geo::round_half_even(r.distance_m as f64 / 1000.0);
    let band = band_index(km);
    cells[hour][band].push(r.duration_s);
}

fn utc_hour(unix_seconds: i64) -> usize {
    (unix_seconds.div_euclid(3600).rem_euclid(24)) as usize
}

fn band_index(km: i64) -> usize {
    BANDS
        .iter()
        .position(|&d| km <= d)
        .expect("the last band is i64::MAX, which absorbs every value")
}

/// `idx = round(n * 0.95)` half-to-even, clamped to `n - 1`; 0 for empty.
fn percentile_95(sorted: &[i64]) -> i64 {
    let n = sorted.len();
    if n == 0 {
        return 0;
    }
    let idx = crate::geo::round_half_even(n as f64 * 0.95) as usize;
    let idx = idx.min(n - 1);
    sorted[idx]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ride(ride_id: i64, start_ts: i64, distance_m: i64, duration_s: i64) -> RideSummary {
        RideSummary { ride_id, start_ts, distance_m, duration_s }
    }

    #[test]
    fn utc_hour_wraps_at_day_boundary() {
        assert_eq!(utc_hour(0), 0);
        assert_eq!(utc_hour(3599), 0);
        assert_eq!(utc_hour(3600), 1);
        assert_eq!(utc_hour(24 * 3600), 0);
        assert_eq!(utc_hour(24 * 3600 * 40 + 7200), 2);
    }

    #[test]
    fn band_index_picks_smallest_covering_band() {
        assert_eq!(band_index(0), 0);
        assert_eq!(band_index(1), 0);
        assert_eq!(band_index(2), 1);
        assert_eq!(band_index(21), 6);
        assert_eq!(band_index(22), 7);
        assert_eq!(band_index(1_000_000), 7);
    }

    #[test]
    fn percentile_95_matches_spec_formula() {
        assert_eq!(percentile_95(&[]), 0);
        assert_eq!(percentile_95(&[10]), 10);
        let v: Vec<i64> = (1..=20).collect();
        // idx = round(20*0.95) = round(19.0) = 19, clamp to n-1=19.
        assert_eq!(percentile_95(&v), 20);
        let v: Vec<i64> = (1..=8).collect();
        // idx = round(8*0.95) = round(7.6) = 8, clamp to n-1=7.
        assert_eq!(percentile_95(&v), 8);
    }

    #[tokio::test]
    async fn run_then_finish_routes_and_reduces() {
        let (tx, rx) = mpsc::channel(16);
        let rides = [
            ride(1, 0, 500, 100),     // hour 0, 1 km band
            ride(2, 3600, 3000, 200), // hour 1, 3 km band
            ride(3, 3600, 3000, 300), // hour 1, 3 km band
        ];
        for r in rides {
            tx.send(r).await.unwrap();
        }
        drop(tx);

        let agg = Aggregator::new();
        agg.run(rx, 4).await;
        let matrix = agg.finish().await;
        assert_eq!(matrix.p95[0][0], 100);
        assert_eq!(matrix.p95[1][2], 300);
        assert_eq!(matrix.p95[2][0], 0);
    }

    #[test]
    fn negative_field_is_dropped() {
        let cells: Arc<[[Cell; NUM_BANDS]; HOURS]> =
            Arc::new(std::array::from_fn(|_| std::array::from_fn(|_| Cell::default())));
        route(&cells, ride(1, -1, 100, 10));
        for row in cells.iter() {
            for cell in row.iter() {
                assert!(cell.0.lock().unwrap().is_empty());
            }
        }
    }
}
