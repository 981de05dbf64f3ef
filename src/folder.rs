// SPDX-License-Identifier: MIT OR Apache-2.0

//! Folds a stream of [`Sample`]s belonging to one chunk into [`RideSummary`]
//! values, one per completed ride.

use crate::geo::haversine_m;
use crate::row::Sample;
use tokio::sync::mpsc;

/// One ride's accumulated duration and distance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RideSummary {
    pub ride_id: i64,
    pub start_ts: i64,
    pub distance_m: i64,
    pub duration_s: i64,
}

#[derive(Default)]
struct Fold {
    last_row: Option<Sample>,
    current_ride: Option<RideSummary>,
}

impl Fold {
    fn push(&mut self, s: Sample) -> Option<RideSummary> {
        if !(0.0..=90.0).contains(&s.lat) || !(0.0..=90.0).contains(&s.lng) {
            tracing::warn!(
                ride_id = s.ride_id,
                lat = s.lat,
                lng = s.lng,
                ts = s.ts,
                "dropping sample with out-of-range lat/lng"
            );
            return None;
        }

        let Some(last) = self.last_row else {
            self.last_row = Some(s);
            return None;
        };

        let mut emitted = None;
        if last.ride_id == s.ride_id {
            let ride = self.current_ride.get_or_insert(RideSummary {
                ride_id: last.ride_id,
                start_ts: last.ts,
                distance_m: 0,
                duration_s: 0,
            });
            ride.duration_s += s.ts - last.ts;
            ride.distance_m += haversine_m(last.lat, last.lng, s.lat, s.lng);
        } else {
            emitted = self.current_ride.take();
        }
        self.last_row = Some(s);
        emitted
    }

    fn finish(self) -> Option<RideSummary> {
        self.current_ride
    }
}

/// Drains `rx` and sends one [`RideSummary`] per completed ride to `out`,
/// until `rx` closes or `out`'s receiver is dropped.
pub async fn fold_rides(mut rx: mpsc::Receiver<Sample>, out: mpsc::Sender<RideSummary>) {
    let mut fold = Fold::default();
    while let Some(s) = rx.recv().await {
        if let Some(ride) = fold.push(s) {
            if out.send(ride).await.is_err() {
                return;
            }
        }
    }
    if let Some(ride) = fold.finish() {
        let _ = out.send(ride).await;
    }
}
