// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wires the reader, folders, and aggregator into one run, and produces the
//! final report.

use crate::aggregator::Aggregator;
use crate::cancel::CancelToken;
use crate::folder::fold_rides;
use crate::reader;
use crate::report::render;
use base::Error;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Queue capacities scale with concurrency: the total in-flight row budget
/// (4096) is divided across the `n` row-queues, and the rides queue (one
/// per run, fed by every folder) gets a flat budget of its own.
const TOTAL_ROW_QUEUE_BUDGET: usize = 4096;
const RIDES_QUEUE_CAPACITY: usize = 4096;

/// Runs the full pipeline against `input_path` with `concurrency` chunks /
/// aggregator workers, and returns the rendered CSV report.
///
/// `concurrency` must be at least 1; callers (the CLI's `main.rs`) are
/// expected to turn `concurrency < 1` into a usage error before reaching
/// here.
pub async fn run_pipeline(input_path: PathBuf, concurrency: usize) -> Result<String, Error> {
    let cancel = CancelToken::new();
    let row_queue_capacity = TOTAL_ROW_QUEUE_BUDGET.div_ceil(concurrency).max(1);

    let mut row_txs = Vec::with_capacity(concurrency);
    let mut row_rxs = Vec::with_capacity(concurrency);
    for _ in 0..concurrency {
        let (tx, rx) = mpsc::channel(row_queue_capacity);
        row_txs.push(tx);
        row_rxs.push(rx);
    }
    let (rides_tx, rides_rx) = mpsc::channel(RIDES_QUEUE_CAPACITY);

    let reader_handle = tokio::task::spawn({
        let cancel = cancel.clone();
        reader::read_file(input_path, row_txs, cancel)
    });

    let mut folder_handles = Vec::with_capacity(concurrency);
    for (i, rx) in row_rxs.into_iter().enumerate() {
        let out = rides_tx.clone();
        folder_handles.push(
            tokio::task::Builder::new()
                .name(&format!("folder-{i}"))
                .spawn(fold_rides(rx, out))
                .expect("spawning folder task"),
        );
    }
    drop(rides_tx);

    // The aggregator must drain the rides queue concurrently with the
    // folders feeding it, so its worker loop is spawned as its own task
    // right away rather than awaited lazily later.
    let aggregator = Arc::new(Aggregator::new());
    let aggregator_handle = tokio::task::spawn({
        let aggregator = aggregator.clone();
        let workers = concurrency.max(1);
        async move { aggregator.run(rides_rx, workers).await }
    });

    let reader_result = reader_handle.await.expect("reader task panicked");
    for h in folder_handles {
        h.await.expect("folder task panicked");
    }
    aggregator_handle.await.expect("aggregator task panicked");

    match reader_result {
        Ok(()) => {
            let aggregator =
                Arc::try_unwrap(aggregator).unwrap_or_else(|_| unreachable!("sole owner after join"));
            let matrix = aggregator.finish().await;
            Ok(render(&matrix))
        }
        // `read_file` already cancels its own sibling chunk workers on the
        // first error; their dropped senders close every row-queue, which
        // drains the folders and then the aggregator without any further
        // signaling here.
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn end_to_end_renders_header_and_24_rows() {
        crate::testutil::init();
        let file = write_csv(&[
            "1,10.0,20.0,0",
            "1,10.1,20.1,60",
            "1,10.2,20.2,120",
            "2,30.0,40.0,3600",
            "2,30.1,40.1,3700",
        ]);
        let report = run_pipeline(file.path().to_path_buf(), 2).await.unwrap();
        let mut lines = report.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Time of Day,1 km,2 km,3 km,5 km,8 km,13 km,21 km,21+ km"
        );
        assert_eq!(lines.count(), 24);
    }

    #[tokio::test]
    async fn single_sample_rides_are_silently_dropped() {
        // Every ride below has exactly one row, so no RideSummary is ever
        // produced and the whole report should come back all zeros.
        let file = write_csv(&["1,10.0,20.0,0", "2,11.0,21.0,10", "3,12.0,22.0,20"]);
        let report = run_pipeline(file.path().to_path_buf(), 3).await.unwrap();
        for line in report.lines().skip(1) {
            assert!(line.ends_with(",0s,0s,0s,0s,0s,0s,0s,0s"), "line was {line:?}");
        }
    }

    #[tokio::test]
    async fn output_is_identical_across_concurrency_levels() {
        let mut lines = Vec::new();
        let mut ts = 0i64;
        for ride_id in 1..=20i64 {
            for sample in 0..5 {
                lines.push(format!(
                    "{ride_id},{:.4},{:.4},{ts}",
                    10.0 + sample as f64 * 0.01,
                    20.0 + sample as f64 * 0.01
                ));
                ts += 60;
            }
        }
        let lines_ref: Vec<&str> = lines.iter().map(String::as_str).collect();
        let file = write_csv(&lines_ref);

        let mut reports = Vec::new();
        for concurrency in [1usize, 2, 3, 5, 7] {
            reports.push(run_pipeline(file.path().to_path_buf(), concurrency).await.unwrap());
        }
        for r in &reports[1..] {
            assert_eq!(&reports[0], r);
        }
    }

    #[tokio::test]
    async fn missing_input_file_is_an_error() {
        let err = run_pipeline(PathBuf::from("/no/such/file.csv"), 2).await.unwrap_err();
        assert_eq!(err.kind(), base::ErrorKind::Io);
    }
}
