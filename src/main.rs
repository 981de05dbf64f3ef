// SPDX-License-Identifier: MIT OR Apache-2.0

use base::Error;
use bpaf::Bpaf;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

mod aggregator;
mod cancel;
mod folder;
mod geo;
mod pipeline;
mod reader;
mod report;
mod row;
#[cfg(test)]
mod testutil;

const DEFAULT_INPUT_FILE: &str = "recorded_rides.csv";
const DEFAULT_OUTPUT_FILE: &str = "statistics.csv";
const DEFAULT_CONCURRENCY: usize = 64;

/// Computes 95th-percentile ride durations bucketed by hour of day and
/// distance band from a CSV of GPS fixes.
#[derive(Bpaf, Debug)]
#[bpaf(options, version(env!("CARGO_PKG_VERSION")))]
struct Args {
    /// Number of chunks to split the input into, and of worker threads in
    /// the async runtime.
    #[bpaf(long, fallback(DEFAULT_CONCURRENCY))]
    concurrency: usize,

    /// CSV file of `rideId,lat,lng,unixSeconds` rows, sorted by ride start.
    #[bpaf(positional("INPUT"), fallback(DEFAULT_INPUT_FILE.into()))]
    input_file: PathBuf,

    /// Where to write the rendered report.
    #[bpaf(positional("OUTPUT"), fallback(DEFAULT_OUTPUT_FILE.into()))]
    output_file: PathBuf,
}

fn run(args: Args) -> Result<i32, Error> {
    if args.concurrency < 1 {
        base::bail_t!(Usage, "concurrency parameter must be a positive number");
    }
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.worker_threads(args.concurrency);
    let report = builder
        .enable_all()
        .build()
        .unwrap()
        .block_on(pipeline::run_pipeline(args.input_file, args.concurrency))?;
    std::fs::write(&args.output_file, report)
        .map_err(|e| base::format_err_t!(Io, "can't write {:?}: {e}", args.output_file))?;
    Ok(0)
}

fn main() {
    // If using the clock will fail, find out now *before* trying to log
    // anything (with timestamps...) so we can print a helpful error.
    if let Err(e) = nix::time::clock_gettime(nix::time::ClockId::CLOCK_MONOTONIC) {
        eprintln!(
            "clock_gettime failed: {e}\n\n\
             This indicates a broken environment. See the troubleshooting guide."
        );
        std::process::exit(1);
    }

    base::tracing_setup::install();

    // Get the program name from the OS (e.g. if invoked as `target/debug/ridestats`:
    // `ridestats`), falling back to the crate name if conversion to a
    // path/UTF-8 string fails. `bpaf`'s default logic is similar but
    // doesn't have the fallback.
    let progname = std::env::args_os().next().map(PathBuf::from);
    let progname = progname
        .as_deref()
        .and_then(Path::file_name)
        .and_then(OsStr::to_str)
        .unwrap_or(env!("CARGO_PKG_NAME"));

    let args = match args()
        .fallback_to_usage()
        .run_inner(bpaf::Args::current_args().set_name(progname))
    {
        Ok(a) => a,
        Err(e) => std::process::exit(e.exit_code()),
    };
    tracing::trace!("Parsed command-line arguments: {args:#?}");

    match run(args) {
        Err(e) => {
            error!(err = %e.chain(), "exiting due to error");
            std::process::exit(1);
        }
        Ok(rv) => {
            debug!("exiting with status {}", rv);
            std::process::exit(rv)
        }
    }
}
