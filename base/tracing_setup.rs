// SPDX-License-Identifier: MIT OR Apache-2.0

//! Logic for setting up a `tracing` subscriber according to our preferences.

use tracing::error;
use tracing_subscriber::layer::SubscriberExt;

/// Custom panic hook that logs instead of directly writing to stderr.
fn panic_hook(p: &std::panic::PanicHookInfo) {
    let payload: Option<&str> = if let Some(s) = p.payload().downcast_ref::<&str>() {
        Some(*s)
    } else if let Some(s) = p.payload().downcast_ref::<String>() {
        Some(s)
    } else {
        None
    };
    error!(
        target: std::env!("CARGO_CRATE_NAME"),
        location = p.location().map(tracing::field::display),
        payload = payload.map(tracing::field::display),
        "panic",
    );
}

/// Installs a `tracing` subscriber reading verbosity from the `RIDESTATS_LOG`
/// environment variable (default level `info`), and a panic hook that routes
/// panics through `tracing` rather than writing straight to stderr.
pub fn install() {
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        .with_env_var("RIDESTATS_LOG")
        .from_env_lossy();
    tracing_log::LogTracer::init().unwrap();

    let sub = tracing_subscriber::registry().with(
        tracing_subscriber::fmt::Layer::new()
            .with_writer(std::io::stderr)
            .with_thread_names(true)
            .with_filter(filter),
    );
    tracing::subscriber::set_global_default(sub).unwrap();

    std::panic::set_hook(Box::new(&panic_hook));
}

/// Like [`install`], but writes to the test harness's captured output and
/// panics if called more than once per process (tests should call this at
/// most once, e.g. via `std::sync::Once`).
pub fn install_for_tests() {
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(tracing_subscriber::filter::LevelFilter::DEBUG.into())
        .with_env_var("RIDESTATS_LOG")
        .from_env_lossy();
    let _ = tracing_log::LogTracer::init();
    let sub = tracing_subscriber::registry().with(
        tracing_subscriber::fmt::Layer::new()
            .with_test_writer()
            .with_thread_names(true)
            .with_filter(filter),
    );
    let _ = tracing::subscriber::set_global_default(sub);
}
