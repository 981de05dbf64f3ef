// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared test-only setup, mirroring the teacher's `db::testutil::init`.

static INIT: std::sync::Once = std::sync::Once::new();

/// Installs a test-oriented `tracing` subscriber once per process. Safe to
/// call at the top of every test; later calls are no-ops.
pub fn init() {
    INIT.call_once(base::tracing_setup::install_for_tests);
}
