// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::Write as _;

/// Encodes a non-negative duration in seconds into human-readable form:
/// `0s` for zero, otherwise the shortest of `NhNmNs`, `NmNs`, or `Ns` that
/// still names every unit coarser than the smallest one present.
pub fn encode_duration(total_secs: i64) -> String {
    if total_secs <= 0 {
        return "0s".to_string();
    }
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    let mut encoded = String::new();
    if hours > 0 {
        write!(&mut encoded, "{hours}h{minutes}m{seconds}s").unwrap();
    } else if minutes > 0 {
        write!(&mut encoded, "{minutes}m{seconds}s").unwrap();
    } else {
        write!(&mut encoded, "{seconds}s").unwrap();
    }
    encoded
}
