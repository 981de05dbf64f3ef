// SPDX-License-Identifier: MIT OR Apache-2.0

//! Renders a [`Matrix`] as the final CSV report.

use crate::aggregator::Matrix;
use std::fmt::Write as _;

const HEADER: &str = "Time of Day,1 km,2 km,3 km,5 km,8 km,13 km,21 km,21+ km";

/// Renders the 24×8 matrix as CSV: a fixed header row, then 24 `HH:00` rows.
pub fn render(matrix: &Matrix) -> String {
    let mut out = String::new();
    out.push_str(HEADER);
    out.push('\n');
    for (hour, row) in matrix.p95.iter().enumerate() {
        write!(&mut out, "{hour:02}:00").unwrap();
        for &duration_s in row {
            out.push(',');
            out.push_str(&base::duration::encode_duration(duration_s));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{HOURS, NUM_BANDS};

    #[test]
    fn renders_header_and_24_rows() {
        let matrix = Matrix { p95: [[0i64; NUM_BANDS]; HOURS] };
        let rendered = render(&matrix);
        let mut lines = rendered.lines();
        assert_eq!(lines.next().unwrap(), HEADER);
        assert_eq!(lines.clone().count(), 24);
        assert_eq!(lines.next().unwrap(), "00:00,0s,0s,0s,0s,0s,0s,0s,0s");
    }

    #[test]
    fn formats_hours_zero_padded_and_durations_human_readable() {
        let mut p95 = [[0i64; NUM_BANDS]; HOURS];
        p95[5][0] = 700;
        p95[23][7] = 3600;
        let matrix = Matrix { p95 };
        let rendered = render(&matrix);
        let row5 = rendered.lines().nth(6).unwrap(); // header + hours 0..4 = 6 lines before
        assert_eq!(row5, "05:00,11m40s,0s,0s,0s,0s,0s,0s,0s");
        let row23 = rendered.lines().last().unwrap();
        assert_eq!(row23, "23:00,0s,0s,0s,0s,0s,0s,0s,1h0m0s");
    }
}
