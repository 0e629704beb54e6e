// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Terminal styling helpers for the query loop.
//!
//! Raw ANSI escapes, switched off when stdout is not a TTY.

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";
pub const CYAN: &str = "\x1b[36m";

/// Wrap `text` in a style code when stdout is a terminal.
pub fn styled(code: &str, text: &str) -> String {
    if atty::is(atty::Stream::Stdout) {
        format!("{}{}{}", code, text, RESET)
    } else {
        text.to_string()
    }
}

/// Milliseconds with two decimals from a nanosecond count.
pub fn timing_ms(nanos: u128) -> String {
    format!("{:.2} ms", nanos as f64 / 1e6)
}

/// One ranked result line: rank, url, optional title.
pub fn result_row(rank: usize, url: &str, title: &str) -> String {
    let title = title.trim();
    if title.is_empty() {
        format!("  {:>2}. {}", rank, styled(CYAN, url))
    } else {
        format!(
            "  {:>2}. {} {}",
            rank,
            styled(CYAN, url),
            styled(DIM, &format!("({})", title))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_formats_milliseconds() {
        assert_eq!(timing_ms(1_500_000), "1.50 ms");
    }

    #[test]
    fn result_row_contains_rank_and_url() {
        let row = result_row(3, "http://a.test/", "");
        assert!(row.contains("3."));
        assert!(row.contains("http://a.test/"));
    }
}
