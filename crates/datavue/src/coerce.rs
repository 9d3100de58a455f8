// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

//! The single numeric-coercion primitive. Every comparison and aggregation
//! in the pipeline routes through [`parse_number`] so that "is this cell a
//! number" means exactly one thing everywhere.

/// Best-effort parse of a leading numeric prefix, ignoring trailing
/// garbage: `"12abc"` parses as 12, `"  3.5e2m"` as 350. Empty and
/// non-numeric input yield `None`.
pub fn parse_number(input: &str) -> Option<f64> {
    let s = input.trim_start();
    let bytes = s.as_bytes();
    let len = bytes.len();
    let mut i = 0;

    if i < len && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }

    let mut seen_digit = false;
    while i < len && bytes[i].is_ascii_digit() {
        i += 1;
        seen_digit = true;
    }
    if i < len && bytes[i] == b'.' {
        i += 1;
        while i < len && bytes[i].is_ascii_digit() {
            i += 1;
            seen_digit = true;
        }
    }
    if !seen_digit {
        return None;
    }

    // An exponent only counts if at least one digit follows it.
    if i < len && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < len && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < len && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }

    s[..i].parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_integers_and_floats() {
        assert_eq!(parse_number("100"), Some(100.0));
        assert_eq!(parse_number("-2.5"), Some(-2.5));
        assert_eq!(parse_number("+0.25"), Some(0.25));
        assert_eq!(parse_number(".5"), Some(0.5));
    }

    #[test]
    fn parses_leading_numeric_prefix() {
        assert_eq!(parse_number("12abc"), Some(12.0));
        assert_eq!(parse_number("  3.5e2m"), Some(350.0));
        assert_eq!(parse_number("7."), Some(7.0));
    }

    #[test]
    fn exponent_without_digits_is_ignored() {
        assert_eq!(parse_number("2e"), Some(2.0));
        assert_eq!(parse_number("2e+"), Some(2.0));
        assert_eq!(parse_number("2e3"), Some(2000.0));
    }

    #[test]
    fn non_numeric_input_fails_uniformly() {
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("   "), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("-"), None);
        assert_eq!(parse_number("."), None);
        assert_eq!(parse_number("e5"), None);
    }
}
