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

use crate::dataset::{CellValue, Dataset};
use indexmap::IndexMap;
use serde::Serialize;

/// Descriptive statistics for one numeric-coercible column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStatistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Total non-null values seen, numeric or not.
    pub count: usize,
    /// Values that actually coerced to a number.
    pub numeric_count: usize,
}

/// Compute per-column statistics for every column with at least one
/// numeric-coercible value, in header order. Columns with no numeric
/// content produce no entry at all.
pub fn summarise(dataset: &Dataset) -> IndexMap<String, ColumnStatistics> {
    let mut stats = IndexMap::new();

    for header in &dataset.headers {
        let mut count = 0usize;
        let mut numeric: Vec<f64> = Vec::new();

        for row in &dataset.rows {
            let Some(cell) = row.get(header) else {
                continue;
            };
            if !cell.is_null() {
                count += 1;
            }
            if let Some(value) = cell.as_f64() {
                if !value.is_nan() {
                    numeric.push(value);
                }
            }
        }

        if numeric.is_empty() {
            continue;
        }

        let sum: f64 = numeric.iter().sum();
        let mut sorted = numeric.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        stats.insert(
            header.clone(),
            ColumnStatistics {
                min: sorted[0],
                max: sorted[sorted.len() - 1],
                mean: sum / numeric.len() as f64,
                median: median_of_sorted(&sorted),
                count,
                numeric_count: numeric.len(),
            },
        );
    }

    stats
}

/// Flatten the statistics into the textual description used both for
/// display and as the prompt body for insight generation.
pub fn describe(stats: &IndexMap<String, ColumnStatistics>) -> String {
    stats
        .iter()
        .map(|(column, s)| {
            format!(
                "{}: min={:.2}, max={:.2}, mean={:.2}, median={:.2}, \
                 total values={}, numeric values={}",
                column, s.min, s.max, s.mean, s.median, s.count, s.numeric_count
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn median_of_sorted(sorted: &[f64]) -> f64 {
    let len = sorted.len();
    if len % 2 == 0 {
        (sorted[len / 2 - 1] + sorted[len / 2]) / 2.0
    } else {
        sorted[len / 2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(rows: Vec<Vec<&str>>) -> Dataset {
        Dataset::from_parsed(
            vec!["label".to_string(), "score".to_string()],
            rows.into_iter()
                .map(|r| r.into_iter().map(String::from).collect())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn median_of_even_length_list_averages_the_middle_pair() {
        let d = dataset(vec![
            vec!["a", "1"],
            vec!["b", "2"],
            vec!["c", "3"],
            vec!["d", "4"],
        ]);
        assert_eq!(summarise(&d)["score"].median, 2.5);
    }

    #[test]
    fn median_of_odd_length_list_is_the_middle_element() {
        let d = dataset(vec![vec!["a", "1"], vec!["b", "2"], vec!["c", "3"]]);
        assert_eq!(summarise(&d)["score"].median, 2.0);
    }

    #[test]
    fn non_numeric_columns_produce_no_entry() {
        let d = dataset(vec![vec!["a", "1"], vec!["b", "2"]]);
        let stats = summarise(&d);
        assert!(!stats.contains_key("label"));
        assert!(stats.contains_key("score"));
    }

    #[test]
    fn count_tracks_all_non_null_values_and_numeric_count_the_coercible_ones() {
        let d = dataset(vec![vec!["a", "10"], vec!["b", "n/a"], vec!["c", "30"]]);
        let s = &summarise(&d)["score"];
        assert_eq!(s.count, 3);
        assert_eq!(s.numeric_count, 2);
        assert_eq!(s.min, 10.0);
        assert_eq!(s.max, 30.0);
        assert_eq!(s.mean, 20.0);
    }

    #[test]
    fn describe_flattens_in_header_order() {
        let d = dataset(vec![vec!["a", "1"], vec!["b", "3"]]);
        let text = describe(&summarise(&d));
        assert_eq!(
            text,
            "score: min=1.00, max=3.00, mean=2.00, median=2.00, \
             total values=2, numeric values=2"
        );
    }
}
