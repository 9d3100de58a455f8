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

//! The deterministic row-processing pipeline: filter, aggregate, coerce,
//! prune, in that fixed order. Pure function of its inputs; per-cell
//! coercion failures exclude the cell or row rather than aborting the
//! whole visualisation.

use crate::coerce::parse_number;
use crate::config::{Aggregation, AggregationType, ChartConfig, FilterOperator, FilterValue, RowFilter};
use crate::dataset::{CellValue, Dataset, Row};
use indexmap::IndexMap;
use tracing::debug;

/// Literal group key used when an aggregation has no `group_by` column.
const TOTAL_GROUP_KEY: &str = "total";

/// Key under which the group label lands when there is no `group_by`.
const DEFAULT_GROUP_FIELD: &str = "group";

/// Transform raw rows into chart-ready rows according to a validated
/// configuration. Safe to call any number of times on unchanged inputs;
/// the output is identical each time.
pub fn process(dataset: &Dataset, config: &ChartConfig) -> Vec<Row> {
    let mut rows: Vec<Row> = dataset.rows.clone();

    if let Some(filter) = &config.filter {
        let before = rows.len();
        rows.retain(|row| row_passes(row, filter));
        debug!(
            "Filter on '{}' kept {} of {} rows",
            filter.column,
            rows.len(),
            before
        );
    }

    if let Some(aggregation) = &config.aggregation {
        rows = aggregate(&rows, aggregation, &config.y_axis);
        debug!(
            "Aggregation ({}) produced {} group rows",
            aggregation.kind.as_str(),
            rows.len()
        );
    }

    for row in &mut rows {
        coerce_row(row, &dataset.headers);
    }

    rows.retain(|row| axis_present(row, &config.x_axis) && axis_present(row, &config.y_axis));
    rows
}

fn row_passes(row: &Row, filter: &RowFilter) -> bool {
    let Some(value) = row.get(&filter.column).and_then(CellValue::as_f64) else {
        return false;
    };
    if value.is_nan() {
        return false;
    }

    match filter.operator {
        FilterOperator::Between => match filter.value {
            // Inclusive at both ends.
            FilterValue::Range(min, max) => min <= value && value <= max,
            // `between` without a pair has no sensible reading; nothing
            // passes rather than guessing.
            _ => false,
        },
        op => {
            let Some(threshold) = scalar_threshold(&filter.value) else {
                return false;
            };
            match op {
                FilterOperator::Gt => value > threshold,
                FilterOperator::Lt => value < threshold,
                // Exact float equality after coercion.
                FilterOperator::Eq => value == threshold,
                FilterOperator::Gte => value >= threshold,
                FilterOperator::Lte => value <= threshold,
                FilterOperator::Between => unreachable!(),
            }
        }
    }
}

fn scalar_threshold(value: &FilterValue) -> Option<f64> {
    match value {
        FilterValue::Number(n) => Some(*n),
        FilterValue::Text(s) => parse_number(s),
        FilterValue::Range(..) => None,
    }
}

fn aggregate(rows: &[Row], aggregation: &Aggregation, y_axis: &str) -> Vec<Row> {
    let value_column = aggregation.column.as_deref().unwrap_or(y_axis);

    // First-seen key order; membership preserves source row order.
    let mut groups: IndexMap<String, Vec<f64>> = IndexMap::new();
    for row in rows {
        let key = match &aggregation.group_by {
            Some(group_by) => row
                .get(group_by)
                .map(CellValue::display)
                .unwrap_or_default(),
            None => TOTAL_GROUP_KEY.to_string(),
        };

        let entry = groups.entry(key).or_default();
        if let Some(value) = row.get(value_column).and_then(CellValue::as_f64) {
            if !value.is_nan() {
                entry.push(value);
            }
        }
    }

    let group_field = aggregation
        .group_by
        .clone()
        .unwrap_or_else(|| DEFAULT_GROUP_FIELD.to_string());

    groups
        .into_iter()
        .map(|(key, values)| {
            let reduced = reduce(aggregation.kind, &values);
            let mut row = Row::new();
            row.insert(group_field.clone(), CellValue::Text(key));
            row.insert(y_axis.to_string(), reduced);
            row
        })
        .collect()
}

/// Reduce a NaN-filtered value list. An empty list under average, max or
/// min yields `Null`; the pruning stage then drops that group, so no
/// degenerate aggregate ever reaches the renderer.
fn reduce(kind: AggregationType, values: &[f64]) -> CellValue {
    match kind {
        AggregationType::Count => CellValue::Number(values.len() as f64),
        AggregationType::Sum => CellValue::Number(values.iter().sum()),
        AggregationType::Average => {
            if values.is_empty() {
                CellValue::Null
            } else {
                CellValue::Number(values.iter().sum::<f64>() / values.len() as f64)
            }
        }
        AggregationType::Max => values
            .iter()
            .copied()
            .reduce(f64::max)
            .map(CellValue::Number)
            .unwrap_or(CellValue::Null),
        AggregationType::Min => values
            .iter()
            .copied()
            .reduce(f64::min)
            .map(CellValue::Number)
            .unwrap_or(CellValue::Null),
    }
}

/// Replace each cell with its numeric form where the coercion yields a
/// finite number; leave everything else untouched.
fn coerce_row(row: &mut Row, headers: &[String]) {
    for header in headers {
        if let Some(cell) = row.get_mut(header) {
            if let CellValue::Text(s) = cell {
                if let Some(n) = parse_number(s) {
                    if n.is_finite() {
                        *cell = CellValue::Number(n);
                    }
                }
            }
        }
    }
}

fn axis_present(row: &Row, axis: &str) -> bool {
    row.get(axis).is_some_and(|cell| !cell.is_blank())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChartType;

    fn dataset() -> Dataset {
        Dataset::from_parsed(
            vec!["region".to_string(), "sales".to_string()],
            vec![
                vec!["East".to_string(), "100".to_string()],
                vec!["West".to_string(), "200".to_string()],
                vec!["East".to_string(), "150".to_string()],
            ],
        )
        .unwrap()
    }

    fn config() -> ChartConfig {
        ChartConfig {
            chart_type: ChartType::Bar,
            x_axis: "region".to_string(),
            y_axis: "sales".to_string(),
            title: "t".to_string(),
            filter: None,
            aggregation: None,
        }
    }

    #[test]
    fn between_is_inclusive_at_both_bounds() {
        let mut cfg = config();
        cfg.filter = Some(RowFilter {
            column: "sales".to_string(),
            operator: FilterOperator::Between,
            value: FilterValue::Range(100.0, 150.0),
        });

        let rows = process(&dataset(), &cfg);
        let sales: Vec<f64> = rows
            .iter()
            .map(|r| r["sales"].as_f64().unwrap())
            .collect();
        assert_eq!(sales, vec![100.0, 150.0]);
    }

    #[test]
    fn string_threshold_is_coerced() {
        let mut cfg = config();
        cfg.filter = Some(RowFilter {
            column: "sales".to_string(),
            operator: FilterOperator::Gte,
            value: FilterValue::Text("150".to_string()),
        });

        let rows = process(&dataset(), &cfg);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn non_coercible_threshold_passes_nothing() {
        let mut cfg = config();
        cfg.filter = Some(RowFilter {
            column: "sales".to_string(),
            operator: FilterOperator::Gt,
            value: FilterValue::Text("abc".to_string()),
        });

        assert!(process(&dataset(), &cfg).is_empty());
    }

    #[test]
    fn eq_uses_exact_float_equality_after_coercion() {
        // Known sharp edge, preserved deliberately: 0.1 + 0.2 is not 0.3
        // in binary floating point, so an eq filter on the sum misses.
        let dataset = Dataset::new(
            vec!["x".to_string(), "v".to_string()],
            vec![Row::from_iter([
                ("x".to_string(), CellValue::from("a")),
                ("v".to_string(), CellValue::Number(0.1 + 0.2)),
            ])],
        )
        .unwrap();

        let mut cfg = config();
        cfg.x_axis = "x".to_string();
        cfg.y_axis = "v".to_string();
        cfg.filter = Some(RowFilter {
            column: "v".to_string(),
            operator: FilterOperator::Eq,
            value: FilterValue::Number(0.3),
        });

        assert!(process(&dataset, &cfg).is_empty());
    }

    #[test]
    fn ungrouped_aggregation_collapses_to_a_single_total_row() {
        let mut cfg = config();
        cfg.x_axis = "group".to_string();
        cfg.aggregation = Some(Aggregation {
            kind: AggregationType::Sum,
            column: None,
            group_by: None,
        });

        // "group" is not a dataset header, but the synthetic row carries
        // it, and pruning only inspects the configured axes.
        let dataset = dataset();
        let rows = aggregate(&dataset.rows, cfg.aggregation.as_ref().unwrap(), "sales");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["group"], CellValue::Text("total".to_string()));
        assert_eq!(rows[0]["sales"], CellValue::Number(450.0));
    }

    #[test]
    fn aggregated_rows_carry_exactly_two_fields() {
        let mut cfg = config();
        cfg.aggregation = Some(Aggregation {
            kind: AggregationType::Average,
            column: None,
            group_by: Some("region".to_string()),
        });

        let rows = process(&dataset(), &cfg);
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row.len(), 2);
        }
        assert_eq!(rows[0]["sales"], CellValue::Number(125.0));
    }

    #[test]
    fn empty_group_under_average_is_dropped() {
        // "n/a" never coerces, so the West group's value list is empty
        // and its Null aggregate is pruned.
        let dataset = Dataset::from_parsed(
            vec!["region".to_string(), "sales".to_string()],
            vec![
                vec!["East".to_string(), "100".to_string()],
                vec!["West".to_string(), "n/a".to_string()],
            ],
        )
        .unwrap();

        let mut cfg = config();
        cfg.aggregation = Some(Aggregation {
            kind: AggregationType::Average,
            column: None,
            group_by: Some("region".to_string()),
        });

        let rows = process(&dataset, &cfg);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["region"], CellValue::Text("East".to_string()));
    }

    #[test]
    fn count_of_empty_group_survives_as_zero_row() {
        // Count of an empty value list is 0, which is a perfectly
        // renderable number; only average/max/min degenerate.
        let dataset = Dataset::from_parsed(
            vec!["region".to_string(), "sales".to_string()],
            vec![vec!["West".to_string(), "n/a".to_string()]],
        )
        .unwrap();

        let mut cfg = config();
        cfg.aggregation = Some(Aggregation {
            kind: AggregationType::Count,
            column: None,
            group_by: Some("region".to_string()),
        });

        let rows = process(&dataset, &cfg);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["sales"], CellValue::Number(0.0));
    }

    #[test]
    fn blank_axis_rows_are_pruned() {
        let dataset = Dataset::from_parsed(
            vec!["region".to_string(), "sales".to_string()],
            vec![
                vec!["East".to_string(), "100".to_string()],
                vec!["".to_string(), "200".to_string()],
                vec!["West".to_string(), "".to_string()],
            ],
        )
        .unwrap();

        let rows = process(&dataset, &config());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["region"], CellValue::Text("East".to_string()));
    }

    #[test]
    fn surviving_cells_are_numerically_coerced() {
        let rows = process(&dataset(), &config());
        assert_eq!(rows[0]["sales"], CellValue::Number(100.0));
        assert_eq!(rows[0]["region"], CellValue::Text("East".to_string()));
    }
}
