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

use crate::error::{ValidationError, ValidationResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Line,
    Bar,
    Scatter,
    Pie,
}

impl ChartType {
    /// Case-insensitive parse from interpreter output.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "line" => Some(ChartType::Line),
            "bar" => Some(ChartType::Bar),
            "scatter" => Some(ChartType::Scatter),
            "pie" => Some(ChartType::Pie),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Line => "line",
            ChartType::Bar => "bar",
            ChartType::Scatter => "scatter",
            ChartType::Pie => "pie",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    Gt,
    Lt,
    Eq,
    Gte,
    Lte,
    Between,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Gt => "gt",
            FilterOperator::Lt => "lt",
            FilterOperator::Eq => "eq",
            FilterOperator::Gte => "gte",
            FilterOperator::Lte => "lte",
            FilterOperator::Between => "between",
        }
    }
}

/// Comparison threshold. `Range` is only meaningful under `between`,
/// where it carries the inclusive `[min, max]` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Number(f64),
    Text(String),
    Range(f64, f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowFilter {
    pub column: String,
    pub operator: FilterOperator,
    pub value: FilterValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationType {
    Count,
    Sum,
    Average,
    Max,
    Min,
}

impl AggregationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationType::Count => "count",
            AggregationType::Sum => "sum",
            AggregationType::Average => "average",
            AggregationType::Max => "max",
            AggregationType::Min => "min",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregation {
    #[serde(rename = "type")]
    pub kind: AggregationType,
    /// Column to aggregate; defaults to the y axis when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
}

/// A validated chart configuration. Only the validator constructs these,
/// so the processor and renderer can rely on the axes existing and the
/// chart type being drawable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    pub chart_type: ChartType,
    pub x_axis: String,
    pub y_axis: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<RowFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<Aggregation>,
}

/// The loosely-typed shape parsed straight off the interpreter's wire
/// output, before any validation. Filter and aggregation stay as raw
/// JSON here: they are best-effort extras, and a malformed sub-object
/// must not sink an otherwise usable configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CandidateConfig {
    pub chart_type: Option<String>,
    pub x_axis: Option<String>,
    pub y_axis: Option<String>,
    pub title: Option<String>,
    pub filter: Option<Value>,
    pub aggregation: Option<Value>,
}

/// Validate a candidate configuration against the dataset's headers.
///
/// Checks short-circuit in a fixed order: required fields, chart type,
/// x axis membership, y axis membership. Filter and aggregation
/// sub-fields are converted best-effort and otherwise left to the row
/// processor's apply-time defences.
pub fn validate(candidate: CandidateConfig, headers: &[String]) -> ValidationResult<ChartConfig> {
    let chart_type_raw = require_field(candidate.chart_type, "chartType")?;
    let x_axis = require_field(candidate.x_axis, "xAxis")?;
    let y_axis = require_field(candidate.y_axis, "yAxis")?;
    let title = require_field(candidate.title, "title")?;

    let chart_type = ChartType::parse(&chart_type_raw)
        .ok_or(ValidationError::UnsupportedChartType(chart_type_raw))?;

    if !headers.iter().any(|h| *h == x_axis) {
        return Err(ValidationError::UnknownColumn(x_axis));
    }
    if !headers.iter().any(|h| *h == y_axis) {
        return Err(ValidationError::UnknownColumn(y_axis));
    }

    let filter = candidate.filter.and_then(|v| best_effort::<RowFilter>(v, "filter"));
    let aggregation = candidate
        .aggregation
        .and_then(|v| best_effort::<Aggregation>(v, "aggregation"));

    Ok(ChartConfig {
        chart_type,
        x_axis,
        y_axis,
        title,
        filter,
        aggregation,
    })
}

fn require_field(value: Option<String>, name: &'static str) -> ValidationResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ValidationError::MissingField(name)),
    }
}

fn best_effort<T: serde::de::DeserializeOwned>(value: Value, what: &str) -> Option<T> {
    if value.is_null() {
        return None;
    }
    match serde_json::from_value(value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!("Dropping malformed {} from interpreter output: {}", what, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> Vec<String> {
        vec!["region".to_string(), "sales".to_string()]
    }

    fn candidate() -> CandidateConfig {
        CandidateConfig {
            chart_type: Some("bar".to_string()),
            x_axis: Some("region".to_string()),
            y_axis: Some("sales".to_string()),
            title: Some("Sales by region".to_string()),
            filter: None,
            aggregation: None,
        }
    }

    #[test]
    fn valid_candidate_passes() {
        let config = validate(candidate(), &headers()).unwrap();
        assert_eq!(config.chart_type, ChartType::Bar);
        assert_eq!(config.x_axis, "region");
    }

    #[test]
    fn chart_type_is_case_insensitive() {
        let mut c = candidate();
        c.chart_type = Some("BAR".to_string());
        assert_eq!(validate(c, &headers()).unwrap().chart_type, ChartType::Bar);
    }

    #[test]
    fn missing_fields_are_reported_before_anything_else() {
        let mut c = candidate();
        c.title = None;
        c.chart_type = Some("hexbin".to_string());
        assert_eq!(
            validate(c, &headers()),
            Err(ValidationError::MissingField("title"))
        );

        let mut c = candidate();
        c.x_axis = Some("  ".to_string());
        assert_eq!(
            validate(c, &headers()),
            Err(ValidationError::MissingField("xAxis"))
        );
    }

    #[test]
    fn unsupported_chart_type_is_rejected() {
        let mut c = candidate();
        c.chart_type = Some("hexbin".to_string());
        assert_eq!(
            validate(c, &headers()),
            Err(ValidationError::UnsupportedChartType("hexbin".to_string()))
        );
    }

    #[test]
    fn unknown_axis_is_rejected_even_when_everything_else_is_well_formed() {
        let mut c = candidate();
        c.x_axis = Some("profit".to_string());
        assert_eq!(
            validate(c, &headers()),
            Err(ValidationError::UnknownColumn("profit".to_string()))
        );

        let mut c = candidate();
        c.y_axis = Some("Region".to_string());
        assert_eq!(
            validate(c, &headers()),
            Err(ValidationError::UnknownColumn("Region".to_string()))
        );
    }

    #[test]
    fn malformed_filter_is_dropped_not_fatal() {
        let mut c = candidate();
        c.filter = Some(serde_json::json!({"column": "sales", "operator": "sideways"}));
        let config = validate(c, &headers()).unwrap();
        assert!(config.filter.is_none());
    }

    #[test]
    fn between_range_deserialises_from_a_pair() {
        let mut c = candidate();
        c.filter = Some(serde_json::json!({
            "column": "sales",
            "operator": "between",
            "value": [100, 200]
        }));
        let config = validate(c, &headers()).unwrap();
        assert_eq!(
            config.filter.unwrap().value,
            FilterValue::Range(100.0, 200.0)
        );
    }
}
