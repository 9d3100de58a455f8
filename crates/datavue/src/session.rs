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

use crate::config::{Aggregation, ChartConfig, ChartType, FilterValue, RowFilter};
use crate::dataset::{Dataset, Row};
use crate::error::{SessionError, SessionResult};
use crate::processor;
use crate::stats::{self, ColumnStatistics};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::info;

/// Everything the external renderer needs to draw one chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    pub rows: Vec<Row>,
    pub chart_type: ChartType,
    pub x_axis: String,
    pub y_axis: String,
    pub title: String,
}

/// One upload-and-query session. Holds at most one dataset and at most
/// one applied configuration; processed rows and statistics are always
/// recomputed from those, never cached.
#[derive(Default)]
pub struct Session {
    dataset: Option<Dataset>,
    config: Option<ChartConfig>,
    query_in_flight: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the dataset wholesale. A configuration validated against
    /// the previous headers is meaningless now, so it is cleared too.
    pub fn load_dataset(&mut self, dataset: Dataset) {
        info!(
            "Loaded dataset: {} rows, {} columns",
            dataset.row_count(),
            dataset.column_count()
        );
        self.dataset = Some(dataset);
        self.config = None;
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn config(&self) -> Option<&ChartConfig> {
        self.config.as_ref()
    }

    pub fn row_count(&self) -> usize {
        self.dataset.as_ref().map_or(0, Dataset::row_count)
    }

    pub fn column_count(&self) -> usize {
        self.dataset.as_ref().map_or(0, Dataset::column_count)
    }

    /// Mark a query as submitted. At most one query runs at a time, and
    /// a query without a dataset has nothing to run against.
    pub fn begin_query(&mut self) -> SessionResult<&Dataset> {
        if self.query_in_flight {
            return Err(SessionError::QueryInFlight);
        }
        let dataset = self.dataset.as_ref().ok_or(SessionError::NoDataset)?;
        self.query_in_flight = true;
        Ok(dataset)
    }

    /// Apply the configuration produced by a successful interpretation
    /// and release the in-flight flag.
    pub fn finish_query(&mut self, config: ChartConfig) {
        self.config = Some(config);
        self.query_in_flight = false;
    }

    /// Release the in-flight flag after a failed interpretation. The
    /// previous configuration, if any, stays applied.
    pub fn abort_query(&mut self) {
        self.query_in_flight = false;
    }

    /// Run the applied configuration over the current dataset.
    pub fn processed_rows(&self) -> SessionResult<Vec<Row>> {
        let dataset = self.dataset.as_ref().ok_or(SessionError::NoDataset)?;
        let config = self.config.as_ref().ok_or(SessionError::NoConfiguration)?;
        Ok(processor::process(dataset, config))
    }

    pub fn statistics(&self) -> SessionResult<IndexMap<String, ColumnStatistics>> {
        let dataset = self.dataset.as_ref().ok_or(SessionError::NoDataset)?;
        Ok(stats::summarise(dataset))
    }

    /// Package the processed rows and the validated configuration for
    /// the external renderer.
    pub fn render_request(&self) -> SessionResult<RenderRequest> {
        let rows = self.processed_rows()?;
        let config = self.config.as_ref().ok_or(SessionError::NoConfiguration)?;
        Ok(RenderRequest {
            rows,
            chart_type: config.chart_type,
            x_axis: config.x_axis.clone(),
            y_axis: config.y_axis.clone(),
            title: config.title.clone(),
        })
    }

    /// Human-readable description of the applied filter and aggregation
    /// for the result panel. Empty when the configuration has neither.
    pub fn caption(&self) -> String {
        let Some(config) = self.config.as_ref() else {
            return String::new();
        };
        let mut parts = Vec::new();
        if let Some(filter) = &config.filter {
            parts.push(describe_filter(filter));
        }
        if let Some(aggregation) = &config.aggregation {
            parts.push(describe_aggregation(aggregation, &config.y_axis));
        }
        parts.join("; ")
    }
}

fn describe_filter(filter: &RowFilter) -> String {
    let value = match &filter.value {
        FilterValue::Number(n) => n.to_string(),
        FilterValue::Text(s) => s.clone(),
        FilterValue::Range(lo, hi) => format!("[{}, {}]", lo, hi),
    };
    format!(
        "Filtered: {} {} {}",
        filter.column,
        filter.operator.as_str(),
        value
    )
}

fn describe_aggregation(aggregation: &Aggregation, y_axis: &str) -> String {
    let column = aggregation.column.as_deref().unwrap_or(y_axis);
    match &aggregation.group_by {
        Some(group) => format!(
            "Aggregated: {} of {} by {}",
            aggregation.kind.as_str(),
            column,
            group
        ),
        None => format!("Aggregated: {} of {}", aggregation.kind.as_str(), column),
    }
}
