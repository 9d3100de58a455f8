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

//! Datavue core: turn an uploaded table plus a natural-language query
//! into a validated chart configuration and the rows to draw it with.
//!
//! The pipeline runs in fixed stages: parse and re-key the upload into a
//! [`dataset::Dataset`], interpret the query into a
//! [`config::ChartConfig`] through the untrusted-output adapter in
//! [`interpreter`], then let [`processor::process`] filter, aggregate,
//! coerce and prune the rows. [`session::Session`] ties the stages to
//! one upload-and-query lifecycle.

pub mod coerce;
pub mod config;
pub mod dataset;
pub mod error;
pub mod insight;
pub mod interpreter;
pub mod processor;
pub mod session;
pub mod stats;

pub use coerce::parse_number;
pub use config::{
    Aggregation, AggregationType, CandidateConfig, ChartConfig, ChartType, FilterOperator,
    FilterValue, RowFilter,
};
pub use dataset::{CellValue, Dataset, Row};
pub use error::{
    DatasetError, DatavueError, InterpreterError, Result, SessionError, ValidationError,
};
pub use insight::{InsightGenerator, INSIGHT_FALLBACK};
pub use interpreter::{GenerationSettings, QueryInterpreter};
pub use session::{RenderRequest, Session};
pub use stats::ColumnStatistics;
