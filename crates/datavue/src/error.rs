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

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatavueError {
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Query interpretation error: {0}")]
    Interpreter(#[from] InterpreterError),
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Errors raised while building a [`crate::dataset::Dataset`] from parser
/// output. Malformed file contents are the parser's concern, not ours;
/// these cover only the header invariants the core relies on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatasetError {
    #[error("Dataset has no columns")]
    NoHeaders,
    #[error("Blank column name at position {0}")]
    BlankHeader(usize),
    #[error("Duplicate column name: '{0}'")]
    DuplicateHeader(String),
}

/// Validator failures for a candidate chart configuration. Surfaced
/// verbatim to the user; an invalid configuration never reaches the row
/// processor or the renderer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Chart configuration is missing required field '{0}'")]
    MissingField(&'static str),
    #[error("Unsupported chart type: '{0}'")]
    UnsupportedChartType(String),
    #[error("Column '{0}' not found in dataset")]
    UnknownColumn(String),
}

#[derive(Error, Debug)]
pub enum InterpreterError {
    #[error("Interpreter returned no content")]
    EmptyResponse,
    #[error("Failed to parse interpreter output as a chart configuration: {reason}")]
    MalformedResponse { reason: String },
    #[error("Query interpretation failed: {0}")]
    Capability(#[from] datavue_llm::LlmError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("A query is already in flight")]
    QueryInFlight,
    #[error("No dataset has been loaded")]
    NoDataset,
    #[error("No chart configuration has been applied")]
    NoConfiguration,
}

pub type Result<T> = std::result::Result<T, DatavueError>;
pub type DatasetResult<T> = std::result::Result<T, DatasetError>;
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;
pub type InterpreterResult<T> = std::result::Result<T, InterpreterError>;
pub type SessionResult<T> = std::result::Result<T, SessionError>;

impl DatavueError {
    pub fn category(&self) -> &'static str {
        match self {
            DatavueError::Dataset(_) => "Dataset",
            DatavueError::Validation(_) => "Validation",
            DatavueError::Interpreter(_) => "Interpreter",
            DatavueError::Session(_) => "Session",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            DatavueError::Interpreter(InterpreterError::EmptyResponse) => {
                "The query service returned an empty response. Please try again.".to_string()
            }
            DatavueError::Interpreter(InterpreterError::MalformedResponse { .. }) => {
                "The query could not be turned into a chart configuration. Try rephrasing it."
                    .to_string()
            }
            DatavueError::Session(SessionError::NoDataset) => {
                "Upload a spreadsheet before submitting a query.".to_string()
            }
            _ => self.to_string(),
        }
    }
}
