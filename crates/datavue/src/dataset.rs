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

use crate::coerce::parse_number;
use crate::error::{DatasetError, DatasetResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A raw cell value as produced by the external file parser. Everything
/// the parser cannot represent as a number or a string lands on `Null`,
/// and the pipeline treats null, undefined and missing uniformly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Null,
}

impl CellValue {
    /// Coerce to a number through the shared primitive. `None` means
    /// "not a number" for every stage of the pipeline.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => parse_number(s),
            CellValue::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Null, or an empty string. Rows with a blank axis cell never reach
    /// the renderer.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Text(s) => s.is_empty(),
            CellValue::Number(_) => false,
        }
    }

    /// Display rendering used for group keys and captions. Whole numbers
    /// print without a trailing `.0` so keys read like the source data.
    pub fn display(&self) -> String {
        match self {
            CellValue::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            CellValue::Text(s) => s.clone(),
            CellValue::Null => String::new(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

/// One record, keyed by header name in header order.
pub type Row = IndexMap<String, CellValue>;

/// An in-memory table as handed over by the external file parser: unique
/// ordered headers plus rows re-keyed by header name. Row order is
/// significant and preserved by every read-only transformation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Dataset {
    /// Build a dataset from pre-keyed rows. Header invariants are still
    /// enforced; row keys outside `headers` are rejected upstream by
    /// construction in [`Dataset::from_parsed`].
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> DatasetResult<Self> {
        Self::check_headers(&headers)?;
        Ok(Self { headers, rows })
    }

    /// Re-key positional parser output by header name. Missing trailing
    /// cells become `Null`; surplus cells beyond the header count are
    /// dropped, matching what the upload widget feeds us.
    pub fn from_parsed(headers: Vec<String>, records: Vec<Vec<String>>) -> DatasetResult<Self> {
        Self::check_headers(&headers)?;

        let rows = records
            .into_iter()
            .map(|record| {
                headers
                    .iter()
                    .enumerate()
                    .map(|(i, header)| {
                        let cell = record
                            .get(i)
                            .map(|v| CellValue::Text(v.clone()))
                            .unwrap_or(CellValue::Null);
                        (header.clone(), cell)
                    })
                    .collect()
            })
            .collect();

        Ok(Self { headers, rows })
    }

    fn check_headers(headers: &[String]) -> DatasetResult<()> {
        if headers.is_empty() {
            return Err(DatasetError::NoHeaders);
        }
        let mut seen = HashSet::new();
        for (i, header) in headers.iter().enumerate() {
            if header.trim().is_empty() {
                return Err(DatasetError::BlankHeader(i));
            }
            if !seen.insert(header.as_str()) {
                return Err(DatasetError::DuplicateHeader(header.clone()));
            }
        }
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_parsed_rekeys_by_header() {
        let dataset = Dataset::from_parsed(
            vec!["region".to_string(), "sales".to_string()],
            vec![
                vec!["East".to_string(), "100".to_string()],
                vec!["West".to_string(), "200".to_string()],
            ],
        )
        .unwrap();

        assert_eq!(dataset.row_count(), 2);
        assert_eq!(dataset.rows[0]["region"], CellValue::from("East"));
        assert_eq!(dataset.rows[1]["sales"], CellValue::from("200"));
    }

    #[test]
    fn short_records_pad_with_null() {
        let dataset = Dataset::from_parsed(
            vec!["a".to_string(), "b".to_string()],
            vec![vec!["1".to_string()]],
        )
        .unwrap();

        assert_eq!(dataset.rows[0]["b"], CellValue::Null);
    }

    #[test]
    fn header_invariants_are_enforced() {
        assert_eq!(
            Dataset::from_parsed(vec![], vec![]),
            Err(DatasetError::NoHeaders)
        );
        assert_eq!(
            Dataset::from_parsed(vec!["a".to_string(), "a".to_string()], vec![]),
            Err(DatasetError::DuplicateHeader("a".to_string()))
        );
        assert_eq!(
            Dataset::from_parsed(vec!["a".to_string(), " ".to_string()], vec![]),
            Err(DatasetError::BlankHeader(1))
        );
    }

    #[test]
    fn cell_display_renders_whole_numbers_without_fraction() {
        assert_eq!(CellValue::Number(100.0).display(), "100");
        assert_eq!(CellValue::Number(2.5).display(), "2.5");
        assert_eq!(CellValue::Null.display(), "");
    }
}
