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

//! The boundary between a natural-language query and a validated chart
//! configuration. The external inference capability is untrusted input:
//! its output is cleaned, parsed and validated before anything downstream
//! sees it.

use crate::config::{self, CandidateConfig, ChartConfig};
use crate::error::{InterpreterError, InterpreterResult};
use datavue_llm::{ApiClient, ChatRequest, Message};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, warn};

/// Trailing commas before a closing brace or bracket, the most common
/// way model output misses strict JSON.
static TRAILING_COMMA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",(\s*[}\]])").expect("valid trailing-comma pattern"));

/// Generation settings shared by the query and insight calls. Explicit
/// and constructor-injected; there is no load-time environment check.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: datavue_llm::client::DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            max_tokens: 300,
        }
    }
}

pub struct QueryInterpreter {
    client: Arc<dyn ApiClient>,
    settings: GenerationSettings,
}

impl QueryInterpreter {
    pub fn new(client: Arc<dyn ApiClient>, settings: GenerationSettings) -> Self {
        Self { client, settings }
    }

    /// Turn a user query plus the dataset's headers into a validated
    /// chart configuration. Failures on this path surface verbatim:
    /// a wrong configuration must never drive the renderer.
    pub async fn interpret(
        &self,
        query: &str,
        headers: &[String],
    ) -> InterpreterResult<ChartConfig> {
        let request = ChatRequest::new(
            self.settings.model.clone(),
            vec![
                Message::system(SYSTEM_PROMPT),
                Message::user(user_prompt(query, headers)),
            ],
        )
        .with_temperature(self.settings.temperature)
        .with_max_tokens(self.settings.max_tokens);

        debug!(
            "Interpreting query via {} ({})",
            self.client.provider_name(),
            self.settings.model
        );
        let response = self.client.send_request(request).await?;

        let content = response.content.trim();
        if content.is_empty() {
            return Err(InterpreterError::EmptyResponse);
        }

        let cleaned = clean_response(content);
        let candidate: CandidateConfig = serde_json::from_str(&cleaned).map_err(|e| {
            warn!("Interpreter output failed to parse: {}", cleaned);
            InterpreterError::MalformedResponse {
                reason: e.to_string(),
            }
        })?;

        Ok(config::validate(candidate, headers)?)
    }
}

/// Strip Markdown code fences and repair trailing commas so near-valid
/// model output still parses.
pub fn clean_response(text: &str) -> String {
    let unfenced = strip_code_fence(text);
    TRAILING_COMMA_RE.replace_all(&unfenced, "$1").into_owned()
}

/// If the text contains a fenced code block, return the first block's
/// content (any language tag); otherwise return the text unchanged.
fn strip_code_fence(text: &str) -> String {
    if !text.contains("```") {
        return text.trim().to_string();
    }

    let mut lines = text.lines();
    while let Some(line) = lines.next() {
        if line.trim().starts_with("```") {
            let mut content = String::new();
            for inner in lines.by_ref() {
                if inner.trim().starts_with("```") {
                    return content.trim().to_string();
                }
                if !content.is_empty() {
                    content.push('\n');
                }
                content.push_str(inner);
            }
            // Unterminated fence: take what followed the opener.
            return content.trim().to_string();
        }
    }
    text.trim().to_string()
}

const SYSTEM_PROMPT: &str = "You are a data visualization expert. Analyze the query and respond \
     with a JSON object that includes visualization configuration and data \
     processing instructions. The response should be ONLY JSON, no other text.";

fn user_prompt(query: &str, headers: &[String]) -> String {
    format!(
        r#"Given a dataset with columns [{columns}] and the query: "{query}"

Respond with a JSON object that includes:
1. Chart configuration
2. Data filtering conditions (if needed)
3. Data aggregation instructions (if needed)

Use this exact format:
{{
  "chartType": "line|bar|scatter|pie",
  "xAxis": "<column name>",
  "yAxis": "<column name>",
  "title": "<descriptive title>",
  "filter": {{
    "column": "<column name>",
    "operator": "gt|lt|eq|gte|lte|between",
    "value": <number or [min, max] for between>
  }},
  "aggregation": {{
    "type": "count|sum|average|max|min",
    "column": "<column to aggregate>",
    "groupBy": "<column to group by>"
  }}
}}

Examples of query interpretation:
1. "Show students who scored above 90" -> filter scores > 90
2. "Average scores by grade" -> aggregate average scores grouped by grade
3. "Count of students by grade with scores above 80" -> filter scores > 80, count students grouped by grade

Note: Only include filter and aggregation if relevant to the query."#,
        columns = headers.join(", "),
        query = query
    )
}
