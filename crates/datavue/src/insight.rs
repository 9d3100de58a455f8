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

//! Narrative insight generation. This path is decorative: failures
//! degrade to a fixed fallback string instead of propagating, unlike
//! the query-interpretation path.

use crate::interpreter::GenerationSettings;
use crate::stats::{self, ColumnStatistics};
use datavue_llm::{ApiClient, ChatRequest, Message};
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::warn;

/// Shown whenever insight generation fails for any reason.
pub const INSIGHT_FALLBACK: &str = "Unable to generate insights at this time.";

const SYSTEM_PROMPT: &str =
    "You are a data analyst. Provide clear, concise insights about the data in 3-4 sentences.";

pub struct InsightGenerator {
    client: Arc<dyn ApiClient>,
    settings: GenerationSettings,
}

impl InsightGenerator {
    pub fn new(client: Arc<dyn ApiClient>, settings: GenerationSettings) -> Self {
        Self { client, settings }
    }

    /// Produce a short narrative summary of the column statistics.
    /// Returns `None` when there is nothing numeric to talk about, and
    /// the fallback text when the capability call fails.
    pub async fn generate(
        &self,
        statistics: &IndexMap<String, ColumnStatistics>,
    ) -> Option<String> {
        if statistics.is_empty() {
            return None;
        }

        let request = ChatRequest::new(
            self.settings.model.clone(),
            vec![
                Message::system(SYSTEM_PROMPT),
                Message::user(insight_prompt(statistics)),
            ],
        )
        .with_temperature(self.settings.temperature)
        .with_max_tokens(self.settings.max_tokens);

        match self.client.send_request(request).await {
            Ok(response) => {
                let content = response.content.trim();
                if content.is_empty() {
                    warn!("Insight generation returned empty content");
                    Some(INSIGHT_FALLBACK.to_string())
                } else {
                    Some(content.to_string())
                }
            }
            Err(e) => {
                warn!("Insight generation failed: {}", e);
                Some(INSIGHT_FALLBACK.to_string())
            }
        }
    }
}

fn insight_prompt(statistics: &IndexMap<String, ColumnStatistics>) -> String {
    format!(
        "Given this statistical summary of my dataset:\n{}\n\n\
         Provide a concise but insightful analysis of the data.",
        stats::describe(statistics)
    )
}
