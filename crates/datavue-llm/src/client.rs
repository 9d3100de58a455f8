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

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use crate::types::{ChatRequest, ChatResponse, LlmError, LlmResult, Message, Usage};

pub const DEFAULT_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn send_request(&self, request: ChatRequest) -> LlmResult<ChatResponse>;

    fn provider_name(&self) -> &'static str;

    async fn health_check(&self) -> LlmResult<()>;
}

/// Client for Groq's OpenAI-compatible chat completions endpoint.
///
/// Failures surface on the first attempt by default; a higher retry count
/// can be configured for callers that want to ride out transient 429s.
#[derive(Debug, Clone)]
pub struct GroqClient {
    client: Client,
    api_key: String,
    endpoint: String,
    timeout: Duration,
    max_attempts: u32,
}

impl GroqClient {
    pub fn new(
        api_key: String,
        endpoint: Option<String>,
        timeout_seconds: Option<u32>,
        max_attempts: Option<u32>,
    ) -> LlmResult<Self> {
        if api_key.trim().is_empty() {
            return Err(LlmError::Configuration(
                "Groq API key is not configured".to_string(),
            ));
        }

        let timeout = Duration::from_secs(timeout_seconds.unwrap_or(30).into());
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            endpoint: endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            timeout,
            max_attempts: max_attempts.unwrap_or(1).max(1),
        })
    }

    fn build_payload(&self, request: &ChatRequest) -> Value {
        let mut payload = json!({
            "model": request.model,
            "messages": request.messages.iter().map(|msg| {
                json!({
                    "role": msg.role,
                    "content": msg.content
                })
            }).collect::<Vec<_>>()
        });

        if let Some(max_tokens) = request.max_tokens {
            payload["max_tokens"] = json!(max_tokens);
        }
        if let Some(temperature) = request.temperature {
            payload["temperature"] = json!(temperature);
        }
        if let Some(top_p) = request.top_p {
            payload["top_p"] = json!(top_p);
        }
        if let Some(stop) = &request.stop_sequences {
            payload["stop"] = json!(stop);
        }

        payload
    }

    fn parse_response(&self, request: &ChatRequest, response_data: Value) -> LlmResult<ChatResponse> {
        let content = response_data["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                LlmError::Provider("Failed to extract content from Groq response".to_string())
            })?;

        let usage = if let Some(usage_data) = response_data.get("usage") {
            Usage {
                prompt_tokens: usage_data["prompt_tokens"].as_u64().unwrap_or(0) as u32,
                completion_tokens: usage_data["completion_tokens"].as_u64().unwrap_or(0) as u32,
                total_tokens: usage_data["total_tokens"].as_u64().unwrap_or(0) as u32,
            }
        } else {
            Usage::default()
        };

        let finish_reason = response_data["choices"][0]["finish_reason"]
            .as_str()
            .map(|s| s.to_string());

        Ok(ChatResponse {
            request_id: request.id,
            content: content.to_string(),
            model: request.model.clone(),
            usage,
            finish_reason,
            created_at: Utc::now(),
            raw_response: response_data,
        })
    }

    async fn execute_request(&self, payload: Value) -> LlmResult<Value> {
        let mut last_error = None;

        for attempt in 0..self.max_attempts {
            match tokio::time::timeout(
                self.timeout,
                self.client
                    .post(&self.endpoint)
                    .header("Authorization", format!("Bearer {}", self.api_key))
                    .header("Content-Type", "application/json")
                    .json(&payload)
                    .send(),
            )
            .await
            {
                Ok(Ok(response)) => match response.status() {
                    status if status.is_success() => {
                        return response.json().await.map_err(|e| {
                            LlmError::Serialisation(format!("Failed to parse response: {e}"))
                        });
                    }
                    status => {
                        last_error = Some(LlmError::Provider(format!(
                            "Groq API error {}: {}",
                            status,
                            response
                                .text()
                                .await
                                .unwrap_or_else(|_| "Unknown error".to_string())
                        )));

                        if status.is_client_error() && status != 429 {
                            break;
                        }
                    }
                },
                Ok(Err(e)) => {
                    last_error = Some(LlmError::Network(format!("Request failed: {e}")));
                }
                Err(_) => {
                    last_error = Some(LlmError::Timeout);
                }
            }

            if attempt + 1 < self.max_attempts {
                let wait_time = Duration::from_secs(2_u64.pow(attempt.min(3)));
                warn!("Groq request attempt {} failed, retrying", attempt + 1);
                tokio::time::sleep(wait_time).await;
            }
        }

        Err(last_error.unwrap_or_else(|| LlmError::Internal("Unknown error".to_string())))
    }
}

#[async_trait]
impl ApiClient for GroqClient {
    async fn send_request(&self, request: ChatRequest) -> LlmResult<ChatResponse> {
        debug!("Sending chat request {} to Groq", request.id);
        let payload = self.build_payload(&request);
        let response_data = self.execute_request(payload).await?;
        self.parse_response(&request, response_data)
    }

    fn provider_name(&self) -> &'static str {
        "groq"
    }

    async fn health_check(&self) -> LlmResult<()> {
        let request = ChatRequest::new(DEFAULT_MODEL, vec![Message::user("Hi")])
            .with_max_tokens(10)
            .with_temperature(0.1);

        self.send_request(request).await?;
        Ok(())
    }
}
