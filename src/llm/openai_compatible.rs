// ABOUTME: Generic OpenAI-compatible text-generation provider for cloud and local endpoints
// ABOUTME: Environment-configured base URL, model, and API key with conservative timeouts
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness

//! # `OpenAI`-Compatible Provider
//!
//! Works against any `OpenAI`-compatible chat-completions endpoint -
//! hosted APIs as well as local servers (Ollama, vLLM, `LocalAI`).
//!
//! ## Configuration
//!
//! - `SOLACE_LLM_BASE_URL`: endpoint base, e.g. `https://api.openai.com/v1`
//! - `SOLACE_LLM_MODEL`: model name (default `gpt-4o-mini`)
//! - `SOLACE_LLM_API_KEY`: bearer key; optional for local servers
//!
//! The provider is considered configured when either the base URL or the
//! API key is present.

use crate::errors::{AppError, AppResult};
use crate::llm::{ChatRequest, TextGenerator};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::debug;

/// Environment variable for the endpoint base URL
const BASE_URL_ENV: &str = "SOLACE_LLM_BASE_URL";

/// Environment variable for the model name
const MODEL_ENV: &str = "SOLACE_LLM_MODEL";

/// Environment variable for the API key
const API_KEY_ENV: &str = "SOLACE_LLM_API_KEY";

/// Default endpoint when only an API key is configured
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Connection timeout
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// End-to-end request timeout; generation can be slow on local servers
const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: &'a [crate::llm::ChatMessage],
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    content: Option<String>,
}

/// Provider over an `OpenAI`-compatible chat-completions endpoint
pub struct OpenAiCompatibleProvider {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiCompatibleProvider {
    /// Build from environment variables; `None` when neither a base URL
    /// nor an API key is configured
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var(BASE_URL_ENV).ok();
        let api_key = env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty());

        if base_url.is_none() && api_key.is_none() {
            return None;
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .ok()?;

        Some(Self {
            client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: env::var(MODEL_ENV).unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            api_key,
        })
    }

    /// Build with explicit settings - primarily for tests
    #[must_use]
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            api_key,
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiCompatibleProvider {
    async fn complete(&self, request: &ChatRequest) -> AppResult<String> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let body = ApiRequest {
            model: &self.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let mut http_request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            http_request = http_request.bearer_auth(key);
        }

        let response = http_request
            .send()
            .await
            .map_err(|e| AppError::external_service("text-generation", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::external_service(
                "text-generation",
                format!("endpoint returned {status}"),
            ));
        }

        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| AppError::external_service("text-generation", e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(AppError::external_service(
                "text-generation",
                "empty completion",
            ));
        }

        debug!(model = %self.model, chars = content.len(), "completion received");
        Ok(content)
    }

    fn display_name(&self) -> &str {
        &self.model
    }
}
