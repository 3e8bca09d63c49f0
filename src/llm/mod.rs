// ABOUTME: Optional text-generation seam for naturalistic insight phrasing
// ABOUTME: Role-tagged chat requests against any OpenAI-compatible endpoint
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness

//! # Text Generation
//!
//! A best-effort enhancement layer. The insight engine phrases everything
//! deterministically first; when a provider is configured, generated text
//! replaces the template. When it is not, or the call fails, nothing
//! user-visible goes wrong.

pub mod openai_compatible;

pub use openai_compatible::OpenAiCompatibleProvider;

use crate::errors::AppResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// System prompt framing every wellness completion
pub const WELLNESS_SYSTEM_PROMPT: &str = "You are a compassionate mental health AI assistant. \
Provide supportive, evidence-based insights while being clear that you are not a replacement \
for professional care. Always include disclaimers about seeking professional help when \
appropriate. Be encouraging and non-judgmental.";

/// Message author role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One role-tagged message in a prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author role
    pub role: ChatRole,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// System message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// User message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// A completion request: role-tagged prompt list plus a token budget
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Prompt messages, in order
    pub messages: Vec<ChatMessage>,
    /// Completion token budget
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f64,
}

impl ChatRequest {
    /// Request with default budget and temperature
    #[must_use]
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            max_tokens: 500,
            temperature: 0.7,
        }
    }

    /// Override the token budget
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Text-generation provider seam
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Complete the prompt, returning free text
    ///
    /// # Errors
    ///
    /// Returns `ExternalServiceUnavailable` on any transport or provider
    /// failure; callers fall back to deterministic phrasing
    async fn complete(&self, request: &ChatRequest) -> AppResult<String>;

    /// Human-readable provider name for logs
    fn display_name(&self) -> &str;
}

/// Build the configured provider, `None` when no endpoint or key is set.
/// Absence is the normal, fully supported state.
#[must_use]
pub fn from_env() -> Option<Arc<dyn TextGenerator>> {
    match OpenAiCompatibleProvider::from_env() {
        Some(provider) => {
            info!(provider = provider.display_name(), "text generation enabled");
            Some(Arc::new(provider))
        }
        None => None,
    }
}
