// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Unified Error Handling System
//!
//! Centralized error types for the Solace client core. Cipher and key
//! primitives signal hard failures to their immediate caller; the domain
//! services translate everything into the `{data, error}` result-pair
//! convention before it crosses the UI boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Standard error codes used throughout the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Key & identity (1000-1999)
    #[serde(rename = "KEY_NOT_INITIALIZED")]
    KeyNotInitialized = 1000,
    #[serde(rename = "NO_ACTIVE_PRINCIPAL")]
    NoActivePrincipal = 1001,

    // Cryptography (2000-2999)
    #[serde(rename = "DECRYPTION_FAILED")]
    DecryptionFailed = 2000,
    #[serde(rename = "SERIALIZATION_ERROR")]
    SerializationError = 2001,

    // Validation (3000-3999)
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput = 3000,
    #[serde(rename = "VALUE_OUT_OF_RANGE")]
    ValueOutOfRange = 3001,

    // Resource management (4000-4999)
    #[serde(rename = "RESOURCE_NOT_FOUND")]
    ResourceNotFound = 4000,
    #[serde(rename = "CAPACITY_EXCEEDED")]
    CapacityExceeded = 4001,

    // External services (5000-5999)
    #[serde(rename = "STORE_ERROR")]
    StoreError = 5000,
    #[serde(rename = "EXTERNAL_SERVICE_UNAVAILABLE")]
    ExternalServiceUnavailable = 5001,

    // Configuration (6000-6999)
    #[serde(rename = "CONFIG_ERROR")]
    ConfigError = 6000,

    // Internal (9000-9999)
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError = 9000,
}

impl ErrorCode {
    /// Get a user-friendly description of this error
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::KeyNotInitialized => "Encryption key has not been initialized",
            Self::NoActivePrincipal => "No authenticated or anonymous session is active",
            Self::DecryptionFailed => "Stored data could not be decrypted with the current key",
            Self::SerializationError => "Data serialization/deserialization failed",
            Self::InvalidInput => "The provided input is invalid",
            Self::ValueOutOfRange => "The provided value is outside the acceptable range",
            Self::ResourceNotFound => "The requested resource was not found",
            Self::CapacityExceeded => "The resource is already at capacity",
            Self::StoreError => "Record store operation failed",
            Self::ExternalServiceUnavailable => "An external service is currently unavailable",
            Self::ConfigError => "Configuration error encountered",
            Self::InternalError => "An internal error occurred",
        }
    }

    /// Whether a failure with this code is recoverable by falling back to
    /// deterministic behavior (never surfaced to the user as an error)
    #[must_use]
    pub const fn is_recoverable(self) -> bool {
        matches!(self, Self::ExternalServiceUnavailable)
    }
}

/// Unified error type for the application
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Convenience constructors for common errors
impl AppError {
    /// Cipher was used before a key was established
    pub fn key_not_initialized() -> Self {
        Self::new(
            ErrorCode::KeyNotInitialized,
            "initialize a session or device key before encrypting",
        )
    }

    /// Write attempted with no resolved identity
    pub fn no_active_principal() -> Self {
        Self::new(
            ErrorCode::NoActivePrincipal,
            "sign in or start an anonymous session first",
        )
    }

    /// Ciphertext unreadable with the current key
    pub fn decryption_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DecryptionFailed, message)
    }

    /// Decrypted bytes are not valid serialized data
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SerializationError, message)
    }

    /// Invalid input
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Value outside its documented range
    pub fn out_of_range(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValueOutOfRange, message)
    }

    /// Resource not found
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ResourceNotFound,
            format!("{} not found", resource.into()),
        )
    }

    /// Group or supporter is at its membership/match ceiling
    pub fn capacity(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CapacityExceeded, message)
    }

    /// Wraps any failure from the external record store
    pub fn store(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StoreError, message)
    }

    /// External text-generation call failed; always recoverable
    pub fn external_service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ExternalServiceUnavailable,
            format!("{}: {}", service.into(), message.into()),
        )
    }

    /// Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::serialization(error.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::new(ErrorCode::InternalError, error.to_string())
    }
}

impl From<ring::error::Unspecified> for AppError {
    fn from(_: ring::error::Unspecified) -> Self {
        Self::internal("cryptographic primitive failure")
    }
}
