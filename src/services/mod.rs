// ABOUTME: Domain record services composing identity, field cipher, and record store
// ABOUTME: Defines the service context and the {data, error} boundary convention
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness

//! # Domain Record Services
//!
//! One service per entity family. Every operation follows the same shape:
//! resolve the active principal, encrypt the entity's sensitive fields,
//! talk to the record store scoped to the principal's column, decrypt on
//! the way back out.
//!
//! Nothing in this layer throws across the UI boundary: public operations
//! return a [`ServiceResponse`] pair so callers can render partial and
//! error states uniformly. Reads with no active principal return empty
//! data, not an error; writes fail with `NoActivePrincipal`.

pub mod context;
pub mod coping;
pub mod insights;
pub mod migration;
pub mod mood;
pub mod peer;
pub mod safety;

pub use context::ServiceContext;
pub use coping::CopingService;
pub use insights::InsightService;
pub use migration::{MigrationReport, MigrationService};
pub use mood::MoodService;
pub use peer::{
    GroupMembershipWithGroup, GroupMessageSubscription, PeerMessageSubscription,
    PeerSupportService,
};
pub use safety::SafetyPlanService;

use crate::errors::{AppError, AppResult, ErrorCode};
use serde::{Deserialize, Serialize};

/// Serializable error surfaced across the UI boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceError {
    /// Machine-readable error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
}

impl From<AppError> for ServiceError {
    fn from(error: AppError) -> Self {
        Self {
            code: error.code,
            message: error.message,
        }
    }
}

/// The `{data, error}` pair every public service operation returns.
/// Exactly one of the two is populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceResponse<T> {
    /// Operation result, when successful
    pub data: Option<T>,
    /// Failure description, when not
    pub error: Option<ServiceError>,
}

impl<T> ServiceResponse<T> {
    /// Successful response
    #[must_use]
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    /// Failed response
    #[must_use]
    pub fn err(error: AppError) -> Self {
        tracing::warn!(code = ?error.code, message = %error.message, "service operation failed");
        Self {
            data: None,
            error: Some(error.into()),
        }
    }

    /// Whether the operation succeeded
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Convert back into a hard result, for internal composition of
    /// service calls (e.g. the insight engine persisting its output)
    ///
    /// # Errors
    ///
    /// Returns the carried error, or an internal error if the response
    /// holds neither data nor error
    pub fn into_result(self) -> AppResult<T> {
        match (self.data, self.error) {
            (Some(data), None) => Ok(data),
            (_, Some(error)) => Err(AppError::new(error.code, error.message)),
            (None, None) => Err(AppError::internal("empty service response")),
        }
    }
}

impl<T> From<AppResult<T>> for ServiceResponse<T> {
    fn from(result: AppResult<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(error) => Self::err(error),
        }
    }
}
