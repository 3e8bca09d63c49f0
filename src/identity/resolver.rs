// ABOUTME: Resolves the active principal and its record-store scoping column
// ABOUTME: Authenticated session takes precedence over a stored anonymous identifier
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness

//! # Identity Resolver
//!
//! Every domain service read and write starts here. Resolution order:
//!
//! 1. An authenticated session, if present, wins - regardless of any
//!    anonymous identifier still sitting in device storage.
//! 2. Otherwise a persisted anonymous identifier yields an anonymous
//!    principal.
//! 3. Otherwise there is no principal: writes fail with
//!    `NoActivePrincipal`, reads return an empty result set. The asymmetry
//!    is intentional so the UI renders "no data yet" rather than an error
//!    for unauthenticated visitors.

use crate::errors::{AppError, AppResult};
use crate::identity::device::{DeviceStorage, ANONYMOUS_ID_STORAGE_KEY};
use crate::identity::session::SessionProvider;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// The acting identity against which records are scoped and encrypted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// Authenticated user with a stable server-issued identifier
    Authenticated {
        /// Server-issued user id
        id: Uuid,
    },
    /// Anonymous device principal with a locally generated identifier
    Anonymous {
        /// 16-character local identifier
        id: String,
    },
}

/// The identity-linking column used to filter store queries.
///
/// A row carries exactly one of the two; never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeColumn {
    /// `user_id` column for authenticated principals
    UserId,
    /// `anonymous_id` column for anonymous principals
    AnonymousId,
}

impl ScopeColumn {
    /// Column name as stored
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UserId => "user_id",
            Self::AnonymousId => "anonymous_id",
        }
    }
}

impl Principal {
    /// Which scoping column rows belonging to this principal carry
    #[must_use]
    pub const fn column(&self) -> ScopeColumn {
        match self {
            Self::Authenticated { .. } => ScopeColumn::UserId,
            Self::Anonymous { .. } => ScopeColumn::AnonymousId,
        }
    }

    /// Scoping column value as a store value
    #[must_use]
    pub fn column_value(&self) -> Value {
        match self {
            Self::Authenticated { id } => Value::String(id.to_string()),
            Self::Anonymous { id } => Value::String(id.clone()),
        }
    }

    /// Scope a column name for this principal, e.g. `seeker` becomes
    /// `seeker_user_id` or `seeker_anonymous_id`
    #[must_use]
    pub fn prefixed_column(&self, prefix: &str) -> String {
        format!("{prefix}_{}", self.column().as_str())
    }
}

/// Determines the active principal for every operation
#[derive(Clone)]
pub struct IdentityResolver {
    sessions: Arc<dyn SessionProvider>,
    storage: Arc<dyn DeviceStorage>,
}

impl IdentityResolver {
    /// Create a resolver over the session provider and device storage
    #[must_use]
    pub fn new(sessions: Arc<dyn SessionProvider>, storage: Arc<dyn DeviceStorage>) -> Self {
        Self { sessions, storage }
    }

    /// Resolve the current principal, `None` when no session of either
    /// kind exists
    ///
    /// # Errors
    ///
    /// Returns an error if the session provider cannot be reached
    pub async fn current_identity(&self) -> AppResult<Option<Principal>> {
        if let Some(session) = self.sessions.current_session().await? {
            return Ok(Some(Principal::Authenticated {
                id: session.user_id,
            }));
        }

        if let Some(id) = self.storage.get(ANONYMOUS_ID_STORAGE_KEY) {
            return Ok(Some(Principal::Anonymous { id }));
        }

        Ok(None)
    }

    /// Resolve the current principal, failing when none exists.
    /// Used by every write path.
    ///
    /// # Errors
    ///
    /// Returns `NoActivePrincipal` if neither session kind is active
    pub async fn require_principal(&self) -> AppResult<Principal> {
        self.current_identity()
            .await?
            .ok_or_else(AppError::no_active_principal)
    }
}
