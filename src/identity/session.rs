// ABOUTME: External session provider seam yielding the current authenticated session
// ABOUTME: Includes a static in-process implementation for tests and local mode
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness

//! Session provider seam
//!
//! The hosted auth service owns authentication; this core only consumes
//! its output: either a current session (access token plus stable user
//! id) or nothing. The access token is opaque here - it is input to key
//! derivation, never parsed.

use crate::errors::AppResult;
use async_trait::async_trait;
use std::sync::RwLock;
use uuid::Uuid;

/// A live authenticated session
#[derive(Debug, Clone)]
pub struct Session {
    /// Opaque per-session access token; rotates with the session
    pub access_token: String,
    /// Stable server-issued user identifier
    pub user_id: Uuid,
}

impl Session {
    /// Create a session value
    #[must_use]
    pub fn new(access_token: impl Into<String>, user_id: Uuid) -> Self {
        Self {
            access_token: access_token.into(),
            user_id,
        }
    }
}

/// Yields the current session, or `None` when signed out
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// The current session, if an authenticated session is present
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying auth service cannot be reached
    async fn current_session(&self) -> AppResult<Option<Session>>;
}

/// In-process session provider holding a settable session value.
///
/// Used by tests and by embedders that receive session changes through
/// their own channel and push them in here.
#[derive(Default)]
pub struct StaticSessionProvider {
    session: RwLock<Option<Session>>,
}

impl StaticSessionProvider {
    /// Provider with no session (signed out)
    #[must_use]
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// Provider with an active session
    #[must_use]
    pub fn with_session(session: Session) -> Self {
        Self {
            session: RwLock::new(Some(session)),
        }
    }

    /// Replace the current session value
    pub fn set_session(&self, session: Option<Session>) {
        *self.session.write().expect("session lock poisoned") = session;
    }
}

#[async_trait]
impl SessionProvider for StaticSessionProvider {
    async fn current_session(&self) -> AppResult<Option<Session>> {
        Ok(self.session.read().expect("session lock poisoned").clone())
    }
}
