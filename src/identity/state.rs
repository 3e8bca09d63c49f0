// ABOUTME: Authoritative auth state machine driving key lifecycle on session transitions
// ABOUTME: One transition table replacing previously duplicated bootstrap flows
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness

//! # Auth State Machine
//!
//! One authoritative state machine over {Uninitialized, Authenticated,
//! Anonymous, SignedOut} with an explicit transition table:
//!
//! | From          | Event             | To            | Key effect                      |
//! |---------------|-------------------|---------------|---------------------------------|
//! | Uninitialized | `initialize` (session present) | Authenticated | install session-derived key |
//! | Uninitialized | `initialize` (anonymous id stored) | Anonymous | install device key          |
//! | Uninitialized | `initialize` (neither)         | SignedOut     | none                        |
//! | any           | `sign_in`         | Authenticated | clear anonymous id + device key from storage, install session key |
//! | any           | `start_anonymous` | Anonymous     | generate + persist anonymous id, install device key |
//! | Authenticated | `sign_out`        | SignedOut     | clear in-memory key; per [`SignOutBehavior`], optionally clear anonymous storage |
//! | Anonymous     | `sign_out`        | SignedOut     | clear in-memory key; per [`SignOutBehavior`], optionally clear anonymous storage |
//!
//! `sign_out` never re-resolves to a still-stored anonymous identity
//! within the same transition; under the default behavior that identity
//! becomes active again only on the next `initialize`.

use crate::crypto::keys::{generate_anonymous_id, EncryptionKey, KeyContext, DEVICE_KEY_STORAGE_KEY};
use crate::errors::AppResult;
use crate::identity::device::{DeviceStorage, ANONYMOUS_ID_STORAGE_KEY};
use crate::identity::session::Session;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::info;
use uuid::Uuid;

/// Authentication lifecycle state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// Before `initialize` has run
    Uninitialized,
    /// Authenticated session active
    Authenticated {
        /// Server-issued user id
        user_id: Uuid,
    },
    /// Anonymous device session active
    Anonymous {
        /// Local anonymous identifier
        anonymous_id: String,
    },
    /// No session of either kind
    SignedOut,
}

/// What an explicit sign-out does to a coexisting anonymous identity.
///
/// The underlying product question - does signing out of an account also
/// mean leaving anonymous mode? - has no universally right answer, so it
/// is a configuration choice rather than an implicit behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignOutBehavior {
    /// End the authenticated session only; a stored anonymous identity
    /// (and its device key) survives and becomes active again on the
    /// next initialization. Default, because the anonymous identity is
    /// unrecoverable once its storage is cleared.
    #[default]
    EndAuthenticatedOnly,
    /// Also clear the stored anonymous identifier and device key
    ExitAnonymousToo,
}

impl SignOutBehavior {
    /// Parse from a configuration string, defaulting on anything unknown
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "exit-anonymous" | "exit-anonymous-too" => Self::ExitAnonymousToo,
            _ => Self::EndAuthenticatedOnly,
        }
    }
}

impl fmt::Display for SignOutBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EndAuthenticatedOnly => f.write_str("end-authenticated-only"),
            Self::ExitAnonymousToo => f.write_str("exit-anonymous"),
        }
    }
}

/// Snapshot of an anonymous identity captured before an upgrade to an
/// authenticated account, so its data can be migrated rather than orphaned
pub struct AnonymousHandoff {
    /// The outgoing anonymous identifier
    pub anonymous_id: String,
    /// The outgoing device key its data is encrypted under
    pub device_key: EncryptionKey,
}

/// Drives auth transitions and their key-lifecycle side effects
pub struct AuthStateMachine {
    state: RwLock<AuthState>,
    keys: Arc<KeyContext>,
    storage: Arc<dyn DeviceStorage>,
    sign_out_behavior: SignOutBehavior,
}

impl AuthStateMachine {
    /// Create a machine in the `Uninitialized` state
    #[must_use]
    pub fn new(
        keys: Arc<KeyContext>,
        storage: Arc<dyn DeviceStorage>,
        sign_out_behavior: SignOutBehavior,
    ) -> Self {
        Self {
            state: RwLock::new(AuthState::Uninitialized),
            keys,
            storage,
            sign_out_behavior,
        }
    }

    /// Current state snapshot
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.state.read().expect("auth state lock poisoned").clone()
    }

    fn set_state(&self, state: AuthState) {
        *self.state.write().expect("auth state lock poisoned") = state;
    }

    /// Establish the initial state from whatever already exists: an
    /// authenticated session wins, a stored anonymous identifier is next,
    /// otherwise signed out
    ///
    /// # Errors
    ///
    /// Returns an error if device key installation fails
    pub fn initialize(&self, session: Option<&Session>) -> AppResult<AuthState> {
        let next = if let Some(session) = session {
            self.keys.install_session_key(&session.access_token);
            AuthState::Authenticated {
                user_id: session.user_id,
            }
        } else if let Some(anonymous_id) = self.storage.get(ANONYMOUS_ID_STORAGE_KEY) {
            self.keys.install_device_key(self.storage.as_ref())?;
            AuthState::Anonymous { anonymous_id }
        } else {
            AuthState::SignedOut
        };

        self.set_state(next.clone());
        info!(state = ?variant_name(&next), "auth state initialized");
        Ok(next)
    }

    /// Establish an authenticated session. Clears any stored anonymous
    /// identity first so a stale identifier can never shadow the account.
    ///
    /// Callers that want to preserve anonymous data must capture an
    /// [`AnonymousHandoff`] before calling this, then run the migration.
    ///
    /// # Errors
    ///
    /// Returns an error if device storage cannot be cleared
    pub fn sign_in(&self, session: &Session) -> AppResult<()> {
        self.storage.remove(ANONYMOUS_ID_STORAGE_KEY)?;
        self.storage.remove(DEVICE_KEY_STORAGE_KEY)?;

        self.keys.install_session_key(&session.access_token);
        self.set_state(AuthState::Authenticated {
            user_id: session.user_id,
        });
        info!(user_id = %session.user_id, "authenticated session established");
        Ok(())
    }

    /// Start an anonymous device session: generate and persist the
    /// identifier, install the device key
    ///
    /// # Errors
    ///
    /// Returns an error if device storage cannot be written
    pub fn start_anonymous(&self) -> AppResult<String> {
        let anonymous_id = generate_anonymous_id();
        self.storage.set(ANONYMOUS_ID_STORAGE_KEY, &anonymous_id)?;
        self.keys.install_device_key(self.storage.as_ref())?;

        self.set_state(AuthState::Anonymous {
            anonymous_id: anonymous_id.clone(),
        });
        info!("anonymous session established");
        Ok(anonymous_id)
    }

    /// Explicit sign-out. Always clears the in-memory key; clears the
    /// persisted anonymous identity only under
    /// [`SignOutBehavior::ExitAnonymousToo`]. Never re-resolves to a
    /// stored anonymous identity within this transition.
    ///
    /// # Errors
    ///
    /// Returns an error if device storage cannot be cleared
    pub fn sign_out(&self) -> AppResult<AuthState> {
        if self.sign_out_behavior == SignOutBehavior::ExitAnonymousToo {
            self.storage.remove(ANONYMOUS_ID_STORAGE_KEY)?;
            self.storage.remove(DEVICE_KEY_STORAGE_KEY)?;
        }

        self.keys.clear();
        self.set_state(AuthState::SignedOut);
        info!(behavior = %self.sign_out_behavior, "signed out");
        Ok(AuthState::SignedOut)
    }

    /// Capture the stored anonymous identity and its device key, for use
    /// by the migration path. Must be called before [`Self::sign_in`],
    /// which destroys both.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored device key is malformed
    pub fn anonymous_handoff(&self) -> AppResult<Option<AnonymousHandoff>> {
        let Some(anonymous_id) = self.storage.get(ANONYMOUS_ID_STORAGE_KEY) else {
            return Ok(None);
        };

        let device_key = EncryptionKey::device_key(self.storage.as_ref())?;
        Ok(Some(AnonymousHandoff {
            anonymous_id,
            device_key,
        }))
    }
}

const fn variant_name(state: &AuthState) -> &'static str {
    match state {
        AuthState::Uninitialized => "uninitialized",
        AuthState::Authenticated { .. } => "authenticated",
        AuthState::Anonymous { .. } => "anonymous",
        AuthState::SignedOut => "signed_out",
    }
}
