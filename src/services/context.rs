// ABOUTME: Lifecycle-scoped dependency context threaded through every domain service
// ABOUTME: Owns the store handle, key context, cipher, resolver, and auth state machine
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness

//! # Service Context
//!
//! The explicit, lifecycle-scoped replacement for a process-wide cipher
//! singleton. Constructed once at application start, it wires together the
//! external collaborators (record store, session provider, device
//! storage) with the key context, field cipher, identity resolver, and
//! auth state machine. Services borrow it; tests build isolated ones.

use crate::config::ClientConfig;
use crate::crypto::{FieldCipher, KeyContext};
use crate::identity::{
    AuthStateMachine, DeviceStorage, IdentityResolver, SessionProvider,
};
use crate::store::RecordStore;
use std::sync::Arc;

/// Shared dependencies for all domain services
pub struct ServiceContext {
    pub(crate) store: Arc<dyn RecordStore>,
    pub(crate) keys: Arc<KeyContext>,
    pub(crate) cipher: FieldCipher,
    pub(crate) resolver: IdentityResolver,
    pub(crate) auth: AuthStateMachine,
    pub(crate) config: ClientConfig,
}

impl ServiceContext {
    /// Wire up a context from the external collaborators
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        sessions: Arc<dyn SessionProvider>,
        device_storage: Arc<dyn DeviceStorage>,
        config: ClientConfig,
    ) -> Arc<Self> {
        let keys = Arc::new(KeyContext::new());
        let cipher = FieldCipher::new(Arc::clone(&keys));
        let resolver = IdentityResolver::new(sessions, Arc::clone(&device_storage));
        let auth = AuthStateMachine::new(
            Arc::clone(&keys),
            device_storage,
            config.sign_out_behavior,
        );

        Arc::new(Self {
            store,
            keys,
            cipher,
            resolver,
            auth,
            config,
        })
    }

    /// The auth state machine driving session transitions
    #[must_use]
    pub fn auth(&self) -> &AuthStateMachine {
        &self.auth
    }

    /// The identity resolver
    #[must_use]
    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    /// The field cipher bound to this context's key lifecycle
    #[must_use]
    pub fn cipher(&self) -> &FieldCipher {
        &self.cipher
    }

    /// The key context shared with the auth state machine
    #[must_use]
    pub fn keys(&self) -> &Arc<KeyContext> {
        &self.keys
    }

    /// The record store handle
    #[must_use]
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Client configuration
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}
