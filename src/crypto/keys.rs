// ABOUTME: Symmetric key material, session-derived and device-persisted key lifecycles
// ABOUTME: Provides the lifecycle-scoped key context threaded through every domain service
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness

//! Key derivation and lifecycle management
//!
//! Two key sources exist, one per principal kind:
//!
//! - **Authenticated**: the key is derived deterministically from the
//!   session access token plus a fixed salt. The key rotates whenever the
//!   token rotates.
//! - **Anonymous**: a random key is generated once and persisted in local
//!   device storage. It is stable for as long as that storage survives and
//!   unrecoverable if the storage is cleared.
//!
//! The [`KeyContext`] replaces the process-wide singleton of earlier
//! designs: it is constructed at session establishment, threaded through
//! the service layer, and torn down at sign-out, which makes key lifetime
//! and test isolation explicit.

use crate::errors::{AppError, AppResult};
use crate::identity::DeviceStorage;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::RwLock;
use zeroize::Zeroize;

/// Fixed salt concatenated with the session token before hashing.
/// Changing this invalidates every session-derived key in the wild.
const SESSION_KEY_SALT: &str = "solace-wellness-salt";

/// Storage key under which the anonymous device key is persisted
pub const DEVICE_KEY_STORAGE_KEY: &str = "sl_device_key";

/// 32-byte symmetric key material for AES-256-GCM
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey {
    bytes: [u8; 32],
}

impl EncryptionKey {
    /// Create a key from raw bytes - primarily for testing
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Deterministically derive a key from a session access token.
    ///
    /// Same token always yields the same key; different tokens yield
    /// unrelated keys. One-way: SHA-256 over token plus fixed salt.
    #[must_use]
    pub fn derive_from_session(access_token: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(access_token.as_bytes());
        hasher.update(SESSION_KEY_SALT.as_bytes());
        let digest = hasher.finalize();

        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self { bytes }
    }

    /// Generate a fresh random key
    #[must_use]
    pub fn generate() -> Self {
        use rand::RngCore;

        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Load the persisted device key, or generate and persist one.
    ///
    /// Idempotent: repeated calls within the same device storage lifetime
    /// return the identical key. Generation writes to storage exactly once.
    ///
    /// # Errors
    ///
    /// Returns an error if a stored key is malformed or storage write fails
    pub fn device_key(storage: &dyn DeviceStorage) -> AppResult<Self> {
        if let Some(stored) = storage.get(DEVICE_KEY_STORAGE_KEY) {
            let decoded = hex::decode(&stored)
                .map_err(|e| AppError::internal(format!("stored device key is not hex: {e}")))?;
            let bytes: [u8; 32] = decoded.try_into().map_err(|_| {
                AppError::internal("stored device key has invalid length")
            })?;
            return Ok(Self { bytes });
        }

        let key = Self::generate();
        storage.set(DEVICE_KEY_STORAGE_KEY, &hex::encode(key.bytes))?;
        tracing::info!("generated and persisted new device encryption key");
        Ok(key)
    }

    /// Raw key bytes for cipher operations
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

impl Drop for EncryptionKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // key material must never reach logs
        f.write_str("EncryptionKey(..)")
    }
}

/// Generate a 16-character anonymous device identifier.
///
/// SHA-256 over fresh random bytes, hex-encoded and truncated. Not
/// recoverable and not linkable to anything server-side.
#[must_use]
pub fn generate_anonymous_id() -> String {
    use rand::RngCore;

    let mut random = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut random);

    let digest = Sha256::digest(random);
    hex::encode(digest)[..16].to_string()
}

/// Lifecycle-scoped holder for the active encryption key.
///
/// Constructed once per [`ServiceContext`](crate::services::ServiceContext)
/// and shared with the auth state machine, which installs and clears keys
/// as the session transitions. Cipher operations before a key is installed
/// fail with `KeyNotInitialized` rather than producing garbage.
#[derive(Default)]
pub struct KeyContext {
    key: RwLock<Option<EncryptionKey>>,
}

impl KeyContext {
    /// Create an uninitialized context (no key installed)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context with a key already installed - primarily for tests
    #[must_use]
    pub fn with_key(key: EncryptionKey) -> Self {
        Self {
            key: RwLock::new(Some(key)),
        }
    }

    /// Install the session-derived key for an authenticated principal
    pub fn install_session_key(&self, access_token: &str) {
        let key = EncryptionKey::derive_from_session(access_token);
        *self.key.write().expect("key lock poisoned") = Some(key);
    }

    /// Install the persisted device key for an anonymous principal
    ///
    /// # Errors
    ///
    /// Returns an error if the stored key is malformed or storage fails
    pub fn install_device_key(&self, storage: &dyn DeviceStorage) -> AppResult<()> {
        let key = EncryptionKey::device_key(storage)?;
        *self.key.write().expect("key lock poisoned") = Some(key);
        Ok(())
    }

    /// Discard the in-memory key. Does not delete the persisted device key.
    pub fn clear(&self) {
        *self.key.write().expect("key lock poisoned") = None;
    }

    /// Whether a key is currently installed
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.key.read().expect("key lock poisoned").is_some()
    }

    /// Snapshot of the current key
    ///
    /// # Errors
    ///
    /// Returns `KeyNotInitialized` if no key has been installed
    pub fn current(&self) -> AppResult<EncryptionKey> {
        self.key
            .read()
            .expect("key lock poisoned")
            .clone()
            .ok_or_else(AppError::key_not_initialized)
    }
}
