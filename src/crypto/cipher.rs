// ABOUTME: Field-level AES-256-GCM encryption for sensitive free-text columns
// ABOUTME: Nonce-prepended, base64-encoded ciphertext with JSON convenience wrappers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness

//! # Field Cipher
//!
//! Encrypts individual string fields (and JSON-serializable structures)
//! before they are written to the record store and decrypts them after they
//! are read back. Sensitive free text is never persisted in plaintext; the
//! ciphertext column is the column of record.
//!
//! The mode is authenticated (AES-256-GCM): a key mismatch or tampered
//! ciphertext fails with `DecryptionFailed` rather than yielding garbled
//! plaintext. Each ciphertext carries its own random 12-byte nonce,
//! prepended to the sealed bytes before base64 encoding:
//! `base64([12-byte nonce][ciphertext][16-byte tag])`.
//!
//! Numeric scores, enums, timestamps, and foreign keys deliberately stay
//! plaintext so the store can filter and sort on them; that
//! confidentiality/queryability tradeoff is part of the service contracts,
//! not of this cipher.

use crate::crypto::keys::{EncryptionKey, KeyContext};
use crate::errors::{AppError, AppResult};
use base64::{engine::general_purpose, Engine as _};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// AES-GCM nonce length in bytes
const NONCE_LEN: usize = 12;

/// Symmetric field cipher bound to a key context
#[derive(Clone)]
pub struct FieldCipher {
    keys: Arc<KeyContext>,
}

impl FieldCipher {
    /// Create a cipher over a shared key context
    #[must_use]
    pub fn new(keys: Arc<KeyContext>) -> Self {
        Self { keys }
    }

    /// Create a cipher over a fixed key, detached from any session
    /// lifecycle. Used by the migration path, which must decrypt with the
    /// outgoing anonymous key while the incoming session key is active.
    #[must_use]
    pub fn with_key(key: EncryptionKey) -> Self {
        Self {
            keys: Arc::new(KeyContext::with_key(key)),
        }
    }

    /// Encrypt a plaintext string field
    ///
    /// # Errors
    ///
    /// Returns `KeyNotInitialized` if no key has been established, or an
    /// internal error if the AEAD seal fails
    pub fn encrypt(&self, plaintext: &str) -> AppResult<String> {
        let key = self.keys.current()?;

        let rng = SystemRandom::new();
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rng.fill(&mut nonce_bytes)?;
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);

        let unbound = UnboundKey::new(&AES_256_GCM, key.as_bytes())?;
        let sealing_key = LessSafeKey::new(unbound);

        let mut data = plaintext.as_bytes().to_vec();
        sealing_key.seal_in_place_append_tag(nonce, Aad::empty(), &mut data)?;

        // Prepend nonce so each field is self-contained at rest
        let mut combined = Vec::with_capacity(NONCE_LEN + data.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&data);

        Ok(general_purpose::STANDARD.encode(combined))
    }

    /// Decrypt a ciphertext field back to its plaintext string
    ///
    /// # Errors
    ///
    /// Returns `KeyNotInitialized` if no key has been established, or
    /// `DecryptionFailed` on key mismatch, tampering, or corrupt input.
    /// Never returns garbled plaintext.
    pub fn decrypt(&self, ciphertext: &str) -> AppResult<String> {
        let key = self.keys.current()?;

        let combined = general_purpose::STANDARD
            .decode(ciphertext)
            .map_err(|e| AppError::decryption_failed(format!("invalid base64: {e}")))?;

        if combined.len() < NONCE_LEN {
            return Err(AppError::decryption_failed("ciphertext too short"));
        }

        let (nonce_bytes, sealed) = combined.split_at(NONCE_LEN);
        let nonce_array: [u8; NONCE_LEN] = nonce_bytes
            .try_into()
            .map_err(|_| AppError::decryption_failed("invalid nonce"))?;
        let nonce = Nonce::assume_unique_for_key(nonce_array);

        let unbound = UnboundKey::new(&AES_256_GCM, key.as_bytes())?;
        let opening_key = LessSafeKey::new(unbound);

        let mut data = sealed.to_vec();
        let plaintext = opening_key
            .open_in_place(nonce, Aad::empty(), &mut data)
            .map_err(|_| {
                AppError::decryption_failed("authentication tag mismatch (wrong key or tampered data)")
            })?;

        String::from_utf8(plaintext.to_vec())
            .map_err(|e| AppError::decryption_failed(format!("invalid UTF-8 in plaintext: {e}")))
    }

    /// Serialize a value to JSON and encrypt it
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the value cannot be encoded, or
    /// any error `encrypt` can return
    pub fn encrypt_json<T: Serialize>(&self, value: &T) -> AppResult<String> {
        let json = serde_json::to_string(value)?;
        self.encrypt(&json)
    }

    /// Decrypt a ciphertext field and parse the plaintext as JSON
    ///
    /// # Errors
    ///
    /// Returns `DecryptionFailed` if the ciphertext is unreadable with the
    /// current key, or a distinguishable `SerializationError` if the
    /// decrypted bytes are not valid serialized data
    pub fn decrypt_json<T: DeserializeOwned>(&self, ciphertext: &str) -> AppResult<T> {
        let json = self.decrypt(ciphertext)?;
        serde_json::from_str(&json)
            .map_err(|e| AppError::serialization(format!("decrypted payload is not valid: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;

    fn cipher() -> FieldCipher {
        FieldCipher::with_key(EncryptionKey::from_bytes([7u8; 32]))
    }

    #[test]
    fn test_round_trip() {
        let cipher = cipher();
        let plaintext = "I felt anxious before the meeting but it passed";

        let ciphertext = cipher.encrypt(plaintext).unwrap();
        assert_ne!(ciphertext, plaintext);
        assert_eq!(cipher.decrypt(&ciphertext).unwrap(), plaintext);
    }

    #[test]
    fn test_each_encryption_uses_fresh_nonce() {
        let cipher = cipher();
        let a = cipher.encrypt("same input").unwrap();
        let b = cipher.encrypt("same input").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_fails_loudly() {
        let ciphertext = cipher().encrypt("private note").unwrap();
        let other = FieldCipher::with_key(EncryptionKey::from_bytes([8u8; 32]));

        let err = other.decrypt(&ciphertext).unwrap_err();
        assert_eq!(err.code, ErrorCode::DecryptionFailed);
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let cipher = cipher();
        let ciphertext = cipher.encrypt("original").unwrap();

        let mut bytes = general_purpose::STANDARD.decode(&ciphertext).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let tampered = general_purpose::STANDARD.encode(bytes);

        let err = cipher.decrypt(&tampered).unwrap_err();
        assert_eq!(err.code, ErrorCode::DecryptionFailed);
    }

    #[test]
    fn test_uninitialized_key_is_an_error() {
        let cipher = FieldCipher::new(Arc::new(KeyContext::new()));

        let err = cipher.encrypt("anything").unwrap_err();
        assert_eq!(err.code, ErrorCode::KeyNotInitialized);

        let err = cipher.decrypt("anything").unwrap_err();
        assert_eq!(err.code, ErrorCode::KeyNotInitialized);
    }

    #[test]
    fn test_json_round_trip() {
        let cipher = cipher();
        let triggers = vec!["work".to_string(), "sleep".to_string()];

        let ciphertext = cipher.encrypt_json(&triggers).unwrap();
        let decoded: Vec<String> = cipher.decrypt_json(&ciphertext).unwrap();
        assert_eq!(decoded, triggers);
    }

    #[test]
    fn test_json_type_mismatch_is_distinguishable() {
        let cipher = cipher();
        let ciphertext = cipher.encrypt("not a number").unwrap();

        let err = cipher.decrypt_json::<u32>(&ciphertext).unwrap_err();
        assert_eq!(err.code, ErrorCode::SerializationError);
    }
}
