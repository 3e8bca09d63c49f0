// ABOUTME: Cryptography module providing key derivation and field-level encryption
// ABOUTME: Centralizes all cryptographic operations for the Solace client core
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness

//! Cryptographic utilities for the Solace client core

pub mod cipher;
pub mod keys;

pub use cipher::FieldCipher;
pub use keys::{generate_anonymous_id, EncryptionKey, KeyContext};
