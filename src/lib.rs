// ABOUTME: Main library entry point for the Solace wellness client core
// ABOUTME: Provides encrypted mood tracking, coping tools, peer support, and insight analysis
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness

#![deny(unsafe_code)]

//! # Solace Core
//!
//! Client core for a privacy-first mental-wellness application. The hosted
//! record store is treated as untrusted: every sensitive free-text field is
//! encrypted with AES-256-GCM on this side of the wire before it is
//! persisted, and decrypted after it is read back. Records are scoped to
//! exactly one principal - an authenticated user with a server-issued id,
//! or an anonymous principal whose identifier and encryption key live only
//! in local device storage.
//!
//! ## Architecture
//!
//! - **Crypto**: key derivation and the field cipher used by every service
//! - **Identity**: principal resolution and the auth state machine
//! - **Store**: the record-store seam plus an in-process implementation
//! - **Services**: one service per entity family, encrypt-on-write /
//!   decrypt-on-read, `{data, error}` results at the boundary
//! - **Intelligence**: trend, correlation, and risk analysis over decrypted
//!   mood history, with optional language-model phrasing
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use solace_core::config::ClientConfig;
//! use solace_core::identity::{MemoryDeviceStore, StaticSessionProvider};
//! use solace_core::services::ServiceContext;
//! use solace_core::store::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ClientConfig::default();
//!     let ctx = ServiceContext::new(
//!         Arc::new(MemoryStore::new()),
//!         Arc::new(StaticSessionProvider::signed_out()),
//!         Arc::new(MemoryDeviceStore::new()),
//!         config,
//!     );
//!     let _ = ctx;
//! }
//! ```

/// Environment-driven client configuration
pub mod config;

/// Key derivation and the field-level cipher
pub mod crypto;

/// Unified error handling with standard error codes
pub mod errors;

/// Principal resolution, device storage, and the auth state machine
pub mod identity;

/// Insight engine: trend, correlation, and risk analysis
pub mod intelligence;

/// Optional text-generation provider for naturalistic insight phrasing
pub mod llm;

/// Structured logging configuration
pub mod logging;

/// Domain entity models
pub mod models;

/// Domain record services composing identity, cipher, and store
pub mod services;

/// Record-store seam and the in-process implementation
pub mod store;
