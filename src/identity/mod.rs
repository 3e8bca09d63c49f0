// ABOUTME: Identity module covering principals, device storage, and session state
// ABOUTME: Resolves the active principal and drives key lifecycle on auth transitions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness

//! Principal resolution and authentication state
//!
//! Every record in the store belongs to exactly one principal: an
//! authenticated user (stable server-issued id, survives across devices)
//! or an anonymous device principal (locally generated identifier that is
//! unrecoverable if device storage is cleared). This module decides which
//! of the two is active, which scoping column store queries must filter
//! on, and what happens to encryption keys as sessions come and go.

pub mod device;
pub mod resolver;
pub mod session;
pub mod state;

pub use device::{DeviceStorage, FileDeviceStore, MemoryDeviceStore, ANONYMOUS_ID_STORAGE_KEY};
pub use resolver::{IdentityResolver, Principal, ScopeColumn};
pub use session::{Session, SessionProvider, StaticSessionProvider};
pub use state::{AnonymousHandoff, AuthState, AuthStateMachine, SignOutBehavior};
