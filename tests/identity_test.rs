// ABOUTME: Tests for principal resolution and the auth state machine
// ABOUTME: Precedence, transition side effects, and the configurable sign-out semantics
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use common::{harness, harness_with_behavior};
use solace_core::identity::{
    AuthState, Principal, ScopeColumn, Session, SignOutBehavior, ANONYMOUS_ID_STORAGE_KEY,
};
use solace_core::identity::DeviceStorage;
use uuid::Uuid;

#[tokio::test]
async fn test_no_session_resolves_to_none() {
    let h = harness();
    assert!(h.ctx.resolver().current_identity().await.unwrap().is_none());

    let err = h.ctx.resolver().require_principal().await.unwrap_err();
    assert_eq!(err.code, solace_core::errors::ErrorCode::NoActivePrincipal);
}

#[tokio::test]
async fn test_anonymous_session_resolves_after_start() {
    let h = harness();
    let anonymous_id = h.start_anonymous();

    let principal = h.ctx.resolver().current_identity().await.unwrap().unwrap();
    assert_eq!(principal, Principal::Anonymous { id: anonymous_id });
    assert_eq!(principal.column(), ScopeColumn::AnonymousId);
    assert!(h.ctx.keys().is_initialized());
}

#[tokio::test]
async fn test_authenticated_takes_precedence_over_stored_anonymous_id() {
    let h = harness();
    h.start_anonymous();

    let user_id = Uuid::new_v4();
    // session present while the anonymous id is still in device storage
    h.sessions
        .set_session(Some(Session::new("tok", user_id)));

    let principal = h.ctx.resolver().current_identity().await.unwrap().unwrap();
    assert_eq!(principal, Principal::Authenticated { id: user_id });
    assert_eq!(principal.column(), ScopeColumn::UserId);
}

#[tokio::test]
async fn test_sign_in_clears_stored_anonymous_identity() {
    let h = harness();
    h.start_anonymous();
    assert!(h.device.get(ANONYMOUS_ID_STORAGE_KEY).is_some());

    let user_id = Uuid::new_v4();
    h.sign_in(user_id);

    assert!(h.device.get(ANONYMOUS_ID_STORAGE_KEY).is_none());
    assert_eq!(
        h.ctx.auth().state(),
        AuthState::Authenticated { user_id }
    );

    // a stale anonymous identifier can never shadow the account
    let principal = h.ctx.resolver().current_identity().await.unwrap().unwrap();
    assert_eq!(principal, Principal::Authenticated { id: user_id });
}

#[tokio::test]
async fn test_initialize_prefers_session_then_anonymous_then_signed_out() {
    let h = harness();
    assert_eq!(
        h.ctx.auth().initialize(None).unwrap(),
        AuthState::SignedOut
    );

    let anonymous_id = h.start_anonymous();
    assert_eq!(
        h.ctx.auth().initialize(None).unwrap(),
        AuthState::Anonymous { anonymous_id }
    );

    let user_id = Uuid::new_v4();
    let session = Session::new("tok", user_id);
    assert_eq!(
        h.ctx.auth().initialize(Some(&session)).unwrap(),
        AuthState::Authenticated { user_id }
    );
}

#[tokio::test]
async fn test_sign_out_default_keeps_anonymous_identity_for_next_init() {
    let h = harness_with_behavior(SignOutBehavior::EndAuthenticatedOnly);
    let anonymous_id = h.start_anonymous();

    let state = h.ctx.auth().sign_out().unwrap();
    // never re-resolves to the stored identity within the transition
    assert_eq!(state, AuthState::SignedOut);
    assert!(!h.ctx.keys().is_initialized());

    // the identity survives and becomes active again on the next init
    assert!(h.device.get(ANONYMOUS_ID_STORAGE_KEY).is_some());
    assert_eq!(
        h.ctx.auth().initialize(None).unwrap(),
        AuthState::Anonymous { anonymous_id }
    );
}

#[tokio::test]
async fn test_sign_out_exit_anonymous_clears_everything() {
    let h = harness_with_behavior(SignOutBehavior::ExitAnonymousToo);
    h.start_anonymous();

    h.ctx.auth().sign_out().unwrap();

    assert!(h.device.get(ANONYMOUS_ID_STORAGE_KEY).is_none());
    assert!(!h.ctx.keys().is_initialized());
    assert_eq!(
        h.ctx.auth().initialize(None).unwrap(),
        AuthState::SignedOut
    );
}

#[tokio::test]
async fn test_anonymous_handoff_captures_identity_and_key() {
    let h = harness();
    assert!(h.ctx.auth().anonymous_handoff().unwrap().is_none());

    let anonymous_id = h.start_anonymous();
    let handoff = h.ctx.auth().anonymous_handoff().unwrap().unwrap();
    assert_eq!(handoff.anonymous_id, anonymous_id);

    // the captured key is the device key the anonymous data was written
    // under
    let current = h.ctx.keys().current().unwrap();
    assert_eq!(handoff.device_key.as_bytes(), current.as_bytes());
}

#[tokio::test]
async fn test_session_key_rotates_with_token() {
    let h = harness();
    let user_id = Uuid::new_v4();

    h.ctx
        .auth()
        .sign_in(&Session::new("token-one", user_id))
        .unwrap();
    let first = h.ctx.keys().current().unwrap();

    h.ctx
        .auth()
        .sign_in(&Session::new("token-two", user_id))
        .unwrap();
    let second = h.ctx.keys().current().unwrap();

    assert_ne!(first.as_bytes(), second.as_bytes());
}
