// ABOUTME: Tests for the anonymous-to-authenticated data migration
// ABOUTME: Rows are re-encrypted under the session key and re-pointed to the user id
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use common::{harness, quick_entry};
use solace_core::models::NewSafetyPlan;
use solace_core::services::{MigrationService, MoodService, SafetyPlanService};
use solace_core::store::{Query, RecordStore};
use std::sync::Arc;
use uuid::Uuid;

#[tokio::test]
async fn test_migration_rescopes_and_reencrypts() {
    let h = harness();
    let anonymous_id = h.start_anonymous();

    let mood = MoodService::new(Arc::clone(&h.ctx));
    let mut input = quick_entry(4);
    input.notes = Some("written while anonymous".into());
    mood.create_entry(input).await.data.unwrap();
    mood.create_entry(quick_entry(6)).await.data.unwrap();

    let safety = SafetyPlanService::new(Arc::clone(&h.ctx));
    safety
        .save(NewSafetyPlan {
            reasons_to_live: Some("the mountains".into()),
            ..NewSafetyPlan::default()
        })
        .await
        .data
        .unwrap();

    // capture the outgoing identity before sign-in destroys it
    let handoff = h.ctx.auth().anonymous_handoff().unwrap().unwrap();
    assert_eq!(handoff.anonymous_id, anonymous_id);

    let user_id = Uuid::new_v4();
    h.sign_in(user_id);

    let report = MigrationService::new(Arc::clone(&h.ctx))
        .migrate_anonymous_data(&handoff, user_id)
        .await
        .data
        .unwrap();
    // two mood entries + one streak row + one safety plan
    assert_eq!(report.rows_migrated, 4);
    assert_eq!(report.rows_skipped, 0);

    // history is now visible to the authenticated principal, decrypted
    // with the session key
    let entries = mood.entries(30).await.data.unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries
        .iter()
        .any(|e| e.notes.as_deref() == Some("written while anonymous")));
    assert!(entries.iter().all(|e| e.user_id == Some(user_id)));
    assert!(entries.iter().all(|e| e.anonymous_id.is_none()));

    let plan = safety.plan().await.data.unwrap().unwrap();
    assert_eq!(plan.reasons_to_live.as_deref(), Some("the mountains"));

    // nothing remains scoped to the old anonymous identifier
    let leftover = h
        .store
        .select(Query::table("mood_entries").eq("anonymous_id", anonymous_id.clone()))
        .await
        .unwrap();
    assert!(leftover.is_empty());
}

#[tokio::test]
async fn test_migrated_ciphertext_changes_key() {
    let h = harness();
    h.start_anonymous();

    let mood = MoodService::new(Arc::clone(&h.ctx));
    let mut input = quick_entry(5);
    input.notes = Some("re-keyed on upgrade".into());
    mood.create_entry(input).await.data.unwrap();

    let before = h
        .store
        .select(Query::table("mood_entries"))
        .await
        .unwrap()[0]
        .get("encrypted_notes")
        .cloned()
        .unwrap();

    let handoff = h.ctx.auth().anonymous_handoff().unwrap().unwrap();
    let user_id = Uuid::new_v4();
    h.sign_in(user_id);

    MigrationService::new(Arc::clone(&h.ctx))
        .migrate_anonymous_data(&handoff, user_id)
        .await
        .data
        .unwrap();

    let after = h
        .store
        .select(Query::table("mood_entries"))
        .await
        .unwrap()[0]
        .get("encrypted_notes")
        .cloned()
        .unwrap();

    // same plaintext, different key and nonce, different ciphertext
    assert_ne!(before, after);

    let entries = mood.entries(30).await.data.unwrap();
    assert_eq!(entries[0].notes.as_deref(), Some("re-keyed on upgrade"));
}

#[tokio::test]
async fn test_migration_requires_installed_session_key() {
    let h = harness();
    h.start_anonymous();
    let handoff = h.ctx.auth().anonymous_handoff().unwrap().unwrap();

    // sign out clears the in-memory key entirely
    h.ctx.auth().sign_out().unwrap();
    h.sessions.set_session(None);

    let response = MigrationService::new(Arc::clone(&h.ctx))
        .migrate_anonymous_data(&handoff, Uuid::new_v4())
        .await;
    assert_eq!(
        response.error.unwrap().code,
        solace_core::errors::ErrorCode::KeyNotInitialized
    );
}

#[tokio::test]
async fn test_migration_report_counts_undecryptable_rows() {
    let h = harness();
    let anonymous_id = h.start_anonymous();

    // a row encrypted under some other device's key
    h.store
        .insert(
            "mood_entries",
            serde_json::json!({
                "anonymous_id": anonymous_id,
                "mood_score": 5,
                "check_in_type": "quick",
                "encrypted_notes": "bm90LXJlYWwtY2lwaGVydGV4dA==",
            })
            .as_object()
            .unwrap()
            .clone(),
        )
        .await
        .unwrap();

    let handoff = h.ctx.auth().anonymous_handoff().unwrap().unwrap();
    let user_id = Uuid::new_v4();
    h.sign_in(user_id);

    let report = MigrationService::new(Arc::clone(&h.ctx))
        .migrate_anonymous_data(&handoff, user_id)
        .await
        .data
        .unwrap();
    assert_eq!(report.rows_migrated, 0);
    assert_eq!(report.rows_skipped, 1);

    // the unreadable row stays under its original scope
    let rows = h
        .store
        .select(Query::table("mood_entries").eq("anonymous_id", anonymous_id))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].get("user_id").is_none());
}
