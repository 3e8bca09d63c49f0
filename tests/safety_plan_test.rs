// ABOUTME: Tests for the safety plan singleton: absent state, idempotent save, encryption
// ABOUTME: Saving twice must update in place, never duplicate the row
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use common::harness;
use solace_core::models::NewSafetyPlan;
use solace_core::services::SafetyPlanService;
use solace_core::store::{Query, RecordStore};
use std::sync::Arc;

fn plan_input() -> NewSafetyPlan {
    NewSafetyPlan {
        warning_signs: Some("isolating myself, skipping meals".into()),
        coping_strategies: Some("walk, call a friend, breathing exercise".into()),
        support_contacts: Some("Sam 555-0100".into()),
        professional_contacts: Some("Dr. Reyes 555-0101".into()),
        environment_safety: Some("keep medication with a friend".into()),
        reasons_to_live: Some("my sister, the garden".into()),
    }
}

#[tokio::test]
async fn test_absent_plan_is_none_not_error() {
    let h = harness();
    h.start_anonymous();
    let service = SafetyPlanService::new(Arc::clone(&h.ctx));

    let response = service.plan().await;
    assert!(response.is_ok());
    assert!(response.data.unwrap().is_none());
}

#[tokio::test]
async fn test_save_and_read_back_all_sections() {
    let h = harness();
    h.start_anonymous();
    let service = SafetyPlanService::new(Arc::clone(&h.ctx));

    let saved = service.save(plan_input()).await.data.unwrap();
    assert_eq!(
        saved.warning_signs.as_deref(),
        Some("isolating myself, skipping meals")
    );
    assert_eq!(saved.reasons_to_live.as_deref(), Some("my sister, the garden"));

    let read = service.plan().await.data.unwrap().unwrap();
    assert_eq!(read.id, saved.id);
    assert_eq!(
        read.coping_strategies.as_deref(),
        Some("walk, call a friend, breathing exercise")
    );
    assert_eq!(
        read.professional_contacts.as_deref(),
        Some("Dr. Reyes 555-0101")
    );
}

#[tokio::test]
async fn test_saving_twice_updates_in_place() {
    let h = harness();
    h.start_anonymous();
    let service = SafetyPlanService::new(Arc::clone(&h.ctx));

    let first = service.save(plan_input()).await.data.unwrap();

    let mut updated = plan_input();
    updated.warning_signs = Some("trouble sleeping".into());
    let second = service.save(updated).await.data.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.warning_signs.as_deref(), Some("trouble sleeping"));

    // exactly one persisted row for the principal
    let rows = h
        .store
        .select(Query::table("safety_plans"))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn test_sections_are_encrypted_at_rest() {
    let h = harness();
    h.start_anonymous();
    let service = SafetyPlanService::new(Arc::clone(&h.ctx));
    service.save(plan_input()).await.data.unwrap();

    let rows = h
        .store
        .select(Query::table("safety_plans"))
        .await
        .unwrap();
    let raw = serde_json::to_string(&rows[0]).unwrap();

    assert!(!raw.contains("my sister"));
    assert!(!raw.contains("Dr. Reyes"));
    assert!(rows[0].get("encrypted_reasons_to_live").is_some());
    assert!(rows[0].get("reasons_to_live").is_none());
}

#[tokio::test]
async fn test_save_without_principal_fails() {
    let h = harness();
    let service = SafetyPlanService::new(Arc::clone(&h.ctx));

    let response = service.save(plan_input()).await;
    assert_eq!(
        response.error.unwrap().code,
        solace_core::errors::ErrorCode::NoActivePrincipal
    );
}
