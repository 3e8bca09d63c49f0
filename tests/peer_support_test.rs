// ABOUTME: Tests for peer support: greedy matching, capacity ceilings, messaging, moderation
// ABOUTME: Message content stays encrypted at rest and decrypts on read and on push delivery
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use common::{harness, seed_group, seed_supporter};
use solace_core::errors::ErrorCode;
use solace_core::models::{
    FeedbackRole, GroupMessageType, MatchPreferences, MatchStatus, MatchType, PeerMessageType,
    SupporterLevel, SupporterProfile,
};
use solace_core::services::PeerSupportService;
use solace_core::store::{Query, RecordStore};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

fn preferences(reason: &str) -> MatchPreferences {
    MatchPreferences {
        match_type: MatchType::Ongoing,
        specializations: Some(vec!["anxiety".into()]),
        supporter_level: None,
        reason: Some(reason.to_string()),
    }
}

#[tokio::test]
async fn test_greedy_match_picks_highest_rated_under_capacity() {
    let h = harness();
    h.start_anonymous();
    let best = Uuid::new_v4();
    let full = Uuid::new_v4();
    let spare = Uuid::new_v4();
    // highest rated is at capacity, so the next best under capacity wins
    seed_supporter(&h.store, full, 5.0, 2, 2).await;
    seed_supporter(&h.store, best, 4.7, 3, 1).await;
    seed_supporter(&h.store, spare, 3.1, 3, 0).await;

    let service = PeerSupportService::new(Arc::clone(&h.ctx));
    let matched = service
        .find_supporter(preferences("work stress"))
        .await
        .data
        .unwrap();

    assert_eq!(matched.supporter_user_id, Some(best));
    assert_eq!(matched.status, MatchStatus::Pending);
    assert_eq!(matched.match_reason.as_deref(), Some("work stress"));

    // the selected supporter's slot count was claimed
    let row = h
        .store
        .select_one(Query::table("peer_supporters").eq("user_id", best.to_string()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.get("current_matches").unwrap().as_u64(), Some(2));
}

#[tokio::test]
async fn test_no_available_supporter_is_an_error() {
    let h = harness();
    h.start_anonymous();
    seed_supporter(&h.store, Uuid::new_v4(), 4.0, 1, 1).await;

    let service = PeerSupportService::new(Arc::clone(&h.ctx));
    let response = service.find_supporter(preferences("anything")).await;
    assert_eq!(response.error.unwrap().code, ErrorCode::ResourceNotFound);
}

#[tokio::test]
async fn test_match_reason_encrypted_at_rest() {
    let h = harness();
    h.start_anonymous();
    seed_supporter(&h.store, Uuid::new_v4(), 4.0, 3, 0).await;

    let service = PeerSupportService::new(Arc::clone(&h.ctx));
    service
        .find_supporter(preferences("my private reason"))
        .await
        .data
        .unwrap();

    let rows = h.store.select(Query::table("peer_matches")).await.unwrap();
    let raw = serde_json::to_string(&rows[0]).unwrap();
    assert!(!raw.contains("my private reason"));
    assert!(rows[0].get("encrypted_match_reason").is_some());
}

#[tokio::test]
async fn test_messages_round_trip_oldest_first_and_bump_match() {
    let h = harness();
    h.start_anonymous();
    seed_supporter(&h.store, Uuid::new_v4(), 4.0, 3, 0).await;
    let service = PeerSupportService::new(Arc::clone(&h.ctx));

    let matched = service
        .find_supporter(preferences("need to talk"))
        .await
        .data
        .unwrap();

    service
        .send_message(&matched.id, "hello there", PeerMessageType::Text)
        .await
        .data
        .unwrap();
    service
        .send_message(&matched.id, "second message", PeerMessageType::Text)
        .await
        .data
        .unwrap();

    let messages = service.messages(&matched.id, 50).await.data.unwrap();
    assert_eq!(messages.len(), 2);
    // oldest first for chat readability
    assert_eq!(messages[0].content, "hello there");
    assert_eq!(messages[1].content, "second message");

    // plaintext bookkeeping on the match row
    let row = h
        .store
        .select_one(Query::table("peer_matches").eq("id", matched.id.clone()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.get("session_count").unwrap().as_u64(), Some(2));
    assert!(row.get("last_interaction").is_some());

    // content is ciphertext at rest
    let raw_messages = h.store.select(Query::table("peer_messages")).await.unwrap();
    let raw = serde_json::to_string(&raw_messages).unwrap();
    assert!(!raw.contains("hello there"));
}

#[tokio::test]
async fn test_match_status_lifecycle() {
    let h = harness();
    h.start_anonymous();
    seed_supporter(&h.store, Uuid::new_v4(), 4.0, 3, 0).await;
    let service = PeerSupportService::new(Arc::clone(&h.ctx));

    let matched = service
        .find_supporter(preferences("reason"))
        .await
        .data
        .unwrap();

    let active = service
        .update_match_status(&matched.id, MatchStatus::Active)
        .await
        .data
        .unwrap();
    assert_eq!(active.status, MatchStatus::Active);

    let completed = service
        .update_match_status(&matched.id, MatchStatus::Completed)
        .await
        .data
        .unwrap();
    assert_eq!(completed.status, MatchStatus::Completed);
}

#[tokio::test]
async fn test_group_join_rejected_at_capacity() {
    let h = harness();
    h.start_anonymous();
    let full_group = seed_group(&h.store, "Evening Circle", 8, 8).await;

    let service = PeerSupportService::new(Arc::clone(&h.ctx));
    let response = service.join_group(&full_group).await;
    assert_eq!(response.error.unwrap().code, ErrorCode::CapacityExceeded);

    // no membership row was created
    let memberships = h
        .store
        .select(Query::table("group_memberships"))
        .await
        .unwrap();
    assert!(memberships.is_empty());
}

#[tokio::test]
async fn test_group_join_and_my_groups() {
    let h = harness();
    h.start_anonymous();
    let group_id = seed_group(&h.store, "Morning Circle", 8, 3).await;

    let service = PeerSupportService::new(Arc::clone(&h.ctx));
    let membership = service.join_group(&group_id).await.data.unwrap();
    assert_eq!(membership.group_id, group_id);

    let groups = service.my_groups().await.data.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].group.name, "Morning Circle");
    assert_eq!(groups[0].group.current_members, 4);
}

#[tokio::test]
async fn test_group_messages_encrypted_round_trip() {
    let h = harness();
    h.start_anonymous();
    let group_id = seed_group(&h.store, "Circle", 8, 0).await;
    let service = PeerSupportService::new(Arc::clone(&h.ctx));
    service.join_group(&group_id).await.data.unwrap();

    service
        .send_group_message(&group_id, "welcome everyone", GroupMessageType::Text)
        .await
        .data
        .unwrap();

    let messages = service.group_messages(&group_id, 50).await.data.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "welcome everyone");

    let raw = h
        .store
        .select(Query::table("group_messages"))
        .await
        .unwrap();
    assert!(!serde_json::to_string(&raw).unwrap().contains("welcome everyone"));
}

#[tokio::test]
async fn test_flag_message_plaintext_reason_and_idempotent() {
    let h = harness();
    h.start_anonymous();
    seed_supporter(&h.store, Uuid::new_v4(), 4.0, 3, 0).await;
    let service = PeerSupportService::new(Arc::clone(&h.ctx));

    let matched = service
        .find_supporter(preferences("reason"))
        .await
        .data
        .unwrap();
    let message = service
        .send_message(&matched.id, "questionable content", PeerMessageType::Text)
        .await
        .data
        .unwrap();

    service
        .flag_message(&message.id, "inappropriate", false)
        .await
        .data
        .unwrap();
    // second flag simply overwrites the reason
    service
        .flag_message(&message.id, "harassment", false)
        .await
        .data
        .unwrap();

    let row = h
        .store
        .select_one(Query::table("peer_messages").eq("id", message.id.clone()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.get("is_flagged").unwrap().as_bool(), Some(true));
    // moderation staff must be able to read the reason
    assert_eq!(
        row.get("flagged_reason").unwrap().as_str(),
        Some("harassment")
    );
}

#[tokio::test]
async fn test_feedback_rolls_into_supporter_rating() {
    let h = harness();
    h.start_anonymous();
    let supporter = Uuid::new_v4();
    seed_supporter(&h.store, supporter, 0.0, 3, 0).await;
    let service = PeerSupportService::new(Arc::clone(&h.ctx));

    let matched = service
        .find_supporter(preferences("reason"))
        .await
        .data
        .unwrap();

    let feedback = service
        .submit_feedback(&matched.id, 5, Some("really helped me"), FeedbackRole::Supporter)
        .await
        .data
        .unwrap();
    assert_eq!(feedback.feedback.as_deref(), Some("really helped me"));

    let row = h
        .store
        .select_one(Query::table("peer_supporters").eq("user_id", supporter.to_string()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.get("total_sessions").unwrap().as_u64(), Some(1));
    assert_eq!(row.get("average_rating").unwrap().as_f64(), Some(5.0));
}

#[tokio::test]
async fn test_supporter_profile_singleton_and_update() {
    let h = harness();
    h.start_anonymous();
    let service = PeerSupportService::new(Arc::clone(&h.ctx));

    assert!(service.supporter_profile().await.data.unwrap().is_none());

    let created = service
        .become_supporter(SupporterProfile {
            supporter_level: SupporterLevel::Community,
            experience_months: 6,
            specializations: vec!["grief".into()],
            availability_hours: json!({"weekends": true}),
            max_concurrent_matches: 2,
            is_active: true,
        })
        .await
        .data
        .unwrap();
    assert_eq!(created.current_matches, 0);

    let updated = service
        .update_supporter(solace_core::models::SupporterProfileUpdate {
            is_active: Some(false),
            ..Default::default()
        })
        .await
        .data
        .unwrap();
    assert!(!updated.is_active);
    assert_eq!(updated.id, created.id);
}

#[tokio::test]
async fn test_subscription_decrypts_inbound_messages() {
    let h = harness();
    h.start_anonymous();
    seed_supporter(&h.store, Uuid::new_v4(), 4.0, 3, 0).await;
    let service = PeerSupportService::new(Arc::clone(&h.ctx));

    let matched = service
        .find_supporter(preferences("reason"))
        .await
        .data
        .unwrap();

    let mut subscription = service
        .subscribe_match_messages(&matched.id)
        .await
        .data
        .unwrap();

    service
        .send_message(&matched.id, "pushed and encrypted", PeerMessageType::Text)
        .await
        .data
        .unwrap();

    let delivered = subscription.next().await.unwrap();
    assert_eq!(delivered.content, "pushed and encrypted");
    assert_eq!(delivered.match_id, matched.id);
}
