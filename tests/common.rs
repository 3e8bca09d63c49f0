// ABOUTME: Shared test fixtures: wired-up contexts, seeded rows, and entry factories
// ABOUTME: Builds isolated in-process harnesses per test
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness

#![allow(dead_code)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{Duration, Utc};
use serde_json::{json, Value};
use solace_core::config::ClientConfig;
use solace_core::identity::{MemoryDeviceStore, Session, SignOutBehavior, StaticSessionProvider};
use solace_core::models::{CheckInType, MoodEntry, NewMoodEntry};
use solace_core::services::ServiceContext;
use solace_core::store::{MemoryStore, RecordStore, Row};
use std::sync::Arc;
use uuid::Uuid;

/// A fully wired, isolated test environment
pub struct TestHarness {
    pub ctx: Arc<ServiceContext>,
    pub store: Arc<MemoryStore>,
    pub sessions: Arc<StaticSessionProvider>,
    pub device: Arc<MemoryDeviceStore>,
}

pub fn harness() -> TestHarness {
    harness_with_config(ClientConfig::default())
}

pub fn harness_with_behavior(behavior: SignOutBehavior) -> TestHarness {
    let config = ClientConfig {
        sign_out_behavior: behavior,
        ..ClientConfig::default()
    };
    harness_with_config(config)
}

pub fn harness_with_config(config: ClientConfig) -> TestHarness {
    let store = Arc::new(MemoryStore::new());
    let sessions = Arc::new(StaticSessionProvider::signed_out());
    let device = Arc::new(MemoryDeviceStore::new());

    let ctx = ServiceContext::new(
        Arc::clone(&store) as Arc<dyn RecordStore>,
        Arc::clone(&sessions) as Arc<dyn solace_core::identity::SessionProvider>,
        Arc::clone(&device) as Arc<dyn solace_core::identity::DeviceStorage>,
        config,
    );

    TestHarness {
        ctx,
        store,
        sessions,
        device,
    }
}

impl TestHarness {
    /// Start an anonymous session, returning the generated identifier
    pub fn start_anonymous(&self) -> String {
        self.ctx.auth().start_anonymous().unwrap()
    }

    /// Establish an authenticated session for the given user
    pub fn sign_in(&self, user_id: Uuid) -> Session {
        let session = Session::new(format!("access-token-{user_id}"), user_id);
        self.sessions.set_session(Some(session.clone()));
        self.ctx.auth().sign_in(&session).unwrap();
        session
    }
}

/// A detailed check-in with the given score and no journal fields
pub fn quick_entry(score: u8) -> NewMoodEntry {
    NewMoodEntry {
        mood_score: score,
        check_in_type: CheckInType::Quick,
        ..NewMoodEntry::default()
    }
}

/// A decrypted in-memory mood entry `days_ago` days old, for feeding the
/// insight engine directly
pub fn entry_days_ago(score: u8, days_ago: i64) -> MoodEntry {
    MoodEntry {
        id: Uuid::new_v4().to_string(),
        user_id: None,
        anonymous_id: None,
        mood_score: score,
        energy_level: None,
        anxiety_level: None,
        sleep_quality: None,
        notes: None,
        triggers: None,
        gratitude: None,
        check_in_type: CheckInType::Quick,
        created_at: Utc::now() - Duration::days(days_ago),
    }
}

fn object(value: Value) -> Row {
    value.as_object().expect("object literal").clone()
}

/// Seed a supporter row directly into the store
pub async fn seed_supporter(
    store: &MemoryStore,
    user_id: Uuid,
    rating: f64,
    max_matches: u32,
    current_matches: u32,
) -> String {
    let row = store
        .insert(
            "peer_supporters",
            object(json!({
                "user_id": user_id.to_string(),
                "supporter_level": "experienced",
                "experience_months": 12,
                "specializations": ["anxiety"],
                "availability_hours": {"weekdays": "evenings"},
                "max_concurrent_matches": max_matches,
                "current_matches": current_matches,
                "total_sessions": 0,
                "average_rating": rating,
                "is_active": true,
            })),
        )
        .await
        .unwrap();
    row.get("id").unwrap().as_str().unwrap().to_string()
}

/// Seed a support group row directly into the store
pub async fn seed_group(
    store: &MemoryStore,
    name: &str,
    max_members: u32,
    current_members: u32,
) -> String {
    let row = store
        .insert(
            "support_groups",
            object(json!({
                "name": name,
                "description": "a place to talk",
                "category": "anxiety",
                "max_members": max_members,
                "current_members": current_members,
                "is_moderated": true,
                "is_active": true,
            })),
        )
        .await
        .unwrap();
    row.get("id").unwrap().as_str().unwrap().to_string()
}

/// Seed a coping tool row directly into the store
pub async fn seed_tool(store: &MemoryStore, name: &str, category: &str) -> String {
    let row = store
        .insert(
            "coping_tools",
            object(json!({
                "name": name,
                "category": category,
                "description": "short description",
                "instructions": "step one, step two",
                "duration_minutes": 5,
                "difficulty_level": "beginner",
                "tags": ["calming"],
                "is_crisis_tool": false,
            })),
        )
        .await
        .unwrap();
    row.get("id").unwrap().as_str().unwrap().to_string()
}
