// ABOUTME: Domain entity models for mood tracking, coping tools, peer support, and insights
// ABOUTME: Plaintext/ciphertext column split mirrors the hosted schema
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness

//! Domain models
//!
//! Every row-backed entity carries exactly one scoping identity
//! (`user_id` or `anonymous_id`). Sensitive free-text fields exist here
//! in decrypted form only; at rest they live in `encrypted_*` columns
//! that the services write and read through the field cipher.

pub mod insight;
pub mod mood;
pub mod peer;
pub mod tools;

pub use insight::{
    AiInsight, InsightType, PatternAnalysis, PatternFrequency, PatternType, RiskAssessment,
    RiskLevel,
};
pub use mood::{CheckInType, MoodEntry, MoodStats, MoodStreak, MoodTrend, NewMoodEntry};
pub use peer::{
    FeedbackRole, GroupCategory, GroupMembership, GroupMessage, GroupMessageType, GroupRole,
    MatchPreferences, MatchStatus, MatchType, PeerFeedback, PeerMatch, PeerMessage,
    PeerMessageType, PeerSupporter, SupportGroup, SupporterLevel, SupporterProfile,
    SupporterProfileUpdate,
};
pub use tools::{
    CopingTool, CrisisResource, DifficultyLevel, NewSafetyPlan, NewToolUsage, ResourceType,
    SafetyPlan, ToolCategory, ToolEffectiveness, ToolUsage,
};
