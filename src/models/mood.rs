// ABOUTME: Mood entry, streak, and aggregate statistics models
// ABOUTME: Notes, triggers, and gratitude are sensitive and persisted only encrypted
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness

use crate::errors::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How thorough a check-in was
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckInType {
    /// Mood score only
    Quick,
    /// Mood score plus sub-scores and journal fields
    Detailed,
}

impl CheckInType {
    /// Convert from the stored string representation
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid check-in type
    pub fn from_str_value(s: &str) -> AppResult<Self> {
        match s {
            "quick" => Ok(Self::Quick),
            "detailed" => Ok(Self::Detailed),
            other => Err(AppError::invalid_input(format!(
                "unknown check-in type: {other}"
            ))),
        }
    }

    /// Stored string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quick => "quick",
            Self::Detailed => "detailed",
        }
    }
}

/// A single mood check-in
///
/// Scores are 1-10. `notes`, `triggers`, and `gratitude` are sensitive:
/// at rest they exist only as `encrypted_notes`, `encrypted_triggers`,
/// and `encrypted_gratitude`. Numeric scores and the check-in type stay
/// plaintext so the store can filter and sort on them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoodEntry {
    /// Row identifier
    pub id: String,
    /// Owning authenticated user, if any
    pub user_id: Option<Uuid>,
    /// Owning anonymous principal, if any
    pub anonymous_id: Option<String>,
    /// Overall mood, 1-10
    pub mood_score: u8,
    /// Energy level, 1-10
    pub energy_level: Option<u8>,
    /// Anxiety level, 1-10
    pub anxiety_level: Option<u8>,
    /// Sleep quality, 1-10
    pub sleep_quality: Option<u8>,
    /// Free-text journal notes (sensitive)
    pub notes: Option<String>,
    /// Trigger tags (sensitive)
    pub triggers: Option<Vec<String>>,
    /// Gratitude text (sensitive)
    pub gratitude: Option<String>,
    /// Quick or detailed check-in
    pub check_in_type: CheckInType,
    /// When the entry was created
    pub created_at: DateTime<Utc>,
}

/// Input for creating a mood entry; identity and timestamps are stamped
/// by the service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewMoodEntry {
    /// Overall mood, 1-10 (required)
    pub mood_score: u8,
    /// Energy level, 1-10
    pub energy_level: Option<u8>,
    /// Anxiety level, 1-10
    pub anxiety_level: Option<u8>,
    /// Sleep quality, 1-10
    pub sleep_quality: Option<u8>,
    /// Free-text journal notes
    pub notes: Option<String>,
    /// Trigger tags
    pub triggers: Option<Vec<String>>,
    /// Gratitude text
    pub gratitude: Option<String>,
    /// Quick or detailed check-in
    pub check_in_type: CheckInType,
}

impl Default for CheckInType {
    fn default() -> Self {
        Self::Quick
    }
}

/// Consecutive-day check-in streak, one row per principal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoodStreak {
    /// Row identifier
    pub id: String,
    /// Owning authenticated user, if any
    pub user_id: Option<Uuid>,
    /// Owning anonymous principal, if any
    pub anonymous_id: Option<String>,
    /// Current consecutive-day streak
    pub current_streak: u32,
    /// Longest streak ever reached
    pub longest_streak: u32,
    /// Most recent check-in timestamp
    pub last_check_in: DateTime<Utc>,
    /// Lifetime check-in count
    pub total_check_ins: u32,
}

/// Direction of the recent mood trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoodTrend {
    /// Recent average meaningfully above the previous period
    Improving,
    /// Recent average meaningfully below the previous period
    Declining,
    /// Difference below the noise threshold
    Stable,
}

/// Aggregate statistics over recent mood history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoodStats {
    /// Mean mood over the analysis window, rounded to one decimal
    pub average_mood: f64,
    /// Recent-versus-previous trend classification
    pub mood_trend: MoodTrend,
    /// Lifetime check-in count
    pub total_entries: u32,
    /// Current consecutive-day streak
    pub current_streak: u32,
    /// Longest streak ever reached
    pub longest_streak: u32,
    /// Most recent check-in, if any
    pub last_check_in: Option<DateTime<Utc>>,
}

impl MoodStats {
    /// Stats for a principal with no history yet
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            average_mood: 0.0,
            mood_trend: MoodTrend::Stable,
            total_entries: 0,
            current_streak: 0,
            longest_streak: 0,
            last_check_in: None,
        }
    }
}
