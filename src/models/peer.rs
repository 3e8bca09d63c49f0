// ABOUTME: Peer support models: supporters, matches, messages, groups, and feedback
// ABOUTME: Match reasons, preferences, message content, and feedback text are encrypted at rest
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness

use crate::errors::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Supporter certification tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupporterLevel {
    Community,
    Experienced,
    Certified,
}

impl SupporterLevel {
    /// Stored string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Community => "community",
            Self::Experienced => "experienced",
            Self::Certified => "certified",
        }
    }

    /// Convert from the stored string representation
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid supporter level
    pub fn from_str_value(s: &str) -> AppResult<Self> {
        match s {
            "community" => Ok(Self::Community),
            "experienced" => Ok(Self::Experienced),
            "certified" => Ok(Self::Certified),
            other => Err(AppError::invalid_input(format!(
                "unknown supporter level: {other}"
            ))),
        }
    }
}

/// A principal offering peer support
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerSupporter {
    /// Row identifier
    pub id: String,
    /// Owning authenticated user, if any
    pub user_id: Option<Uuid>,
    /// Owning anonymous principal, if any
    pub anonymous_id: Option<String>,
    /// Certification tier
    pub supporter_level: SupporterLevel,
    /// Months of lived/support experience
    pub experience_months: u32,
    /// Topics the supporter is comfortable with
    pub specializations: Vec<String>,
    /// Free-form availability schedule
    pub availability_hours: Value,
    /// Ceiling on concurrent matches
    pub max_concurrent_matches: u32,
    /// Matches currently assigned
    pub current_matches: u32,
    /// Lifetime completed sessions
    pub total_sessions: u32,
    /// Mean feedback rating
    pub average_rating: f64,
    /// Whether the supporter is accepting matches
    pub is_active: bool,
}

/// Input for creating a supporter profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupporterProfile {
    /// Certification tier
    pub supporter_level: SupporterLevel,
    /// Months of lived/support experience
    pub experience_months: u32,
    /// Topics the supporter is comfortable with
    pub specializations: Vec<String>,
    /// Free-form availability schedule
    pub availability_hours: Value,
    /// Ceiling on concurrent matches
    pub max_concurrent_matches: u32,
    /// Whether the supporter is accepting matches
    pub is_active: bool,
}

/// Partial update to a supporter profile; `None` fields are untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupporterProfileUpdate {
    /// New certification tier
    pub supporter_level: Option<SupporterLevel>,
    /// New specializations
    pub specializations: Option<Vec<String>>,
    /// New availability schedule
    pub availability_hours: Option<Value>,
    /// New concurrent-match ceiling
    pub max_concurrent_matches: Option<u32>,
    /// Activate or deactivate
    pub is_active: Option<bool>,
}

/// Shape of support being sought
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchType {
    OneTime,
    Ongoing,
    Crisis,
}

impl MatchType {
    /// Stored string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneTime => "one-time",
            Self::Ongoing => "ongoing",
            Self::Crisis => "crisis",
        }
    }

    /// Convert from the stored string representation
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid match type
    pub fn from_str_value(s: &str) -> AppResult<Self> {
        match s {
            "one-time" => Ok(Self::OneTime),
            "ongoing" => Ok(Self::Ongoing),
            "crisis" => Ok(Self::Crisis),
            other => Err(AppError::invalid_input(format!(
                "unknown match type: {other}"
            ))),
        }
    }
}

/// Lifecycle state of a match: pending -> active -> completed, or
/// pending -> cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    Active,
    Completed,
    Cancelled,
}

impl MatchStatus {
    /// Stored string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Convert from the stored string representation
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid match status
    pub fn from_str_value(s: &str) -> AppResult<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(AppError::invalid_input(format!(
                "unknown match status: {other}"
            ))),
        }
    }
}

/// A supporter-seeker pairing. The match reason and seeker preferences
/// are sensitive; session count and last interaction stay plaintext and
/// are bumped on every message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerMatch {
    /// Row identifier
    pub id: String,
    /// Seeking user, if authenticated
    pub seeker_user_id: Option<Uuid>,
    /// Seeking anonymous principal, if any
    pub seeker_anonymous_id: Option<String>,
    /// Supporting user, if authenticated
    pub supporter_user_id: Option<Uuid>,
    /// Supporting anonymous principal, if any
    pub supporter_anonymous_id: Option<String>,
    /// Shape of support sought
    pub match_type: MatchType,
    /// Lifecycle state
    pub status: MatchStatus,
    /// Why the seeker asked for support (sensitive)
    pub match_reason: Option<String>,
    /// Seeker preferences snapshot (sensitive)
    pub seeker_preferences: Option<String>,
    /// Messages exchanged within this match
    pub session_count: u32,
    /// Timestamp of the most recent message
    pub last_interaction: Option<DateTime<Utc>>,
    /// When the match was created
    pub created_at: DateTime<Utc>,
}

/// Seeker preferences used to pick a supporter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchPreferences {
    /// Shape of support sought
    pub match_type: MatchType,
    /// Preferred specializations
    pub specializations: Option<Vec<String>>,
    /// Required supporter tier, if any
    pub supporter_level: Option<SupporterLevel>,
    /// Why support is being sought (sensitive, encrypted into the match)
    pub reason: Option<String>,
}

/// Kind of message within a peer match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerMessageType {
    Text,
    System,
    SafetyCheck,
}

impl PeerMessageType {
    /// Stored string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::System => "system",
            Self::SafetyCheck => "safety_check",
        }
    }

    /// Convert from the stored string representation
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid message type
    pub fn from_str_value(s: &str) -> AppResult<Self> {
        match s {
            "text" => Ok(Self::Text),
            "system" => Ok(Self::System),
            "safety_check" => Ok(Self::SafetyCheck),
            other => Err(AppError::invalid_input(format!(
                "unknown message type: {other}"
            ))),
        }
    }
}

/// A message within a peer match; content is always encrypted at rest.
/// The flagged reason stays plaintext so moderation staff can read it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerMessage {
    /// Row identifier
    pub id: String,
    /// Match this message belongs to
    pub match_id: String,
    /// Sending user, if authenticated
    pub sender_user_id: Option<Uuid>,
    /// Sending anonymous principal, if any
    pub sender_anonymous_id: Option<String>,
    /// Message text (sensitive)
    pub content: String,
    /// Kind of message
    pub message_type: PeerMessageType,
    /// Whether the message was flagged for moderation
    pub is_flagged: bool,
    /// Moderation reason, plaintext by design
    pub flagged_reason: Option<String>,
    /// When the message was sent
    pub created_at: DateTime<Utc>,
}

/// Topic a support group is organized around
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupCategory {
    Anxiety,
    Depression,
    Trauma,
    Addiction,
    Grief,
    General,
}

impl GroupCategory {
    /// Stored string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Anxiety => "anxiety",
            Self::Depression => "depression",
            Self::Trauma => "trauma",
            Self::Addiction => "addiction",
            Self::Grief => "grief",
            Self::General => "general",
        }
    }

    /// Convert from the stored string representation
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid group category
    pub fn from_str_value(s: &str) -> AppResult<Self> {
        match s {
            "anxiety" => Ok(Self::Anxiety),
            "depression" => Ok(Self::Depression),
            "trauma" => Ok(Self::Trauma),
            "addiction" => Ok(Self::Addiction),
            "grief" => Ok(Self::Grief),
            "general" => Ok(Self::General),
            other => Err(AppError::invalid_input(format!(
                "unknown group category: {other}"
            ))),
        }
    }
}

/// A topic-based support group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportGroup {
    /// Row identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Short description
    pub description: String,
    /// Organizing topic
    pub category: GroupCategory,
    /// Membership ceiling
    pub max_members: u32,
    /// Current membership count
    pub current_members: u32,
    /// Whether a moderator is assigned
    pub is_moderated: bool,
    /// Whether the group accepts new members
    pub is_active: bool,
}

/// Role within a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupRole {
    Member,
    Moderator,
}

impl GroupRole {
    /// Stored string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Moderator => "moderator",
        }
    }

    /// Convert from the stored string representation
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid group role
    pub fn from_str_value(s: &str) -> AppResult<Self> {
        match s {
            "member" => Ok(Self::Member),
            "moderator" => Ok(Self::Moderator),
            other => Err(AppError::invalid_input(format!(
                "unknown group role: {other}"
            ))),
        }
    }
}

/// A principal's membership in a support group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMembership {
    /// Row identifier
    pub id: String,
    /// Group joined
    pub group_id: String,
    /// Member user, if authenticated
    pub user_id: Option<Uuid>,
    /// Member anonymous principal, if any
    pub anonymous_id: Option<String>,
    /// Role within the group
    pub role: GroupRole,
    /// When the membership was created
    pub joined_at: DateTime<Utc>,
}

/// Kind of message within a support group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupMessageType {
    Text,
    System,
    Announcement,
}

impl GroupMessageType {
    /// Stored string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::System => "system",
            Self::Announcement => "announcement",
        }
    }

    /// Convert from the stored string representation
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid group message type
    pub fn from_str_value(s: &str) -> AppResult<Self> {
        match s {
            "text" => Ok(Self::Text),
            "system" => Ok(Self::System),
            "announcement" => Ok(Self::Announcement),
            other => Err(AppError::invalid_input(format!(
                "unknown group message type: {other}"
            ))),
        }
    }
}

/// A message within a support group; content encrypted, flag reason
/// plaintext, same as peer messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMessage {
    /// Row identifier
    pub id: String,
    /// Group this message belongs to
    pub group_id: String,
    /// Sending user, if authenticated
    pub sender_user_id: Option<Uuid>,
    /// Sending anonymous principal, if any
    pub sender_anonymous_id: Option<String>,
    /// Message text (sensitive)
    pub content: String,
    /// Kind of message
    pub message_type: GroupMessageType,
    /// Whether the message was flagged for moderation
    pub is_flagged: bool,
    /// Moderation reason, plaintext by design
    pub flagged_reason: Option<String>,
    /// When the message was sent
    pub created_at: DateTime<Utc>,
}

/// Which side of the match is being reviewed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackRole {
    Supporter,
    Seeker,
}

impl FeedbackRole {
    /// Stored string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Supporter => "supporter",
            Self::Seeker => "seeker",
        }
    }

    /// Convert from the stored string representation
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid feedback role
    pub fn from_str_value(s: &str) -> AppResult<Self> {
        match s {
            "supporter" => Ok(Self::Supporter),
            "seeker" => Ok(Self::Seeker),
            other => Err(AppError::invalid_input(format!(
                "unknown feedback role: {other}"
            ))),
        }
    }
}

/// Post-match feedback; the free-text portion is encrypted at rest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerFeedback {
    /// Row identifier
    pub id: String,
    /// Match being reviewed
    pub match_id: String,
    /// Reviewing user, if authenticated
    pub reviewer_user_id: Option<Uuid>,
    /// Reviewing anonymous principal, if any
    pub reviewer_anonymous_id: Option<String>,
    /// Rating, 1-5
    pub rating: u8,
    /// Free-text feedback (sensitive)
    pub feedback: Option<String>,
    /// Which side is being reviewed
    pub feedback_type: FeedbackRole,
    /// When the feedback was submitted
    pub created_at: DateTime<Utc>,
}
