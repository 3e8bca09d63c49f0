// ABOUTME: Coping tool catalog, tool usage, safety plan, and crisis resource models
// ABOUTME: Usage notes and every safety plan section are persisted only encrypted
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness

use crate::errors::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Therapeutic modality a coping tool belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    Cbt,
    Dbt,
    Mindfulness,
    Breathing,
    Grounding,
    Crisis,
    Movement,
    Creative,
}

impl ToolCategory {
    /// Stored string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cbt => "cbt",
            Self::Dbt => "dbt",
            Self::Mindfulness => "mindfulness",
            Self::Breathing => "breathing",
            Self::Grounding => "grounding",
            Self::Crisis => "crisis",
            Self::Movement => "movement",
            Self::Creative => "creative",
        }
    }

    /// Convert from the stored string representation
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid category
    pub fn from_str_value(s: &str) -> AppResult<Self> {
        match s {
            "cbt" => Ok(Self::Cbt),
            "dbt" => Ok(Self::Dbt),
            "mindfulness" => Ok(Self::Mindfulness),
            "breathing" => Ok(Self::Breathing),
            "grounding" => Ok(Self::Grounding),
            "crisis" => Ok(Self::Crisis),
            "movement" => Ok(Self::Movement),
            "creative" => Ok(Self::Creative),
            other => Err(AppError::invalid_input(format!(
                "unknown tool category: {other}"
            ))),
        }
    }
}

/// How much practice a tool assumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl DifficultyLevel {
    /// Stored string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }

    /// Convert from the stored string representation
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid difficulty level
    pub fn from_str_value(s: &str) -> AppResult<Self> {
        match s {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            other => Err(AppError::invalid_input(format!(
                "unknown difficulty level: {other}"
            ))),
        }
    }
}

/// A catalog entry in the coping-tool library. The catalog is shared,
/// not principal-scoped, and entirely plaintext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopingTool {
    /// Row identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Therapeutic modality
    pub category: ToolCategory,
    /// Short description
    pub description: String,
    /// Step-by-step instructions
    pub instructions: String,
    /// Expected duration in minutes
    pub duration_minutes: u32,
    /// Assumed practice level
    pub difficulty_level: DifficultyLevel,
    /// Evidence base summary, if documented
    pub evidence_base: Option<String>,
    /// Search tags
    pub tags: Vec<String>,
    /// Whether this tool is surfaced during crisis flows
    pub is_crisis_tool: bool,
}

/// One use of a coping tool by a principal; `notes` is sensitive and
/// persisted only as `encrypted_notes`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolUsage {
    /// Row identifier
    pub id: String,
    /// Owning authenticated user, if any
    pub user_id: Option<Uuid>,
    /// Owning anonymous principal, if any
    pub anonymous_id: Option<String>,
    /// Catalog tool used
    pub tool_id: String,
    /// Mood before the exercise, 1-10
    pub mood_before: Option<u8>,
    /// Mood after the exercise, 1-10
    pub mood_after: Option<u8>,
    /// Self-reported effectiveness, 1-5
    pub effectiveness_rating: Option<u8>,
    /// Free-text notes (sensitive)
    pub notes: Option<String>,
    /// Minutes actually spent
    pub duration_used: Option<u32>,
    /// Whether the exercise was completed
    pub completed: bool,
    /// When the usage was recorded
    pub created_at: DateTime<Utc>,
}

/// Input for recording tool usage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewToolUsage {
    /// Catalog tool used
    pub tool_id: String,
    /// Mood before the exercise, 1-10
    pub mood_before: Option<u8>,
    /// Mood after the exercise, 1-10
    pub mood_after: Option<u8>,
    /// Self-reported effectiveness, 1-5
    pub effectiveness_rating: Option<u8>,
    /// Free-text notes
    pub notes: Option<String>,
    /// Minutes actually spent
    pub duration_used: Option<u32>,
    /// Whether the exercise was completed
    pub completed: bool,
}

/// Per-tool effectiveness aggregate computed from usage history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolEffectiveness {
    /// Catalog tool id
    pub tool_id: String,
    /// Tool display name, when the catalog row still exists
    pub tool_name: Option<String>,
    /// Times the tool was used with a rating
    pub usage_count: u32,
    /// Mean effectiveness rating
    pub average_effectiveness: f64,
    /// Mean mood-after minus mood-before delta
    pub average_mood_improvement: f64,
}

/// A principal's safety plan: a one-per-principal singleton with six
/// free-text sections, each independently encrypted at rest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyPlan {
    /// Row identifier
    pub id: String,
    /// Owning authenticated user, if any
    pub user_id: Option<Uuid>,
    /// Owning anonymous principal, if any
    pub anonymous_id: Option<String>,
    /// Early warning signs (sensitive)
    pub warning_signs: Option<String>,
    /// Coping strategies that have helped (sensitive)
    pub coping_strategies: Option<String>,
    /// Friends and family to reach out to (sensitive)
    pub support_contacts: Option<String>,
    /// Professionals and services (sensitive)
    pub professional_contacts: Option<String>,
    /// Steps to make the environment safer (sensitive)
    pub environment_safety: Option<String>,
    /// Reasons to live (sensitive)
    pub reasons_to_live: Option<String>,
    /// When the plan was first created
    pub created_at: DateTime<Utc>,
    /// When the plan was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for saving a safety plan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSafetyPlan {
    /// Early warning signs
    pub warning_signs: Option<String>,
    /// Coping strategies that have helped
    pub coping_strategies: Option<String>,
    /// Friends and family to reach out to
    pub support_contacts: Option<String>,
    /// Professionals and services
    pub professional_contacts: Option<String>,
    /// Steps to make the environment safer
    pub environment_safety: Option<String>,
    /// Reasons to live
    pub reasons_to_live: Option<String>,
}

/// Kind of crisis resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Hotline,
    Chat,
    Text,
    Emergency,
    Website,
}

impl ResourceType {
    /// Stored string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hotline => "hotline",
            Self::Chat => "chat",
            Self::Text => "text",
            Self::Emergency => "emergency",
            Self::Website => "website",
        }
    }

    /// Convert from the stored string representation
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid resource type
    pub fn from_str_value(s: &str) -> AppResult<Self> {
        match s {
            "hotline" => Ok(Self::Hotline),
            "chat" => Ok(Self::Chat),
            "text" => Ok(Self::Text),
            "emergency" => Ok(Self::Emergency),
            "website" => Ok(Self::Website),
            other => Err(AppError::invalid_input(format!(
                "unknown resource type: {other}"
            ))),
        }
    }
}

/// A crisis support resource; shared directory, entirely plaintext
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrisisResource {
    /// Row identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Kind of resource
    pub resource_type: ResourceType,
    /// Phone number, for call/text resources
    pub phone_number: Option<String>,
    /// Website, for chat/web resources
    pub website_url: Option<String>,
    /// Short description
    pub description: String,
    /// Availability statement, e.g. "24/7"
    pub availability: String,
    /// ISO country code this resource serves
    pub country_code: String,
    /// Supported languages
    pub language_support: Vec<String>,
}
