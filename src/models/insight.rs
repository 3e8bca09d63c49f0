// ABOUTME: Derived analytics models: insights, pattern analyses, and risk assessments
// ABOUTME: Content, descriptions, and recommendations are encrypted at rest
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness

use crate::errors::{AppError, AppResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of generated insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    MoodPattern,
    TriggerAnalysis,
    ProgressSummary,
    Recommendation,
    Warning,
}

impl InsightType {
    /// Stored string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MoodPattern => "mood_pattern",
            Self::TriggerAnalysis => "trigger_analysis",
            Self::ProgressSummary => "progress_summary",
            Self::Recommendation => "recommendation",
            Self::Warning => "warning",
        }
    }

    /// Convert from the stored string representation
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid insight type
    pub fn from_str_value(s: &str) -> AppResult<Self> {
        match s {
            "mood_pattern" => Ok(Self::MoodPattern),
            "trigger_analysis" => Ok(Self::TriggerAnalysis),
            "progress_summary" => Ok(Self::ProgressSummary),
            "recommendation" => Ok(Self::Recommendation),
            "warning" => Ok(Self::Warning),
            other => Err(AppError::invalid_input(format!(
                "unknown insight type: {other}"
            ))),
        }
    }
}

/// A generated wellness insight. Derived, never user-authored; immutable
/// once created except for the reviewed flag. Content is encrypted at rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiInsight {
    /// Row identifier
    pub id: String,
    /// Owning authenticated user, if any
    pub user_id: Option<Uuid>,
    /// Owning anonymous principal, if any
    pub anonymous_id: Option<String>,
    /// Kind of insight
    pub insight_type: InsightType,
    /// Insight text (sensitive)
    pub content: String,
    /// Confidence in the statement, 0-1
    pub confidence_score: f64,
    /// First day of the analyzed period
    pub data_period_start: NaiveDate,
    /// Last day of the analyzed period
    pub data_period_end: NaiveDate,
    /// Whether the user has reviewed this insight
    pub is_reviewed: bool,
    /// When the insight was generated
    pub created_at: DateTime<Utc>,
}

/// Kind of detected pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    MoodCycle,
    TriggerCorrelation,
    SleepMood,
    EnergyMood,
    WeeklyPattern,
    StressResponse,
}

impl PatternType {
    /// Stored string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MoodCycle => "mood_cycle",
            Self::TriggerCorrelation => "trigger_correlation",
            Self::SleepMood => "sleep_mood",
            Self::EnergyMood => "energy_mood",
            Self::WeeklyPattern => "weekly_pattern",
            Self::StressResponse => "stress_response",
        }
    }

    /// Convert from the stored string representation
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid pattern type
    pub fn from_str_value(s: &str) -> AppResult<Self> {
        match s {
            "mood_cycle" => Ok(Self::MoodCycle),
            "trigger_correlation" => Ok(Self::TriggerCorrelation),
            "sleep_mood" => Ok(Self::SleepMood),
            "energy_mood" => Ok(Self::EnergyMood),
            "weekly_pattern" => Ok(Self::WeeklyPattern),
            "stress_response" => Ok(Self::StressResponse),
            other => Err(AppError::invalid_input(format!(
                "unknown pattern type: {other}"
            ))),
        }
    }
}

/// How often a pattern recurs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternFrequency {
    Daily,
    Weekly,
    Monthly,
    Irregular,
}

impl PatternFrequency {
    /// Stored string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Irregular => "irregular",
        }
    }

    /// Convert from the stored string representation
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid pattern frequency
    pub fn from_str_value(s: &str) -> AppResult<Self> {
        match s {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "irregular" => Ok(Self::Irregular),
            other => Err(AppError::invalid_input(format!(
                "unknown pattern frequency: {other}"
            ))),
        }
    }
}

/// A detected correlation or cycle in mood history. The description is
/// encrypted at rest; strength and frequency stay plaintext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternAnalysis {
    /// Row identifier
    pub id: String,
    /// Owning authenticated user, if any
    pub user_id: Option<Uuid>,
    /// Owning anonymous principal, if any
    pub anonymous_id: Option<String>,
    /// Kind of pattern
    pub pattern_type: PatternType,
    /// Narrative description (sensitive)
    pub description: String,
    /// Pattern strength, 0-1
    pub strength: f64,
    /// How often the pattern recurs
    pub frequency: PatternFrequency,
    /// Trigger tags involved, when applicable
    pub triggers: Vec<String>,
    /// Suggested responses
    pub recommendations: Vec<String>,
    /// When the pattern was detected
    pub created_at: DateTime<Utc>,
}

/// Assessed crisis-risk level, in escalating order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Crisis,
}

impl RiskLevel {
    /// Stored string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Crisis => "crisis",
        }
    }

    /// Convert from the stored string representation
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid risk level
    pub fn from_str_value(s: &str) -> AppResult<Self> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "crisis" => Ok(Self::Crisis),
            other => Err(AppError::invalid_input(format!(
                "unknown risk level: {other}"
            ))),
        }
    }
}

/// A computed crisis-risk assessment. Emitted only when at least one
/// risk factor exists; recommendations are encrypted at rest, the factor
/// lists stay plaintext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Row identifier
    pub id: String,
    /// Owning authenticated user, if any
    pub user_id: Option<Uuid>,
    /// Owning anonymous principal, if any
    pub anonymous_id: Option<String>,
    /// Assessed level
    pub risk_level: RiskLevel,
    /// Signals that raised the level
    pub risk_factors: Vec<String>,
    /// Observed mitigating signals; never lower the level
    pub protective_factors: Vec<String>,
    /// Guidance text (sensitive)
    pub recommendations: Option<String>,
    /// Whether immediate intervention is indicated
    pub requires_intervention: bool,
    /// When the assessment was made
    pub created_at: DateTime<Utc>,
}
