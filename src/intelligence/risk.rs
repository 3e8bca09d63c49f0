// ABOUTME: Crisis-risk assessment over recent mood history
// ABOUTME: Numeric thresholds plus a crisis-phrase scan that overrides them
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness

//! Risk assessment
//!
//! Deterministic and conservative: numeric thresholds on the seven most
//! recent entries, a case-insensitive substring scan of notes for crisis
//! indicators that forces the level to crisis regardless of the numbers,
//! and additive protective factors that never downgrade an elevated
//! level. No assessment is emitted when no risk factor exists - there is
//! deliberately no persisted "all clear".

use crate::intelligence::statistics::{mean, population_std_dev};
use crate::models::{MoodEntry, RiskAssessment, RiskLevel};
use chrono::Utc;
use uuid::Uuid;

/// Mean mood below this is high risk
const HIGH_RISK_MEAN: f64 = 3.0;

/// Mean mood below this is at least medium risk
const MEDIUM_RISK_MEAN: f64 = 5.0;

/// Mood standard deviation above this escalates to at least medium
const VARIABILITY_THRESHOLD: f64 = 2.5;

/// Entries considered by the assessment
const ASSESSMENT_WINDOW: usize = 7;

/// Phrases that force a crisis classification when found in notes.
/// Matched case-insensitively as substrings.
const CRISIS_INDICATORS: [&str; 7] = [
    "hopeless",
    "worthless",
    "suicide",
    "kill myself",
    "end it all",
    "no point",
    "give up",
];

/// Assess crisis risk over mood history (newest first).
///
/// Returns `None` below three entries, or when no risk factor exists.
#[must_use]
pub fn assess_risk(entries: &[MoodEntry]) -> Option<RiskAssessment> {
    if entries.len() < 3 {
        return None;
    }

    let recent: Vec<&MoodEntry> = entries.iter().take(ASSESSMENT_WINDOW).collect();
    let scores: Vec<f64> = recent.iter().map(|e| f64::from(e.mood_score)).collect();
    let average = mean(&scores);
    let variability = population_std_dev(&scores);

    let mut risk_factors = Vec::new();
    let mut protective_factors = Vec::new();
    let mut level = RiskLevel::Low;

    if average < HIGH_RISK_MEAN {
        risk_factors.push("Consistently low mood scores".to_string());
        level = level.max(RiskLevel::High);
    } else if average < MEDIUM_RISK_MEAN {
        risk_factors.push("Below-average mood scores".to_string());
        level = level.max(RiskLevel::Medium);
    }

    if variability > VARIABILITY_THRESHOLD {
        risk_factors.push("High mood variability".to_string());
        level = level.max(RiskLevel::Medium);
    }

    // the phrase scan overrides every numeric threshold
    let concerning_content = recent.iter().any(|entry| {
        entry.notes.as_deref().is_some_and(|notes| {
            let lowered = notes.to_lowercase();
            CRISIS_INDICATORS
                .iter()
                .any(|indicator| lowered.contains(indicator))
        })
    });
    let requires_intervention = concerning_content;
    if concerning_content {
        risk_factors.push("Concerning language in journal entries".to_string());
        level = RiskLevel::Crisis;
    }

    // protective factors are observations, never downgrades
    if recent.len() >= 5 {
        protective_factors.push("Consistent mood tracking".to_string());
    }
    if recent.iter().any(|entry| entry.gratitude.is_some()) {
        protective_factors.push("Practicing gratitude".to_string());
    }
    if average >= 6.0 {
        protective_factors.push("Generally positive mood".to_string());
    }

    if risk_factors.is_empty() {
        return None;
    }

    let recommendations = match level {
        RiskLevel::Crisis => Some(
            "Immediate professional support recommended. Please contact a crisis hotline or emergency services."
                .to_string(),
        ),
        RiskLevel::High => Some(
            "Consider reaching out to a mental health professional for support and guidance."
                .to_string(),
        ),
        RiskLevel::Medium => Some(
            "Focus on self-care, social connection, and monitor mood patterns closely."
                .to_string(),
        ),
        RiskLevel::Low => None,
    };

    Some(RiskAssessment {
        id: Uuid::new_v4().to_string(),
        user_id: None,
        anonymous_id: None,
        risk_level: level,
        risk_factors,
        protective_factors,
        recommendations,
        requires_intervention,
        created_at: Utc::now(),
    })
}
