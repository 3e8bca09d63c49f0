// ABOUTME: Tests for the insight engine: trend, triggers, sleep correlation, risk, refresh
// ABOUTME: Scenario coverage for thresholds, crisis overrides, and suppression rules
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use common::{entry_days_ago, harness, quick_entry};
use solace_core::intelligence::{assess_risk, trend_summary, InsightEngine};
use solace_core::models::{
    InsightType, MoodEntry, MoodTrend, PatternType, RiskLevel,
};
use solace_core::services::{InsightService, MoodService};
use std::sync::Arc;

/// Seven recent entries at `recent` and seven older at `previous`,
/// newest first
fn two_week_history(recent: u8, previous: u8) -> Vec<MoodEntry> {
    let mut entries = Vec::new();
    for day in 0..7 {
        entries.push(entry_days_ago(recent, day));
    }
    for day in 7..14 {
        entries.push(entry_days_ago(previous, day));
    }
    entries
}

#[tokio::test]
async fn test_improving_trend_scenario() {
    let entries = two_week_history(8, 6);

    let summary = trend_summary(&entries).unwrap();
    assert_eq!(summary.direction, MoodTrend::Improving);
    assert!((summary.delta - 2.0).abs() < 1e-9);
    assert!((summary.recent_average - 8.0).abs() < 1e-9);

    let analysis = InsightEngine::new().analyze(&entries).await;
    let trend_insight = analysis
        .insights
        .iter()
        .find(|i| i.insight_type == InsightType::MoodPattern)
        .unwrap();
    assert!(trend_insight.content.contains("improved by 2.0 points"));
    assert!((trend_insight.confidence_score - 0.9).abs() < 1e-9);
}

#[tokio::test]
async fn test_stable_and_declining_trends() {
    let stable = trend_summary(&two_week_history(7, 7)).unwrap();
    assert_eq!(stable.direction, MoodTrend::Stable);

    let declining = trend_summary(&two_week_history(4, 7)).unwrap();
    assert_eq!(declining.direction, MoodTrend::Declining);
    assert!((declining.delta + 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_below_three_entries_nothing_is_emitted() {
    let entries = vec![entry_days_ago(5, 0), entry_days_ago(6, 1)];
    let analysis = InsightEngine::new().analyze(&entries).await;
    assert!(analysis.insights.is_empty());
    assert!(analysis.patterns.is_empty());
    assert!(assess_risk(&entries).is_none());
}

#[tokio::test]
async fn test_trigger_correlation_pattern() {
    let mut entries = two_week_history(6, 6);
    entries[0].triggers = Some(vec!["Work".into(), "sleep".into()]);
    entries[1].triggers = Some(vec!["work ".into()]);
    entries[2].triggers = Some(vec!["work".into()]);

    let analysis = InsightEngine::new().analyze(&entries).await;
    let pattern = analysis
        .patterns
        .iter()
        .find(|p| p.pattern_type == PatternType::TriggerCorrelation)
        .unwrap();

    // case/whitespace-normalized: "Work", "work ", "work" all count once
    assert_eq!(pattern.triggers[0], "work");
    assert!((pattern.strength - 1.0).abs() < 1e-9);
    assert!(pattern.description.contains("3 times"));
    assert!(!pattern.recommendations.is_empty());
}

#[tokio::test]
async fn test_trigger_pattern_needs_two_tagged_entries() {
    let mut entries = two_week_history(6, 6);
    entries[0].triggers = Some(vec!["work".into()]);

    let analysis = InsightEngine::new().analyze(&entries).await;
    assert!(analysis
        .patterns
        .iter()
        .all(|p| p.pattern_type != PatternType::TriggerCorrelation));
}

#[tokio::test]
async fn test_sleep_mood_correlation_emitted_when_strong() {
    let mut entries = two_week_history(6, 6);
    // sleep and mood move together strongly
    let sleep = [2u8, 4, 6, 8, 10];
    let mood = [2u8, 4, 6, 8, 10];
    for (i, (s, m)) in sleep.iter().zip(mood.iter()).enumerate() {
        entries[i].sleep_quality = Some(*s);
        entries[i].mood_score = *m;
    }

    let analysis = InsightEngine::new().analyze(&entries).await;
    let pattern = analysis
        .patterns
        .iter()
        .find(|p| p.pattern_type == PatternType::SleepMood)
        .unwrap();
    assert!(pattern.description.contains("positive correlation"));
    assert!(pattern.strength >= 0.3);
}

#[tokio::test]
async fn test_sleep_mood_suppressed_below_noise_floor() {
    let mut entries = two_week_history(6, 6);
    // |r| well under 0.3 for these pairs
    let sleep = [1u8, 2, 3, 4, 5];
    let mood = [3u8, 7, 2, 8, 4];
    for (i, (s, m)) in sleep.iter().zip(mood.iter()).enumerate() {
        entries[i].sleep_quality = Some(*s);
        entries[i].mood_score = *m;
    }

    let analysis = InsightEngine::new().analyze(&entries).await;
    assert!(analysis
        .patterns
        .iter()
        .all(|p| p.pattern_type != PatternType::SleepMood));
}

#[tokio::test]
async fn test_sleep_mood_needs_five_samples() {
    let mut entries = two_week_history(6, 6);
    for i in 0..4 {
        entries[i].sleep_quality = Some(8);
    }

    let analysis = InsightEngine::new().analyze(&entries).await;
    assert!(analysis
        .patterns
        .iter()
        .all(|p| p.pattern_type != PatternType::SleepMood));
}

#[tokio::test]
async fn test_risk_high_from_low_mean_without_intervention() {
    let entries = two_week_history(2, 2);

    let assessment = assess_risk(&entries).unwrap();
    assert_eq!(assessment.risk_level, RiskLevel::High);
    assert!(!assessment.requires_intervention);
    assert!(assessment
        .risk_factors
        .iter()
        .any(|f| f.contains("low mood")));
}

#[tokio::test]
async fn test_crisis_phrase_overrides_numeric_thresholds() {
    let mut entries = two_week_history(2, 2);
    entries[3].notes = Some("some days I want to kill myself".into());

    let assessment = assess_risk(&entries).unwrap();
    assert_eq!(assessment.risk_level, RiskLevel::Crisis);
    assert!(assessment.requires_intervention);

    // the override does not depend on the numbers at all
    let mut good_mood = two_week_history(8, 8);
    good_mood[0].notes = Some("feeling HOPELESS again".into());
    let assessment = assess_risk(&good_mood).unwrap();
    assert_eq!(assessment.risk_level, RiskLevel::Crisis);
    assert!(assessment.requires_intervention);
}

#[tokio::test]
async fn test_protective_factors_never_downgrade() {
    let mut entries = two_week_history(2, 2);
    entries[0].gratitude = Some("grateful for my cat".into());

    let assessment = assess_risk(&entries).unwrap();
    assert!(assessment
        .protective_factors
        .iter()
        .any(|f| f.contains("gratitude")));
    // still high despite the protective factors
    assert_eq!(assessment.risk_level, RiskLevel::High);
}

#[tokio::test]
async fn test_no_risk_factors_no_assessment() {
    // healthy mean, low variability, clean notes
    let entries = two_week_history(8, 8);
    assert!(assess_risk(&entries).is_none());
}

#[tokio::test]
async fn test_high_variability_escalates_to_medium() {
    let mut entries = two_week_history(6, 6);
    let swings = [1u8, 10, 1, 10, 1, 10, 10];
    for (entry, score) in entries.iter_mut().zip(swings.iter()) {
        entry.mood_score = *score;
    }

    let assessment = assess_risk(&entries).unwrap();
    assert_eq!(assessment.risk_level, RiskLevel::Medium);
    assert!(assessment
        .risk_factors
        .iter()
        .any(|f| f.contains("variability")));
}

#[tokio::test]
async fn test_refresh_persists_encrypted_results() {
    let h = harness();
    h.start_anonymous();
    let mood = MoodService::new(Arc::clone(&h.ctx));

    // older week first so the recent entries sort on top
    for _ in 0..7 {
        mood.create_entry(quick_entry(6)).await.data.unwrap();
    }
    for _ in 0..7 {
        mood.create_entry(quick_entry(8)).await.data.unwrap();
    }

    let report = InsightEngine::new().refresh(&h.ctx).await.data.unwrap();
    assert!(report
        .insights
        .iter()
        .any(|i| i.insight_type == InsightType::MoodPattern));
    assert!(report
        .insights
        .iter()
        .any(|i| i.insight_type == InsightType::Recommendation));
    // healthy numbers: no assessment persisted, no "all clear" record
    assert!(report.risk_assessment.is_none());

    let store = InsightService::new(Arc::clone(&h.ctx));
    let listed = store.insights(10).await.data.unwrap();
    assert_eq!(listed.len(), report.insights.len());
    assert!(listed.iter().all(|i| !i.is_reviewed));

    // reviewed flag is the one permitted mutation
    let reviewed = store.mark_reviewed(&listed[0].id).await.data.unwrap();
    assert!(reviewed.is_reviewed);
}

#[tokio::test]
async fn test_risk_assessment_persistence_round_trip() {
    let h = harness();
    h.start_anonymous();
    let mood = MoodService::new(Arc::clone(&h.ctx));

    for _ in 0..7 {
        let mut input = quick_entry(2);
        input.notes = Some("everything feels heavy".into());
        mood.create_entry(input).await.data.unwrap();
    }

    let report = InsightEngine::new().refresh(&h.ctx).await.data.unwrap();
    let persisted = report.risk_assessment.unwrap();
    assert_eq!(persisted.risk_level, RiskLevel::High);

    let store = InsightService::new(Arc::clone(&h.ctx));
    let latest = store.latest_risk_assessment().await.data.unwrap().unwrap();
    assert_eq!(latest.risk_level, RiskLevel::High);
    assert_eq!(
        latest.recommendations,
        persisted.recommendations
    );
}
