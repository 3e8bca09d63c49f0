// ABOUTME: Insight engine computing trend, trigger, sleep, and recommendation analyses
// ABOUTME: Deterministic templates first, optional language-model phrasing substituted on top
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness

//! # Insight Engine
//!
//! A state machine over a mood-history window (most recent entries,
//! newest first). Each analysis computes deterministically; when a text
//! generator is configured its phrasing replaces the template and nudges
//! confidence, but a failed or absent generator never blocks an insight.

use crate::errors::AppResult;
use crate::intelligence::risk;
use crate::intelligence::statistics::{mean, pearson};
use crate::llm::{ChatMessage, ChatRequest, TextGenerator, WELLNESS_SYSTEM_PROMPT};
use crate::models::{
    AiInsight, InsightType, MoodEntry, MoodTrend, PatternAnalysis, PatternFrequency, PatternType,
    RiskAssessment,
};
use crate::services::{InsightService, MoodService, ServiceContext};
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Entries compared on each side of the trend split
const TREND_SPLIT: usize = 7;

/// Absolute mean-mood delta below which the trend is called stable
const STABILITY_THRESHOLD: f64 = 0.5;

/// Minimum entries carrying a sleep score before correlating
const MIN_SLEEP_SAMPLES: usize = 5;

/// Correlations weaker than this are treated as noise and suppressed
const CORRELATION_NOISE_FLOOR: f64 = 0.3;

/// Recent-versus-previous mood trend numbers
#[derive(Debug, Clone)]
pub struct TrendSummary {
    /// Trend classification
    pub direction: MoodTrend,
    /// Mean mood over the recent split
    pub recent_average: f64,
    /// Mean mood over the previous split
    pub previous_average: f64,
    /// Recent minus previous
    pub delta: f64,
}

/// Compute the trend split over history ordered newest first.
///
/// `None` below three recent entries. With no previous period the recent
/// average stands in for it, which classifies as stable.
#[must_use]
pub fn trend_summary(entries: &[MoodEntry]) -> Option<TrendSummary> {
    let recent: Vec<f64> = entries
        .iter()
        .take(TREND_SPLIT)
        .map(|e| f64::from(e.mood_score))
        .collect();
    if recent.len() < 3 {
        return None;
    }

    let previous: Vec<f64> = entries
        .iter()
        .skip(TREND_SPLIT)
        .take(TREND_SPLIT)
        .map(|e| f64::from(e.mood_score))
        .collect();

    let recent_average = mean(&recent);
    let previous_average = if previous.is_empty() {
        recent_average
    } else {
        mean(&previous)
    };
    let delta = recent_average - previous_average;

    let direction = if delta.abs() < STABILITY_THRESHOLD {
        MoodTrend::Stable
    } else if delta > 0.0 {
        MoodTrend::Improving
    } else {
        MoodTrend::Declining
    };

    Some(TrendSummary {
        direction,
        recent_average,
        previous_average,
        delta,
    })
}

/// Insights and patterns produced by one analysis pass
#[derive(Debug, Clone, Default)]
pub struct MoodAnalysis {
    /// Generated insights
    pub insights: Vec<AiInsight>,
    /// Detected patterns
    pub patterns: Vec<PatternAnalysis>,
}

/// Everything a full refresh computed and persisted
#[derive(Debug, Clone)]
pub struct RefreshReport {
    /// Persisted insights
    pub insights: Vec<AiInsight>,
    /// Persisted patterns
    pub patterns: Vec<PatternAnalysis>,
    /// Persisted risk assessment, when one was warranted
    pub risk_assessment: Option<RiskAssessment>,
}

/// Derived-analytics engine over decrypted mood history
pub struct InsightEngine {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl Default for InsightEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InsightEngine {
    /// Engine with deterministic phrasing only
    #[must_use]
    pub const fn new() -> Self {
        Self { generator: None }
    }

    /// Engine with the environment-configured text generator, when any
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            generator: crate::llm::from_env(),
        }
    }

    /// Engine with an explicit text generator
    #[must_use]
    pub fn with_generator(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator: Some(generator),
        }
    }

    /// Run every pattern and insight analysis over history (newest
    /// first). Below three entries nothing is emitted.
    pub async fn analyze(&self, entries: &[MoodEntry]) -> MoodAnalysis {
        if entries.len() < 3 {
            return MoodAnalysis::default();
        }

        let mut analysis = MoodAnalysis::default();

        if let Some(insight) = self.analyze_trend(entries).await {
            analysis.insights.push(insight);
        }
        if let Some(pattern) = self.analyze_triggers(entries).await {
            analysis.patterns.push(pattern);
        }
        if let Some(pattern) = self.analyze_sleep_mood(entries).await {
            analysis.patterns.push(pattern);
        }
        if let Some(insight) = self.recommend(entries).await {
            analysis.insights.push(insight);
        }

        analysis
    }

    /// Assess crisis risk, optionally rephrasing the guidance text
    pub async fn assess(&self, entries: &[MoodEntry]) -> Option<RiskAssessment> {
        let mut assessment = risk::assess_risk(entries)?;

        if let Some(recommendations) = assessment.recommendations.clone() {
            let prompt = format!(
                "Rephrase this mental-health guidance supportively, keeping its urgency \
                 (risk level: {}):\n{recommendations}",
                assessment.risk_level.as_str()
            );
            if let Some(text) = self.rephrase(prompt, 200).await {
                assessment.recommendations = Some(text);
            }
        }

        Some(assessment)
    }

    /// Pull recent history, run every analysis, and persist the results
    /// through the domain services (which encrypt on write)
    pub async fn refresh(
        &self,
        ctx: &Arc<ServiceContext>,
    ) -> crate::services::ServiceResponse<RefreshReport> {
        self.try_refresh(ctx).await.into()
    }

    async fn try_refresh(&self, ctx: &Arc<ServiceContext>) -> AppResult<RefreshReport> {
        let window = ctx.config().analysis_window;
        let entries = MoodService::new(Arc::clone(ctx))
            .entries(window)
            .await
            .into_result()?;

        let analysis = self.analyze(&entries).await;
        let store = InsightService::new(Arc::clone(ctx));

        let insights = store.save_insights(analysis.insights).await.into_result()?;
        let patterns = store.save_patterns(analysis.patterns).await.into_result()?;

        let risk_assessment = match self.assess(&entries).await {
            Some(assessment) => Some(
                store
                    .save_risk_assessment(assessment)
                    .await
                    .into_result()?,
            ),
            None => None,
        };

        Ok(RefreshReport {
            insights,
            patterns,
            risk_assessment,
        })
    }

    async fn analyze_trend(&self, entries: &[MoodEntry]) -> Option<AiInsight> {
        let summary = trend_summary(entries)?;

        let (mut content, mut confidence) = match summary.direction {
            MoodTrend::Stable => (
                format!(
                    "Your mood has been stable over the past week, averaging {:.1}/10. \
                     Consistency in mood tracking is a positive sign of emotional awareness. \
                     Consider maintaining your current routines and coping strategies.",
                    summary.recent_average
                ),
                0.8,
            ),
            MoodTrend::Improving => (
                format!(
                    "Your mood has improved by {:.1} points over the past week (from {:.1} to \
                     {:.1}). This is encouraging progress! Reflect on what positive changes \
                     you've made recently and try to maintain them.",
                    summary.delta, summary.previous_average, summary.recent_average
                ),
                0.9,
            ),
            MoodTrend::Declining => (
                format!(
                    "Your mood has declined by {:.1} points over the past week. This might be \
                     a good time to reach out for support, practice self-care, or consider \
                     speaking with a mental health professional if the decline continues.",
                    summary.delta.abs()
                ),
                0.85,
            ),
        };

        let trend_word = match summary.direction {
            MoodTrend::Improving => "improving",
            MoodTrend::Declining => "declining",
            MoodTrend::Stable => "stable",
        };
        let prompt = format!(
            "Analyze this mood trend data and provide a supportive insight:\n\
             Recent average mood: {:.1}/10\n\
             Previous average mood: {:.1}/10\n\
             Trend: {trend_word}\n\n\
             Provide a brief, encouraging insight (2-3 sentences) that acknowledges the trend \
             and offers gentle guidance.",
            summary.recent_average, summary.previous_average
        );
        if let Some(text) = self.rephrase(prompt, 200).await {
            content = text;
            confidence = (confidence + 0.1_f64).min(1.0);
        }

        let (start, end) = period(entries);
        Some(AiInsight {
            id: Uuid::new_v4().to_string(),
            user_id: None,
            anonymous_id: None,
            insight_type: InsightType::MoodPattern,
            content,
            confidence_score: confidence,
            data_period_start: start,
            data_period_end: end,
            is_reviewed: false,
            created_at: Utc::now(),
        })
    }

    async fn analyze_triggers(&self, entries: &[MoodEntry]) -> Option<PatternAnalysis> {
        let tagged: Vec<&MoodEntry> = entries
            .iter()
            .filter(|e| e.triggers.as_ref().is_some_and(|t| !t.is_empty()))
            .collect();
        if tagged.len() < 2 {
            return None;
        }

        struct TriggerStats {
            count: u32,
            total_mood: f64,
        }

        let mut by_trigger: HashMap<String, TriggerStats> = HashMap::new();
        for entry in &tagged {
            for trigger in entry.triggers.iter().flatten() {
                let normalized = trigger.trim().to_lowercase();
                if normalized.is_empty() {
                    continue;
                }
                let stats = by_trigger.entry(normalized).or_insert(TriggerStats {
                    count: 0,
                    total_mood: 0.0,
                });
                stats.count += 1;
                stats.total_mood += f64::from(entry.mood_score);
            }
        }

        let mut ranked: Vec<(String, TriggerStats)> = by_trigger.into_iter().collect();
        ranked.sort_by(|a, b| b.1.count.cmp(&a.1.count));
        let (top_trigger, top_stats) = ranked.first()?;

        let average_mood = top_stats.total_mood / f64::from(top_stats.count);
        let strength = (f64::from(top_stats.count) / tagged.len() as f64).min(1.0);
        let frequency = if top_stats.count as usize * 2 >= tagged.len() {
            PatternFrequency::Weekly
        } else {
            PatternFrequency::Irregular
        };

        let mut description = format!(
            "You've identified \"{top_trigger}\" as a trigger {} times, with an average mood \
             of {average_mood:.1}/10 when this occurs.",
            top_stats.count
        );
        let mut recommendations = vec![
            "Practice mindfulness when you notice this trigger arising".to_string(),
            "Develop a specific coping strategy for this situation".to_string(),
            "Consider what you can control vs. what you cannot in these situations".to_string(),
            "Track your response to this trigger to identify what helps most".to_string(),
        ];

        let prompt = format!(
            "Analyze this trigger pattern and provide supportive guidance:\n\
             Most frequent trigger: \"{top_trigger}\" ({} times)\n\
             Average mood when triggered: {average_mood:.1}/10\n\n\
             Provide a brief analysis and 2-3 specific, actionable recommendations for \
             managing this trigger.",
            top_stats.count
        );
        if let Some(text) = self.rephrase(prompt, 300).await {
            let lines: Vec<&str> = text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect();
            if let Some(first) = lines.first() {
                description = (*first).to_string();
                if lines.len() > 1 {
                    recommendations = lines[1..]
                        .iter()
                        .map(|line| line.trim_start_matches(['-', '*', '\u{2022}']).trim().to_string())
                        .collect();
                }
            }
        }

        let triggers = ranked
            .iter()
            .take(3)
            .map(|(name, _)| name.clone())
            .collect();

        Some(PatternAnalysis {
            id: Uuid::new_v4().to_string(),
            user_id: None,
            anonymous_id: None,
            pattern_type: PatternType::TriggerCorrelation,
            description,
            strength,
            frequency,
            triggers,
            recommendations,
            created_at: Utc::now(),
        })
    }

    async fn analyze_sleep_mood(&self, entries: &[MoodEntry]) -> Option<PatternAnalysis> {
        let sampled: Vec<&MoodEntry> = entries
            .iter()
            .filter(|e| e.sleep_quality.is_some_and(|q| q > 0))
            .collect();
        if sampled.len() < MIN_SLEEP_SAMPLES {
            return None;
        }

        let sleep: Vec<f64> = sampled
            .iter()
            .filter_map(|e| e.sleep_quality.map(f64::from))
            .collect();
        let mood: Vec<f64> = sampled.iter().map(|e| f64::from(e.mood_score)).collect();

        let correlation = pearson(&sleep, &mood)?;
        if correlation.abs() < CORRELATION_NOISE_FLOOR {
            debug!(correlation, "sleep-mood correlation below noise floor");
            return None;
        }

        let (description, recommendations) = if correlation > 0.0 {
            (
                format!(
                    "There's a positive correlation ({:.0}%) between your sleep quality and \
                     mood. Better sleep tends to lead to better mood days.",
                    correlation * 100.0
                ),
                vec![
                    "Prioritize a consistent sleep schedule".to_string(),
                    "Create a relaxing bedtime routine".to_string(),
                    "Limit screen time before bed".to_string(),
                    "Consider sleep hygiene practices".to_string(),
                ],
            )
        } else {
            (
                "There's a negative correlation between your sleep and mood patterns. This \
                 might indicate sleep disruption during stressful periods."
                    .to_string(),
                vec![
                    "Practice stress management before bedtime".to_string(),
                    "Consider relaxation techniques for better sleep".to_string(),
                    "Track what affects your sleep quality".to_string(),
                    "Speak with a healthcare provider about sleep concerns".to_string(),
                ],
            )
        };

        Some(PatternAnalysis {
            id: Uuid::new_v4().to_string(),
            user_id: None,
            anonymous_id: None,
            pattern_type: PatternType::SleepMood,
            description,
            strength: correlation.abs(),
            frequency: PatternFrequency::Daily,
            triggers: Vec::new(),
            recommendations,
            created_at: Utc::now(),
        })
    }

    async fn recommend(&self, entries: &[MoodEntry]) -> Option<AiInsight> {
        let recent: Vec<f64> = entries
            .iter()
            .take(TREND_SPLIT)
            .map(|e| f64::from(e.mood_score))
            .collect();
        if recent.is_empty() {
            return None;
        }
        let average = mean(&recent);

        let mut content = if average >= 7.0 {
            "Your mood has been consistently positive this week! To maintain this wellbeing: \
             continue your current self-care practices, celebrate your progress, and consider \
             what specific activities or routines are contributing to your positive mood."
                .to_string()
        } else if average >= 5.0 {
            "Your mood has been moderate this week. Consider incorporating more activities \
             that bring you joy, practicing mindfulness or gratitude, and ensuring you're \
             getting adequate rest and social connection."
                .to_string()
        } else {
            "Your mood has been lower this week. This is a good time to prioritize self-care, \
             reach out to supportive friends or family, and consider speaking with a mental \
             health professional if these feelings persist."
                .to_string()
        };
        let mut confidence = 0.8;

        let prompt = format!(
            "Based on this week's mood data, provide 3-4 specific, actionable \
             recommendations:\nAverage mood: {average:.1}/10\nData points: {}\n\n\
             Provide personalized, evidence-based suggestions that are encouraging and \
             practical.",
            recent.len()
        );
        if let Some(text) = self.rephrase(prompt, 400).await {
            content = text;
            confidence = 0.9;
        }

        let (start, end) = period(entries);
        Some(AiInsight {
            id: Uuid::new_v4().to_string(),
            user_id: None,
            anonymous_id: None,
            insight_type: InsightType::Recommendation,
            content,
            confidence_score: confidence,
            data_period_start: start,
            data_period_end: end,
            is_reviewed: false,
            created_at: Utc::now(),
        })
    }

    /// Best-effort phrasing substitution; any failure falls back to the
    /// deterministic template without surfacing an error
    async fn rephrase(&self, prompt: String, max_tokens: u32) -> Option<String> {
        let generator = self.generator.as_ref()?;

        let request = ChatRequest::new(vec![
            ChatMessage::system(WELLNESS_SYSTEM_PROMPT),
            ChatMessage::user(prompt),
        ])
        .with_max_tokens(max_tokens);

        match generator.complete(&request).await {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => None,
            Err(error) => {
                debug!(
                    provider = generator.display_name(),
                    code = ?error.code,
                    "text generation unavailable, keeping deterministic phrasing"
                );
                None
            }
        }
    }
}

/// Analyzed period boundaries from history ordered newest first
fn period(entries: &[MoodEntry]) -> (NaiveDate, NaiveDate) {
    let end = entries
        .first()
        .map_or_else(|| Utc::now().date_naive(), |e| e.created_at.date_naive());
    let start = entries
        .last()
        .map_or(end, |e| e.created_at.date_naive());
    (start, end)
}
