// ABOUTME: Persistence service for generated insights, pattern analyses, and risk assessments
// ABOUTME: Content, descriptions, and recommendation text are encrypted before insert
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness

//! Insight persistence service
//!
//! Stores what the insight engine computes. Derived records are immutable
//! once created, except for the reviewed flag on insights.

use crate::errors::{AppError, AppResult};
use crate::models::{
    AiInsight, InsightType, PatternAnalysis, PatternFrequency, PatternType, RiskAssessment,
    RiskLevel,
};
use crate::services::{ServiceContext, ServiceResponse};
use crate::store::{get_bool, get_datetime, get_opt_f64, get_opt_str, get_opt_uuid, get_str, Query, Row};
use chrono::NaiveDate;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

const INSIGHTS_TABLE: &str = "ai_insights";
const PATTERNS_TABLE: &str = "pattern_analysis";
const ASSESSMENTS_TABLE: &str = "risk_assessments";

/// Service over generated insights, patterns, and risk assessments
#[derive(Clone)]
pub struct InsightService {
    ctx: Arc<ServiceContext>,
}

impl InsightService {
    /// Create a service over a shared context
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Persist generated insights, encrypting their content
    pub async fn save_insights(&self, insights: Vec<AiInsight>) -> ServiceResponse<Vec<AiInsight>> {
        self.try_save_insights(insights).await.into()
    }

    /// Persist detected patterns, encrypting their descriptions
    pub async fn save_patterns(
        &self,
        patterns: Vec<PatternAnalysis>,
    ) -> ServiceResponse<Vec<PatternAnalysis>> {
        self.try_save_patterns(patterns).await.into()
    }

    /// Persist a risk assessment, encrypting its recommendations
    pub async fn save_risk_assessment(
        &self,
        assessment: RiskAssessment,
    ) -> ServiceResponse<RiskAssessment> {
        self.try_save_risk_assessment(assessment).await.into()
    }

    /// Recent insights, newest first
    pub async fn insights(&self, limit: usize) -> ServiceResponse<Vec<AiInsight>> {
        self.try_insights(limit).await.into()
    }

    /// Recent patterns, newest first
    pub async fn patterns(&self, limit: usize) -> ServiceResponse<Vec<PatternAnalysis>> {
        self.try_patterns(limit).await.into()
    }

    /// The most recent risk assessment, if any exists
    pub async fn latest_risk_assessment(&self) -> ServiceResponse<Option<RiskAssessment>> {
        self.try_latest_risk_assessment().await.into()
    }

    /// Mark an insight as reviewed by the user - the only mutation a
    /// derived record permits
    pub async fn mark_reviewed(&self, insight_id: &str) -> ServiceResponse<AiInsight> {
        self.try_mark_reviewed(insight_id).await.into()
    }

    async fn try_save_insights(&self, insights: Vec<AiInsight>) -> AppResult<Vec<AiInsight>> {
        if insights.is_empty() {
            return Ok(Vec::new());
        }

        let principal = self.ctx.resolver.require_principal().await?;
        let mut persisted = Vec::with_capacity(insights.len());

        for insight in &insights {
            let mut row = Row::new();
            row.insert(
                principal.column().as_str().into(),
                principal.column_value(),
            );
            row.insert(
                "insight_type".into(),
                json!(insight.insight_type.as_str()),
            );
            row.insert(
                "encrypted_content".into(),
                json!(self.ctx.cipher.encrypt(&insight.content)?),
            );
            row.insert(
                "confidence_score".into(),
                json!(insight.confidence_score),
            );
            row.insert(
                "data_period_start".into(),
                json!(insight.data_period_start.to_string()),
            );
            row.insert(
                "data_period_end".into(),
                json!(insight.data_period_end.to_string()),
            );
            row.insert("is_reviewed".into(), json!(insight.is_reviewed));

            let saved = self.ctx.store.insert(INSIGHTS_TABLE, row).await?;
            persisted.push(self.insight_from_row(&saved)?);
        }
        Ok(persisted)
    }

    async fn try_save_patterns(
        &self,
        patterns: Vec<PatternAnalysis>,
    ) -> AppResult<Vec<PatternAnalysis>> {
        if patterns.is_empty() {
            return Ok(Vec::new());
        }

        let principal = self.ctx.resolver.require_principal().await?;
        let mut persisted = Vec::with_capacity(patterns.len());

        for pattern in &patterns {
            let mut row = Row::new();
            row.insert(
                principal.column().as_str().into(),
                principal.column_value(),
            );
            row.insert(
                "pattern_type".into(),
                json!(pattern.pattern_type.as_str()),
            );
            row.insert(
                "encrypted_description".into(),
                json!(self.ctx.cipher.encrypt(&pattern.description)?),
            );
            row.insert("strength".into(), json!(pattern.strength));
            row.insert("frequency".into(), json!(pattern.frequency.as_str()));
            row.insert("triggers".into(), json!(pattern.triggers));
            row.insert(
                "recommendations".into(),
                json!(pattern.recommendations),
            );

            let saved = self.ctx.store.insert(PATTERNS_TABLE, row).await?;
            persisted.push(self.pattern_from_row(&saved)?);
        }
        Ok(persisted)
    }

    async fn try_save_risk_assessment(
        &self,
        assessment: RiskAssessment,
    ) -> AppResult<RiskAssessment> {
        let principal = self.ctx.resolver.require_principal().await?;

        let mut row = Row::new();
        row.insert(
            principal.column().as_str().into(),
            principal.column_value(),
        );
        row.insert("risk_level".into(), json!(assessment.risk_level.as_str()));
        row.insert("risk_factors".into(), json!(assessment.risk_factors));
        row.insert(
            "protective_factors".into(),
            json!(assessment.protective_factors),
        );
        if let Some(recommendations) = assessment.recommendations.as_deref() {
            row.insert(
                "encrypted_recommendations".into(),
                json!(self.ctx.cipher.encrypt(recommendations)?),
            );
        }
        row.insert(
            "requires_intervention".into(),
            json!(assessment.requires_intervention),
        );

        let saved = self.ctx.store.insert(ASSESSMENTS_TABLE, row).await?;
        self.assessment_from_row(&saved)
    }

    async fn try_insights(&self, limit: usize) -> AppResult<Vec<AiInsight>> {
        let Some(principal) = self.ctx.resolver.current_identity().await? else {
            return Ok(Vec::new());
        };

        let rows = self
            .ctx
            .store
            .select(
                Query::table(INSIGHTS_TABLE)
                    .eq(principal.column().as_str(), principal.column_value())
                    .order_desc("created_at")
                    .limit(limit),
            )
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| match self.insight_from_row(row) {
                Ok(insight) => Some(insight),
                Err(error) => {
                    warn!(
                        id = get_opt_str(row, "id").as_deref().unwrap_or("?"),
                        code = ?error.code,
                        "skipping undecryptable insight"
                    );
                    None
                }
            })
            .collect())
    }

    async fn try_patterns(&self, limit: usize) -> AppResult<Vec<PatternAnalysis>> {
        let Some(principal) = self.ctx.resolver.current_identity().await? else {
            return Ok(Vec::new());
        };

        let rows = self
            .ctx
            .store
            .select(
                Query::table(PATTERNS_TABLE)
                    .eq(principal.column().as_str(), principal.column_value())
                    .order_desc("created_at")
                    .limit(limit),
            )
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| match self.pattern_from_row(row) {
                Ok(pattern) => Some(pattern),
                Err(error) => {
                    warn!(
                        id = get_opt_str(row, "id").as_deref().unwrap_or("?"),
                        code = ?error.code,
                        "skipping undecryptable pattern"
                    );
                    None
                }
            })
            .collect())
    }

    async fn try_latest_risk_assessment(&self) -> AppResult<Option<RiskAssessment>> {
        let Some(principal) = self.ctx.resolver.current_identity().await? else {
            return Ok(None);
        };

        let row = self
            .ctx
            .store
            .select_one(
                Query::table(ASSESSMENTS_TABLE)
                    .eq(principal.column().as_str(), principal.column_value())
                    .order_desc("created_at")
                    .limit(1),
            )
            .await?;

        match row {
            Some(row) => Ok(Some(self.assessment_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn try_mark_reviewed(&self, insight_id: &str) -> AppResult<AiInsight> {
        let mut changes = Row::new();
        changes.insert("is_reviewed".into(), json!(true));

        let updated = self
            .ctx
            .store
            .update(INSIGHTS_TABLE, insight_id, changes)
            .await?;
        self.insight_from_row(&updated)
    }

    fn insight_from_row(&self, row: &Row) -> AppResult<AiInsight> {
        Ok(AiInsight {
            id: get_str(row, "id")?,
            user_id: get_opt_uuid(row, "user_id"),
            anonymous_id: get_opt_str(row, "anonymous_id"),
            insight_type: InsightType::from_str_value(&get_str(row, "insight_type")?)?,
            content: self
                .ctx
                .cipher
                .decrypt(&get_str(row, "encrypted_content")?)?,
            confidence_score: get_opt_f64(row, "confidence_score").unwrap_or(0.0),
            data_period_start: parse_date(row, "data_period_start")?,
            data_period_end: parse_date(row, "data_period_end")?,
            is_reviewed: get_bool(row, "is_reviewed")?,
            created_at: get_datetime(row, "created_at")?,
        })
    }

    fn pattern_from_row(&self, row: &Row) -> AppResult<PatternAnalysis> {
        Ok(PatternAnalysis {
            id: get_str(row, "id")?,
            user_id: get_opt_uuid(row, "user_id"),
            anonymous_id: get_opt_str(row, "anonymous_id"),
            pattern_type: PatternType::from_str_value(&get_str(row, "pattern_type")?)?,
            description: self
                .ctx
                .cipher
                .decrypt(&get_str(row, "encrypted_description")?)?,
            strength: get_opt_f64(row, "strength").unwrap_or(0.0),
            frequency: PatternFrequency::from_str_value(&get_str(row, "frequency")?)?,
            triggers: string_array(row, "triggers"),
            recommendations: string_array(row, "recommendations"),
            created_at: get_datetime(row, "created_at")?,
        })
    }

    fn assessment_from_row(&self, row: &Row) -> AppResult<RiskAssessment> {
        let recommendations = match get_opt_str(row, "encrypted_recommendations") {
            Some(ciphertext) => Some(self.ctx.cipher.decrypt(&ciphertext)?),
            None => None,
        };

        Ok(RiskAssessment {
            id: get_str(row, "id")?,
            user_id: get_opt_uuid(row, "user_id"),
            anonymous_id: get_opt_str(row, "anonymous_id"),
            risk_level: RiskLevel::from_str_value(&get_str(row, "risk_level")?)?,
            risk_factors: string_array(row, "risk_factors"),
            protective_factors: string_array(row, "protective_factors"),
            recommendations,
            requires_intervention: get_bool(row, "requires_intervention")?,
            created_at: get_datetime(row, "created_at")?,
        })
    }
}

fn string_array(row: &Row, column: &str) -> Vec<String> {
    row.get(column)
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(ToOwned::to_owned))
                .collect()
        })
        .unwrap_or_default()
}

fn parse_date(row: &Row, column: &str) -> AppResult<NaiveDate> {
    let raw = get_str(row, column)?;
    raw.parse::<NaiveDate>()
        .map_err(|e| AppError::store(format!("invalid date in {column}: {e}")))
}
