// ABOUTME: Coping-tool catalog, usage recording with encrypted notes, and effectiveness stats
// ABOUTME: Crisis-resource directory reads for the crisis support flows
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness

//! Coping tools service
//!
//! The tool catalog and crisis-resource directory are shared, plaintext
//! reference data. Usage records are principal-scoped; their free-text
//! notes route through the field cipher.

use crate::errors::{AppError, AppResult};
use crate::models::{
    CopingTool, CrisisResource, DifficultyLevel, NewToolUsage, ResourceType, ToolCategory,
    ToolEffectiveness, ToolUsage,
};
use crate::services::{ServiceContext, ServiceResponse};
use crate::store::{
    get_bool, get_datetime, get_opt_str, get_opt_u8, get_opt_u32, get_opt_uuid, get_str, get_u32,
    Query, Row,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

const TOOLS_TABLE: &str = "coping_tools";
const USAGE_TABLE: &str = "tool_usage";
const RESOURCES_TABLE: &str = "crisis_resources";

/// Service over the coping-tool library and usage history
#[derive(Clone)]
pub struct CopingService {
    ctx: Arc<ServiceContext>,
}

impl CopingService {
    /// Create a service over a shared context
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Catalog tools, ordered by name, optionally filtered by category
    /// and crisis suitability
    pub async fn tools(
        &self,
        category: Option<ToolCategory>,
        crisis_only: Option<bool>,
    ) -> ServiceResponse<Vec<CopingTool>> {
        self.try_tools(category, crisis_only).await.into()
    }

    /// A single catalog tool by id
    pub async fn tool(&self, id: &str) -> ServiceResponse<CopingTool> {
        self.try_tool(id).await.into()
    }

    /// Record one use of a tool; notes are encrypted before the insert
    pub async fn record_usage(&self, input: NewToolUsage) -> ServiceResponse<ToolUsage> {
        self.try_record_usage(input).await.into()
    }

    /// The principal's usage history, newest first
    pub async fn usage_history(&self, limit: usize) -> ServiceResponse<Vec<ToolUsage>> {
        self.try_usage_history(limit).await.into()
    }

    /// Per-tool effectiveness aggregates over rated usages
    pub async fn tool_effectiveness(&self) -> ServiceResponse<Vec<ToolEffectiveness>> {
        self.try_tool_effectiveness().await.into()
    }

    /// Crisis-resource directory, ordered by name
    pub async fn crisis_resources(
        &self,
        resource_type: Option<ResourceType>,
    ) -> ServiceResponse<Vec<CrisisResource>> {
        self.try_crisis_resources(resource_type).await.into()
    }

    async fn try_tools(
        &self,
        category: Option<ToolCategory>,
        crisis_only: Option<bool>,
    ) -> AppResult<Vec<CopingTool>> {
        let mut query = Query::table(TOOLS_TABLE).order_asc("name");
        if let Some(category) = category {
            query = query.eq("category", category.as_str());
        }
        if let Some(crisis) = crisis_only {
            query = query.eq("is_crisis_tool", crisis);
        }

        let rows = self.ctx.store.select(query).await?;
        rows.iter().map(tool_from_row).collect()
    }

    async fn try_tool(&self, id: &str) -> AppResult<CopingTool> {
        let row = self
            .ctx
            .store
            .select_one(Query::table(TOOLS_TABLE).eq("id", id))
            .await?
            .ok_or_else(|| AppError::not_found("coping tool"))?;
        tool_from_row(&row)
    }

    async fn try_record_usage(&self, input: NewToolUsage) -> AppResult<ToolUsage> {
        if input.tool_id.is_empty() {
            return Err(AppError::invalid_input("tool_id is required"));
        }
        if let Some(rating) = input.effectiveness_rating {
            if !(1..=5).contains(&rating) {
                return Err(AppError::out_of_range(format!(
                    "effectiveness_rating must be between 1 and 5, got {rating}"
                )));
            }
        }

        let principal = self.ctx.resolver.require_principal().await?;

        let mut row = Row::new();
        row.insert(
            principal.column().as_str().into(),
            principal.column_value(),
        );
        row.insert("tool_id".into(), json!(input.tool_id));
        if let Some(before) = input.mood_before {
            row.insert("mood_before".into(), json!(before));
        }
        if let Some(after) = input.mood_after {
            row.insert("mood_after".into(), json!(after));
        }
        if let Some(rating) = input.effectiveness_rating {
            row.insert("effectiveness_rating".into(), json!(rating));
        }
        if let Some(duration) = input.duration_used {
            row.insert("duration_used".into(), json!(duration));
        }
        row.insert("completed".into(), json!(input.completed));

        if let Some(notes) = input.notes.as_deref() {
            row.insert(
                "encrypted_notes".into(),
                json!(self.ctx.cipher.encrypt(notes)?),
            );
        }

        let persisted = self.ctx.store.insert(USAGE_TABLE, row).await?;
        self.usage_from_row(&persisted)
    }

    async fn try_usage_history(&self, limit: usize) -> AppResult<Vec<ToolUsage>> {
        let Some(principal) = self.ctx.resolver.current_identity().await? else {
            return Ok(Vec::new());
        };

        let rows = self
            .ctx
            .store
            .select(
                Query::table(USAGE_TABLE)
                    .eq(principal.column().as_str(), principal.column_value())
                    .order_desc("created_at")
                    .limit(limit),
            )
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| match self.usage_from_row(row) {
                Ok(usage) => Some(usage),
                Err(error) => {
                    warn!(
                        id = get_opt_str(row, "id").as_deref().unwrap_or("?"),
                        code = ?error.code,
                        "skipping undecryptable tool usage"
                    );
                    None
                }
            })
            .collect())
    }

    async fn try_tool_effectiveness(&self) -> AppResult<Vec<ToolEffectiveness>> {
        let Some(principal) = self.ctx.resolver.current_identity().await? else {
            return Ok(Vec::new());
        };

        let rows = self
            .ctx
            .store
            .select(
                Query::table(USAGE_TABLE)
                    .eq(principal.column().as_str(), principal.column_value()),
            )
            .await?;

        struct Accumulator {
            usage_count: u32,
            total_effectiveness: f64,
            improvement_count: u32,
            total_improvement: f64,
        }

        let mut by_tool: HashMap<String, Accumulator> = HashMap::new();
        for row in &rows {
            let Some(rating) = get_opt_u8(row, "effectiveness_rating") else {
                continue;
            };
            let tool_id = get_str(row, "tool_id")?;
            let entry = by_tool.entry(tool_id).or_insert(Accumulator {
                usage_count: 0,
                total_effectiveness: 0.0,
                improvement_count: 0,
                total_improvement: 0.0,
            });

            entry.usage_count += 1;
            entry.total_effectiveness += f64::from(rating);

            if let (Some(before), Some(after)) =
                (get_opt_u8(row, "mood_before"), get_opt_u8(row, "mood_after"))
            {
                entry.improvement_count += 1;
                entry.total_improvement += f64::from(after) - f64::from(before);
            }
        }

        // resolve display names from the shared catalog; a deleted tool
        // still aggregates, just without a name
        let catalog = self.try_tools(None, None).await?;
        let names: HashMap<&str, &str> = catalog
            .iter()
            .map(|tool| (tool.id.as_str(), tool.name.as_str()))
            .collect();

        let mut effectiveness: Vec<ToolEffectiveness> = by_tool
            .into_iter()
            .map(|(tool_id, acc)| ToolEffectiveness {
                tool_name: names.get(tool_id.as_str()).map(|n| (*n).to_string()),
                average_effectiveness: acc.total_effectiveness / f64::from(acc.usage_count),
                average_mood_improvement: if acc.improvement_count == 0 {
                    0.0
                } else {
                    acc.total_improvement / f64::from(acc.improvement_count)
                },
                usage_count: acc.usage_count,
                tool_id,
            })
            .collect();

        effectiveness.sort_by(|a, b| {
            b.average_effectiveness
                .partial_cmp(&a.average_effectiveness)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(effectiveness)
    }

    async fn try_crisis_resources(
        &self,
        resource_type: Option<ResourceType>,
    ) -> AppResult<Vec<CrisisResource>> {
        let mut query = Query::table(RESOURCES_TABLE)
            .eq("is_active", true)
            .order_asc("name");
        if let Some(resource_type) = resource_type {
            query = query.eq("type", resource_type.as_str());
        }

        let rows = self.ctx.store.select(query).await?;
        rows.iter().map(resource_from_row).collect()
    }

    fn usage_from_row(&self, row: &Row) -> AppResult<ToolUsage> {
        let notes = match get_opt_str(row, "encrypted_notes") {
            Some(ciphertext) => Some(self.ctx.cipher.decrypt(&ciphertext)?),
            None => None,
        };

        Ok(ToolUsage {
            id: get_str(row, "id")?,
            user_id: get_opt_uuid(row, "user_id"),
            anonymous_id: get_opt_str(row, "anonymous_id"),
            tool_id: get_str(row, "tool_id")?,
            mood_before: get_opt_u8(row, "mood_before"),
            mood_after: get_opt_u8(row, "mood_after"),
            effectiveness_rating: get_opt_u8(row, "effectiveness_rating"),
            notes,
            duration_used: get_opt_u32(row, "duration_used"),
            completed: get_bool(row, "completed")?,
            created_at: get_datetime(row, "created_at")?,
        })
    }
}

fn tool_from_row(row: &Row) -> AppResult<CopingTool> {
    let tags = row
        .get("tags")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(ToOwned::to_owned))
                .collect()
        })
        .unwrap_or_default();

    Ok(CopingTool {
        id: get_str(row, "id")?,
        name: get_str(row, "name")?,
        category: ToolCategory::from_str_value(&get_str(row, "category")?)?,
        description: get_str(row, "description")?,
        instructions: get_str(row, "instructions")?,
        duration_minutes: get_u32(row, "duration_minutes")?,
        difficulty_level: DifficultyLevel::from_str_value(&get_str(row, "difficulty_level")?)?,
        evidence_base: get_opt_str(row, "evidence_base"),
        tags,
        is_crisis_tool: get_bool(row, "is_crisis_tool")?,
    })
}

fn resource_from_row(row: &Row) -> AppResult<CrisisResource> {
    let language_support = row
        .get("language_support")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(ToOwned::to_owned))
                .collect()
        })
        .unwrap_or_default();

    Ok(CrisisResource {
        id: get_str(row, "id")?,
        name: get_str(row, "name")?,
        resource_type: ResourceType::from_str_value(&get_str(row, "type")?)?,
        phone_number: get_opt_str(row, "phone_number"),
        website_url: get_opt_str(row, "website_url"),
        description: get_str(row, "description")?,
        availability: get_str(row, "availability")?,
        country_code: get_str(row, "country_code")?,
        language_support,
    })
}
