// ABOUTME: Safety plan singleton service with six independently encrypted sections
// ABOUTME: Save consults the existing row to choose insert versus update, never duplicating
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness

//! Safety plan service
//!
//! One plan per principal. An absent plan is a non-error state (`None`),
//! not a fetch failure. Concurrent saves from two clients race without a
//! version check; the last successful write wins.

use crate::errors::AppResult;
use crate::models::{NewSafetyPlan, SafetyPlan};
use crate::services::{ServiceContext, ServiceResponse};
use crate::store::{get_datetime, get_opt_str, get_opt_uuid, get_str, Query, Row};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

const TABLE: &str = "safety_plans";

/// The six encrypted section columns, paired with their plaintext names
const SECTIONS: [(&str, &str); 6] = [
    ("warning_signs", "encrypted_warning_signs"),
    ("coping_strategies", "encrypted_coping_strategies"),
    ("support_contacts", "encrypted_support_contacts"),
    ("professional_contacts", "encrypted_professional_contacts"),
    ("environment_safety", "encrypted_environment_safety"),
    ("reasons_to_live", "encrypted_reasons_to_live"),
];

/// Service over the per-principal safety plan singleton
#[derive(Clone)]
pub struct SafetyPlanService {
    ctx: Arc<ServiceContext>,
}

impl SafetyPlanService {
    /// Create a service over a shared context
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// The principal's plan, decrypted; `None` if never saved
    pub async fn plan(&self) -> ServiceResponse<Option<SafetyPlan>> {
        self.try_plan().await.into()
    }

    /// Save the plan: updates the existing row in place when one exists,
    /// inserts otherwise. Saving twice never creates a second row.
    pub async fn save(&self, input: NewSafetyPlan) -> ServiceResponse<SafetyPlan> {
        self.try_save(input).await.into()
    }

    async fn try_plan(&self) -> AppResult<Option<SafetyPlan>> {
        let Some(principal) = self.ctx.resolver.current_identity().await? else {
            return Ok(None);
        };

        let row = self
            .ctx
            .store
            .select_one(
                Query::table(TABLE)
                    .eq(principal.column().as_str(), principal.column_value()),
            )
            .await?;

        match row {
            Some(row) => Ok(Some(self.plan_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn try_save(&self, input: NewSafetyPlan) -> AppResult<SafetyPlan> {
        let principal = self.ctx.resolver.require_principal().await?;
        let cipher = &self.ctx.cipher;

        let sections = [
            &input.warning_signs,
            &input.coping_strategies,
            &input.support_contacts,
            &input.professional_contacts,
            &input.environment_safety,
            &input.reasons_to_live,
        ];

        let mut changes = Row::new();
        for ((_, encrypted_column), section) in SECTIONS.iter().zip(sections) {
            if let Some(text) = section.as_deref() {
                changes.insert((*encrypted_column).into(), json!(cipher.encrypt(text)?));
            }
        }

        let existing = self
            .ctx
            .store
            .select_one(
                Query::table(TABLE)
                    .eq(principal.column().as_str(), principal.column_value()),
            )
            .await?;

        let persisted = match existing {
            Some(row) => {
                let id = get_str(&row, "id")?;
                changes.insert("updated_at".into(), json!(Utc::now().to_rfc3339()));
                self.ctx.store.update(TABLE, &id, changes).await?
            }
            None => {
                changes.insert(
                    principal.column().as_str().into(),
                    principal.column_value(),
                );
                changes.insert("updated_at".into(), json!(Utc::now().to_rfc3339()));
                self.ctx.store.insert(TABLE, changes).await?
            }
        };

        self.plan_from_row(&persisted)
    }

    fn plan_from_row(&self, row: &Row) -> AppResult<SafetyPlan> {
        let cipher = &self.ctx.cipher;

        let mut decrypted: [Option<String>; 6] = Default::default();
        for (slot, (_, encrypted_column)) in decrypted.iter_mut().zip(SECTIONS.iter()) {
            *slot = match get_opt_str(row, encrypted_column) {
                Some(ciphertext) => Some(cipher.decrypt(&ciphertext)?),
                None => None,
            };
        }

        let [warning_signs, coping_strategies, support_contacts, professional_contacts, environment_safety, reasons_to_live] =
            decrypted;

        Ok(SafetyPlan {
            id: get_str(row, "id")?,
            user_id: get_opt_uuid(row, "user_id"),
            anonymous_id: get_opt_str(row, "anonymous_id"),
            warning_signs,
            coping_strategies,
            support_contacts,
            professional_contacts,
            environment_safety,
            reasons_to_live,
            created_at: get_datetime(row, "created_at")?,
            updated_at: get_datetime(row, "updated_at")?,
        })
    }
}
