// ABOUTME: Anonymous-to-authenticated data migration: re-encrypt and re-scope every row
// ABOUTME: Runs with the outgoing device key in hand after the authenticated key is installed
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness

//! # Anonymous Data Migration
//!
//! Upgrading an anonymous principal to an authenticated account would
//! otherwise orphan every row scoped to the old anonymous identifier,
//! encrypted under a device key the account has no claim to. This service
//! walks those rows, decrypts each sensitive column with the outgoing
//! device key, re-encrypts it under the authenticated session key, and
//! re-points the scoping column at the new user id.
//!
//! Call order matters: capture the
//! [`AnonymousHandoff`](crate::identity::AnonymousHandoff) *before*
//! `sign_in` (which destroys the stored anonymous identity), establish the
//! authenticated session, then run the migration.

use crate::crypto::FieldCipher;
use crate::errors::{AppError, AppResult};
use crate::identity::AnonymousHandoff;
use crate::services::{ServiceContext, ServiceResponse};
use crate::store::{get_opt_str, get_str, Query, Row};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Scoping and encryption layout of one principal-scoped table
struct TableLayout {
    table: &'static str,
    /// (anonymous column, user column) pairs; most tables have one,
    /// match/message/feedback tables scope several roles
    scopes: &'static [(&'static str, &'static str)],
    /// Encrypted columns to re-key
    encrypted: &'static [&'static str],
}

/// Every table that carries principal scoping, with its encrypted columns
const TABLES: &[TableLayout] = &[
    TableLayout {
        table: "mood_entries",
        scopes: &[("anonymous_id", "user_id")],
        encrypted: &["encrypted_notes", "encrypted_triggers", "encrypted_gratitude"],
    },
    TableLayout {
        table: "mood_streaks",
        scopes: &[("anonymous_id", "user_id")],
        encrypted: &[],
    },
    TableLayout {
        table: "tool_usage",
        scopes: &[("anonymous_id", "user_id")],
        encrypted: &["encrypted_notes"],
    },
    TableLayout {
        table: "safety_plans",
        scopes: &[("anonymous_id", "user_id")],
        encrypted: &[
            "encrypted_warning_signs",
            "encrypted_coping_strategies",
            "encrypted_support_contacts",
            "encrypted_professional_contacts",
            "encrypted_environment_safety",
            "encrypted_reasons_to_live",
        ],
    },
    TableLayout {
        table: "peer_supporters",
        scopes: &[("anonymous_id", "user_id")],
        encrypted: &[],
    },
    TableLayout {
        table: "peer_matches",
        scopes: &[
            ("seeker_anonymous_id", "seeker_user_id"),
            ("supporter_anonymous_id", "supporter_user_id"),
        ],
        encrypted: &["encrypted_match_reason", "encrypted_seeker_preferences"],
    },
    TableLayout {
        table: "peer_messages",
        scopes: &[("sender_anonymous_id", "sender_user_id")],
        encrypted: &["encrypted_content"],
    },
    TableLayout {
        table: "group_memberships",
        scopes: &[("anonymous_id", "user_id")],
        encrypted: &[],
    },
    TableLayout {
        table: "group_messages",
        scopes: &[("sender_anonymous_id", "sender_user_id")],
        encrypted: &["encrypted_content"],
    },
    TableLayout {
        table: "peer_feedback",
        scopes: &[("reviewer_anonymous_id", "reviewer_user_id")],
        encrypted: &["encrypted_feedback"],
    },
    TableLayout {
        table: "ai_insights",
        scopes: &[("anonymous_id", "user_id")],
        encrypted: &["encrypted_content"],
    },
    TableLayout {
        table: "pattern_analysis",
        scopes: &[("anonymous_id", "user_id")],
        encrypted: &["encrypted_description"],
    },
    TableLayout {
        table: "risk_assessments",
        scopes: &[("anonymous_id", "user_id")],
        encrypted: &["encrypted_recommendations"],
    },
];

/// Outcome of a migration run
#[derive(Debug, Clone, Default)]
pub struct MigrationReport {
    /// Rows re-scoped (and re-encrypted where applicable)
    pub rows_migrated: u32,
    /// Rows left behind because their ciphertext would not decrypt
    pub rows_skipped: u32,
}

/// Service performing the anonymous-to-authenticated upgrade migration
#[derive(Clone)]
pub struct MigrationService {
    ctx: Arc<ServiceContext>,
}

impl MigrationService {
    /// Create a service over a shared context
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Migrate every row scoped to the handed-off anonymous identity to
    /// the authenticated user. The authenticated session key must already
    /// be installed (i.e. `sign_in` has run).
    pub async fn migrate_anonymous_data(
        &self,
        handoff: &AnonymousHandoff,
        user_id: Uuid,
    ) -> ServiceResponse<MigrationReport> {
        self.try_migrate(handoff, user_id).await.into()
    }

    async fn try_migrate(
        &self,
        handoff: &AnonymousHandoff,
        user_id: Uuid,
    ) -> AppResult<MigrationReport> {
        if !self.ctx.keys.is_initialized() {
            return Err(AppError::key_not_initialized());
        }

        let old_cipher = FieldCipher::with_key(handoff.device_key.clone());
        let new_cipher = &self.ctx.cipher;
        let mut report = MigrationReport::default();

        for layout in TABLES {
            for (anonymous_column, user_column) in layout.scopes {
                let rows = self
                    .ctx
                    .store
                    .select(
                        Query::table(layout.table)
                            .eq(*anonymous_column, handoff.anonymous_id.clone()),
                    )
                    .await?;

                for row in rows {
                    match self
                        .migrate_row(layout, &row, anonymous_column, user_column, user_id, &old_cipher, new_cipher)
                        .await
                    {
                        Ok(()) => report.rows_migrated += 1,
                        Err(error) => {
                            report.rows_skipped += 1;
                            warn!(
                                table = layout.table,
                                id = get_opt_str(&row, "id").as_deref().unwrap_or("?"),
                                code = ?error.code,
                                "row left under anonymous scope"
                            );
                        }
                    }
                }
            }
        }

        info!(
            user_id = %user_id,
            migrated = report.rows_migrated,
            skipped = report.rows_skipped,
            "anonymous data migration finished"
        );
        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    async fn migrate_row(
        &self,
        layout: &TableLayout,
        row: &Row,
        anonymous_column: &str,
        user_column: &str,
        user_id: Uuid,
        old_cipher: &FieldCipher,
        new_cipher: &FieldCipher,
    ) -> AppResult<()> {
        let id = get_str(row, "id")?;

        let mut changes = Row::new();
        changes.insert(anonymous_column.to_string(), Value::Null);
        changes.insert(user_column.to_string(), json!(user_id.to_string()));

        for encrypted_column in layout.encrypted {
            if let Some(ciphertext) = get_opt_str(row, encrypted_column) {
                let plaintext = old_cipher.decrypt(&ciphertext)?;
                changes.insert(
                    (*encrypted_column).to_string(),
                    json!(new_cipher.encrypt(&plaintext)?),
                );
            }
        }

        self.ctx.store.update(layout.table, &id, changes).await?;
        Ok(())
    }
}
