// ABOUTME: Mood entry service: encrypted check-ins, history, streaks, and statistics
// ABOUTME: Notes, triggers, and gratitude route through the field cipher; scores stay plaintext
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness

//! Mood tracking service
//!
//! The create path returns the decrypted view of the row that was just
//! persisted - a deliberate round trip through the cipher so a bad key is
//! visible to the writer immediately rather than on some later read.

use crate::errors::{AppError, AppResult};
use crate::models::{CheckInType, MoodEntry, MoodStats, MoodStreak, MoodTrend, NewMoodEntry};
use crate::services::{ServiceContext, ServiceResponse};
use crate::store::{
    get_datetime, get_opt_str, get_opt_u8, get_opt_uuid, get_str, get_u32, get_u8, Query, Row,
};
use chrono::{Duration, NaiveTime, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

const ENTRIES_TABLE: &str = "mood_entries";
const STREAKS_TABLE: &str = "mood_streaks";

/// Service over mood entries, streaks, and aggregate statistics
#[derive(Clone)]
pub struct MoodService {
    ctx: Arc<ServiceContext>,
}

impl MoodService {
    /// Create a service over a shared context
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Record a mood check-in. Sensitive fields are encrypted before the
    /// insert; the returned entry is the decrypted view of the persisted
    /// row.
    pub async fn create_entry(&self, input: NewMoodEntry) -> ServiceResponse<MoodEntry> {
        self.try_create_entry(input).await.into()
    }

    /// Most recent entries, newest first
    pub async fn entries(&self, limit: usize) -> ServiceResponse<Vec<MoodEntry>> {
        self.try_entries(limit).await.into()
    }

    /// Today's most recent entry, if the principal checked in today
    pub async fn todays_entry(&self) -> ServiceResponse<Option<MoodEntry>> {
        self.try_todays_entry().await.into()
    }

    /// The principal's streak record, if one exists yet
    pub async fn streak(&self) -> ServiceResponse<Option<MoodStreak>> {
        self.try_streak().await.into()
    }

    /// Aggregate statistics over the recent analysis window
    pub async fn stats(&self) -> ServiceResponse<MoodStats> {
        self.try_stats().await.into()
    }

    async fn try_create_entry(&self, input: NewMoodEntry) -> AppResult<MoodEntry> {
        validate_score("mood_score", input.mood_score)?;
        validate_optional_score("energy_level", input.energy_level)?;
        validate_optional_score("anxiety_level", input.anxiety_level)?;
        validate_optional_score("sleep_quality", input.sleep_quality)?;

        let principal = self.ctx.resolver.require_principal().await?;
        let cipher = &self.ctx.cipher;

        let mut row = Row::new();
        row.insert(
            principal.column().as_str().into(),
            principal.column_value(),
        );
        row.insert("mood_score".into(), json!(input.mood_score));
        if let Some(energy) = input.energy_level {
            row.insert("energy_level".into(), json!(energy));
        }
        if let Some(anxiety) = input.anxiety_level {
            row.insert("anxiety_level".into(), json!(anxiety));
        }
        if let Some(sleep) = input.sleep_quality {
            row.insert("sleep_quality".into(), json!(sleep));
        }
        row.insert(
            "check_in_type".into(),
            json!(input.check_in_type.as_str()),
        );

        if let Some(notes) = input.notes.as_deref() {
            row.insert("encrypted_notes".into(), json!(cipher.encrypt(notes)?));
        }
        if let Some(triggers) = input.triggers.as_ref().filter(|t| !t.is_empty()) {
            row.insert(
                "encrypted_triggers".into(),
                json!(cipher.encrypt_json(triggers)?),
            );
        }
        if let Some(gratitude) = input.gratitude.as_deref() {
            row.insert(
                "encrypted_gratitude".into(),
                json!(cipher.encrypt(gratitude)?),
            );
        }

        let persisted = self.ctx.store.insert(ENTRIES_TABLE, row).await?;

        // The streak is derived bookkeeping; its failure must not lose
        // the check-in that was already persisted.
        if let Err(error) = self.bump_streak(&principal).await {
            warn!(code = ?error.code, "streak update failed after check-in");
        }

        self.entry_from_row(&persisted)
    }

    async fn try_entries(&self, limit: usize) -> AppResult<Vec<MoodEntry>> {
        let Some(principal) = self.ctx.resolver.current_identity().await? else {
            return Ok(Vec::new());
        };

        let rows = self
            .ctx
            .store
            .select(
                Query::table(ENTRIES_TABLE)
                    .eq(principal.column().as_str(), principal.column_value())
                    .order_desc("created_at")
                    .limit(limit),
            )
            .await?;

        Ok(self.decrypt_rows(rows))
    }

    async fn try_todays_entry(&self) -> AppResult<Option<MoodEntry>> {
        let Some(principal) = self.ctx.resolver.current_identity().await? else {
            return Ok(None);
        };

        let start = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();
        let end = start + Duration::days(1);

        let row = self
            .ctx
            .store
            .select_one(
                Query::table(ENTRIES_TABLE)
                    .eq(principal.column().as_str(), principal.column_value())
                    .gte("created_at", start.to_rfc3339())
                    .lt("created_at", end.to_rfc3339())
                    .order_desc("created_at")
                    .limit(1),
            )
            .await?;

        match row {
            Some(row) => Ok(Some(self.entry_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn try_streak(&self) -> AppResult<Option<MoodStreak>> {
        let Some(principal) = self.ctx.resolver.current_identity().await? else {
            return Ok(None);
        };

        let row = self
            .ctx
            .store
            .select_one(
                Query::table(STREAKS_TABLE)
                    .eq(principal.column().as_str(), principal.column_value()),
            )
            .await?;

        row.map(|row| streak_from_row(&row)).transpose()
    }

    async fn try_stats(&self) -> AppResult<MoodStats> {
        let window = self.ctx.config.analysis_window;
        let entries = self.try_entries(window).await?;
        let streak = self.try_streak().await?;

        if entries.is_empty() {
            return Ok(MoodStats::empty());
        }

        let scores: Vec<f64> = entries.iter().map(|e| f64::from(e.mood_score)).collect();
        let average = scores.iter().sum::<f64>() / scores.len() as f64;

        // trend compares the most recent seven entries to the seven
        // before them, by recency ordering rather than calendar weeks
        let recent: Vec<f64> = scores.iter().copied().take(7).collect();
        let previous: Vec<f64> = scores.iter().copied().skip(7).take(7).collect();

        let mood_trend = if recent.is_empty() || previous.is_empty() {
            MoodTrend::Stable
        } else {
            let recent_avg = recent.iter().sum::<f64>() / recent.len() as f64;
            let previous_avg = previous.iter().sum::<f64>() / previous.len() as f64;
            let difference = recent_avg - previous_avg;
            if difference > 0.5 {
                MoodTrend::Improving
            } else if difference < -0.5 {
                MoodTrend::Declining
            } else {
                MoodTrend::Stable
            }
        };

        Ok(MoodStats {
            average_mood: (average * 10.0).round() / 10.0,
            mood_trend,
            total_entries: streak
                .as_ref()
                .map_or(entries.len() as u32, |s| s.total_check_ins),
            current_streak: streak.as_ref().map_or(0, |s| s.current_streak),
            longest_streak: streak.as_ref().map_or(0, |s| s.longest_streak),
            last_check_in: entries.first().map(|e| e.created_at),
        })
    }

    /// Upsert the streak row for a check-in happening now
    async fn bump_streak(&self, principal: &crate::identity::Principal) -> AppResult<()> {
        let now = Utc::now();
        let today = now.date_naive();

        let existing = self
            .ctx
            .store
            .select_one(
                Query::table(STREAKS_TABLE)
                    .eq(principal.column().as_str(), principal.column_value()),
            )
            .await?;

        match existing {
            Some(row) => {
                let streak = streak_from_row(&row)?;
                let last_day = streak.last_check_in.date_naive();

                let current = if last_day == today {
                    streak.current_streak
                } else if today.signed_duration_since(last_day).num_days() == 1 {
                    streak.current_streak + 1
                } else {
                    1
                };

                let mut changes = Row::new();
                changes.insert("current_streak".into(), json!(current));
                changes.insert(
                    "longest_streak".into(),
                    json!(streak.longest_streak.max(current)),
                );
                changes.insert(
                    "total_check_ins".into(),
                    json!(streak.total_check_ins + 1),
                );
                changes.insert("last_check_in".into(), json!(now.to_rfc3339()));
                changes.insert("updated_at".into(), json!(now.to_rfc3339()));

                self.ctx.store.update(STREAKS_TABLE, &streak.id, changes).await?;
            }
            None => {
                let mut row = Row::new();
                row.insert(
                    principal.column().as_str().into(),
                    principal.column_value(),
                );
                row.insert("current_streak".into(), json!(1));
                row.insert("longest_streak".into(), json!(1));
                row.insert("total_check_ins".into(), json!(1));
                row.insert("last_check_in".into(), json!(now.to_rfc3339()));

                self.ctx.store.insert(STREAKS_TABLE, row).await?;
            }
        }

        Ok(())
    }

    /// Decrypt a batch, skipping rows the current key cannot read. A
    /// single corrupt row must not abort the whole list.
    fn decrypt_rows(&self, rows: Vec<Row>) -> Vec<MoodEntry> {
        rows.iter()
            .filter_map(|row| match self.entry_from_row(row) {
                Ok(entry) => Some(entry),
                Err(error) => {
                    warn!(
                        id = get_opt_str(row, "id").as_deref().unwrap_or("?"),
                        code = ?error.code,
                        "skipping undecryptable mood entry"
                    );
                    None
                }
            })
            .collect()
    }

    fn entry_from_row(&self, row: &Row) -> AppResult<MoodEntry> {
        let cipher = &self.ctx.cipher;

        let notes = match get_opt_str(row, "encrypted_notes") {
            Some(ciphertext) => Some(cipher.decrypt(&ciphertext)?),
            None => None,
        };
        let triggers = match get_opt_str(row, "encrypted_triggers") {
            Some(ciphertext) => Some(cipher.decrypt_json::<Vec<String>>(&ciphertext)?),
            None => None,
        };
        let gratitude = match get_opt_str(row, "encrypted_gratitude") {
            Some(ciphertext) => Some(cipher.decrypt(&ciphertext)?),
            None => None,
        };

        Ok(MoodEntry {
            id: get_str(row, "id")?,
            user_id: get_opt_uuid(row, "user_id"),
            anonymous_id: get_opt_str(row, "anonymous_id"),
            mood_score: get_u8(row, "mood_score")?,
            energy_level: get_opt_u8(row, "energy_level"),
            anxiety_level: get_opt_u8(row, "anxiety_level"),
            sleep_quality: get_opt_u8(row, "sleep_quality"),
            notes,
            triggers,
            gratitude,
            check_in_type: CheckInType::from_str_value(&get_str(row, "check_in_type")?)?,
            created_at: get_datetime(row, "created_at")?,
        })
    }
}

fn streak_from_row(row: &Row) -> AppResult<MoodStreak> {
    Ok(MoodStreak {
        id: get_str(row, "id")?,
        user_id: get_opt_uuid(row, "user_id"),
        anonymous_id: get_opt_str(row, "anonymous_id"),
        current_streak: get_u32(row, "current_streak")?,
        longest_streak: get_u32(row, "longest_streak")?,
        last_check_in: get_datetime(row, "last_check_in")?,
        total_check_ins: get_u32(row, "total_check_ins")?,
    })
}

fn validate_score(field: &str, value: u8) -> AppResult<()> {
    if (1..=10).contains(&value) {
        Ok(())
    } else {
        Err(AppError::out_of_range(format!(
            "{field} must be between 1 and 10, got {value}"
        )))
    }
}

fn validate_optional_score(field: &str, value: Option<u8>) -> AppResult<()> {
    match value {
        Some(value) => validate_score(field, value),
        None => Ok(()),
    }
}
