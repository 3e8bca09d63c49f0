// ABOUTME: Peer support service: supporter profiles, matching, encrypted messaging, groups
// ABOUTME: Greedy highest-rated-under-capacity matching and capacity-checked group joins
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness

//! Peer support service
//!
//! Supporter selection is a greedy pick: the highest-average-rating
//! active supporter currently under their concurrent-match ceiling. Ties
//! fall to store-default ordering, which is not deterministic. Message
//! content is always encrypted; flag reasons stay plaintext so moderation
//! staff can read them.

use crate::crypto::FieldCipher;
use crate::errors::{AppError, AppResult};
use crate::models::{
    FeedbackRole, GroupCategory, GroupMembership, GroupMessage, GroupMessageType, GroupRole,
    MatchPreferences, MatchStatus, MatchType, PeerFeedback, PeerMatch, PeerMessage,
    PeerMessageType, PeerSupporter, SupportGroup, SupporterLevel, SupporterProfile,
    SupporterProfileUpdate,
};
use crate::services::{ServiceContext, ServiceResponse};
use crate::store::{
    get_bool, get_datetime, get_opt_datetime, get_opt_f64, get_opt_str, get_opt_uuid, get_str,
    get_u32, get_u8, Filter, Query, Row, Subscription,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

const SUPPORTERS_TABLE: &str = "peer_supporters";
const MATCHES_TABLE: &str = "peer_matches";
const MESSAGES_TABLE: &str = "peer_messages";
const GROUPS_TABLE: &str = "support_groups";
const MEMBERSHIPS_TABLE: &str = "group_memberships";
const GROUP_MESSAGES_TABLE: &str = "group_messages";
const FEEDBACK_TABLE: &str = "peer_feedback";

/// A membership joined with its group, for "my groups" listings
#[derive(Debug, Clone)]
pub struct GroupMembershipWithGroup {
    /// The membership row
    pub membership: GroupMembership,
    /// The group it belongs to
    pub group: SupportGroup,
}

/// Service over supporters, matches, messages, groups, and feedback
#[derive(Clone)]
pub struct PeerSupportService {
    ctx: Arc<ServiceContext>,
}

impl PeerSupportService {
    /// Create a service over a shared context
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    // ── Supporter profiles ──────────────────────────────────────────

    /// Register the principal as a peer supporter
    pub async fn become_supporter(
        &self,
        profile: SupporterProfile,
    ) -> ServiceResponse<PeerSupporter> {
        self.try_become_supporter(profile).await.into()
    }

    /// Partially update the principal's supporter profile
    pub async fn update_supporter(
        &self,
        update: SupporterProfileUpdate,
    ) -> ServiceResponse<PeerSupporter> {
        self.try_update_supporter(update).await.into()
    }

    /// The principal's supporter profile; `None` if never registered
    pub async fn supporter_profile(&self) -> ServiceResponse<Option<PeerSupporter>> {
        self.try_supporter_profile().await.into()
    }

    // ── Matching ────────────────────────────────────────────────────

    /// Match the seeking principal with a supporter and create the match
    /// record. Reason and preferences are encrypted into the row.
    pub async fn find_supporter(
        &self,
        preferences: MatchPreferences,
    ) -> ServiceResponse<PeerMatch> {
        self.try_find_supporter(preferences).await.into()
    }

    /// Matches where the principal is seeker or supporter, newest first
    pub async fn my_matches(&self) -> ServiceResponse<Vec<PeerMatch>> {
        self.try_my_matches().await.into()
    }

    /// Advance a match through its lifecycle
    pub async fn update_match_status(
        &self,
        match_id: &str,
        status: MatchStatus,
    ) -> ServiceResponse<PeerMatch> {
        self.try_update_match_status(match_id, status).await.into()
    }

    // ── Messaging ───────────────────────────────────────────────────

    /// Send an encrypted message within a match; bumps the match's
    /// last-interaction timestamp and session count
    pub async fn send_message(
        &self,
        match_id: &str,
        content: &str,
        message_type: PeerMessageType,
    ) -> ServiceResponse<PeerMessage> {
        self.try_send_message(match_id, content, message_type)
            .await
            .into()
    }

    /// Messages within a match, oldest first for chat readability
    pub async fn messages(&self, match_id: &str, limit: usize) -> ServiceResponse<Vec<PeerMessage>> {
        self.try_messages(match_id, limit).await.into()
    }

    // ── Groups ──────────────────────────────────────────────────────

    /// Active support groups, fullest first, optionally by category
    pub async fn support_groups(
        &self,
        category: Option<GroupCategory>,
    ) -> ServiceResponse<Vec<SupportGroup>> {
        self.try_support_groups(category).await.into()
    }

    /// Join a group. Rejected without a membership row when the group is
    /// already at its membership ceiling.
    pub async fn join_group(&self, group_id: &str) -> ServiceResponse<GroupMembership> {
        self.try_join_group(group_id).await.into()
    }

    /// The principal's group memberships with their groups
    pub async fn my_groups(&self) -> ServiceResponse<Vec<GroupMembershipWithGroup>> {
        self.try_my_groups().await.into()
    }

    /// Send an encrypted message to a group
    pub async fn send_group_message(
        &self,
        group_id: &str,
        content: &str,
        message_type: GroupMessageType,
    ) -> ServiceResponse<GroupMessage> {
        self.try_send_group_message(group_id, content, message_type)
            .await
            .into()
    }

    /// Messages within a group, oldest first
    pub async fn group_messages(
        &self,
        group_id: &str,
        limit: usize,
    ) -> ServiceResponse<Vec<GroupMessage>> {
        self.try_group_messages(group_id, limit).await.into()
    }

    // ── Feedback & moderation ───────────────────────────────────────

    /// Submit post-match feedback; rolls the rating into the supporter's
    /// average when the feedback reviews the supporter
    pub async fn submit_feedback(
        &self,
        match_id: &str,
        rating: u8,
        feedback: Option<&str>,
        feedback_type: FeedbackRole,
    ) -> ServiceResponse<PeerFeedback> {
        self.try_submit_feedback(match_id, rating, feedback, feedback_type)
            .await
            .into()
    }

    /// Flag a message for moderation. The reason is stored plaintext so
    /// moderation staff can read it. Idempotent: a second flag simply
    /// overwrites the reason.
    pub async fn flag_message(
        &self,
        message_id: &str,
        reason: &str,
        group_message: bool,
    ) -> ServiceResponse<()> {
        self.try_flag_message(message_id, reason, group_message)
            .await
            .into()
    }

    // ── Subscriptions ───────────────────────────────────────────────

    /// Subscribe to new messages in a match; payloads are decrypted as
    /// they arrive
    pub async fn subscribe_match_messages(
        &self,
        match_id: &str,
    ) -> ServiceResponse<PeerMessageSubscription> {
        self.try_subscribe_match(match_id).await.into()
    }

    /// Subscribe to new messages in a group
    pub async fn subscribe_group_messages(
        &self,
        group_id: &str,
    ) -> ServiceResponse<GroupMessageSubscription> {
        self.try_subscribe_group(group_id).await.into()
    }

    // ── Implementation ──────────────────────────────────────────────

    async fn try_become_supporter(&self, profile: SupporterProfile) -> AppResult<PeerSupporter> {
        let principal = self.ctx.resolver.require_principal().await?;

        let mut row = Row::new();
        row.insert(
            principal.column().as_str().into(),
            principal.column_value(),
        );
        row.insert(
            "supporter_level".into(),
            json!(profile.supporter_level.as_str()),
        );
        row.insert(
            "experience_months".into(),
            json!(profile.experience_months),
        );
        row.insert("specializations".into(), json!(profile.specializations));
        row.insert("availability_hours".into(), profile.availability_hours);
        row.insert(
            "max_concurrent_matches".into(),
            json!(profile.max_concurrent_matches),
        );
        row.insert("current_matches".into(), json!(0));
        row.insert("total_sessions".into(), json!(0));
        row.insert("average_rating".into(), json!(0.0));
        row.insert("is_active".into(), json!(profile.is_active));

        let persisted = self.ctx.store.insert(SUPPORTERS_TABLE, row).await?;
        supporter_from_row(&persisted)
    }

    async fn try_update_supporter(
        &self,
        update: SupporterProfileUpdate,
    ) -> AppResult<PeerSupporter> {
        let existing = self
            .try_supporter_profile()
            .await?
            .ok_or_else(|| AppError::not_found("supporter profile"))?;

        let mut changes = Row::new();
        if let Some(level) = update.supporter_level {
            changes.insert("supporter_level".into(), json!(level.as_str()));
        }
        if let Some(specializations) = update.specializations {
            changes.insert("specializations".into(), json!(specializations));
        }
        if let Some(availability) = update.availability_hours {
            changes.insert("availability_hours".into(), availability);
        }
        if let Some(ceiling) = update.max_concurrent_matches {
            changes.insert("max_concurrent_matches".into(), json!(ceiling));
        }
        if let Some(active) = update.is_active {
            changes.insert("is_active".into(), json!(active));
        }
        changes.insert("updated_at".into(), json!(Utc::now().to_rfc3339()));

        let persisted = self
            .ctx
            .store
            .update(SUPPORTERS_TABLE, &existing.id, changes)
            .await?;
        supporter_from_row(&persisted)
    }

    async fn try_supporter_profile(&self) -> AppResult<Option<PeerSupporter>> {
        let Some(principal) = self.ctx.resolver.current_identity().await? else {
            return Ok(None);
        };

        let row = self
            .ctx
            .store
            .select_one(
                Query::table(SUPPORTERS_TABLE)
                    .eq(principal.column().as_str(), principal.column_value()),
            )
            .await?;

        row.map(|row| supporter_from_row(&row)).transpose()
    }

    async fn try_find_supporter(&self, preferences: MatchPreferences) -> AppResult<PeerMatch> {
        let principal = self.ctx.resolver.require_principal().await?;

        let mut query = Query::table(SUPPORTERS_TABLE)
            .eq("is_active", true)
            .order_desc("average_rating");
        if let Some(level) = preferences.supporter_level {
            query = query.eq("supporter_level", level.as_str());
        }

        let supporters = self.ctx.store.select(query).await?;

        // greedy: first (highest-rated) supporter still under capacity
        let selected = supporters
            .iter()
            .map(|row| supporter_from_row(row))
            .collect::<AppResult<Vec<_>>>()?
            .into_iter()
            .find(|s| s.current_matches < s.max_concurrent_matches)
            .ok_or_else(|| AppError::not_found("available supporter"))?;

        let mut row = Row::new();
        row.insert(
            principal.prefixed_column("seeker"),
            principal.column_value(),
        );
        if let Some(user_id) = selected.user_id {
            row.insert("supporter_user_id".into(), json!(user_id.to_string()));
        } else if let Some(anonymous_id) = &selected.anonymous_id {
            row.insert("supporter_anonymous_id".into(), json!(anonymous_id));
        }
        row.insert("match_type".into(), json!(preferences.match_type.as_str()));
        row.insert("status".into(), json!(MatchStatus::Pending.as_str()));
        row.insert("session_count".into(), json!(0));

        if let Some(reason) = preferences.reason.as_deref() {
            row.insert(
                "encrypted_match_reason".into(),
                json!(self.ctx.cipher.encrypt(reason)?),
            );
        }
        row.insert(
            "encrypted_seeker_preferences".into(),
            json!(self.ctx.cipher.encrypt_json(&preferences)?),
        );

        let persisted = self.ctx.store.insert(MATCHES_TABLE, row).await?;

        // claim a slot so the supporter falls out of the candidate pool
        // at their ceiling; last-write-wins under concurrency
        let mut changes = Row::new();
        changes.insert(
            "current_matches".into(),
            json!(selected.current_matches + 1),
        );
        self.ctx
            .store
            .update(SUPPORTERS_TABLE, &selected.id, changes)
            .await?;

        self.match_from_row(&persisted)
    }

    async fn try_my_matches(&self) -> AppResult<Vec<PeerMatch>> {
        let Some(principal) = self.ctx.resolver.current_identity().await? else {
            return Ok(Vec::new());
        };

        let value = principal.column_value();
        let rows = self
            .ctx
            .store
            .select(
                Query::table(MATCHES_TABLE)
                    .any_eq(principal.prefixed_column("seeker"), value.clone())
                    .any_eq(principal.prefixed_column("supporter"), value)
                    .order_desc("created_at"),
            )
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| match self.match_from_row(row) {
                Ok(peer_match) => Some(peer_match),
                Err(error) => {
                    warn!(
                        id = get_opt_str(row, "id").as_deref().unwrap_or("?"),
                        code = ?error.code,
                        "skipping undecryptable match"
                    );
                    None
                }
            })
            .collect())
    }

    async fn try_update_match_status(
        &self,
        match_id: &str,
        status: MatchStatus,
    ) -> AppResult<PeerMatch> {
        let mut changes = Row::new();
        changes.insert("status".into(), json!(status.as_str()));
        changes.insert("updated_at".into(), json!(Utc::now().to_rfc3339()));

        let persisted = self.ctx.store.update(MATCHES_TABLE, match_id, changes).await?;
        self.match_from_row(&persisted)
    }

    async fn try_send_message(
        &self,
        match_id: &str,
        content: &str,
        message_type: PeerMessageType,
    ) -> AppResult<PeerMessage> {
        let principal = self.ctx.resolver.require_principal().await?;

        let mut row = Row::new();
        row.insert("match_id".into(), json!(match_id));
        row.insert(
            principal.prefixed_column("sender"),
            principal.column_value(),
        );
        row.insert(
            "encrypted_content".into(),
            json!(self.ctx.cipher.encrypt(content)?),
        );
        row.insert("message_type".into(), json!(message_type.as_str()));
        row.insert("is_flagged".into(), json!(false));

        let persisted = self.ctx.store.insert(MESSAGES_TABLE, row).await?;

        // plaintext interaction bookkeeping on the match row
        if let Some(match_row) = self
            .ctx
            .store
            .select_one(Query::table(MATCHES_TABLE).eq("id", match_id))
            .await?
        {
            let session_count = get_u32(&match_row, "session_count").unwrap_or(0);
            let mut changes = Row::new();
            changes.insert("session_count".into(), json!(session_count + 1));
            changes.insert("last_interaction".into(), json!(Utc::now().to_rfc3339()));
            self.ctx.store.update(MATCHES_TABLE, match_id, changes).await?;
        }

        self.peer_message_from_row(&persisted)
    }

    async fn try_messages(&self, match_id: &str, limit: usize) -> AppResult<Vec<PeerMessage>> {
        let rows = self
            .ctx
            .store
            .select(
                Query::table(MESSAGES_TABLE)
                    .eq("match_id", match_id)
                    .order_asc("created_at")
                    .limit(limit),
            )
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| match self.peer_message_from_row(row) {
                Ok(message) => Some(message),
                Err(error) => {
                    warn!(
                        id = get_opt_str(row, "id").as_deref().unwrap_or("?"),
                        code = ?error.code,
                        "skipping undecryptable message"
                    );
                    None
                }
            })
            .collect())
    }

    async fn try_support_groups(
        &self,
        category: Option<GroupCategory>,
    ) -> AppResult<Vec<SupportGroup>> {
        let mut query = Query::table(GROUPS_TABLE)
            .eq("is_active", true)
            .order_desc("current_members");
        if let Some(category) = category {
            query = query.eq("category", category.as_str());
        }

        let rows = self.ctx.store.select(query).await?;
        rows.iter().map(group_from_row).collect()
    }

    async fn try_join_group(&self, group_id: &str) -> AppResult<GroupMembership> {
        let principal = self.ctx.resolver.require_principal().await?;

        let group_row = self
            .ctx
            .store
            .select_one(Query::table(GROUPS_TABLE).eq("id", group_id))
            .await?
            .ok_or_else(|| AppError::not_found("support group"))?;
        let group = group_from_row(&group_row)?;

        // the ceiling is checked before any membership row exists
        if group.current_members >= group.max_members {
            return Err(AppError::capacity(format!(
                "group {} is full ({}/{})",
                group.name, group.current_members, group.max_members
            )));
        }

        let mut row = Row::new();
        row.insert("group_id".into(), json!(group_id));
        row.insert(
            principal.column().as_str().into(),
            principal.column_value(),
        );
        row.insert("role".into(), json!(GroupRole::Member.as_str()));
        row.insert("joined_at".into(), json!(Utc::now().to_rfc3339()));

        let persisted = self.ctx.store.insert(MEMBERSHIPS_TABLE, row).await?;

        let mut changes = Row::new();
        changes.insert("current_members".into(), json!(group.current_members + 1));
        self.ctx.store.update(GROUPS_TABLE, group_id, changes).await?;

        membership_from_row(&persisted)
    }

    async fn try_my_groups(&self) -> AppResult<Vec<GroupMembershipWithGroup>> {
        let Some(principal) = self.ctx.resolver.current_identity().await? else {
            return Ok(Vec::new());
        };

        let membership_rows = self
            .ctx
            .store
            .select(
                Query::table(MEMBERSHIPS_TABLE)
                    .eq(principal.column().as_str(), principal.column_value())
                    .order_desc("joined_at"),
            )
            .await?;

        let mut joined = Vec::with_capacity(membership_rows.len());
        for row in &membership_rows {
            let membership = membership_from_row(row)?;
            let Some(group_row) = self
                .ctx
                .store
                .select_one(Query::table(GROUPS_TABLE).eq("id", membership.group_id.clone()))
                .await?
            else {
                warn!(group_id = %membership.group_id, "membership references missing group");
                continue;
            };
            joined.push(GroupMembershipWithGroup {
                membership,
                group: group_from_row(&group_row)?,
            });
        }
        Ok(joined)
    }

    async fn try_send_group_message(
        &self,
        group_id: &str,
        content: &str,
        message_type: GroupMessageType,
    ) -> AppResult<GroupMessage> {
        let principal = self.ctx.resolver.require_principal().await?;

        let mut row = Row::new();
        row.insert("group_id".into(), json!(group_id));
        row.insert(
            principal.prefixed_column("sender"),
            principal.column_value(),
        );
        row.insert(
            "encrypted_content".into(),
            json!(self.ctx.cipher.encrypt(content)?),
        );
        row.insert("message_type".into(), json!(message_type.as_str()));
        row.insert("is_flagged".into(), json!(false));

        let persisted = self.ctx.store.insert(GROUP_MESSAGES_TABLE, row).await?;
        self.group_message_from_row(&persisted)
    }

    async fn try_group_messages(
        &self,
        group_id: &str,
        limit: usize,
    ) -> AppResult<Vec<GroupMessage>> {
        let rows = self
            .ctx
            .store
            .select(
                Query::table(GROUP_MESSAGES_TABLE)
                    .eq("group_id", group_id)
                    .order_asc("created_at")
                    .limit(limit),
            )
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| match self.group_message_from_row(row) {
                Ok(message) => Some(message),
                Err(error) => {
                    warn!(
                        id = get_opt_str(row, "id").as_deref().unwrap_or("?"),
                        code = ?error.code,
                        "skipping undecryptable group message"
                    );
                    None
                }
            })
            .collect())
    }

    async fn try_submit_feedback(
        &self,
        match_id: &str,
        rating: u8,
        feedback: Option<&str>,
        feedback_type: FeedbackRole,
    ) -> AppResult<PeerFeedback> {
        if !(1..=5).contains(&rating) {
            return Err(AppError::out_of_range(format!(
                "rating must be between 1 and 5, got {rating}"
            )));
        }

        let principal = self.ctx.resolver.require_principal().await?;

        let mut row = Row::new();
        row.insert("match_id".into(), json!(match_id));
        row.insert(
            principal.prefixed_column("reviewer"),
            principal.column_value(),
        );
        row.insert("rating".into(), json!(rating));
        row.insert("feedback_type".into(), json!(feedback_type.as_str()));
        if let Some(text) = feedback {
            row.insert(
                "encrypted_feedback".into(),
                json!(self.ctx.cipher.encrypt(text)?),
            );
        }

        let persisted = self.ctx.store.insert(FEEDBACK_TABLE, row).await?;

        if feedback_type == FeedbackRole::Supporter {
            if let Err(error) = self.roll_up_supporter_rating(match_id, rating).await {
                warn!(code = ?error.code, "supporter rating roll-up failed");
            }
        }

        self.feedback_from_row(&persisted)
    }

    /// Fold a new rating into the matched supporter's running average
    async fn roll_up_supporter_rating(&self, match_id: &str, rating: u8) -> AppResult<()> {
        let match_row = self
            .ctx
            .store
            .select_one(Query::table(MATCHES_TABLE).eq("id", match_id))
            .await?
            .ok_or_else(|| AppError::not_found("peer match"))?;

        let mut query = Query::table(SUPPORTERS_TABLE);
        if let Some(user_id) = get_opt_str(&match_row, "supporter_user_id") {
            query = query.eq("user_id", user_id);
        } else if let Some(anonymous_id) = get_opt_str(&match_row, "supporter_anonymous_id") {
            query = query.eq("anonymous_id", anonymous_id);
        } else {
            return Err(AppError::store("match has no supporter scope"));
        }

        let supporter_row = self
            .ctx
            .store
            .select_one(query)
            .await?
            .ok_or_else(|| AppError::not_found("supporter"))?;
        let supporter = supporter_from_row(&supporter_row)?;

        let sessions = supporter.total_sessions;
        let new_average = (supporter.average_rating * f64::from(sessions) + f64::from(rating))
            / f64::from(sessions + 1);

        let mut changes = Row::new();
        changes.insert("average_rating".into(), json!(new_average));
        changes.insert("total_sessions".into(), json!(sessions + 1));
        self.ctx
            .store
            .update(SUPPORTERS_TABLE, &supporter.id, changes)
            .await?;
        Ok(())
    }

    async fn try_flag_message(
        &self,
        message_id: &str,
        reason: &str,
        group_message: bool,
    ) -> AppResult<()> {
        let table = if group_message {
            GROUP_MESSAGES_TABLE
        } else {
            MESSAGES_TABLE
        };

        let mut changes = Row::new();
        changes.insert("is_flagged".into(), json!(true));
        changes.insert("flagged_reason".into(), json!(reason));

        self.ctx.store.update(table, message_id, changes).await?;
        Ok(())
    }

    async fn try_subscribe_match(&self, match_id: &str) -> AppResult<PeerMessageSubscription> {
        let inner = self
            .ctx
            .store
            .subscribe(MESSAGES_TABLE, Filter::eq("match_id", match_id))
            .await?;
        Ok(PeerMessageSubscription {
            inner,
            cipher: self.ctx.cipher.clone(),
        })
    }

    async fn try_subscribe_group(&self, group_id: &str) -> AppResult<GroupMessageSubscription> {
        let inner = self
            .ctx
            .store
            .subscribe(GROUP_MESSAGES_TABLE, Filter::eq("group_id", group_id))
            .await?;
        Ok(GroupMessageSubscription {
            inner,
            cipher: self.ctx.cipher.clone(),
        })
    }

    fn match_from_row(&self, row: &Row) -> AppResult<PeerMatch> {
        let cipher = &self.ctx.cipher;

        let match_reason = match get_opt_str(row, "encrypted_match_reason") {
            Some(ciphertext) => Some(cipher.decrypt(&ciphertext)?),
            None => None,
        };
        let seeker_preferences = match get_opt_str(row, "encrypted_seeker_preferences") {
            Some(ciphertext) => Some(cipher.decrypt(&ciphertext)?),
            None => None,
        };

        Ok(PeerMatch {
            id: get_str(row, "id")?,
            seeker_user_id: get_opt_uuid(row, "seeker_user_id"),
            seeker_anonymous_id: get_opt_str(row, "seeker_anonymous_id"),
            supporter_user_id: get_opt_uuid(row, "supporter_user_id"),
            supporter_anonymous_id: get_opt_str(row, "supporter_anonymous_id"),
            match_type: MatchType::from_str_value(&get_str(row, "match_type")?)?,
            status: MatchStatus::from_str_value(&get_str(row, "status")?)?,
            match_reason,
            seeker_preferences,
            session_count: get_u32(row, "session_count")?,
            last_interaction: get_opt_datetime(row, "last_interaction"),
            created_at: get_datetime(row, "created_at")?,
        })
    }

    fn peer_message_from_row(&self, row: &Row) -> AppResult<PeerMessage> {
        Ok(PeerMessage {
            id: get_str(row, "id")?,
            match_id: get_str(row, "match_id")?,
            sender_user_id: get_opt_uuid(row, "sender_user_id"),
            sender_anonymous_id: get_opt_str(row, "sender_anonymous_id"),
            content: self
                .ctx
                .cipher
                .decrypt(&get_str(row, "encrypted_content")?)?,
            message_type: PeerMessageType::from_str_value(&get_str(row, "message_type")?)?,
            is_flagged: get_bool(row, "is_flagged")?,
            flagged_reason: get_opt_str(row, "flagged_reason"),
            created_at: get_datetime(row, "created_at")?,
        })
    }

    fn group_message_from_row(&self, row: &Row) -> AppResult<GroupMessage> {
        Ok(GroupMessage {
            id: get_str(row, "id")?,
            group_id: get_str(row, "group_id")?,
            sender_user_id: get_opt_uuid(row, "sender_user_id"),
            sender_anonymous_id: get_opt_str(row, "sender_anonymous_id"),
            content: self
                .ctx
                .cipher
                .decrypt(&get_str(row, "encrypted_content")?)?,
            message_type: GroupMessageType::from_str_value(&get_str(row, "message_type")?)?,
            is_flagged: get_bool(row, "is_flagged")?,
            flagged_reason: get_opt_str(row, "flagged_reason"),
            created_at: get_datetime(row, "created_at")?,
        })
    }

    fn feedback_from_row(&self, row: &Row) -> AppResult<PeerFeedback> {
        let feedback = match get_opt_str(row, "encrypted_feedback") {
            Some(ciphertext) => Some(self.ctx.cipher.decrypt(&ciphertext)?),
            None => None,
        };

        Ok(PeerFeedback {
            id: get_str(row, "id")?,
            match_id: get_str(row, "match_id")?,
            reviewer_user_id: get_opt_uuid(row, "reviewer_user_id"),
            reviewer_anonymous_id: get_opt_str(row, "reviewer_anonymous_id"),
            rating: get_u8(row, "rating")?,
            feedback,
            feedback_type: FeedbackRole::from_str_value(&get_str(row, "feedback_type")?)?,
            created_at: get_datetime(row, "created_at")?,
        })
    }
}

/// Decrypting subscription over a match's message channel
pub struct PeerMessageSubscription {
    inner: Subscription,
    cipher: FieldCipher,
}

impl PeerMessageSubscription {
    /// The next decrypted message; undecryptable payloads are skipped
    /// with a warning rather than ending the stream
    pub async fn next(&mut self) -> Option<PeerMessage> {
        while let Some(row) = self.inner.next().await {
            match peer_message_from_row_with(&self.cipher, &row) {
                Ok(message) => return Some(message),
                Err(error) => {
                    warn!(code = ?error.code, "skipping undecryptable inbound message");
                }
            }
        }
        None
    }
}

/// Decrypting subscription over a group's message channel
pub struct GroupMessageSubscription {
    inner: Subscription,
    cipher: FieldCipher,
}

impl GroupMessageSubscription {
    /// The next decrypted message; undecryptable payloads are skipped
    pub async fn next(&mut self) -> Option<GroupMessage> {
        while let Some(row) = self.inner.next().await {
            match group_message_from_row_with(&self.cipher, &row) {
                Ok(message) => return Some(message),
                Err(error) => {
                    warn!(code = ?error.code, "skipping undecryptable inbound group message");
                }
            }
        }
        None
    }
}

fn peer_message_from_row_with(cipher: &FieldCipher, row: &Row) -> AppResult<PeerMessage> {
    Ok(PeerMessage {
        id: get_str(row, "id")?,
        match_id: get_str(row, "match_id")?,
        sender_user_id: get_opt_uuid(row, "sender_user_id"),
        sender_anonymous_id: get_opt_str(row, "sender_anonymous_id"),
        content: cipher.decrypt(&get_str(row, "encrypted_content")?)?,
        message_type: PeerMessageType::from_str_value(&get_str(row, "message_type")?)?,
        is_flagged: get_bool(row, "is_flagged")?,
        flagged_reason: get_opt_str(row, "flagged_reason"),
        created_at: get_datetime(row, "created_at")?,
    })
}

fn group_message_from_row_with(cipher: &FieldCipher, row: &Row) -> AppResult<GroupMessage> {
    Ok(GroupMessage {
        id: get_str(row, "id")?,
        group_id: get_str(row, "group_id")?,
        sender_user_id: get_opt_uuid(row, "sender_user_id"),
        sender_anonymous_id: get_opt_str(row, "sender_anonymous_id"),
        content: cipher.decrypt(&get_str(row, "encrypted_content")?)?,
        message_type: GroupMessageType::from_str_value(&get_str(row, "message_type")?)?,
        is_flagged: get_bool(row, "is_flagged")?,
        flagged_reason: get_opt_str(row, "flagged_reason"),
        created_at: get_datetime(row, "created_at")?,
    })
}

fn supporter_from_row(row: &Row) -> AppResult<PeerSupporter> {
    let specializations = row
        .get("specializations")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(ToOwned::to_owned))
                .collect()
        })
        .unwrap_or_default();

    Ok(PeerSupporter {
        id: get_str(row, "id")?,
        user_id: get_opt_uuid(row, "user_id"),
        anonymous_id: get_opt_str(row, "anonymous_id"),
        supporter_level: SupporterLevel::from_str_value(&get_str(row, "supporter_level")?)?,
        experience_months: get_u32(row, "experience_months")?,
        specializations,
        availability_hours: row
            .get("availability_hours")
            .cloned()
            .unwrap_or(Value::Null),
        max_concurrent_matches: get_u32(row, "max_concurrent_matches")?,
        current_matches: get_u32(row, "current_matches")?,
        total_sessions: get_u32(row, "total_sessions")?,
        average_rating: get_opt_f64(row, "average_rating").unwrap_or(0.0),
        is_active: get_bool(row, "is_active")?,
    })
}

fn group_from_row(row: &Row) -> AppResult<SupportGroup> {
    Ok(SupportGroup {
        id: get_str(row, "id")?,
        name: get_str(row, "name")?,
        description: get_str(row, "description")?,
        category: GroupCategory::from_str_value(&get_str(row, "category")?)?,
        max_members: get_u32(row, "max_members")?,
        current_members: get_u32(row, "current_members")?,
        is_moderated: get_bool(row, "is_moderated")?,
        is_active: get_bool(row, "is_active")?,
    })
}

fn membership_from_row(row: &Row) -> AppResult<GroupMembership> {
    Ok(GroupMembership {
        id: get_str(row, "id")?,
        group_id: get_str(row, "group_id")?,
        user_id: get_opt_uuid(row, "user_id"),
        anonymous_id: get_opt_str(row, "anonymous_id"),
        role: GroupRole::from_str_value(&get_str(row, "role")?)?,
        joined_at: get_datetime(row, "joined_at")?,
    })
}
