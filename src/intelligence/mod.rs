// ABOUTME: Insight engine module: trend, correlation, and risk analysis over mood history
// ABOUTME: Deterministic templates with optional language-model phrasing on top
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness

//! Mood intelligence
//!
//! Everything here computes from decrypted mood history in process. The
//! external text-generation service is an enhancement for phrasing only -
//! never a dependency for correctness. When it is unconfigured or fails,
//! the deterministic templated text stands.

pub mod engine;
pub mod risk;
pub mod statistics;

pub use engine::{trend_summary, InsightEngine, MoodAnalysis, RefreshReport, TrendSummary};
pub use risk::assess_risk;
