//! # Lead Scoring
//!
//! Pure scoring functions for inbound leads. The completeness score is
//! recomputed from scratch on every save so edits can never drift it, and
//! the conversion probability is derived on read and never persisted.

use chrono::{DateTime, Utc};

/// Upper bound for both scores.
pub const MAX_SCORE: i32 = 100;

/// Borrowed view of the fields that feed the completeness score.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeadScoreInput<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub phone: Option<&'a str>,
    pub company_name: Option<&'a str>,
    pub message: Option<&'a str>,
    pub budget_range: &'a str,
    pub timeline: &'a str,
    pub source: &'a str,
    pub interest_count: usize,
}

/// Inputs for the derived conversion probability.
#[derive(Debug, Clone, Copy)]
pub struct ConversionInput {
    pub lead_score: i32,
    pub contact_attempts: i32,
    pub has_notes: bool,
    pub has_company: bool,
    pub has_phone: bool,
    pub created_at: DateTime<Utc>,
}

fn present(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// Compute the completeness score for a lead, clamped to `0..=100`.
///
/// Each populated field contributes a fixed weight; the source channel adds
/// a quality bonus on top. The function is deterministic and idempotent.
pub fn lead_score(input: &LeadScoreInput<'_>) -> i32 {
    let mut score = 0;

    if !input.name.trim().is_empty() {
        score += 10;
    }
    if !input.email.trim().is_empty() {
        score += 15;
    }
    if present(input.phone) {
        score += 10;
    }
    if present(input.company_name) {
        score += 15;
    }
    if input
        .message
        .is_some_and(|m| m.chars().count() > 50)
    {
        score += 10;
    }
    if input.budget_range != "not-specified" {
        score += 15;
    }
    if input.timeline != "flexible" {
        score += 10;
    }
    if input.interest_count > 0 {
        score += 5;
    }

    score += match input.source {
        "referral" => 20,
        "email" => 15,
        "form" => 10,
        "website" => 5,
        _ => 0,
    };

    score.clamp(0, MAX_SCORE)
}

/// Derive a lead priority from its score.
///
/// Used when intake does not carry an explicit priority; `urgent` is
/// reserved for manual escalation.
pub fn priority_for_score(score: i32) -> &'static str {
    if score >= 70 {
        "high"
    } else if score >= 40 {
        "medium"
    } else {
        "low"
    }
}

/// Bucket a lead by days since creation.
pub fn age_category(age_days: i64) -> &'static str {
    if age_days <= 1 {
        "fresh"
    } else if age_days <= 7 {
        "warm"
    } else if age_days <= 30 {
        "aging"
    } else {
        "cold"
    }
}

/// Estimate the probability of converting a lead, clamped to `0..=100`.
///
/// Starts from the stored completeness score, rewards engagement signals
/// and penalizes stale leads by age.
pub fn conversion_probability(input: &ConversionInput, now: DateTime<Utc>) -> i32 {
    let mut probability = input.lead_score;

    if input.contact_attempts > 0 {
        probability += 10;
    }
    if input.has_notes {
        probability += 5;
    }
    if input.has_company {
        probability += 5;
    }
    if input.has_phone {
        probability += 5;
    }

    let age_days = (now - input.created_at).num_days();
    if age_days > 30 {
        probability -= 20;
    } else if age_days > 7 {
        probability -= 10;
    }

    probability.clamp(0, MAX_SCORE)
}
