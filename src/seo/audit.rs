//! # SEO Audit
//!
//! Rule-based scoring of an entity's SEO metadata. The audit starts at 100
//! and subtracts a fixed penalty per failed check, flooring at 0; the final
//! score maps onto one of four status buckets. Penalties and bucket
//! boundaries are constants so audit results stay reproducible across runs.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use utoipa::ToSchema;

/// Score at or above which an audit is rated `excellent`.
pub const EXCELLENT_MIN: i32 = 90;
/// Score at or above which an audit is rated `good`.
pub const GOOD_MIN: i32 = 70;
/// Score at or above which an audit is rated `needs-improvement`.
pub const NEEDS_IMPROVEMENT_MIN: i32 = 50;

/// Recommended meta title length range, in characters.
pub const TITLE_RANGE: (usize, usize) = (30, 60);
/// Recommended meta description length range, in characters.
pub const DESCRIPTION_RANGE: (usize, usize) = (120, 160);
/// Slugs longer than this draw a warning.
pub const SLUG_MAX: usize = 75;
/// Posts with fewer words than this draw a thin-content warning.
pub const MIN_CONTENT_WORDS: usize = 300;

/// Which entity kind is being audited. Posts carry extra image and
/// content-length checks that do not apply to perks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditKind {
    Perk,
    Post,
}

impl AuditKind {
    /// Parses the path segment used by the audit endpoint.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "perk" => Some(AuditKind::Perk),
            "post" => Some(AuditKind::Post),
            _ => None,
        }
    }
}

/// Borrowed view over the SEO surface of the entity being audited.
///
/// All fields refer to the dedicated SEO metadata, not the display fields:
/// a post always has a display title, but an unset `seo_title` still counts
/// as a missing meta title.
#[derive(Debug, Default)]
pub struct AuditSubject<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub keywords: &'a [String],
    pub slug: &'a str,
    pub og_image: Option<&'a str>,
    pub featured_image: Option<&'a str>,
    pub content: Option<&'a str>,
}

/// Result of one audit run.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SeoAudit {
    /// Final score in 0..=100
    pub score: i32,
    /// Bucketed rating (excellent|good|needs-improvement|poor)
    pub status: String,
    /// Failed checks that materially hurt discoverability
    pub issues: Vec<String>,
    /// Softer findings worth fixing
    pub warnings: Vec<String>,
    /// Suggested next actions, one per missing field
    pub recommendations: Vec<String>,
}

/// Keyword usage statistics for one declared keyword.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct KeywordDensity {
    pub keyword: String,
    /// Case-insensitive whole-word occurrences in the stripped content
    pub occurrences: usize,
    /// Occurrences per hundred words
    pub density: f64,
    /// Bucketed rating (missing|low|good|high)
    pub rating: String,
}

/// Maps a score onto its status bucket.
pub fn status_for_score(score: i32) -> &'static str {
    if score >= EXCELLENT_MIN {
        "excellent"
    } else if score >= GOOD_MIN {
        "good"
    } else if score >= NEEDS_IMPROVEMENT_MIN {
        "needs-improvement"
    } else {
        "poor"
    }
}

/// Audits the subject's SEO metadata.
pub fn audit(subject: &AuditSubject<'_>, kind: AuditKind) -> SeoAudit {
    let mut score = 100i32;
    let mut issues = Vec::new();
    let mut warnings = Vec::new();
    let mut recommendations = Vec::new();

    match non_empty(subject.title) {
        None => {
            score -= 15;
            issues.push("Meta title is missing".to_string());
            recommendations.push(format!(
                "Add a meta title of {} to {} characters",
                TITLE_RANGE.0, TITLE_RANGE.1
            ));
        }
        Some(title) => {
            let length = title.chars().count();
            if length < TITLE_RANGE.0 {
                score -= 5;
                warnings.push(format!(
                    "Meta title is short ({} characters, aim for {} to {})",
                    length, TITLE_RANGE.0, TITLE_RANGE.1
                ));
            } else if length > TITLE_RANGE.1 {
                score -= 5;
                warnings.push(format!(
                    "Meta title is long ({} characters, aim for {} to {})",
                    length, TITLE_RANGE.0, TITLE_RANGE.1
                ));
            }
        }
    }

    match non_empty(subject.description) {
        None => {
            score -= 15;
            issues.push("Meta description is missing".to_string());
            recommendations.push(format!(
                "Add a meta description of {} to {} characters",
                DESCRIPTION_RANGE.0, DESCRIPTION_RANGE.1
            ));
        }
        Some(description) => {
            let length = description.chars().count();
            if length < DESCRIPTION_RANGE.0 {
                score -= 5;
                warnings.push(format!(
                    "Meta description is short ({} characters, aim for {} to {})",
                    length, DESCRIPTION_RANGE.0, DESCRIPTION_RANGE.1
                ));
            } else if length > DESCRIPTION_RANGE.1 {
                score -= 5;
                warnings.push(format!(
                    "Meta description is long ({} characters, aim for {} to {})",
                    length, DESCRIPTION_RANGE.0, DESCRIPTION_RANGE.1
                ));
            }
        }
    }

    if subject.keywords.iter().all(|k| k.trim().is_empty()) {
        score -= 10;
        warnings.push("No SEO keywords declared".to_string());
        recommendations.push("Declare three to five keywords this page should rank for".to_string());
    }

    if kind == AuditKind::Post {
        if non_empty(subject.og_image).is_none() {
            score -= 15;
            issues.push("Open Graph image is missing".to_string());
            recommendations.push("Add an Open Graph image so shares render a preview".to_string());
        }
        if non_empty(subject.featured_image).is_none() {
            score -= 10;
            warnings.push("Featured image is missing".to_string());
        }
        let words = word_count(subject.content.unwrap_or_default());
        if words < MIN_CONTENT_WORDS {
            score -= 10;
            warnings.push(format!(
                "Content is thin ({} words, aim for at least {})",
                words, MIN_CONTENT_WORDS
            ));
        }
    }

    if subject.slug.chars().count() > SLUG_MAX {
        score -= 5;
        warnings.push(format!(
            "Slug is longer than {} characters, shorter slugs rank better",
            SLUG_MAX
        ));
    }

    let score = score.max(0);
    SeoAudit {
        score,
        status: status_for_score(score).to_string(),
        issues,
        warnings,
        recommendations,
    }
}

/// Computes per-keyword density over tag-stripped content.
///
/// Density is whole-word occurrences per hundred words; ratings are
/// `missing` at zero occurrences, `low` below 0.5, `high` above 3.0,
/// `good` otherwise.
pub fn keyword_density(content: &str, keywords: &[String]) -> Vec<KeywordDensity> {
    let text = strip_tags(content);
    let total_words = word_count(&text);

    keywords
        .iter()
        .filter(|keyword| !keyword.trim().is_empty())
        .map(|keyword| {
            let occurrences = count_whole_word(&text, keyword.trim());
            let density = if total_words == 0 {
                0.0
            } else {
                occurrences as f64 * 100.0 / total_words as f64
            };
            let rating = if occurrences == 0 {
                "missing"
            } else if density < 0.5 {
                "low"
            } else if density > 3.0 {
                "high"
            } else {
                "good"
            };
            KeywordDensity {
                keyword: keyword.trim().to_string(),
                occurrences,
                density,
                rating: rating.to_string(),
            }
        })
        .collect()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn word_count(text: &str) -> usize {
    strip_tags(text).split_whitespace().count()
}

fn strip_tags(content: &str) -> String {
    static TAG: OnceLock<Regex> = OnceLock::new();
    let tag = TAG.get_or_init(|| Regex::new(r"<[^>]*>").unwrap());
    tag.replace_all(content, " ").into_owned()
}

fn count_whole_word(text: &str, keyword: &str) -> usize {
    // Keywords come from user input, so the pattern is escaped and a
    // keyword the regex engine still rejects simply counts zero.
    let pattern = format!(r"(?i)\b{}\b", regex::escape(keyword));
    match Regex::new(&pattern) {
        Ok(re) => re.find_iter(text).count(),
        Err(_) => 0,
    }
}
