//! Response normalizer — reconciles the backend's variably-shaped payloads
//! into one canonical, fully-populated result.
//!
//! The backend has shipped several revisions of its response envelope, so the
//! raw payload is first classified into an explicit `ResponseShape`, tried in
//! priority order, and each recognized shape is mapped by a pure conversion
//! into `NormalizedResult`. Extraction is lenient field by field: a mistyped
//! field falls back alone and never discards valid siblings. `normalize` is
//! total: any JSON value — object, array, or primitive — produces a result,
//! never a panic or an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ────────────────────────────────────────────────────────────────────────────
// Canonical output
// ────────────────────────────────────────────────────────────────────────────

/// The canonical shape handed to the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedResult {
    /// Relevance order as returned by the backend; never re-sorted here.
    pub matches: Vec<JobMatch>,
    pub resume_summary: Option<String>,
    /// Skill names with duplicates removed, backend order kept.
    pub resume_skills: Vec<String>,
    pub total_jobs_analyzed: Option<u64>,
}

/// One job posting annotated with match data. Every field is populated after
/// normalization; only `explanation` and `recommendation` stay optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMatch {
    /// Backend id, or `job-{index}` synthesized from the element's position —
    /// stable for rendering keys within one result set.
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    /// Clamped to 0–100.
    pub match_percentage: f64,
    pub matching_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub requirements: Vec<String>,
    pub salary: String,
    pub remote: bool,
    pub job_type: String,
    pub experience_level: String,
    pub posted_date: String,
    pub url: String,
    pub source: String,
    pub explanation: Option<String>,
    pub recommendation: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Recognized backend shapes
// ────────────────────────────────────────────────────────────────────────────

/// A result envelope as any backend revision sends it. Individual match
/// elements stay raw here; field fallbacks are applied per element below.
#[derive(Debug, Default)]
struct RawResults {
    matches: Vec<Value>,
    resume_summary: Option<String>,
    resume_skills: Vec<String>,
    total_jobs_analyzed: Option<u64>,
}

impl RawResults {
    /// Field-by-field lenient extraction. A mistyped sibling degrades to its
    /// own default and never discards the rest of the envelope.
    fn from_value(raw: &Value) -> RawResults {
        RawResults {
            matches: raw
                .get("matches")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            resume_summary: opt_text(raw, "resume_summary"),
            resume_skills: string_list(raw.get("resume_skills")),
            total_jobs_analyzed: raw.get("total_jobs_analyzed").and_then(Value::as_u64),
        }
    }
}

/// The payload shapes the backend has been observed to send, in the priority
/// order they are tried.
#[derive(Debug)]
enum ResponseShape {
    /// `matches` array at the top level.
    Flat(RawResults),
    /// `{ success, results: { matches, ... } }` — results one level down.
    Enveloped(RawResults),
    /// The payload itself is the matches array.
    Bare(Vec<Value>),
    /// A lone job-like object (has a title field).
    Single(Value),
    /// Anything else; normalizes to an empty result.
    Unrecognized,
}

impl ResponseShape {
    fn classify(raw: &Value) -> ResponseShape {
        if raw.get("matches").is_some_and(Value::is_array) {
            return ResponseShape::Flat(RawResults::from_value(raw));
        }
        if let Some(results) = raw.get("results") {
            let signals_success = raw.get("success").and_then(Value::as_bool) == Some(true);
            if results.get("matches").is_some_and(Value::is_array)
                || (signals_success && results.is_object())
            {
                return ResponseShape::Enveloped(RawResults::from_value(results));
            }
        }
        if let Value::Array(items) = raw {
            return ResponseShape::Bare(items.clone());
        }
        if raw.is_object() && raw.get("title").is_some_and(Value::is_string) {
            return ResponseShape::Single(raw.clone());
        }
        ResponseShape::Unrecognized
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Normalization
// ────────────────────────────────────────────────────────────────────────────

/// Converts any backend payload into the canonical result.
pub fn normalize(raw: &Value) -> NormalizedResult {
    match ResponseShape::classify(raw) {
        ResponseShape::Flat(results) | ResponseShape::Enveloped(results) => NormalizedResult {
            matches: normalize_jobs(results.matches),
            resume_summary: results.resume_summary,
            resume_skills: dedup_keep_order(results.resume_skills),
            total_jobs_analyzed: results.total_jobs_analyzed,
        },
        ResponseShape::Bare(items) => NormalizedResult {
            total_jobs_analyzed: Some(items.len() as u64),
            matches: normalize_jobs(items),
            ..NormalizedResult::default()
        },
        ResponseShape::Single(job) => NormalizedResult {
            resume_summary: opt_text(&job, "resume_summary"),
            total_jobs_analyzed: Some(1),
            matches: normalize_jobs(vec![job]),
            ..NormalizedResult::default()
        },
        ResponseShape::Unrecognized => NormalizedResult::default(),
    }
}

/// Applies the per-field fallbacks to one raw match element. Each field is
/// extracted on its own, so one bad field falls back alone.
fn normalize_jobs(items: Vec<Value>) -> Vec<JobMatch> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| JobMatch {
            id: job_id(item.get("id"), index),
            title: text_field(&item, "title", "Untitled Position"),
            company: text_field(&item, "company", "Unknown Company"),
            location: text_field(&item, "location", "Location not specified"),
            description: text_field(&item, "description", "No description available"),
            match_percentage: item
                .get("match_percentage")
                .and_then(Value::as_f64)
                .unwrap_or(0.0)
                .clamp(0.0, 100.0),
            matching_skills: string_list(item.get("matching_skills")),
            missing_skills: string_list(item.get("missing_skills")),
            requirements: string_list(item.get("requirements")),
            salary: text_field(&item, "salary", "Not disclosed"),
            remote: item.get("remote").and_then(Value::as_bool).unwrap_or(false),
            job_type: text_field(&item, "job_type", "Full-time"),
            experience_level: text_field(&item, "experience_level", "Mid-level"),
            posted_date: text_field(&item, "posted_date", "Recent"),
            url: text_field(&item, "url", "#"),
            source: text_field(&item, "source", "Unknown"),
            explanation: opt_text(&item, "explanation"),
            recommendation: opt_text(&item, "recommendation"),
        })
        .collect()
}

fn job_id(raw_id: Option<&Value>, index: usize) -> String {
    match raw_id {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => format!("job-{index}"),
    }
}

/// Empty or non-string values count as missing.
fn text_field(item: &Value, key: &str, fallback: &str) -> String {
    match item.get(key).and_then(Value::as_str) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => fallback.to_string(),
    }
}

fn opt_text(item: &Value, key: &str) -> Option<String> {
    item.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// String elements of an array; non-array values and non-string elements are
/// dropped.
fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn dedup_keep_order(skills: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    skills
        .into_iter()
        .filter(|s| seen.insert(s.clone()))
        .collect()
}
