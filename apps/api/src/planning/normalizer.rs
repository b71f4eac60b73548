//! Response Normalizer: turns any completion shape into a `NormalizedPlan`.
//!
//! Attempt order for text: direct parse → fenced block (recursive) → balanced
//! `{...}` spans in order. Each parse tries the text as-is, then repaired.
//! A parsed object is accepted only if it yields at least one non-empty
//! narrative section. When nothing is accepted the caller still gets a
//! degraded plan built from the request and the raw text: `normalize` is total.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::llm_client::RawCompletion;
use crate::planning::extract::{fenced_block, object_spans};
use crate::planning::repair::repair;
use crate::planning::request::{PlanKind, PlanRequest};
use crate::planning::sections::{Section, TableGroup, TableRow};

/// Nesting limit for fenced blocks and JSON-encoded strings.
const MAX_DEPTH: usize = 3;

/// Keys that carry record metadata, not plan content.
const RESERVED_KEYS: &[&str] = &["title", "id", "created_at"];

const NO_CONTENT: &str = "No content received";

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSection {
    pub key: String,
    pub section: Section,
}

/// A structured business plan. Serializes to the flat `{ "title", <key>: value }`
/// shape the UI and backend expect, with section order preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Map<String, Value>", from = "Map<String, Value>")]
pub struct NormalizedPlan {
    pub title: String,
    pub sections: Vec<PlanSection>,
}

/// Which path produced the plan. Logged and returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationOrigin {
    /// The completion was already an object.
    Structured,
    /// The whole text parsed (possibly after repair).
    Direct,
    /// Found inside a code fence.
    Fenced,
    /// Found as a `{...}` span inside prose.
    Embedded,
    /// Nothing usable; degraded plan built from the raw text.
    Fallback,
}

#[derive(Debug, Clone)]
pub struct Normalized {
    pub plan: NormalizedPlan,
    pub origin: NormalizationOrigin,
}

impl NormalizedPlan {
    #[cfg(test)]
    pub fn section(&self, key: &str) -> Option<&Section> {
        self.sections
            .iter()
            .find(|s| s.key == key)
            .map(|s| &s.section)
    }

    /// True when at least one narrative section has text.
    pub fn has_narrative(&self) -> bool {
        self.sections
            .iter()
            .any(|s| s.section.is_narrative() && !s.section.is_empty())
    }

    /// Builds a plan from a JSON object without any acceptance checks.
    /// A missing or blank title is left empty.
    fn from_object(map: Map<String, Value>) -> Self {
        let title = map
            .get("title")
            .map(crate::planning::sections::value_text)
            .unwrap_or_default()
            .trim()
            .to_string();
        let sections = map
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| PlanSection {
                key: key.clone(),
                section: Section::classify(key, value),
            })
            .collect();
        Self { title, sections }
    }
}

impl From<NormalizedPlan> for Map<String, Value> {
    fn from(plan: NormalizedPlan) -> Self {
        let mut map = Map::new();
        map.insert("title".to_string(), Value::String(plan.title));
        for PlanSection { key, section } in plan.sections {
            map.insert(key, section.to_value());
        }
        map
    }
}

impl From<Map<String, Value>> for NormalizedPlan {
    fn from(map: Map<String, Value>) -> Self {
        let mut plan = NormalizedPlan::from_object(map);
        if plan.title.is_empty() {
            plan.title = "Business Plan".to_string();
        }
        plan
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Normalization
// ────────────────────────────────────────────────────────────────────────────

/// Converts a completion into a plan. Never fails.
pub fn normalize(raw: &RawCompletion, request: &PlanRequest) -> Normalized {
    let accepted = match raw {
        RawCompletion::Structured(Value::Object(map)) => {
            accept(map.clone(), request).map(|plan| (plan, NormalizationOrigin::Structured))
        }
        RawCompletion::Structured(Value::String(text)) | RawCompletion::Text(text) => {
            find_object(text, 0, &mut |map| accept(map, request))
        }
        RawCompletion::Structured(_) => None,
    };

    match accepted {
        Some((plan, origin)) => {
            info!(
                "Normalized {:?} plan via {:?} ({} sections)",
                request.kind,
                origin,
                plan.sections.len()
            );
            Normalized { plan, origin }
        }
        None => {
            warn!(
                "Completion for {:?} plan could not be normalized; using degraded plan",
                request.kind
            );
            Normalized {
                plan: degraded_plan(request, &raw.as_text()),
                origin: NormalizationOrigin::Fallback,
            }
        }
    }
}

/// Finds the first JSON object in `text` for which `accept` returns a value.
/// Used by the normalizer and, with an accept-anything closure, by the raw
/// completion route.
pub fn find_object<T, F>(text: &str, depth: usize, accept: &mut F) -> Option<(T, NormalizationOrigin)>
where
    F: FnMut(Map<String, Value>) -> Option<T>,
{
    if depth > MAX_DEPTH {
        return None;
    }

    match parse_lenient(text) {
        Some(Value::Object(map)) => {
            if let Some(found) = accept(map) {
                return Some((found, NormalizationOrigin::Direct));
            }
        }
        // JSON-encoded JSON: a string whose contents are the object.
        Some(Value::String(inner)) => {
            if let Some(found) = find_object(&inner, depth + 1, accept) {
                return Some(found);
            }
        }
        _ => {}
    }

    if let Some(inner) = fenced_block(text) {
        if let Some((found, origin)) = find_object(inner, depth + 1, accept) {
            let origin = match origin {
                NormalizationOrigin::Direct => NormalizationOrigin::Fenced,
                other => other,
            };
            return Some((found, origin));
        }
    }

    for span in object_spans(text) {
        if let Some(Value::Object(map)) = parse_lenient(span) {
            if let Some(found) = accept(map) {
                return Some((found, NormalizationOrigin::Embedded));
            }
        }
    }
    None
}

/// Parses as-is, then after repair.
fn parse_lenient(text: &str) -> Option<Value> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str(text) {
        return Some(value);
    }
    let repaired = repair(text);
    match serde_json::from_str(&repaired) {
        Ok(value) => {
            debug!("Parsed completion after repair");
            Some(value)
        }
        Err(_) => None,
    }
}

/// Accepts an object as a plan if it carries narrative content; fills the title.
fn accept(map: Map<String, Value>, request: &PlanRequest) -> Option<NormalizedPlan> {
    let mut plan = NormalizedPlan::from_object(map);
    if !plan.has_narrative() {
        return None;
    }
    if plan.title.is_empty() {
        plan.title = request.fallback_title();
    }
    Some(plan)
}

/// The degraded plan: request-derived title, raw text as the primary narrative,
/// every other expected section empty.
pub fn degraded_plan(request: &PlanRequest, raw_text: &str) -> NormalizedPlan {
    let narrative = if raw_text.trim().is_empty() {
        NO_CONTENT.to_string()
    } else {
        raw_text.to_string()
    };
    let primary = request.kind.primary_narrative();

    let sections = request
        .kind
        .section_keys()
        .iter()
        .map(|&key| {
            let section = if key == primary {
                Section::Narrative(narrative.clone())
            } else if request.kind == PlanKind::Tracker && key == "FinancialSummary" {
                tracker_summary(request)
                    .unwrap_or_else(|| Section::classify(key, &Value::String(String::new())))
            } else {
                Section::classify(key, &Value::String(String::new()))
            };
            PlanSection {
                key: key.to_string(),
                section,
            }
        })
        .collect();

    NormalizedPlan {
        title: request.fallback_title(),
        sections,
    }
}

/// Profit/loss computed locally from the tracker inputs, when both parse.
fn tracker_summary(request: &PlanRequest) -> Option<Section> {
    let sales = parse_amount(request.field("Sales"))?;
    let expenditure = parse_amount(request.field("Expenditure"))?;
    let amount = sales - expenditure;
    let status = if amount >= 0.0 { "Profit" } else { "Loss" };

    Some(Section::Table(vec![TableGroup {
        caption: None,
        rows: vec![
            TableRow {
                item: "Status".to_string(),
                value: status.to_string(),
            },
            TableRow {
                item: "Amount".to_string(),
                value: format!("{amount:.2}"),
            },
            TableRow {
                item: "Insight".to_string(),
                value: "Financial analysis could not be generated. Please review your inputs."
                    .to_string(),
            },
        ],
    }]))
}

/// Parses "₦12,500.50", "$300", "1 200" and similar into a number.
fn parse_amount(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse().ok()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
