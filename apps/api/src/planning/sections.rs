//! Plan sections: the explicit tagged union every section value is decided
//! into once, at normalization time.
//!
//! Rendering and document export consume `Section` and never re-inspect the
//! raw JSON shape. `Section::to_value` produces JSON that classifies back into
//! an equal `Section`, which keeps normalization idempotent.

use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListStyle {
    Numbered,
    Bulleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub item: String,
    pub value: String,
}

/// A run of rows. Nested objects become their own captioned group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableGroup {
    pub caption: Option<String>,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Section {
    Narrative(String),
    List { style: ListStyle, items: Vec<String> },
    Table(Vec<TableGroup>),
}

/// How a section key wants its value shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionShape {
    /// Checklist-like keys: always a numbered list.
    Numbered,
    /// Financial keys: a key/value table when structured.
    Financial,
    /// Narrative keys: prose when a string, bullets otherwise.
    Prose,
    /// Unknown keys: decided by the runtime shape of the value.
    Generic,
}

/// Key dispatch table.
pub fn shape_for(key: &str) -> SectionShape {
    match key {
        "things_needed_to_start"
        | "setup_checklist"
        | "pricing_strategy"
        | "Suggest_a_bunch_of_solutions"
        | "Give_a_step_by_step_guide_to_carry_out_the_solution" => SectionShape::Numbered,
        "financial_plan" | "FinancialSummary" => SectionShape::Financial,
        "executive_summary"
        | "market_analysis"
        | "marketing_strategy"
        | "operations_plan"
        | "growth_ideas"
        | "Address_the_suitation"
        | "Review_best_option_to_solve_issue_and_why"
        | "Best_way_to_improve_business_with_business_properties" => SectionShape::Prose,
        _ => SectionShape::Generic,
    }
}

impl Section {
    /// Decides the section type for `value` under `key`.
    pub fn classify(key: &str, value: &Value) -> Section {
        match (shape_for(key), value) {
            (SectionShape::Numbered, _) => Section::List {
                style: ListStyle::Numbered,
                items: list_items(value),
            },
            (SectionShape::Financial | SectionShape::Generic, Value::Object(map)) => {
                Section::Table(table_groups(map))
            }
            (_, Value::Array(_)) | (SectionShape::Prose, Value::Object(_)) => Section::List {
                style: ListStyle::Bulleted,
                items: list_items(value),
            },
            (_, other) => Section::Narrative(value_text(other)),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Section::Narrative(text) => text.trim().is_empty(),
            Section::List { items, .. } => items.is_empty(),
            Section::Table(groups) => groups.iter().all(|g| g.rows.is_empty()),
        }
    }

    pub fn is_narrative(&self) -> bool {
        matches!(self, Section::Narrative(_))
    }

    /// JSON form used when the plan is serialized or sent to the backend.
    pub fn to_value(&self) -> Value {
        match self {
            Section::Narrative(text) => Value::String(text.clone()),
            Section::List { items, .. } => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
            Section::Table(groups) => {
                let mut map = Map::new();
                for group in groups {
                    let rows: Map<String, Value> = group
                        .rows
                        .iter()
                        .map(|r| (r.item.clone(), Value::String(r.value.clone())))
                        .collect();
                    match &group.caption {
                        Some(caption) => {
                            map.insert(caption.clone(), Value::Object(rows));
                        }
                        None => map.extend(rows),
                    }
                }
                Value::Object(map)
            }
        }
    }

    /// Flat string form for backends that store every section as text.
    pub fn to_text(&self) -> String {
        match self {
            Section::Narrative(text) => text.clone(),
            other => other.to_value().to_string(),
        }
    }
}

/// List items from any JSON shape. Strings split into lines with leading list
/// markers removed; arrays keep one item per element; objects become
/// `key: value` items. Blank items are dropped.
fn list_items(value: &Value) -> Vec<String> {
    let items: Vec<String> = match value {
        Value::String(text) => text.lines().map(strip_list_marker).map(str::to_string).collect(),
        Value::Array(values) => values.iter().map(value_text).collect(),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{k}: {}", value_text(v)))
            .collect(),
        Value::Null => Vec::new(),
        other => vec![value_text(other)],
    };
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Removes "1. ", "2) ", "- ", "* ", "• " prefixes from a line.
fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    for marker in ["- ", "* ", "• "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return rest;
        }
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return rest;
        }
    }
    line
}

fn table_groups(map: &Map<String, Value>) -> Vec<TableGroup> {
    let mut groups: Vec<TableGroup> = Vec::new();
    for (key, value) in map {
        match value {
            Value::Object(nested) => groups.push(TableGroup {
                caption: Some(key.clone()),
                rows: nested
                    .iter()
                    .map(|(item, v)| TableRow {
                        item: item.clone(),
                        value: value_text(v),
                    })
                    .collect(),
            }),
            Value::Array(values) => groups.push(TableGroup {
                caption: Some(key.clone()),
                rows: values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| TableRow {
                        item: (i + 1).to_string(),
                        value: value_text(v),
                    })
                    .collect(),
            }),
            scalar => {
                let row = TableRow {
                    item: key.clone(),
                    value: value_text(scalar),
                };
                match groups.last_mut() {
                    Some(group) if group.caption.is_none() => group.rows.push(row),
                    _ => groups.push(TableGroup {
                        caption: None,
                        rows: vec![row],
                    }),
                }
            }
        }
    }
    groups
}

/// Display text for any JSON value.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(values) => values
            .iter()
            .map(value_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{k}: {}", value_text(v)))
            .collect::<Vec<_>>()
            .join("; "),
    }
}
