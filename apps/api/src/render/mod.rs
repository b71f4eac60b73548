//! Presentation Layer: a pure projection from `NormalizedPlan` to display blocks.
//!
//! The section type was decided at normalization time, so this module only
//! maps each variant to its blocks. Markdown and the Word export both start
//! from `render_plan`.

pub mod markdown;

use serde::Serialize;

use crate::planning::normalizer::NormalizedPlan;
use crate::planning::sections::{ListStyle, Section, TableGroup};

pub const TABLE_HEADERS: [&str; 2] = ["Item", "Value"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Paragraph { text: String },
    Subheading { text: String },
    NumberedList { items: Vec<String> },
    BulletList { items: Vec<String> },
    Table { headers: Vec<String>, rows: Vec<Vec<String>> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedSection {
    pub key: String,
    pub title: String,
    pub blocks: Vec<Block>,
}

/// Renders every non-empty section in plan order.
pub fn render_plan(plan: &NormalizedPlan) -> Vec<RenderedSection> {
    plan.sections
        .iter()
        .filter(|s| !s.section.is_empty())
        .map(|s| RenderedSection {
            key: s.key.clone(),
            title: display_title(&s.key),
            blocks: section_blocks(&s.section),
        })
        .collect()
}

fn section_blocks(section: &Section) -> Vec<Block> {
    match section {
        Section::Narrative(text) => paragraphs(text)
            .into_iter()
            .map(|text| Block::Paragraph { text })
            .collect(),
        Section::List {
            style: ListStyle::Numbered,
            items,
        } => vec![Block::NumberedList {
            items: items.clone(),
        }],
        Section::List {
            style: ListStyle::Bulleted,
            items,
        } => vec![Block::BulletList {
            items: items.clone(),
        }],
        Section::Table(groups) => groups.iter().flat_map(table_blocks).collect(),
    }
}

fn table_blocks(group: &TableGroup) -> Vec<Block> {
    let mut blocks = Vec::with_capacity(2);
    if let Some(caption) = &group.caption {
        blocks.push(Block::Subheading {
            text: caption_text(caption),
        });
    }
    if !group.rows.is_empty() {
        blocks.push(Block::Table {
            headers: TABLE_HEADERS.iter().map(|h| h.to_string()).collect(),
            rows: group
                .rows
                .iter()
                .map(|r| vec![r.item.clone(), r.value.clone()])
                .collect(),
        });
    }
    blocks
}

/// Splits prose on blank lines. Single line breaks stay inside a paragraph.
fn paragraphs(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                out.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line.trim_end());
        }
    }
    if !current.is_empty() {
        out.push(current.join("\n"));
    }
    out
}

/// "market_analysis" → "Market Analysis", "FinancialSummary" → "Financial Summary".
pub fn display_title(key: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    for part in key.split(|c: char| c == '_' || c == '-' || c.is_whitespace()).filter(|p| !p.is_empty()) {
        let mut word = String::new();
        let mut prev_lower = false;
        for c in part.chars() {
            if c.is_uppercase() && prev_lower {
                words.push(std::mem::take(&mut word));
            }
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
            word.push(c);
        }
        words.push(word);
    }
    words
        .iter()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Group captions are shown in capitals: "startup_costs" → "STARTUP COSTS".
fn caption_text(caption: &str) -> String {
    caption.replace('_', " ").to_uppercase()
}
