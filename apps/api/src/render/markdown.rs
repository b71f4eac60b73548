use std::fmt::Write;

use crate::planning::normalizer::NormalizedPlan;
use crate::render::{render_plan, Block};

/// Plain-text rendering of a plan for clients without a rich view.
pub fn render_markdown(plan: &NormalizedPlan) -> String {
    let mut out = format!("# {}\n", plan.title);
    for section in render_plan(plan) {
        let _ = write!(out, "\n## {}\n", section.title);
        for block in &section.blocks {
            out.push('\n');
            write_block(&mut out, block);
        }
    }
    out
}

fn write_block(out: &mut String, block: &Block) {
    match block {
        Block::Paragraph { text } => {
            let _ = writeln!(out, "{text}");
        }
        Block::Subheading { text } => {
            let _ = writeln!(out, "### {text}");
        }
        Block::NumberedList { items } => {
            for (i, item) in items.iter().enumerate() {
                let _ = writeln!(out, "{}. {item}", i + 1);
            }
        }
        Block::BulletList { items } => {
            for item in items {
                let _ = writeln!(out, "- {item}");
            }
        }
        Block::Table { headers, rows } => {
            let _ = writeln!(out, "| {} |", headers.join(" | "));
            let _ = writeln!(out, "|{}", " --- |".repeat(headers.len()));
            for row in rows {
                let cells: Vec<String> = row.iter().map(|c| c.replace('|', "\\|")).collect();
                let _ = writeln!(out, "| {} |", cells.join(" | "));
            }
        }
    }
}
