//! Word document export.
//!
//! Layout: title page with the preparation date, a table of contents on its
//! own page, then one heading per rendered section. The document is built in
//! memory; nothing touches disk.

use std::io::Cursor;

use chrono::NaiveDate;
use docx_rs::{
    AlignmentType, BreakType, Docx, Paragraph, Run, Shading, Table, TableCell, TableRow,
};
use thiserror::Error;

use crate::planning::normalizer::NormalizedPlan;
use crate::render::{render_plan, Block};

pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

const HEADER_FILL: &str = "DDDDDD";

// Run sizes are in half-points.
const TITLE_SIZE: usize = 56;
const HEADING_SIZE: usize = 32;
const SUBHEADING_SIZE: usize = 26;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Could not package document: {0}")]
    Pack(String),
}

/// Builds the `.docx` bytes for a plan.
pub fn export_docx(plan: &NormalizedPlan, prepared_on: NaiveDate) -> Result<Vec<u8>, ExportError> {
    let sections = render_plan(plan);

    let mut docx = Docx::new()
        .add_paragraph(
            Paragraph::new()
                .add_run(Run::new().add_text(&plan.title).bold().size(TITLE_SIZE))
                .align(AlignmentType::Center),
        )
        .add_paragraph(
            Paragraph::new()
                .add_run(Run::new().add_text(format!(
                    "Prepared on: {}",
                    prepared_on.format("%B %-d, %Y")
                )))
                .align(AlignmentType::Center),
        )
        .add_paragraph(page_break())
        .add_paragraph(heading("Table of Contents", HEADING_SIZE));

    for (i, section) in sections.iter().enumerate() {
        docx = docx.add_paragraph(
            Paragraph::new().add_run(Run::new().add_text(format!("{}. {}", i + 1, section.title))),
        );
    }
    docx = docx.add_paragraph(page_break());

    for section in &sections {
        docx = docx.add_paragraph(heading(&section.title, HEADING_SIZE));
        for block in &section.blocks {
            docx = add_block(docx, block);
        }
    }

    let mut buf = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut buf)
        .map_err(|e| ExportError::Pack(e.to_string()))?;
    Ok(buf.into_inner())
}

/// `Business_Plan_<title>.docx` with whitespace runs collapsed to `_`.
pub fn export_file_name(plan: &NormalizedPlan) -> String {
    let title = plan.title.split_whitespace().collect::<Vec<_>>().join("_");
    format!("Business_Plan_{title}.docx")
}

fn add_block(docx: Docx, block: &Block) -> Docx {
    match block {
        Block::Paragraph { text } => docx.add_paragraph(text_paragraph(text)),
        Block::Subheading { text } => docx.add_paragraph(heading(text, SUBHEADING_SIZE)),
        Block::NumberedList { items } => items.iter().enumerate().fold(docx, |d, (i, item)| {
            d.add_paragraph(text_paragraph(&format!("{}. {item}", i + 1)))
        }),
        Block::BulletList { items } => items
            .iter()
            .fold(docx, |d, item| d.add_paragraph(text_paragraph(&format!("• {item}")))),
        Block::Table { headers, rows } => docx
            .add_table(item_value_table(headers, rows))
            .add_paragraph(Paragraph::new()),
    }
}

fn item_value_table(headers: &[String], rows: &[Vec<String>]) -> Table {
    let header = TableRow::new(
        headers
            .iter()
            .map(|h| {
                TableCell::new()
                    .add_paragraph(Paragraph::new().add_run(Run::new().add_text(h).bold()))
                    .shading(Shading::new().fill(HEADER_FILL))
            })
            .collect(),
    );
    let body = rows.iter().map(|row| {
        TableRow::new(
            row.iter()
                .map(|cell| TableCell::new().add_paragraph(text_paragraph(cell)))
                .collect(),
        )
    });
    Table::new(std::iter::once(header).chain(body).collect())
}

fn heading(text: &str, size: usize) -> Paragraph {
    Paragraph::new().add_run(Run::new().add_text(text).bold().size(size))
}

/// Line breaks inside a paragraph become `w:br` runs.
fn text_paragraph(text: &str) -> Paragraph {
    let mut run = Run::new();
    for (i, line) in text.lines().enumerate() {
        if i > 0 {
            run = run.add_break(BreakType::TextWrapping);
        }
        run = run.add_text(line);
    }
    Paragraph::new().add_run(run)
}

fn page_break() -> Paragraph {
    Paragraph::new().add_run(Run::new().add_break(BreakType::Page))
}
