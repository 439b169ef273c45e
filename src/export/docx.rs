// Word rendering with docx-rust

use std::path::Path;

use chrono::Utc;
use docx_rust::document::{Paragraph, Run};
use docx_rust::formatting::CharacterProperty;
use docx_rust::Docx;

use crate::export::{numbered_headings, parse_sections, ReportContent, BYLINE, REFERENCES_HEADING};
use crate::types::{AppError, AppResult};

fn bold(text: &str) -> Paragraph<'static> {
    Paragraph::default().push(
        Run::default()
            .property(CharacterProperty::default().bold(true))
            .push_text(text.to_string()),
    )
}

fn plain(text: &str) -> Paragraph<'static> {
    Paragraph::default().push_text(text.to_string())
}

/// Paragraphs of the document, in order.
fn paragraphs(report: &ReportContent) -> Vec<Paragraph<'static>> {
    let mut out = vec![
        bold(&report.topic),
        plain(BYLINE),
        plain(&Utc::now().format("%B %d, %Y").to_string()),
    ];

    let sections = parse_sections(&report.synthesis);
    for (section, heading) in sections.iter().zip(numbered_headings(&sections)) {
        if let Some(heading) = heading {
            out.push(bold(&heading));
        }
        out.extend(section.paragraphs.iter().map(|p| plain(p)));
    }

    let references = report.references();
    if !references.is_empty() {
        out.push(bold(REFERENCES_HEADING));
        out.extend(references.into_iter().map(plain));
    }

    out
}

/// The docx writer targets a path, so the package goes through a scratch file.
pub fn render(report: &ReportContent, scratch_dir: &Path) -> AppResult<Vec<u8>> {
    let mut docx = Docx::default();
    for paragraph in paragraphs(report) {
        docx.document.push(paragraph);
    }

    std::fs::create_dir_all(scratch_dir)
        .map_err(|e| AppError::Export(format!("Cannot create {}: {}", scratch_dir.display(), e)))?;
    let scratch = scratch_dir.join(format!("report-{}.docx", uuid::Uuid::new_v4()));
    docx.write_file(&scratch)
        .map_err(|e| AppError::Export(format!("DOCX write: {:?}", e)))?;

    let bytes = std::fs::read(&scratch);
    let _ = std::fs::remove_file(&scratch);
    bytes.map_err(|e| AppError::Export(format!("DOCX read back: {}", e)))
}
