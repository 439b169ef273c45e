// Markdown rendering for the terminal and the `screen` format

use chrono::Utc;

use crate::export::{numbered_headings, parse_sections, ReportContent, BYLINE, REFERENCES_HEADING};

pub fn render(report: &ReportContent) -> String {
    let mut out = format!("# {}\n\n_{} - {}_\n\n", report.topic, BYLINE, Utc::now().format("%B %d, %Y"));

    let sections = parse_sections(&report.synthesis);
    for (section, heading) in sections.iter().zip(numbered_headings(&sections)) {
        if let Some(heading) = heading {
            out.push_str(&format!("## {}\n\n", heading));
        }
        for paragraph in &section.paragraphs {
            out.push_str(paragraph);
            out.push_str("\n\n");
        }
    }

    let references = report.references();
    if !references.is_empty() {
        out.push_str(&format!("## {}\n\n", REFERENCES_HEADING));
        for reference in references {
            out.push_str(reference);
            out.push_str("\n\n");
        }
    }

    out.trim_end().to_string()
}
