//! PDF rendering with lopdf.
//!
//! Uses the standard Type1 Times fonts, so no font files are embedded. Text
//! is wrapped with an average glyph width of half the font size, which is
//! close enough for Times at body sizes.

use chrono::Utc;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

use crate::export::{numbered_headings, parse_sections, ReportContent, BYLINE, REFERENCES_HEADING};
use crate::types::{AppError, AppResult};

// US letter, in points
const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;
const MARGIN_TOP: i64 = 54;
const MARGIN_BOTTOM: i64 = 72;
const MARGIN_SIDE: i64 = 45;
const TEXT_WIDTH: i64 = PAGE_WIDTH - 2 * MARGIN_SIDE;

const SIZE_TITLE: i64 = 24;
const SIZE_BYLINE: i64 = 12;
const SIZE_BODY: i64 = 10;
const SIZE_SECTION: i64 = 10;
const SIZE_REFERENCE: i64 = 9;
const SIZE_FOOTER: i64 = 9;

const PARAGRAPH_SPACING: i64 = 6;
const SECTION_SPACING: i64 = 12;
const REFERENCE_INDENT: i64 = 18;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(&self) -> &'static [u8] {
        match self {
            Font::Regular => b"F1",
            Font::Bold => b"F2",
        }
    }
}

#[derive(Debug, Clone)]
struct Line {
    text: String,
    font: Font,
    size: i64,
    centered: bool,
    indent: i64,
    space_before: i64,
}

impl Line {
    fn new(text: impl Into<String>, font: Font, size: i64) -> Self {
        Self {
            text: text.into(),
            font,
            size,
            centered: false,
            indent: 0,
            space_before: 0,
        }
    }

    fn centered(mut self) -> Self {
        self.centered = true;
        self
    }

    fn indent(mut self, indent: i64) -> Self {
        self.indent = indent;
        self
    }

    fn space_before(mut self, space: i64) -> Self {
        self.space_before = space;
        self
    }

    fn leading(&self) -> i64 {
        self.size + self.size / 5
    }
}

fn estimated_width(text: &str, size: i64) -> i64 {
    text.chars().count() as i64 * size / 2
}

/// Greedy word wrap; words longer than a line are split.
fn wrap(text: &str, size: i64, width: i64) -> Vec<String> {
    let max_chars = ((width * 2) / size.max(1)).max(1) as usize;
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let word: String = word.into_iter().collect();

        let needed = if current.is_empty() { word.chars().count() } else { current.chars().count() + 1 + word.chars().count() };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Text in the single-byte encoding of the standard fonts.
fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => b'\'',
            '\u{201C}' | '\u{201D}' => b'"',
            '\u{2013}' | '\u{2014}' => b'-',
            c if (c as u32) < 256 => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

fn layout(report: &ReportContent) -> Vec<Line> {
    let mut lines = Vec::new();

    for (i, text) in wrap(&report.topic, SIZE_TITLE, TEXT_WIDTH).into_iter().enumerate() {
        let line = Line::new(text, Font::Bold, SIZE_TITLE).centered();
        lines.push(if i == 0 { line } else { line.space_before(2) });
    }
    lines.push(Line::new(BYLINE, Font::Regular, SIZE_BYLINE).centered().space_before(14));
    lines.push(Line::new(Utc::now().format("%B %d, %Y").to_string(), Font::Regular, SIZE_BYLINE).centered());

    let sections = parse_sections(&report.synthesis);
    for (section, heading) in sections.iter().zip(numbered_headings(&sections)) {
        if let Some(heading) = heading {
            lines.push(Line::new(heading, Font::Bold, SIZE_SECTION).centered().space_before(SECTION_SPACING));
        }
        for paragraph in &section.paragraphs {
            for (i, text) in wrap(paragraph, SIZE_BODY, TEXT_WIDTH).into_iter().enumerate() {
                let line = Line::new(text, Font::Regular, SIZE_BODY);
                lines.push(if i == 0 { line.space_before(PARAGRAPH_SPACING) } else { line });
            }
        }
    }

    let references = report.references();
    if !references.is_empty() {
        lines.push(
            Line::new(REFERENCES_HEADING, Font::Bold, SIZE_SECTION)
                .centered()
                .space_before(SECTION_SPACING * 2),
        );
        for reference in references {
            // Hanging indent: continuation lines are pushed right
            let wrapped = wrap(reference, SIZE_REFERENCE, TEXT_WIDTH - REFERENCE_INDENT);
            for (i, text) in wrapped.into_iter().enumerate() {
                let line = Line::new(text, Font::Regular, SIZE_REFERENCE);
                lines.push(if i == 0 { line.space_before(3) } else { line.indent(REFERENCE_INDENT) });
            }
        }
    }

    lines
}

fn text_op(text: &str, font: Font, size: i64, x: i64, y: i64) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![Object::Name(font.resource().to_vec()), Object::Integer(size)]),
        Operation::new("Td", vec![Object::Integer(x), Object::Integer(y)]),
        Operation::new("Tj", vec![Object::String(encode_text(text), StringFormat::Literal)]),
        Operation::new("ET", vec![]),
    ]
}

/// Operations for each page, including the page-number footer.
fn paginate(lines: &[Line]) -> Vec<Vec<Operation>> {
    let mut pages: Vec<Vec<Operation>> = vec![Vec::new()];
    let mut y = PAGE_HEIGHT - MARGIN_TOP;

    for line in lines {
        let needed = line.space_before + line.leading();
        if y - needed < MARGIN_BOTTOM {
            pages.push(Vec::new());
            y = PAGE_HEIGHT - MARGIN_TOP;
        }
        y -= needed;

        let x = if line.centered {
            ((PAGE_WIDTH - estimated_width(&line.text, line.size)) / 2).max(MARGIN_SIDE)
        } else {
            MARGIN_SIDE + line.indent
        };
        if let Some(page) = pages.last_mut() {
            page.extend(text_op(&line.text, line.font, line.size, x, y));
        }
    }

    for (i, page) in pages.iter_mut().enumerate() {
        let number = (i + 1).to_string();
        let x = (PAGE_WIDTH - estimated_width(&number, SIZE_FOOTER)) / 2;
        page.extend(text_op(&number, Font::Regular, SIZE_FOOTER, x, 36));
    }

    pages
}

pub fn render(report: &ReportContent) -> AppResult<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Times-Roman",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Times-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    });

    let mut kids = Vec::new();
    for operations in paginate(&layout(report)) {
        let content = Content { operations };
        let encoded = content.encode().map_err(|e| AppError::Export(format!("PDF content: {}", e)))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let page_count = kids.len() as i64;
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count,
        "Resources" => resources_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(PAGE_WIDTH),
            Object::Integer(PAGE_HEIGHT),
        ],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| AppError::Export(format!("PDF write: {}", e)))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap() {
        // 10pt over 100pt fits 20 characters
        let lines = wrap("alpha beta gamma delta epsilon zeta", 10, 100);
        assert!(lines.iter().all(|l| l.chars().count() <= 20));
        assert_eq!(lines.join(" "), "alpha beta gamma delta epsilon zeta");

        let long = wrap(&"x".repeat(45), 10, 100);
        assert_eq!(long.len(), 3);
        assert!(wrap("", 10, 100).is_empty());
    }

    #[test]
    fn test_encode_text() {
        assert_eq!(encode_text("caf\u{e9} \u{201C}q\u{201D} \u{4e2d}"), b"caf\xe9 \"q\" ?".to_vec());
    }

    #[test]
    fn test_long_report_paginates() {
        let report = ReportContent {
            topic: "Graphene".into(),
            synthesis: "## Introduction\n".to_string() + &"Sentence about graphene. ".repeat(2000),
            bibliography: String::new(),
        };
        let pages = paginate(&layout(&report));
        assert!(pages.len() > 1);

        let bytes = render(&report).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
    }
}
