//! PDF rendering.
//!
//! A4 pages in the built-in Helvetica faces. Every page starts with the
//! report title; content flows top to bottom and breaks onto a new page
//! when it reaches the bottom margin.

use super::document::ReportDocument;
use crate::error::{ReportError, Result};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 15.0;
const LINE_HEIGHT: f32 = 6.0;
const BODY_SIZE: f32 = 10.0;
const HEADING_SIZE: f32 = 12.0;
const TITLE_SIZE: f32 = 14.0;

/// Points to millimetres
const PT_TO_MM: f32 = 0.3528;

fn pdf_error(e: impl std::fmt::Display) -> ReportError {
    ReportError::Pdf(e.to_string())
}

/// Built-in fonts only cover Latin-1; replace anything else
fn latin1(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2013}' | '\u{2014}' => '-',
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\t' => ' ',
            c if (c as u32) < 0x20 => ' ',
            c if (c as u32) <= 0xFF => c,
            _ => '?',
        })
        .collect()
}

/// Average Helvetica advance in em, sized for status-heavy uppercase rows
const AVG_GLYPH_EM: f32 = 0.6;

/// Rough characters-per-line for Helvetica at `size` points
fn max_chars(size: f32) -> usize {
    let avg_char_mm = size * AVG_GLYPH_EM * PT_TO_MM;
    ((PAGE_WIDTH - 2.0 * MARGIN) / avg_char_mm) as usize
}

/// Greedy word wrap; words longer than a line are split
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let rest = word.split_off(width);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            let word_len = word.len();
            let word: String = word.into_iter().collect();
            let needed = if current.is_empty() { word_len } else { current.chars().count() + 1 + word_len };
            if needed > width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&word);
        }
        lines.push(current);
    }

    lines
}

struct PdfWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    title: String,
    y: f32,
    pages: usize,
}

impl PdfWriter {
    fn new(title: &str) -> Result<Self> {
        let title = latin1(title);
        let (doc, page, layer) = PdfDocument::new(title.as_str(), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Page 1");
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?;
        let layer = doc.get_page(page).get_layer(layer);

        let mut writer = Self { doc, layer, regular, bold, title, y: PAGE_HEIGHT - MARGIN, pages: 1 };
        writer.page_header();
        Ok(writer)
    }

    fn page_header(&mut self) {
        // Approximate centring from the average glyph width
        let text_width = self.title.chars().count() as f32 * TITLE_SIZE * 0.55 * PT_TO_MM;
        let x = ((PAGE_WIDTH - text_width) / 2.0).max(MARGIN);
        self.y -= 8.0;
        self.layer.use_text(self.title.clone(), TITLE_SIZE, Mm(x), Mm(self.y), &self.bold);
        self.y -= 7.0;
    }

    fn new_page(&mut self) {
        self.pages += 1;
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), format!("Page {}", self.pages));
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
        self.page_header();
    }

    fn text(&mut self, text: &str, size: f32, bold: bool) {
        for line in wrap(&latin1(text), max_chars(size)) {
            if self.y - LINE_HEIGHT < MARGIN {
                self.new_page();
            }
            self.y -= LINE_HEIGHT;
            let font = if bold { &self.bold } else { &self.regular };
            self.layer.use_text(line, size, Mm(MARGIN), Mm(self.y), font);
        }
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
        if self.y < MARGIN {
            self.new_page();
        }
    }

    fn finish(self) -> Result<Vec<u8>> {
        self.doc.save_to_bytes().map_err(pdf_error)
    }
}

/// Render `doc` into PDF bytes
pub fn render_pdf(doc: &ReportDocument, generated_at: &str) -> Result<Vec<u8>> {
    render_pdf_paged(doc, generated_at).map(|(bytes, _)| bytes)
}

/// Render and also report how many pages were produced
fn render_pdf_paged(doc: &ReportDocument, generated_at: &str) -> Result<(Vec<u8>, usize)> {
    let mut w = PdfWriter::new(&doc.title)?;

    for (label, value) in &doc.summary {
        w.text(&format!("{}: {}", label, value), BODY_SIZE, false);
    }
    w.text(&format!("Generated On: {}", generated_at), BODY_SIZE, false);
    w.gap(LINE_HEIGHT);

    for section in &doc.sections {
        w.text(&format!("{}:", section.heading), HEADING_SIZE, true);
        w.text(&section.body, BODY_SIZE, false);
        w.gap(LINE_HEIGHT / 2.0);
    }

    w.text(&format!("{}:", doc.table.heading), HEADING_SIZE, true);
    if doc.table.rows.is_empty() {
        w.text("No rows", BODY_SIZE, false);
    }
    for row in &doc.table.rows {
        let line = if doc.table.columns.len() == 2 && row.len() == 2 {
            format!("{}: {}", row[0], row[1])
        } else {
            row.iter()
                .enumerate()
                .map(|(i, cell)| match doc.table.columns.get(i) {
                    Some(column) => format!("{}: {}", column, cell),
                    None => cell.clone(),
                })
                .collect::<Vec<_>>()
                .join(" | ")
        };
        w.text(&line, BODY_SIZE, false);
    }

    let pages = w.pages;
    Ok((w.finish()?, pages))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::document::DetailTable;

    fn doc_with_rows(rows: usize) -> ReportDocument {
        ReportDocument {
            title: "Jira Issue Report \u{2014} RD-1".to_string(),
            summary: vec![("Status".to_string(), "Done".to_string())],
            sections: vec![],
            table: DetailTable {
                heading: "Test Cases".to_string(),
                columns: vec!["Key".to_string(), "Status".to_string(), "Summary".to_string()],
                rows: (0..rows)
                    .map(|i| vec![format!("TC-{}", i), "PASSED".to_string(), "Checks the login form".to_string()])
                    .collect(),
            },
        }
    }

    #[test]
    fn test_pdf_has_pdf_header() {
        let bytes = render_pdf(&doc_with_rows(3), "2024-01-01 00:00:00").unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn test_many_rows_span_multiple_pages() {
        let (_, short_pages) = render_pdf_paged(&doc_with_rows(5), "now").unwrap();
        let (_, long_pages) = render_pdf_paged(&doc_with_rows(200), "now").unwrap();
        assert_eq!(short_pages, 1);
        // 200 rows at 6mm each cannot fit on one 297mm page
        assert!(long_pages >= 4, "expected page breaks, got {} pages", long_pages);
    }

    /// Helvetica AFM advance widths, in 1/1000 em
    fn helvetica_width(c: char) -> u32 {
        match c {
            'I' | ' ' | ':' | 'f' | 't' => 278,
            '|' => 260,
            '-' | 'r' => 333,
            'J' | 'c' | 'k' | 's' | 'v' | 'x' | 'y' | 'z' => 500,
            'L' | '0'..='9' => 556,
            'F' | 'T' | 'Z' => 611,
            'C' | 'D' | 'H' | 'N' | 'R' | 'U' => 722,
            'G' | 'O' | 'Q' => 778,
            'M' | 'm' => 833,
            'W' => 944,
            'i' | 'j' | 'l' => 222,
            'w' => 722,
            c if c.is_ascii_uppercase() => 667,
            _ => 556,
        }
    }

    #[test]
    fn test_uppercase_rows_fit_between_margins() {
        let row = "Key: TC-1042 | Status: PASSED | Summary: LOGIN FORM REJECTS EXPIRED PASSWORDS \
                   AND LOCKS THE ACCOUNT AFTER FIVE FAILED ATTEMPTS ON QA";
        let usable = PAGE_WIDTH - 2.0 * MARGIN;

        for line in wrap(row, max_chars(BODY_SIZE)) {
            let em: u32 = line.chars().map(helvetica_width).sum();
            let width_mm = em as f32 / 1000.0 * BODY_SIZE * PT_TO_MM;
            assert!(width_mm <= usable, "'{}' is {:.1}mm wide, usable {:.1}mm", line, width_mm, usable);
        }
    }

    #[test]
    fn test_wrap_respects_width() {
        let lines = wrap("alpha beta gamma delta", 11);
        assert_eq!(lines, vec!["alpha beta", "gamma delta"]);
        assert!(lines.iter().all(|l| l.chars().count() <= 11));
    }

    #[test]
    fn test_wrap_splits_long_words_and_keeps_newlines() {
        let lines = wrap("abcdefghij\nxy", 4);
        assert_eq!(lines, vec!["abcd", "efgh", "ij", "xy"]);
    }

    #[test]
    fn test_latin1_replaces_unsupported_characters() {
        assert_eq!(latin1("a\u{2014}b \u{2713} caf\u{e9}"), "a-b ? caf\u{e9}");
    }
}
