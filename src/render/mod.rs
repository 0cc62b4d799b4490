//! Report rendering - turns a `ReportDocument` into HTML and PDF.
//!
//! # Module Organization
//!
//! - `document` - Renderer-neutral report model and builders
//! - `html` - Deterministic HTML output with an isolated timestamp region
//! - `pdf` - Paginated PDF output

mod document;
mod html;
mod pdf;

pub use document::ReportDocument;
pub use html::{escape_html, render_html};
pub use pdf::render_pdf;

use crate::error::Result;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// HTML and PDF renderings of one document
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub html: String,
    pub pdf: Vec<u8>,
}

/// Paths of a report pair written to disk
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenReport {
    pub html_path: PathBuf,
    pub pdf_path: PathBuf,
}

impl RenderedReport {
    /// Write `{stem}.html` and `{stem}.pdf` into `dir`, replacing any
    /// previous run's files
    pub fn write_to(&self, dir: &Path, stem: &str) -> Result<WrittenReport> {
        fs::create_dir_all(dir)?;
        let html_path = dir.join(format!("{}.html", stem));
        let pdf_path = dir.join(format!("{}.pdf", stem));

        fs::write(&html_path, &self.html)?;
        fs::write(&pdf_path, &self.pdf)?;
        debug!("Wrote {:?} and {:?}", html_path, pdf_path);

        Ok(WrittenReport { html_path, pdf_path })
    }
}

/// Render both formats, stamping the current local time
pub fn render(doc: &ReportDocument) -> Result<RenderedReport> {
    let generated_at = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    Ok(RenderedReport { html: render_html(doc, &generated_at), pdf: render_pdf(doc, &generated_at)? })
}

#[cfg(test)]
mod tests {
    use super::html::{GENERATED_END, GENERATED_START};
    use super::*;
    use crate::summary::{ExecutionSummary, IssueSummary, TestCaseRow};
    use serde_json::json;

    fn execution(statuses: &[&str]) -> ExecutionSummary {
        let issue = IssueSummary::from_issue_json(
            "RD-4",
            "QA",
            &json!({"fields": {"summary": "Nightly", "project": {"key": "RD"}}}),
        );
        let rows = statuses
            .iter()
            .enumerate()
            .map(|(i, s)| TestCaseRow::from_json(&json!({"key": format!("TC-{}", i), "status": s})))
            .collect();
        ExecutionSummary::new(issue, rows)
    }

    #[test]
    fn test_execution_document_with_test_cases() {
        let doc = ReportDocument::for_execution(&execution(&["PASSED", "FAILED"]));
        assert_eq!(doc.title, "Jira Issue Report - RD-4");
        assert_eq!(doc.table.heading, "Test Cases");
        assert_eq!(doc.table.rows.len(), 2);
        assert!(doc.summary.contains(&("Pass Rate".to_string(), "50.00%".to_string())));
        assert!(doc.summary.contains(&("Assignee".to_string(), "Unassigned".to_string())));
    }

    #[test]
    fn test_execution_document_without_test_cases_lists_fields() {
        let doc = ReportDocument::for_execution(&execution(&[]));
        assert_eq!(doc.table.columns, vec!["Field", "Value"]);
        assert!(doc.table.rows.contains(&vec!["Environment".to_string(), "QA".to_string()]));
        assert!(!doc.summary.iter().any(|(label, _)| label == "Pass Rate"));
    }

    #[test]
    fn test_render_twice_differs_only_in_generated_region() {
        let doc = ReportDocument::for_execution(&execution(&["PASSED"]));
        let a = render(&doc).unwrap();
        let b = render(&doc).unwrap();

        let strip = |html: &str| {
            let start = html.find(GENERATED_START).unwrap();
            let end = html.find(GENERATED_END).unwrap();
            format!("{}{}", &html[..start], &html[end..])
        };
        assert_eq!(strip(&a.html), strip(&b.html));
    }

    #[test]
    fn test_write_to_overwrites_previous_files() {
        let dir = tempfile::tempdir().unwrap();
        let doc = ReportDocument::for_execution(&execution(&["PASSED"]));
        let report = render(&doc).unwrap();

        std::fs::write(dir.path().join("rtm_execution_report.html"), "stale").unwrap();
        let written = report.write_to(dir.path(), "rtm_execution_report").unwrap();

        assert_eq!(std::fs::read_to_string(&written.html_path).unwrap(), report.html);
        assert!(std::fs::read(&written.pdf_path).unwrap().starts_with(b"%PDF"));
    }
}
