//! Renderer-neutral report model.
//!
//! Both the HTML and the PDF renderer consume a `ReportDocument`, so the
//! two outputs always carry the same information in the same order.

use crate::summary::{ExecutionSummary, TestCaseRow};

/// Free-text block rendered under its own heading
#[derive(Debug, Clone, PartialEq)]
pub struct TextSection {
    pub heading: String,
    pub body: String,
}

/// Detail rows rendered as a table, in input order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DetailTable {
    pub heading: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Everything a report shows
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub title: String,
    /// Ordered label/value pairs for the header block
    pub summary: Vec<(String, String)>,
    pub sections: Vec<TextSection>,
    pub table: DetailTable,
}

impl ReportDocument {
    /// Execution report: issue fields, status counts when test cases are
    /// known, and either the test-case table or a field/value table
    pub fn for_execution(execution: &ExecutionSummary) -> Self {
        let issue = &execution.issue;

        let mut summary = issue.field_pairs();
        if !execution.test_cases.is_empty() {
            summary.extend(execution.count_pairs());
        }

        let table = if execution.test_cases.is_empty() {
            DetailTable {
                heading: "Field Details".to_string(),
                columns: vec!["Field".to_string(), "Value".to_string()],
                rows: issue.field_pairs().into_iter().map(|(label, value)| vec![label, value]).collect(),
            }
        } else {
            DetailTable {
                heading: "Test Cases".to_string(),
                columns: TestCaseRow::COLUMNS.iter().map(|c| c.to_string()).collect(),
                rows: execution.test_cases.iter().map(TestCaseRow::cells).collect(),
            }
        };

        Self {
            title: format!("Jira Issue Report - {}", issue.key),
            summary,
            sections: vec![
                TextSection { heading: "Issue Summary".to_string(), body: issue.summary.clone() },
                TextSection { heading: "Description".to_string(), body: issue.description.clone() },
            ],
            table,
        }
    }
}
