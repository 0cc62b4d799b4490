/// Flattened views of Jira issues and RTM test executions
///
/// Built once from the raw API JSON and handed unchanged to the renderer.
use serde::Serialize;
use serde_json::Value;

pub const NOT_AVAILABLE: &str = "N/A";
pub const UNASSIGNED: &str = "Unassigned";
pub const NO_DESCRIPTION: &str = "No description provided.";

/// Read a string at `path`, treating null and non-strings as absent
fn str_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    let mut cur = value;
    for key in path {
        cur = cur.get(key)?;
    }
    cur.as_str().filter(|s| !s.trim().is_empty())
}

/// First non-empty string among dotted paths such as `"testCase.key"`
fn first_str(value: &Value, paths: &[&str]) -> Option<String> {
    paths
        .iter()
        .find_map(|p| str_at(value, &p.split('.').collect::<Vec<_>>()))
        .map(|s| s.to_string())
}

fn field_or_na(value: &Value, path: &[&str]) -> String {
    str_at(value, path).unwrap_or(NOT_AVAILABLE).to_string()
}

/// Flatten a description that may be plain text or an Atlassian Document
/// Format tree into plain text, one line per block
pub fn flatten_description(value: &Value) -> Option<String> {
    fn walk(node: &Value, out: &mut String) {
        match node {
            Value::String(s) => out.push_str(s),
            Value::Object(map) => {
                if let Some(Value::String(text)) = map.get("text") {
                    out.push_str(text);
                }
                if map.get("type").and_then(Value::as_str) == Some("hardBreak") {
                    out.push('\n');
                }
                if let Some(Value::Array(children)) = map.get("content") {
                    for child in children {
                        walk(child, out);
                    }
                }
                let block = matches!(
                    map.get("type").and_then(Value::as_str),
                    Some("paragraph" | "heading" | "listItem" | "codeBlock" | "blockquote")
                );
                if block && !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            Value::Array(items) => items.iter().for_each(|item| walk(item, out)),
            _ => {}
        }
    }

    let mut out = String::new();
    walk(value, &mut out);
    let text = out.trim().to_string();
    if text.is_empty() { None } else { Some(text) }
}

/// Jira issue fields used by the execution report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueSummary {
    pub key: String,
    pub project_key: String,
    pub summary: String,
    pub status: String,
    pub issue_type: String,
    pub priority: String,
    pub reporter: String,
    pub assignee: String,
    pub created: String,
    pub description: String,
    pub environment: String,
}

impl IssueSummary {
    /// Build from a `GET /rest/api/N/issue/{key}` response body
    pub fn from_issue_json(issue_key: &str, environment: &str, issue: &Value) -> Self {
        let null = Value::Null;
        let fields = issue.get("fields").unwrap_or(&null);

        Self {
            key: str_at(issue, &["key"]).unwrap_or(issue_key).to_string(),
            project_key: field_or_na(fields, &["project", "key"]),
            summary: field_or_na(fields, &["summary"]),
            status: field_or_na(fields, &["status", "name"]),
            issue_type: field_or_na(fields, &["issuetype", "name"]),
            priority: field_or_na(fields, &["priority", "name"]),
            reporter: field_or_na(fields, &["reporter", "displayName"]),
            assignee: str_at(fields, &["assignee", "displayName"]).unwrap_or(UNASSIGNED).to_string(),
            created: field_or_na(fields, &["created"]),
            description: fields
                .get("description")
                .and_then(flatten_description)
                .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            environment: if environment.trim().is_empty() { NOT_AVAILABLE.to_string() } else { environment.to_string() },
        }
    }

    /// Label/value pairs in report order
    pub fn field_pairs(&self) -> Vec<(String, String)> {
        [
            ("Project Key", &self.project_key),
            ("Issue Key", &self.key),
            ("Summary", &self.summary),
            ("Status", &self.status),
            ("Issue Type", &self.issue_type),
            ("Priority", &self.priority),
            ("Reporter", &self.reporter),
            ("Assignee", &self.assignee),
            ("Created On", &self.created),
            ("Environment", &self.environment),
        ]
        .into_iter()
        .map(|(label, value)| (label.to_string(), value.clone()))
        .collect()
    }
}

/// One RTM test case result inside an execution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestCaseRow {
    pub key: String,
    pub summary: String,
    pub status: String,
    pub assignee: String,
    pub executed_on: String,
}

impl TestCaseRow {
    pub const COLUMNS: [&'static str; 5] = ["Test Case", "Summary", "Status", "Assignee", "Executed On"];

    /// Build from one element of an RTM test-case listing. Field names vary
    /// between RTM API generations, so several spellings are accepted.
    pub fn from_json(item: &Value) -> Self {
        let or_na = |v: Option<String>| v.unwrap_or_else(|| NOT_AVAILABLE.to_string());

        Self {
            key: or_na(first_str(item, &["key", "testCaseKey", "testCase.key"])),
            summary: or_na(first_str(item, &["summary", "name", "testCase.summary", "testCase.name"])),
            status: or_na(first_str(item, &["status", "status.name", "result", "executionStatus"])),
            assignee: first_str(item, &["assignee.displayName", "assignee", "executedBy.displayName", "executedBy"])
                .unwrap_or_else(|| UNASSIGNED.to_string()),
            executed_on: or_na(first_str(item, &["executedOn", "executionDate", "actualEndDate", "updated"])),
        }
    }

    pub fn cells(&self) -> Vec<String> {
        vec![
            self.key.clone(),
            self.summary.clone(),
            self.status.clone(),
            self.assignee.clone(),
            self.executed_on.clone(),
        ]
    }
}

/// Extract test-case rows from a listing that is either a bare array or an
/// object wrapping it in `values`, `testCases` or `results`
pub fn parse_test_cases(body: &Value) -> Vec<TestCaseRow> {
    let items = match body {
        Value::Array(items) => Some(items),
        Value::Object(map) => ["values", "testCases", "results"].iter().find_map(|k| map.get(*k)?.as_array()),
        _ => None,
    };
    items.map(|items| items.iter().map(TestCaseRow::from_json).collect()).unwrap_or_default()
}

/// Status counts for a test execution, computed once from its rows
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExecutionCounts {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub blocked: usize,
    pub unexecuted: usize,
    pub pass_rate: f64,
}

impl ExecutionCounts {
    /// Exact, case-sensitive status matching. Rows with any other status
    /// count toward `total` only.
    pub fn from_statuses<'a, I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut counts = Self { total: 0, passed: 0, failed: 0, blocked: 0, unexecuted: 0, pass_rate: 0.0 };
        for status in statuses {
            counts.total += 1;
            match status {
                "PASSED" => counts.passed += 1,
                "FAILED" => counts.failed += 1,
                "BLOCKED" => counts.blocked += 1,
                "UNEXECUTED" => counts.unexecuted += 1,
                _ => {}
            }
        }
        if counts.total > 0 {
            let rate = counts.passed as f64 / counts.total as f64 * 100.0;
            counts.pass_rate = (rate * 100.0).round() / 100.0;
        }
        counts
    }

    /// Rows whose status is none of the four known values
    pub fn other(&self) -> usize {
        self.total - self.passed - self.failed - self.blocked - self.unexecuted
    }
}

/// Issue fields plus the test cases of its execution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionSummary {
    pub issue: IssueSummary,
    pub test_cases: Vec<TestCaseRow>,
    pub counts: ExecutionCounts,
}

impl ExecutionSummary {
    pub fn new(issue: IssueSummary, test_cases: Vec<TestCaseRow>) -> Self {
        let counts = ExecutionCounts::from_statuses(test_cases.iter().map(|t| t.status.as_str()));
        Self { issue, test_cases, counts }
    }

    /// Count label/value pairs in report order
    pub fn count_pairs(&self) -> Vec<(String, String)> {
        let c = &self.counts;
        let mut pairs = vec![
            ("Total Test Cases".to_string(), c.total.to_string()),
            ("Passed".to_string(), c.passed.to_string()),
            ("Failed".to_string(), c.failed.to_string()),
            ("Blocked".to_string(), c.blocked.to_string()),
            ("Unexecuted".to_string(), c.unexecuted.to_string()),
        ];
        if c.other() > 0 {
            pairs.push(("Other Status".to_string(), c.other().to_string()));
        }
        pairs.push(("Pass Rate".to_string(), format!("{:.2}%", c.pass_rate)));
        pairs
    }
}

#[cfg(test)]
#[path = "summary_test.rs"]
mod summary_test;
