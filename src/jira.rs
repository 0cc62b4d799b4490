/// Jira and RTM data retrieval
///
/// Issue details, the test cases of an RTM execution, and the saved-report
/// listing of a project. All three go through the endpoint resolver so the
/// URL guesses live in the catalog rather than in code.
use crate::endpoints::{self, EndpointCandidates, EndpointCatalog, TemplateVars};
use crate::error::{ReportError, Result};
use crate::http::HttpClient;
use crate::locator::{self, SavedReportDescriptor};
use crate::summary::{self, IssueSummary, TestCaseRow};
use log::debug;
use serde_json::Value;

const JSON: &str = "application/json";

pub struct JiraClient<'a, C: HttpClient + ?Sized> {
    client: &'a C,
    catalog: &'a EndpointCatalog,
    base_url: &'a str,
}

impl<'a, C: HttpClient + ?Sized> JiraClient<'a, C> {
    pub fn new(client: &'a C, catalog: &'a EndpointCatalog, base_url: &'a str) -> Self {
        Self { client, catalog, base_url }
    }

    fn get_json(&self, operation: &str, templates: &[String], vars: &TemplateVars) -> Result<Value> {
        let candidates = EndpointCandidates::expand(operation, templates, vars);
        let resolved =
            endpoints::resolve(self.client, &candidates, JSON, Some(JSON)).map_err(endpoints::classify_exhaustion)?;
        for attempt in &resolved.failed_attempts {
            debug!("{}: skipped {}", operation, attempt);
        }
        resolved.response.json().map_err(|e| ReportError::UnexpectedResponse {
            url: resolved.url.clone(),
            status: resolved.response.status,
            detail: format!("body is not valid JSON: {}", e),
        })
    }

    /// Fetch an issue and flatten it
    pub fn fetch_issue(&self, issue_key: &str, environment: &str) -> Result<IssueSummary> {
        debug!("Fetching issue {} ({})", issue_key, environment);
        let vars = TemplateVars { issue_key: Some(issue_key), ..TemplateVars::new(self.base_url) };
        let issue = self.get_json(&format!("fetch issue {}", issue_key), &self.catalog.issue, &vars)?;
        Ok(IssueSummary::from_issue_json(issue_key, environment, &issue))
    }

    /// Fetch the RTM test cases of the execution identified by `issue_key`
    pub fn fetch_test_cases(&self, issue_key: &str) -> Result<Vec<TestCaseRow>> {
        let vars = TemplateVars { issue_key: Some(issue_key), ..TemplateVars::new(self.base_url) };
        let body = self.get_json(
            &format!("fetch test cases of {}", issue_key),
            &self.catalog.execution_test_cases,
            &vars,
        )?;
        let rows = summary::parse_test_cases(&body);
        debug!("Execution {} has {} test cases", issue_key, rows.len());
        Ok(rows)
    }

    /// List the saved RTM reports of a project
    pub fn list_saved_reports(&self, project_key: &str) -> Result<Vec<SavedReportDescriptor>> {
        let vars = TemplateVars { project_key: Some(project_key), ..TemplateVars::new(self.base_url) };
        let body = self.get_json(
            &format!("list saved reports of {}", project_key),
            &self.catalog.saved_report_list,
            &vars,
        )?;
        locator::parse_report_list(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::fake::FakeClient;
    use crate::http::Method;
    use serde_json::json;

    const BASE: &str = "https://acme.atlassian.net";

    #[test]
    fn test_fetch_issue_falls_back_to_v2() {
        let client = FakeClient::new()
            .on_get(&format!("{}/rest/api/3/issue/RD-1", BASE), 404, "application/json", b"{}")
            .on_json(
                Method::Get,
                &format!("{}/rest/api/2/issue/RD-1", BASE),
                200,
                json!({"key": "RD-1", "fields": {"summary": "Smoke", "assignee": null}}),
            );
        let catalog = EndpointCatalog::default();

        let issue = JiraClient::new(&client, &catalog, BASE).fetch_issue("RD-1", "QA").unwrap();
        assert_eq!(issue.summary, "Smoke");
        assert_eq!(issue.assignee, "Unassigned");
    }

    #[test]
    fn test_fetch_issue_with_rejected_credentials() {
        let client = FakeClient::new()
            .on_get(&format!("{}/rest/api/3/issue/RD-1", BASE), 401, "application/json", b"{}")
            .on_get(&format!("{}/rest/api/2/issue/RD-1", BASE), 401, "application/json", b"{}");
        let catalog = EndpointCatalog::default();

        let err = JiraClient::new(&client, &catalog, BASE).fetch_issue("RD-1", "QA").unwrap_err();
        assert!(matches!(err, ReportError::AuthenticationFailed(_)));
    }

    #[test]
    fn test_invalid_json_is_unexpected_response() {
        let client =
            FakeClient::new().on_get(&format!("{}/rest/api/3/issue/RD-1", BASE), 200, "application/json", b"<html>");
        let catalog = EndpointCatalog::default();

        let err = JiraClient::new(&client, &catalog, BASE).fetch_issue("RD-1", "QA").unwrap_err();
        assert!(matches!(err, ReportError::UnexpectedResponse { status: 200, .. }));
    }

    #[test]
    fn test_list_saved_reports_uses_project_key() {
        let url = format!("{}/rest/atm/1.0/reports/saved?projectKey=RD", BASE);
        let client = FakeClient::new().on_json(Method::Get, &url, 200, json!({"values": [{"id": 3, "name": "QA"}]}));
        let catalog = EndpointCatalog::default();

        let reports = JiraClient::new(&client, &catalog, BASE).list_saved_reports("RD").unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].id.as_deref(), Some("3"));
        assert_eq!(client.requests().len(), 2);
    }

    #[test]
    fn test_fetch_test_cases() {
        let url = format!("{}/atm-cloud/rest/api/latest/test-executions/RD-2/test-cases", BASE);
        let client = FakeClient::new().on_json(
            Method::Get,
            &url,
            200,
            json!([{"key": "TC-1", "status": "PASSED"}, {"key": "TC-2", "status": "BLOCKED"}]),
        );
        let catalog = EndpointCatalog::default();

        let rows = JiraClient::new(&client, &catalog, BASE).fetch_test_cases("RD-2").unwrap();
        assert_eq!(rows.iter().map(|r| r.status.as_str()).collect::<Vec<_>>(), vec!["PASSED", "BLOCKED"]);
    }
}
