/// Endpoint discovery for the Jira / RTM REST surfaces
///
/// RTM Cloud tenants expose the same operation under different paths, so
/// each logical operation has an ordered list of URL templates. The
/// resolver tries them in order and keeps the first one that answers 200
/// with the expected content type.
///
/// Templates may use `{base}`, `{project_key}`, `{issue_key}` and
/// `{report_id}`. Everything but `{base}` is percent-encoded on expansion.
use crate::error::{Attempt, AttemptOutcome, ReportError, Result};
use crate::http::{HttpClient, HttpRequest, HttpResponse, encode_component};
use log::{debug, info, warn};
use serde::Deserialize;
use std::path::Path;

const RTM_APP_PATH: &str = "jira/apps/64e045b8-e29a-40e5-bd2e-0cfdf4e8d4bb/7a2911d3-7421-4d99-89f7-762313d01b40";

/// Ordered URL templates for every operation that needs discovery
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EndpointCatalog {
    pub issue: Vec<String>,
    pub execution_test_cases: Vec<String>,
    pub saved_report_list: Vec<String>,
    pub saved_report_export_pdf: Vec<String>,
    pub saved_report_export_html: Vec<String>,
}

impl Default for EndpointCatalog {
    fn default() -> Self {
        let owned = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let app = |suffix: &str| format!("{{base}}/{}/{}", RTM_APP_PATH, suffix);

        Self {
            issue: owned(&["{base}/rest/api/3/issue/{issue_key}", "{base}/rest/api/2/issue/{issue_key}"]),
            execution_test_cases: owned(&[
                "{base}/atm-cloud/rest/api/latest/test-executions/{issue_key}/test-cases",
                "{base}/rest/atm/1.0/testrun/{issue_key}/testresults",
                "{base}/apps/rtm-api/rest/api/latest/test-executions/{issue_key}/test-cases",
            ]),
            saved_report_list: vec![
                "{base}/atm-cloud/rest/api/latest/reports/saved?projectKey={project_key}".to_string(),
                "{base}/rest/atm/1.0/reports/saved?projectKey={project_key}".to_string(),
                app("reports/saved?projectKey={project_key}"),
                "{base}/apps/rtm-api/rest/api/latest/reports/saved?projectKey={project_key}".to_string(),
            ],
            saved_report_export_pdf: vec![
                "{base}/atm-cloud/rest/api/latest/reports/{report_id}/export/pdf".to_string(),
                "{base}/rest/atm/1.0/report/export/pdf/{report_id}".to_string(),
                "{base}/apps/rtm-api/rest/api/latest/reports/{report_id}/export/pdf".to_string(),
                app("reports/export/pdf/{report_id}"),
            ],
            saved_report_export_html: vec![
                "{base}/atm-cloud/rest/api/latest/reports/{report_id}/export/html".to_string(),
                "{base}/rest/atm/1.0/report/export/html/{report_id}".to_string(),
                "{base}/apps/rtm-api/rest/api/latest/reports/{report_id}/export/html".to_string(),
                app("reports/export/html/{report_id}"),
            ],
        }
    }
}

impl EndpointCatalog {
    /// Load a TOML catalog; lists absent from the file keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading endpoint catalog from {:?}", path);
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

/// Values substituted into URL templates
#[derive(Debug, Clone, Default)]
pub struct TemplateVars<'a> {
    pub base: &'a str,
    pub project_key: Option<&'a str>,
    pub issue_key: Option<&'a str>,
    pub report_id: Option<&'a str>,
}

impl<'a> TemplateVars<'a> {
    pub fn new(base: &'a str) -> Self {
        Self { base, ..Default::default() }
    }

    fn expand(&self, template: &str) -> String {
        let mut url = template.replace("{base}", self.base.trim_end_matches('/'));
        for (placeholder, value) in
            [("{project_key}", self.project_key), ("{issue_key}", self.issue_key), ("{report_id}", self.report_id)]
        {
            if let Some(value) = value {
                url = url.replace(placeholder, &encode_component(value));
            }
        }
        url
    }
}

/// Concrete URLs for one logical operation, in the order they are tried
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointCandidates {
    pub operation: String,
    pub urls: Vec<String>,
}

impl EndpointCandidates {
    pub fn expand(operation: &str, templates: &[String], vars: &TemplateVars) -> Self {
        Self { operation: operation.to_string(), urls: templates.iter().map(|t| vars.expand(t)).collect() }
    }
}

/// Winning response plus the trail of failed attempts before it
#[derive(Debug)]
pub struct Resolved {
    pub url: String,
    pub response: HttpResponse,
    pub failed_attempts: Vec<Attempt>,
}

/// Probe `candidates` in order and return the first acceptable response
///
/// A candidate is accepted when it answers 200 and, if `content_type` is
/// given, its media type starts with it. Later candidates are never
/// requested once one is accepted. Each candidate is requested at most once.
pub fn resolve<C: HttpClient + ?Sized>(
    client: &C,
    candidates: &EndpointCandidates,
    accept: &str,
    content_type: Option<&str>,
) -> Result<Resolved> {
    let mut attempts = Vec::new();

    for url in &candidates.urls {
        debug!("{}: trying {}", candidates.operation, url);

        let response = match client.execute(&HttpRequest::get(url.as_str()).accept(accept)) {
            Ok(resp) => resp,
            Err(e) => {
                warn!("{}: error trying {}: {}", candidates.operation, url, e);
                attempts.push(Attempt { url: url.clone(), outcome: AttemptOutcome::Transport(e.to_string()) });
                continue;
            }
        };

        let type_ok = content_type.map(|ct| response.content_type_matches(ct)).unwrap_or(true);
        if response.is_ok() && type_ok {
            info!("{}: using endpoint {} after {} failed attempts", candidates.operation, url, attempts.len());
            return Ok(Resolved { url: url.clone(), response, failed_attempts: attempts });
        }

        warn!("{}: GET {} -> {} {}", candidates.operation, url, response.status, response.snippet(150));
        attempts.push(Attempt {
            url: url.clone(),
            outcome: AttemptOutcome::Status { status: response.status, content_type: response.content_type.clone() },
        });
    }

    Err(ReportError::EndpointUnavailable { operation: candidates.operation.clone(), attempts })
}

/// True when every attempt got an answer and all of them were 401/403
pub fn credentials_rejected(attempts: &[Attempt]) -> bool {
    !attempts.is_empty() && attempts.iter().all(|a| matches!(a.status(), Some(401) | Some(403)))
}

/// Turn an exhausted scan whose every candidate refused the credentials
/// into `AuthenticationFailed`; pass anything else through
pub fn classify_exhaustion(err: ReportError) -> ReportError {
    match err {
        ReportError::EndpointUnavailable { operation, attempts } if credentials_rejected(&attempts) => {
            ReportError::AuthenticationFailed(format!("{}: credentials rejected by every endpoint", operation))
        }
        other => other,
    }
}

#[cfg(test)]
#[path = "endpoints_test.rs"]
mod endpoints_test;
