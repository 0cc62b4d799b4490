/// Configuration resolution module
///
/// This module handles:
/// - Turning parsed CLI arguments (with their environment fallbacks) into
///   validated, typed configuration
/// - Naming the flag and environment variable of anything missing
/// - Loading the endpoint catalog override
use crate::cli::{ConfluenceArgs, FetchExecutionArgs, FetchSavedArgs, GlobalArgs, JiraArgs, SmtpArgs};
use crate::endpoints::EndpointCatalog;
use crate::error::{ReportError, Result};
use crate::http::{Credentials, encode_component};
use crate::locator::{FallbackPolicy, MatchQuery};
use log::debug;
use std::path::PathBuf;
use std::time::Duration;

/// Return the trimmed value or `ConfigurationMissing` naming where it comes from
fn require(value: &Option<String>, name: &str) -> Result<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ReportError::missing(name)),
    }
}

fn require_url(value: &Option<String>, name: &str) -> Result<String> {
    let raw = require(value, name)?;
    let parsed =
        url::Url::parse(&raw).map_err(|e| ReportError::InvalidConfiguration(format!("{} '{}': {}", name, raw, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ReportError::InvalidConfiguration(format!("{} must be an http(s) URL, got '{}'", name, raw)));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub struct JiraConfig {
    pub base_url: String,
    pub credentials: Credentials,
}

impl JiraConfig {
    pub fn from_args(args: &JiraArgs) -> Result<Self> {
        Ok(Self {
            base_url: require_url(&args.jira_base, "JIRA_BASE (positional jira base URL)")?,
            credentials: Credentials::new(
                require(&args.jira_user, "JIRA_USER (positional jira user)")?,
                require(&args.jira_token, "JIRA_TOKEN (positional jira token)")?,
            ),
        })
    }
}

/// Issue key and environment of a test execution
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionTarget {
    pub issue_key: String,
    pub environment: String,
}

impl ExecutionTarget {
    pub fn new(issue_key: &Option<String>, environment: &Option<String>) -> Result<Self> {
        Ok(Self {
            issue_key: require(issue_key, "JIRA_ISSUE_KEY (positional issue key)")?,
            environment: require(environment, "ENVIRONMENT (positional environment)")?,
        })
    }
}

/// Everything fetch-execution needs
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionConfig {
    pub jira: JiraConfig,
    pub target: ExecutionTarget,
}

impl ExecutionConfig {
    pub fn from_args(args: &FetchExecutionArgs) -> Result<Self> {
        Ok(Self {
            jira: JiraConfig::from_args(&args.jira)?,
            target: ExecutionTarget::new(&args.issue_key, &args.environment)?,
        })
    }
}

/// Everything fetch-saved needs
#[derive(Debug, Clone, PartialEq)]
pub struct SavedReportConfig {
    pub jira: JiraConfig,
    pub project_key: String,
    pub query: MatchQuery,
}

impl SavedReportConfig {
    pub fn from_args(args: &FetchSavedArgs) -> Result<Self> {
        let jira = JiraConfig::from_args(&args.jira)?;
        let project_key = require(&args.project_key, "JIRA_PROJECT_KEY (positional project key)")?;
        let environment = args.environment.as_deref().map(str::trim).unwrap_or("");

        let mut query = MatchQuery::new(&project_key, environment);
        if let Some(name) = &args.report_name {
            query = query.with_name(name);
        }
        if args.strict_match {
            query = query.with_policy(FallbackPolicy::Strict);
        }

        Ok(Self { jira, project_key, query })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub credentials: Credentials,
    pub from: String,
    pub to: Vec<String>,
}

impl SmtpConfig {
    pub fn from_args(args: &SmtpArgs) -> Result<Self> {
        let host = args.smtp_host.trim();
        if host.is_empty() {
            return Err(ReportError::missing("SMTP_HOST (--smtp-host)"));
        }
        let to: Vec<String> = args.to.iter().map(|r| r.trim().to_string()).filter(|r| !r.is_empty()).collect();
        if to.is_empty() {
            return Err(ReportError::missing("REPORT_TO (--to)"));
        }

        Ok(Self {
            host: host.to_string(),
            port: args.smtp_port,
            credentials: Credentials::new(
                require(&args.smtp_user, "SMTP_USER (--smtp-user)")?,
                require(&args.smtp_pass, "SMTP_PASS (--smtp-pass)")?,
            ),
            from: require(&args.from, "REPORT_FROM (--from)")?,
            to,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfluenceConfig {
    pub base_url: String,
    pub credentials: Credentials,
    pub space: String,
    pub title: String,
}

impl ConfluenceConfig {
    pub fn from_args(args: &ConfluenceArgs) -> Result<Self> {
        Ok(Self {
            base_url: require_url(&args.confluence_base, "CONFLUENCE_BASE (--confluence-base)")?,
            credentials: Credentials::new(
                require(&args.confluence_user, "CONFLUENCE_USER (--confluence-user)")?,
                require(&args.confluence_token, "CONFLUENCE_TOKEN (--confluence-token)")?,
            ),
            space: require(&args.confluence_space, "CONFLUENCE_SPACE (--confluence-space)")?,
            title: require(&args.confluence_title, "CONFLUENCE_TITLE (--confluence-title)")?,
        })
    }

    /// `None` when no Confluence setting was given at all; an error when
    /// only some were
    pub fn optional(args: &ConfluenceArgs) -> Result<Option<Self>> {
        if args.is_configured() { Self::from_args(args).map(Some) } else { Ok(None) }
    }

    /// Browser link to the report page
    pub fn page_link(&self) -> String {
        format!(
            "{}/pages/viewpage.action?spaceKey={}&title={}",
            self.base_url,
            encode_component(&self.space),
            encode_component(&self.title)
        )
    }
}

/// Where reports go and how the HTTP layer behaves
#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub timeout: Duration,
    pub catalog: EndpointCatalog,
}

impl OutputConfig {
    pub fn from_args(args: &GlobalArgs) -> Result<Self> {
        if args.timeout_secs == 0 {
            return Err(ReportError::InvalidConfiguration("RTM_HTTP_TIMEOUT must be greater than zero".to_string()));
        }
        let catalog = match &args.endpoints {
            Some(path) => EndpointCatalog::load(path)?,
            None => EndpointCatalog::default(),
        };
        debug!("Output dir {:?}, timeout {}s", args.output_dir, args.timeout_secs);

        Ok(Self { dir: args.output_dir.clone(), timeout: Duration::from_secs(args.timeout_secs), catalog })
    }

    pub fn execution_html(&self) -> PathBuf {
        self.dir.join(format!("{}.html", EXECUTION_REPORT_STEM))
    }

    pub fn execution_pdf(&self) -> PathBuf {
        self.dir.join(format!("{}.pdf", EXECUTION_REPORT_STEM))
    }

    /// The execution report pair, HTML first
    pub fn execution_reports(&self) -> Vec<PathBuf> {
        vec![self.execution_html(), self.execution_pdf()]
    }
}

/// File stem of the rendered execution report
pub const EXECUTION_REPORT_STEM: &str = "rtm_execution_report";

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
