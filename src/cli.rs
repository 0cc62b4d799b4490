use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Default directory for generated reports
pub const DEFAULT_REPORT_DIR: &str = "report";

#[derive(Parser, Debug, Clone)]
#[command(name = "rtm-report")]
#[command(about = "Fetch Jira / RTM test reports, render them, and deliver them by email and Confluence")]
#[command(version)]
pub struct CliArgs {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// TOML file overriding the built-in endpoint candidate lists
    #[arg(long, global = true, env = "RTM_ENDPOINTS", value_name = "FILE")]
    pub endpoints: Option<PathBuf>,

    /// Timeout for every outbound HTTP request, in seconds
    #[arg(long, global = true, env = "RTM_HTTP_TIMEOUT", default_value = "30", value_name = "SECS")]
    pub timeout_secs: u64,

    /// Directory reports are written to and read from
    #[arg(long, global = true, env = "RTM_REPORT_DIR", default_value = DEFAULT_REPORT_DIR, value_name = "DIR")]
    pub output_dir: PathBuf,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Render an HTML and PDF report for a test execution issue
    FetchExecution(FetchExecutionArgs),

    /// Locate a saved RTM report and download its PDF (and HTML) export
    FetchSaved(FetchSavedArgs),

    /// Email the rendered execution report
    SendEmail(SendEmailArgs),

    /// Attach the rendered execution report to a Confluence page
    PublishConfluence(PublishConfluenceArgs),

    /// fetch-execution, then publish-confluence, then send-email
    Run(RunArgs),
}

/// Jira connection, positional in the order Jenkins passes it
#[derive(Args, Debug, Clone, Default)]
pub struct JiraArgs {
    /// Jira Cloud base URL, e.g. https://acme.atlassian.net
    #[arg(env = "JIRA_BASE", value_name = "JIRA_BASE")]
    pub jira_base: Option<String>,

    /// Jira account email
    #[arg(env = "JIRA_USER", value_name = "JIRA_USER")]
    pub jira_user: Option<String>,

    /// Jira API token
    #[arg(env = "JIRA_TOKEN", value_name = "JIRA_TOKEN", hide_env_values = true)]
    pub jira_token: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FetchExecutionArgs {
    #[command(flatten)]
    pub jira: JiraArgs,

    /// Test execution issue key, e.g. RD-42
    #[arg(env = "JIRA_ISSUE_KEY", value_name = "ISSUE_KEY")]
    pub issue_key: Option<String>,

    /// Environment label, e.g. QA
    #[arg(env = "ENVIRONMENT", value_name = "ENVIRONMENT")]
    pub environment: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FetchSavedArgs {
    #[command(flatten)]
    pub jira: JiraArgs,

    /// Project whose saved reports are searched
    #[arg(env = "JIRA_PROJECT_KEY", value_name = "PROJECT_KEY")]
    pub project_key: Option<String>,

    /// Name (or part of the name) of the saved report
    #[arg(env = "REPORT_NAME", value_name = "REPORT_NAME")]
    pub report_name: Option<String>,

    /// Environment label used as an extra match term
    #[arg(long, env = "ENVIRONMENT")]
    pub environment: Option<String>,

    /// Fail instead of falling back to the newest report when nothing matches
    #[arg(long)]
    pub strict_match: bool,
}

/// SMTP delivery settings
#[derive(Args, Debug, Clone)]
pub struct SmtpArgs {
    #[arg(long, env = "SMTP_HOST", default_value = "smtp.gmail.com")]
    pub smtp_host: String,

    #[arg(long, env = "SMTP_PORT", default_value = "587")]
    pub smtp_port: u16,

    #[arg(long, env = "SMTP_USER")]
    pub smtp_user: Option<String>,

    #[arg(long, env = "SMTP_PASS", hide_env_values = true)]
    pub smtp_pass: Option<String>,

    /// Sender address
    #[arg(long, env = "REPORT_FROM")]
    pub from: Option<String>,

    /// Recipients, comma separated
    #[arg(long, env = "REPORT_TO", value_delimiter = ',')]
    pub to: Vec<String>,
}

impl Default for SmtpArgs {
    fn default() -> Self {
        Self {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            smtp_user: None,
            smtp_pass: None,
            from: None,
            to: Vec::new(),
        }
    }
}

/// Confluence page settings
#[derive(Args, Debug, Clone, Default)]
pub struct ConfluenceArgs {
    /// Confluence base URL, e.g. https://acme.atlassian.net/wiki
    #[arg(long, env = "CONFLUENCE_BASE")]
    pub confluence_base: Option<String>,

    #[arg(long, env = "CONFLUENCE_USER")]
    pub confluence_user: Option<String>,

    #[arg(long, env = "CONFLUENCE_TOKEN", hide_env_values = true)]
    pub confluence_token: Option<String>,

    #[arg(long, env = "CONFLUENCE_SPACE")]
    pub confluence_space: Option<String>,

    #[arg(long, env = "CONFLUENCE_TITLE")]
    pub confluence_title: Option<String>,
}

impl ConfluenceArgs {
    /// True when any Confluence setting was supplied
    pub fn is_configured(&self) -> bool {
        [
            &self.confluence_base,
            &self.confluence_user,
            &self.confluence_token,
            &self.confluence_space,
            &self.confluence_title,
        ]
        .iter()
        .any(|v| v.is_some())
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct SendEmailArgs {
    #[arg(env = "JIRA_ISSUE_KEY", value_name = "ISSUE_KEY")]
    pub issue_key: Option<String>,

    #[arg(env = "ENVIRONMENT", value_name = "ENVIRONMENT")]
    pub environment: Option<String>,

    #[command(flatten)]
    pub smtp: SmtpArgs,

    #[command(flatten)]
    pub confluence: ConfluenceArgs,

    /// Files to attach instead of the execution report pair
    #[arg(long = "attach", value_name = "PATH", num_args = 1..)]
    pub attachments: Vec<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct PublishConfluenceArgs {
    #[command(flatten)]
    pub confluence: ConfluenceArgs,

    /// Files to upload instead of the execution report pair
    #[arg(long = "file", value_name = "PATH", num_args = 1..)]
    pub files: Vec<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub execution: FetchExecutionArgs,

    #[command(flatten)]
    pub smtp: SmtpArgs,

    #[command(flatten)]
    pub confluence: ConfluenceArgs,

    /// Skip the Confluence upload
    #[arg(long)]
    pub skip_confluence: bool,

    /// Skip the email
    #[arg(long)]
    pub skip_email: bool,
}

impl CliArgs {
    /// Parse command-line arguments
    ///
    /// `--help` and `--version` come back as errors too; check
    /// `clap::Error::use_stderr` to tell them apart.
    pub fn parse_args() -> Result<Self, clap::Error> {
        let mut args = CliArgs::try_parse()?;

        // REPORT_TO is commonly written "a@x, b@y"
        if let Command::SendEmail(SendEmailArgs { smtp, .. }) | Command::Run(RunArgs { smtp, .. }) = &mut args.command {
            smtp.to = smtp.to.iter().map(|r| r.trim().to_string()).filter(|r| !r.is_empty()).collect();
        }

        Ok(args)
    }

    /// Validate argument combinations
    pub fn validate(&self) -> Result<(), String> {
        if self.global.timeout_secs == 0 {
            return Err("--timeout-secs must be greater than zero".to_string());
        }

        if let Command::Run(run) = &self.command {
            if run.skip_confluence && run.skip_email {
                return Err("Cannot specify both --skip-confluence and --skip-email; use fetch-execution".to_string());
            }
        }

        Ok(())
    }
}
