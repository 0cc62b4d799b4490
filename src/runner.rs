use crate::cli::{CliArgs, Command, PublishConfluenceArgs, RunArgs, SendEmailArgs};
use crate::config::*;
use crate::delivery::{self, ConfluencePublisher, EmailContent, MailTransport, PublishOutcome, SentEmail, SmtpMailer};
use crate::error::{ExportKind, ReportError, Result};
use crate::exporter::{self, ReportExporter};
use crate::http::{HttpClient, UreqClient};
use crate::jira::JiraClient;
use crate::locator::{self, LocatedReport};
use crate::render::{self, ReportDocument, WrittenReport};
use crate::summary::ExecutionSummary;
use crate::ui;
use log::{debug, warn};
use std::path::PathBuf;

/// Files produced by fetch-saved
#[derive(Debug, Clone, PartialEq)]
pub struct SavedArtifacts {
    pub report: LocatedReport,
    pub pdf: PathBuf,
    pub html: Option<PathBuf>,
}

/// Fetch an execution issue and its test cases, render both formats
///
/// Test cases are optional: when the servers answer but no endpoint serves
/// them the report falls back to the issue's field table. Rejected
/// credentials and unreachable servers still abort.
pub fn fetch_execution<C: HttpClient + ?Sized>(
    client: &C,
    config: &ExecutionConfig,
    output: &OutputConfig,
) -> Result<WrittenReport> {
    let target = &config.target;
    let jira = JiraClient::new(client, &output.catalog, &config.jira.base_url);

    ui::status(&format!("Fetching Jira issue details for {} ({})...", target.issue_key, target.environment));
    let issue = jira.fetch_issue(&target.issue_key, &target.environment)?;

    let test_cases = match jira.fetch_test_cases(&target.issue_key) {
        Ok(rows) => rows,
        Err(e @ ReportError::AuthenticationFailed(_)) => return Err(e),
        // Nothing answered at all: a network failure, not a missing endpoint
        Err(ReportError::EndpointUnavailable { operation, attempts })
            if !attempts.is_empty() && attempts.iter().all(|a| a.status().is_none()) =>
        {
            return Err(ReportError::EndpointUnavailable { operation, attempts });
        }
        Err(e) => {
            warn!("{}", e);
            ui::warning(&format!("Test cases of {} unavailable; reporting issue fields only", target.issue_key));
            Vec::new()
        }
    };

    let execution = ExecutionSummary::new(issue, test_cases);
    debug!("Execution counts: {:?}", execution.counts);

    ui::status("Generating HTML and PDF reports...");
    let rendered = render::render(&ReportDocument::for_execution(&execution))?;
    let written = rendered.write_to(&output.dir, EXECUTION_REPORT_STEM)?;

    ui::status(&format!("HTML report generated at {}", written.html_path.display()));
    ui::status(&format!("PDF report generated at {}", written.pdf_path.display()));
    Ok(written)
}

/// Locate a saved report, then download its PDF (required) and HTML
/// (best-effort) exports
pub fn fetch_saved<C: HttpClient + ?Sized>(
    client: &C,
    config: &SavedReportConfig,
    output: &OutputConfig,
) -> Result<SavedArtifacts> {
    let base = &config.jira.base_url;

    ui::status(&format!("Searching for saved RTM reports in {}...", config.project_key));
    let reports = JiraClient::new(client, &output.catalog, base).list_saved_reports(&config.project_key)?;
    debug!("{} saved reports listed", reports.len());

    let report = locator::locate(&reports, &config.query)?;
    if report.is_fallback() {
        ui::warning(&format!("No saved report matched; using the most recent one ({})", report.descriptor.name));
    }
    ui::status(&format!("Found report '{}' with ID: {}", report.descriptor.name, report.id));

    let exporter = ReportExporter::new(client, &output.catalog, base);

    let pdf_bytes = exporter.export(&report.id, ExportKind::Pdf)?;
    let pdf_name = exporter::artifact_name(&config.project_key, &report.id, ExportKind::Pdf);
    let pdf = exporter::write_artifact(&output.dir, &pdf_name, &pdf_bytes)?;
    ui::status(&format!("Saved RTM PDF report at {}", pdf.display()));

    let html = match exporter.export(&report.id, ExportKind::Html) {
        Ok(bytes) => {
            let name = exporter::artifact_name(&config.project_key, &report.id, ExportKind::Html);
            let path = exporter::write_artifact(&output.dir, &name, &bytes)?;
            ui::status(&format!("Saved RTM HTML report at {}", path.display()));
            Some(path)
        }
        Err(e) => {
            warn!("{}", e);
            ui::warning(&format!("HTML export of report {} unavailable", report.id));
            None
        }
    };

    Ok(SavedArtifacts { report, pdf, html })
}

/// Email the report files
pub fn send_email<T: MailTransport + ?Sized>(
    transport: &T,
    smtp: &SmtpConfig,
    content: &EmailContent,
    attachments: &[PathBuf],
) -> Result<SentEmail> {
    ui::status(&format!("Sending report email for {} ({})...", content.issue_key, content.environment));
    let sent = delivery::send_report(transport, smtp, content, attachments)?;

    for path in &sent.missing {
        ui::warning(&format!("Missing attachment: {}", path.display()));
    }
    for path in &sent.attached {
        ui::status(&format!("Attached: {}", path.display()));
    }
    ui::status(&format!("Email sent to: {}", sent.recipients.join(", ")));
    Ok(sent)
}

/// Upload the report files to the Confluence page
pub fn publish_confluence<C: HttpClient + ?Sized>(
    client: &C,
    config: &ConfluenceConfig,
    files: &[PathBuf],
) -> Result<PublishOutcome> {
    ui::status(&format!("Publishing to Confluence page '{}' in space {}...", config.title, config.space));
    let outcome = ConfluencePublisher::new(client, config).publish(files)?;

    if outcome.page_created {
        ui::status(&format!("Created page {}", outcome.page_id));
    }
    for path in &outcome.missing {
        ui::warning(&format!("Missing file: {}", path.display()));
    }
    for upload in &outcome.uploaded {
        ui::status(&format!("{:?} attachment: {}", upload.action, upload.filename));
    }
    if outcome.page_updated {
        ui::status("Page content updated successfully.");
    } else {
        ui::warning("Attachments uploaded but the page body could not be updated");
    }
    Ok(outcome)
}

fn email_content(target: &ExecutionTarget, confluence: Option<&ConfluenceConfig>) -> EmailContent {
    EmailContent {
        issue_key: target.issue_key.clone(),
        environment: target.environment.clone(),
        confluence_link: confluence.map(|c| (c.page_link(), c.title.clone())),
    }
}

fn attachments_or_default(explicit: &[PathBuf], output: &OutputConfig) -> Vec<PathBuf> {
    if explicit.is_empty() { output.execution_reports() } else { explicit.to_vec() }
}

fn run_send_email(args: &SendEmailArgs, output: &OutputConfig) -> Result<()> {
    let target = ExecutionTarget::new(&args.issue_key, &args.environment)?;
    let smtp = SmtpConfig::from_args(&args.smtp)?;
    let confluence = ConfluenceConfig::optional(&args.confluence)?;

    let mailer = SmtpMailer::new(&smtp, output.timeout)?;
    let attachments = attachments_or_default(&args.attachments, output);
    send_email(&mailer, &smtp, &email_content(&target, confluence.as_ref()), &attachments)?;
    Ok(())
}

fn run_publish(args: &PublishConfluenceArgs, output: &OutputConfig) -> Result<()> {
    let confluence = ConfluenceConfig::from_args(&args.confluence)?;
    let client = UreqClient::new(&confluence.credentials, output.timeout);
    publish_confluence(&client, &confluence, &attachments_or_default(&args.files, output))?;
    Ok(())
}

/// fetch-execution, publish-confluence, send-email
///
/// Every configuration is validated before the first request so a missing
/// setting never leaves a half-finished run.
fn run_pipeline(args: &RunArgs, output: &OutputConfig) -> Result<()> {
    let execution = ExecutionConfig::from_args(&args.execution)?;
    let confluence = if args.skip_confluence { None } else { ConfluenceConfig::optional(&args.confluence)? };
    let smtp = if args.skip_email { None } else { Some(SmtpConfig::from_args(&args.smtp)?) };

    let jira_client = UreqClient::new(&execution.jira.credentials, output.timeout);
    let written = fetch_execution(&jira_client, &execution, output)?;
    let files = vec![written.html_path, written.pdf_path];

    match &confluence {
        Some(config) => {
            let client = UreqClient::new(&config.credentials, output.timeout);
            publish_confluence(&client, config, &files)?;
        }
        None if !args.skip_confluence => ui::warning("Confluence is not configured; skipping upload"),
        None => {}
    }

    if let Some(smtp) = &smtp {
        let mailer = SmtpMailer::new(smtp, output.timeout)?;
        send_email(&mailer, smtp, &email_content(&execution.target, confluence.as_ref()), &files)?;
    }

    Ok(())
}

/// Execute the parsed command line
pub fn run_command(args: &CliArgs) -> Result<()> {
    let output = OutputConfig::from_args(&args.global)?;

    match &args.command {
        Command::FetchExecution(exec) => {
            let config = ExecutionConfig::from_args(exec)?;
            let client = UreqClient::new(&config.jira.credentials, output.timeout);
            fetch_execution(&client, &config, &output)?;
        }
        Command::FetchSaved(saved) => {
            let config = SavedReportConfig::from_args(saved)?;
            let client = UreqClient::new(&config.jira.credentials, output.timeout);
            fetch_saved(&client, &config, &output)?;
        }
        Command::SendEmail(email) => run_send_email(email, &output)?,
        Command::PublishConfluence(publish) => run_publish(publish, &output)?,
        Command::Run(run) => run_pipeline(run, &output)?,
    }

    Ok(())
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod runner_test;
