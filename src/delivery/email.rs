//! Email delivery.
//!
//! One message per run: a multipart/alternative body (plain text plus HTML
//! with the Confluence link when there is one) followed by the report files
//! as attachments. Files that do not exist are skipped with a warning.

use super::{content_type_for, file_name, partition_existing};
use crate::config::SmtpConfig;
use crate::error::{ReportError, Result};
use crate::render::escape_html;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials as SmtpCredentials;
use lettre::{Message, SmtpTransport, Transport};
use log::{debug, info, warn};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// SMTP reply codes that mean the credentials were refused
const AUTH_REJECTED: &[&str] = &["530", "534", "535"];

/// Anything that can deliver a composed message
pub trait MailTransport {
    fn send(&self, message: &Message) -> Result<()>;
}

/// STARTTLS relay with login credentials
pub struct SmtpMailer {
    transport: SmtpTransport,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig, timeout: Duration) -> Result<Self> {
        let transport = SmtpTransport::starttls_relay(&config.host)
            .map_err(|e| ReportError::InvalidConfiguration(format!("SMTP host '{}': {}", config.host, e)))?
            .port(config.port)
            .credentials(SmtpCredentials::new(config.credentials.username.clone(), config.credentials.token.clone()))
            .timeout(Some(timeout))
            .build();
        Ok(Self { transport })
    }
}

impl MailTransport for SmtpMailer {
    fn send(&self, message: &Message) -> Result<()> {
        self.transport.send(message).map(|_| ()).map_err(classify_smtp_error)
    }
}

fn classify_smtp_error(e: lettre::transport::smtp::Error) -> ReportError {
    let rejected = e.status().map(|code| AUTH_REJECTED.contains(&code.to_string().as_str())).unwrap_or(false);
    if rejected {
        ReportError::AuthenticationFailed(format!("SMTP server rejected the credentials: {}", e))
    } else {
        ReportError::Email(e.to_string())
    }
}

/// What the message says
#[derive(Debug, Clone, PartialEq)]
pub struct EmailContent {
    pub issue_key: String,
    pub environment: String,
    /// (page URL, page title)
    pub confluence_link: Option<(String, String)>,
}

impl EmailContent {
    pub fn subject(&self) -> String {
        format!("RTM Test Execution Report: {} ({})", self.issue_key, self.environment)
    }

    pub fn plain_body(&self) -> String {
        let mut body = format!(
            "Hello Team,\n\nThe RTM Test Execution Report for {} in environment {} has been generated.\n",
            self.issue_key, self.environment
        );
        if let Some((url, _)) = &self.confluence_link {
            body.push_str(&format!("\nView it on Confluence: {}\n", url));
        }
        body.push_str("\nThe HTML and PDF reports are attached.\n");
        body
    }

    pub fn html_body(&self) -> String {
        let link = match &self.confluence_link {
            Some((url, title)) => format!(
                "<p>View it on Confluence: <a href=\"{}\" target=\"_blank\">{}</a></p>\n",
                escape_html(url),
                escape_html(title)
            ),
            None => String::new(),
        };
        format!(
            "<html>\n<body style=\"font-family: Arial, sans-serif;\">\n<p>Hello Team,</p>\n\
             <p>The <b>RTM Test Execution Report</b> for <b>{}</b> in environment <b>{}</b> has been generated.</p>\n\
             {}<p>The HTML and PDF reports are attached.</p>\n</body>\n</html>\n",
            escape_html(&self.issue_key),
            escape_html(&self.environment),
            link
        )
    }
}

/// Result of a send
#[derive(Debug, Clone, PartialEq)]
pub struct SentEmail {
    pub recipients: Vec<String>,
    pub attached: Vec<PathBuf>,
    pub missing: Vec<PathBuf>,
}

fn mailbox(address: &str, name: &str) -> Result<Mailbox> {
    address.parse().map_err(|e| ReportError::InvalidConfiguration(format!("{} address '{}': {}", name, address, e)))
}

fn content_type(value: &str) -> Result<ContentType> {
    ContentType::parse(value).map_err(|e| ReportError::Email(format!("content type '{}': {}", value, e)))
}

/// Build the message; returns it with the files that were actually attached
pub fn compose(config: &SmtpConfig, content: &EmailContent, attachments: &[PathBuf]) -> Result<(Message, SentEmail)> {
    let mut builder = Message::builder().from(mailbox(&config.from, "REPORT_FROM")?).subject(content.subject());
    for recipient in &config.to {
        builder = builder.to(mailbox(recipient, "REPORT_TO")?);
    }

    let (found, missing) = partition_existing(attachments);
    for path in &missing {
        warn!("Missing attachment: {}", path.display());
    }

    let mut body =
        MultiPart::mixed().multipart(MultiPart::alternative_plain_html(content.plain_body(), content.html_body()));
    for path in &found {
        let data = fs::read(path)?;
        debug!("Attaching {} ({} bytes)", path.display(), data.len());
        body = body.singlepart(Attachment::new(file_name(path)).body(data, content_type(content_type_for(path))?));
    }

    let message = builder.multipart(body).map_err(|e| ReportError::Email(e.to_string()))?;
    Ok((message, SentEmail { recipients: config.to.clone(), attached: found, missing }))
}

/// Compose and send one report email
pub fn send_report<T: MailTransport + ?Sized>(
    transport: &T,
    config: &SmtpConfig,
    content: &EmailContent,
    attachments: &[PathBuf],
) -> Result<SentEmail> {
    let (message, sent) = compose(config, content, attachments)?;
    info!("Sending report email for {} ({}) via {}:{}", content.issue_key, content.environment, config.host, config.port);
    transport.send(&message)?;
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Credentials;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingTransport {
        sent: RefCell<Vec<Vec<u8>>>,
        envelopes: RefCell<Vec<usize>>,
    }

    impl MailTransport for RecordingTransport {
        fn send(&self, message: &Message) -> Result<()> {
            self.envelopes.borrow_mut().push(message.envelope().to().len());
            self.sent.borrow_mut().push(message.formatted());
            Ok(())
        }
    }

    struct RejectingTransport;

    impl MailTransport for RejectingTransport {
        fn send(&self, _message: &Message) -> Result<()> {
            Err(ReportError::AuthenticationFailed("535 bad credentials".to_string()))
        }
    }

    fn smtp() -> SmtpConfig {
        SmtpConfig {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            credentials: Credentials::new("bot@acme.io", "app-pass"),
            from: "bot@acme.io".to_string(),
            to: vec!["qa@acme.io".to_string(), "dev@acme.io".to_string()],
        }
    }

    fn content(link: bool) -> EmailContent {
        EmailContent {
            issue_key: "RD-7".to_string(),
            environment: "QA".to_string(),
            confluence_link: link.then(|| {
                ("https://acme.atlassian.net/wiki/pages/viewpage.action?spaceKey=QA&title=RTM".to_string(), "RTM".to_string())
            }),
        }
    }

    #[test]
    fn test_subject_format() {
        assert_eq!(content(false).subject(), "RTM Test Execution Report: RD-7 (QA)");
    }

    #[test]
    fn test_html_body_links_confluence_only_when_configured() {
        assert!(content(true).html_body().contains("href=\"https://acme.atlassian.net/wiki/pages/viewpage.action?spaceKey=QA&amp;title=RTM\""));
        assert!(!content(false).html_body().contains("Confluence"));
        assert!(content(true).plain_body().contains("View it on Confluence"));
    }

    #[test]
    fn test_message_structure_and_attachments() {
        let dir = tempfile::tempdir().unwrap();
        let html = dir.path().join("rtm_execution_report.html");
        let pdf = dir.path().join("rtm_execution_report.pdf");
        fs::write(&html, "<html></html>").unwrap();
        fs::write(&pdf, b"%PDF-1.4").unwrap();

        let transport = RecordingTransport::default();
        let sent = send_report(&transport, &smtp(), &content(true), &[html.clone(), pdf.clone()]).unwrap();

        assert_eq!(sent.attached, vec![html, pdf]);
        assert!(sent.missing.is_empty());
        assert_eq!(transport.envelopes.borrow()[0], 2);

        let raw = String::from_utf8_lossy(&transport.sent.borrow()[0]).to_string();
        assert!(raw.contains("Subject: RTM Test Execution Report: RD-7 (QA)"));
        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("rtm_execution_report.pdf"));
        assert!(raw.contains("application/pdf"));
    }

    #[test]
    fn test_missing_attachment_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("rtm_execution_report.pdf");
        fs::write(&pdf, b"%PDF-1.4").unwrap();
        let html = dir.path().join("rtm_execution_report.html");

        let (_, sent) = compose(&smtp(), &content(false), &[html.clone(), pdf.clone()]).unwrap();
        assert_eq!(sent.attached, vec![pdf]);
        assert_eq!(sent.missing, vec![html]);
    }

    #[test]
    fn test_invalid_sender_is_configuration_error() {
        let config = SmtpConfig { from: "not an address".to_string(), ..smtp() };
        let err = compose(&config, &content(false), &[]).unwrap_err();
        assert!(matches!(err, ReportError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_transport_rejection_propagates() {
        let err = send_report(&RejectingTransport, &smtp(), &content(false), &[]).unwrap_err();
        assert!(matches!(err, ReportError::AuthenticationFailed(_)));
    }
}
