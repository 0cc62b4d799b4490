/// Error taxonomy for every stage of a report run
///
/// All failures propagate to `main` as a `ReportError`, which prints the
/// message and exits with status 1.
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReportError>;

/// One probe made by the endpoint resolver
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    pub url: String,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    /// Server answered with this status (and content type, if any)
    Status { status: u16, content_type: String },
    /// Request never produced a response
    Transport(String),
}

impl Attempt {
    /// HTTP status, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self.outcome {
            AttemptOutcome::Status { status, .. } => Some(status),
            AttemptOutcome::Transport(_) => None,
        }
    }
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            AttemptOutcome::Status { status, content_type } if content_type.is_empty() => {
                write!(f, "GET {} -> {}", self.url, status)
            }
            AttemptOutcome::Status { status, content_type } => {
                write!(f, "GET {} -> {} ({})", self.url, status, content_type)
            }
            AttemptOutcome::Transport(e) => write!(f, "GET {} -> transport error: {}", self.url, e),
        }
    }
}

fn format_attempts(attempts: &[Attempt]) -> String {
    if attempts.is_empty() {
        return "no candidate URLs configured".to_string();
    }
    attempts.iter().map(|a| format!("\n  {}", a)).collect()
}

/// Which representation of a saved report is being exported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Pdf,
    Html,
}

impl ExportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportKind::Pdf => "pdf",
            ExportKind::Html => "html",
        }
    }

    /// Content type a successful export must carry
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportKind::Pdf => "application/pdf",
            ExportKind::Html => "text/html",
        }
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("missing required configuration: {name}")]
    ConfigurationMissing { name: String },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("{operation}: no candidate endpoint succeeded:{}", format_attempts(.attempts))]
    EndpointUnavailable { operation: String, attempts: Vec<Attempt> },

    #[error("no saved reports available")]
    NoReportsAvailable,

    #[error("report not found: {0}")]
    ReportNotFound(String),

    #[error("{kind} export failed with HTTP status {status}")]
    ExportFailed { kind: ExportKind, status: u16 },

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response from {url}: {status} {detail}")]
    UnexpectedResponse { url: String, status: u16, detail: String },

    #[error("PDF rendering failed: {0}")]
    Pdf(String),

    #[error("email delivery failed: {0}")]
    Email(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

impl ReportError {
    pub fn missing(name: impl Into<String>) -> Self {
        ReportError::ConfigurationMissing { name: name.into() }
    }
}
