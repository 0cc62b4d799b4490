//! Delivery adapters - getting rendered reports to people.
//!
//! # Module Organization
//!
//! - `email` - SMTP message composition and sending
//! - `confluence` - Page lookup/creation and attachment upload

mod confluence;
mod email;

pub use confluence::{ConfluencePublisher, PublishOutcome};
pub use email::{EmailContent, MailTransport, SentEmail, SmtpMailer, send_report};

use std::path::{Path, PathBuf};

/// MIME type used when attaching or uploading a report file
pub fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("html") | Some("htm") => "text/html",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Base name of `path` as a string, falling back to the whole path
pub fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| path.display().to_string())
}

/// Split `paths` into files that exist and files that do not
pub fn partition_existing(paths: &[PathBuf]) -> (Vec<PathBuf>, Vec<PathBuf>) {
    paths.iter().cloned().partition(|p| p.is_file())
}
