/// Saved report export
///
/// Downloads the PDF or HTML rendering of a saved report through the
/// export candidates of the endpoint catalog. Nothing is written here; the
/// caller saves artifacts only once an export has succeeded.
use crate::endpoints::{self, EndpointCandidates, EndpointCatalog, TemplateVars};
use crate::error::{ExportKind, ReportError, Result};
use crate::http::HttpClient;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

pub struct ReportExporter<'a, C: HttpClient + ?Sized> {
    client: &'a C,
    catalog: &'a EndpointCatalog,
    base_url: &'a str,
}

impl<'a, C: HttpClient + ?Sized> ReportExporter<'a, C> {
    pub fn new(client: &'a C, catalog: &'a EndpointCatalog, base_url: &'a str) -> Self {
        Self { client, catalog, base_url }
    }

    fn templates(&self, kind: ExportKind) -> &[String] {
        match kind {
            ExportKind::Pdf => &self.catalog.saved_report_export_pdf,
            ExportKind::Html => &self.catalog.saved_report_export_html,
        }
    }

    /// Fetch one representation of `report_id`
    ///
    /// Fails with `ExportFailed` carrying the last HTTP status seen when no
    /// candidate produced the right content type.
    pub fn export(&self, report_id: &str, kind: ExportKind) -> Result<Vec<u8>> {
        let vars = TemplateVars { report_id: Some(report_id), ..TemplateVars::new(self.base_url) };
        let candidates =
            EndpointCandidates::expand(&format!("export {} of report {}", kind, report_id), self.templates(kind), &vars);

        match endpoints::resolve(self.client, &candidates, kind.content_type(), Some(kind.content_type())) {
            Ok(resolved) => {
                info!("Exported {} of report {} ({} bytes)", kind, report_id, resolved.response.body.len());
                Ok(resolved.response.body)
            }
            Err(ReportError::EndpointUnavailable { operation, attempts }) => {
                match attempts.iter().rev().find_map(|a| a.status()) {
                    Some(status) => {
                        debug!("{}: giving up after {} attempts", operation, attempts.len());
                        Err(ReportError::ExportFailed { kind, status })
                    }
                    None => Err(ReportError::EndpointUnavailable { operation, attempts }),
                }
            }
            Err(e) => Err(e),
        }
    }
}

/// File name for an exported saved report: `{project_key}_{report_id}_report.{ext}`
pub fn artifact_name(project_key: &str, report_id: &str, kind: ExportKind) -> String {
    let safe = |s: &str| {
        s.chars().map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' }).collect::<String>()
    };
    format!("{}_{}_report.{}", safe(project_key), safe(report_id), kind.as_str())
}

/// Write an exported artifact into `dir`, creating it if needed
pub fn write_artifact(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(name);
    fs::write(&path, bytes)?;
    debug!("Wrote {} bytes to {:?}", bytes.len(), path);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::fake::FakeClient;

    const BASE: &str = "https://acme.atlassian.net";

    #[test]
    fn test_pdf_export_uses_first_matching_endpoint() {
        let client = FakeClient::new()
            .on_get(&format!("{}/atm-cloud/rest/api/latest/reports/77/export/pdf", BASE), 404, "", b"")
            .on_get(&format!("{}/rest/atm/1.0/report/export/pdf/77", BASE), 200, "application/pdf", b"%PDF-1.4");
        let catalog = EndpointCatalog::default();

        let bytes = ReportExporter::new(&client, &catalog, BASE).export("77", ExportKind::Pdf).unwrap();
        assert_eq!(bytes, b"%PDF-1.4");
        assert_eq!(client.requests().len(), 2);
        assert_eq!(client.requests()[1].header_value("Accept"), Some("application/pdf"));
    }

    #[test]
    fn test_unknown_report_is_export_failed_404() {
        let client = FakeClient::new();
        let catalog = EndpointCatalog::default();

        let err = ReportExporter::new(&client, &catalog, BASE).export("does-not-exist", ExportKind::Pdf).unwrap_err();
        assert!(matches!(err, ReportError::ExportFailed { kind: ExportKind::Pdf, status: 404 }));
        assert_eq!(client.requests().len(), catalog.saved_report_export_pdf.len());
    }

    #[test]
    fn test_wrong_content_type_reports_last_status() {
        let catalog = EndpointCatalog {
            saved_report_export_html: vec!["{base}/export/{report_id}.html".to_string()],
            ..EndpointCatalog::default()
        };
        let client = FakeClient::new().on_get(&format!("{}/export/5.html", BASE), 200, "application/json", b"{}");

        let err = ReportExporter::new(&client, &catalog, BASE).export("5", ExportKind::Html).unwrap_err();
        assert!(matches!(err, ReportError::ExportFailed { kind: ExportKind::Html, status: 200 }));
    }

    #[test]
    fn test_transport_only_failures_stay_endpoint_unavailable() {
        let catalog = EndpointCatalog {
            saved_report_export_pdf: vec!["{base}/x/{report_id}".to_string()],
            ..EndpointCatalog::default()
        };
        let client = FakeClient::new().fail_get(&format!("{}/x/1", BASE), "timed out");

        let err = ReportExporter::new(&client, &catalog, BASE).export("1", ExportKind::Pdf).unwrap_err();
        assert!(matches!(err, ReportError::EndpointUnavailable { .. }));
    }

    #[test]
    fn test_failed_export_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let client = FakeClient::new();
        let catalog = EndpointCatalog::default();

        let result = ReportExporter::new(&client, &catalog, BASE)
            .export("404", ExportKind::Pdf)
            .and_then(|bytes| write_artifact(dir.path(), &artifact_name("RD", "404", ExportKind::Pdf), &bytes));
        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_artifact_name_is_filesystem_safe() {
        assert_eq!(artifact_name("RD", "42", ExportKind::Pdf), "RD_42_report.pdf");
        assert_eq!(artifact_name("RD", "a/b c", ExportKind::Html), "RD_a_b_c_report.html");
    }
}
