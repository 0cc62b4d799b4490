//! Confluence publication.
//!
//! The page is found by space and title, or created. Each report file then
//! replaces the attachment of the same name, or becomes a new attachment.
//! Finally the page body is rewritten at the next version number; a failure
//! there only produces a warning since the attachments are already in place.

use super::{content_type_for, file_name, partition_existing};
use crate::config::ConfluenceConfig;
use crate::error::{ReportError, Result};
use crate::http::{HttpClient, HttpRequest, HttpResponse, MultipartForm, encode_component, join_url};
use crate::render::escape_html;
use log::{debug, info, warn};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};

const NO_CHECK: (&str, &str) = ("X-Atlassian-Token", "no-check");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentAction {
    Created,
    Updated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadedAttachment {
    pub filename: String,
    pub action: AttachmentAction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishOutcome {
    pub page_id: String,
    pub page_created: bool,
    pub uploaded: Vec<UploadedAttachment>,
    pub missing: Vec<PathBuf>,
    pub page_updated: bool,
}

pub struct ConfluencePublisher<'a, C: HttpClient + ?Sized> {
    client: &'a C,
    config: &'a ConfluenceConfig,
}

/// Fail on a non-2xx response, treating 401/403 as rejected credentials
fn expect_success(url: &str, response: HttpResponse) -> Result<HttpResponse> {
    if response.is_success() {
        return Ok(response);
    }
    match response.status {
        401 | 403 => Err(ReportError::AuthenticationFailed(format!("Confluence refused {} ({})", url, response.status))),
        status => {
            Err(ReportError::UnexpectedResponse { url: url.to_string(), status, detail: response.snippet(200) })
        }
    }
}

/// `results[0].id` of a Confluence search/list response
fn first_result_id(body: &Value) -> Option<String> {
    let id = body.get("results")?.as_array()?.first()?.get("id")?;
    match id {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl<'a, C: HttpClient + ?Sized> ConfluencePublisher<'a, C> {
    pub fn new(client: &'a C, config: &'a ConfluenceConfig) -> Self {
        Self { client, config }
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.config.base_url, path)
    }

    fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = request.url.clone();
        let response = self.client.execute(&request)?;
        expect_success(&url, response)
    }

    /// Page id for the configured space and title, if the page exists
    pub fn find_page(&self) -> Result<Option<String>> {
        let url = self.url(&format!(
            "rest/api/content?spaceKey={}&title={}",
            encode_component(&self.config.space),
            encode_component(&self.config.title)
        ));
        let response = self.send(HttpRequest::get(url).accept("application/json"))?;
        Ok(first_result_id(&response.json()?))
    }

    pub fn create_page(&self) -> Result<String> {
        let url = self.url("rest/api/content");
        let payload = json!({
            "type": "page",
            "title": self.config.title,
            "space": {"key": self.config.space},
            "body": {"storage": {
                "value": "<p>RTM Reports Page created automatically.</p>",
                "representation": "storage"
            }}
        });
        let response = self.send(HttpRequest::post_json(url.as_str(), &payload)?)?;
        let body: Value = response.json()?;

        match body.get("id") {
            Some(Value::String(id)) => Ok(id.clone()),
            Some(Value::Number(id)) => Ok(id.to_string()),
            _ => Err(ReportError::UnexpectedResponse {
                url,
                status: response.status,
                detail: "created page has no id".to_string(),
            }),
        }
    }

    /// Upload `path` to the page, replacing an attachment with the same name
    pub fn upload_attachment(&self, page_id: &str, path: &Path) -> Result<UploadedAttachment> {
        let filename = file_name(path);
        let data = fs::read(path)?;
        let attachments = format!("rest/api/content/{}/child/attachment", encode_component(page_id));

        let lookup = self.url(&format!("{}?filename={}", attachments, encode_component(&filename)));
        let existing = match self.client.execute(&HttpRequest::get(lookup.as_str()).accept("application/json"))? {
            resp if resp.is_ok() => resp.json::<Value>().ok().as_ref().and_then(first_result_id),
            resp => {
                debug!("Attachment lookup {} -> {}", lookup, resp.status);
                None
            }
        };

        let form = MultipartForm::new().file("file", &filename, content_type_for(path), data);
        let (url, action) = match existing {
            Some(attachment_id) => {
                (self.url(&format!("{}/{}/data", attachments, encode_component(&attachment_id))), AttachmentAction::Updated)
            }
            None => (self.url(&attachments), AttachmentAction::Created),
        };

        self.send(HttpRequest::post_multipart(url, form).header(NO_CHECK.0, NO_CHECK.1))?;
        info!("{:?} attachment {} on page {}", action, filename, page_id);
        Ok(UploadedAttachment { filename, action })
    }

    fn current_version(&self, page_id: &str) -> Result<u64> {
        let url = self.url(&format!("rest/api/content/{}?expand=version", encode_component(page_id)));
        let response = self.send(HttpRequest::get(url.as_str()).accept("application/json"))?;
        let body: Value = response.json()?;
        body.pointer("/version/number").and_then(Value::as_u64).ok_or_else(|| ReportError::UnexpectedResponse {
            url,
            status: response.status,
            detail: "page has no version number".to_string(),
        })
    }

    /// Rewrite the page body at the next version
    pub fn update_page(&self, page_id: &str, uploaded: &[UploadedAttachment]) -> Result<u64> {
        let next = self.current_version(page_id)? + 1;
        let items: String =
            uploaded.iter().map(|a| format!("<li>{}</li>", escape_html(&a.filename))).collect();
        let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");

        let payload = json!({
            "id": page_id,
            "type": "page",
            "title": self.config.title,
            "version": {"number": next},
            "body": {"storage": {
                "value": format!("<p>Report updated {}.</p><ul>{}</ul>", stamp, items),
                "representation": "storage"
            }}
        });
        let url = self.url(&format!("rest/api/content/{}", encode_component(page_id)));
        self.send(HttpRequest::put_json(url, &payload)?)?;
        Ok(next)
    }

    /// Find or create the page, upload every existing file, update the page
    pub fn publish(&self, files: &[PathBuf]) -> Result<PublishOutcome> {
        let (page_id, page_created) = match self.find_page()? {
            Some(id) => (id, false),
            None => {
                info!("Page '{}' not found in space {}; creating it", self.config.title, self.config.space);
                (self.create_page()?, true)
            }
        };
        debug!("Publishing to page {}", page_id);

        let (found, missing) = partition_existing(files);
        for path in &missing {
            warn!("Missing file: {}", path.display());
        }

        let mut uploaded = Vec::new();
        for path in &found {
            uploaded.push(self.upload_attachment(&page_id, path)?);
        }

        let page_updated = match self.update_page(&page_id, &uploaded) {
            Ok(version) => {
                debug!("Page {} now at version {}", page_id, version);
                true
            }
            Err(e) => {
                warn!("Page update warning: {}", e);
                false
            }
        };

        Ok(PublishOutcome { page_id, page_created, uploaded, missing, page_updated })
    }
}
