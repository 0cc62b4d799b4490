/// HTTP plumbing shared by the Jira, RTM and Confluence clients
///
/// Everything above this module talks to the `HttpClient` trait, so the
/// resolver and adapters can be driven by an in-memory fake in tests.
/// `UreqClient` is the real blocking implementation.
use crate::error::{ReportError, Result};
use base64::Engine;
use log::debug;
use serde::de::DeserializeOwned;
use std::io::Read;
use std::time::Duration;

const USER_AGENT: &str = concat!("rtm-report/", env!("CARGO_PKG_VERSION"));

/// Basic-auth credentials supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub token: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self { username: username.into(), token: token.into() }
    }

    /// Value for the `Authorization` header
    pub fn basic_header(&self) -> String {
        let raw = format!("{}:{}", self.username, self.token);
        format!("Basic {}", base64::engine::general_purpose::STANDARD.encode(raw))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self { method: Method::Get, url: url.into(), headers: Vec::new(), body: None }
    }

    pub fn post_json(url: impl Into<String>, body: &serde_json::Value) -> Result<Self> {
        Ok(Self {
            method: Method::Post,
            url: url.into(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: Some(serde_json::to_vec(body)?),
        })
    }

    pub fn put_json(url: impl Into<String>, body: &serde_json::Value) -> Result<Self> {
        let mut req = Self::post_json(url, body)?;
        req.method = Method::Put;
        Ok(req)
    }

    pub fn post_multipart(url: impl Into<String>, form: MultipartForm) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: vec![("Content-Type".to_string(), form.content_type())],
            body: Some(form.into_body()),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn accept(self, value: &str) -> Self {
        self.header("Accept", value)
    }

    /// Look up a header set on this request (case-insensitive)
    #[cfg(test)]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }
}

/// A response with any status; non-2xx answers are not errors at this layer
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Compare the media type (parameters ignored) against `expected`
    pub fn content_type_matches(&self, expected: &str) -> bool {
        let media_type = self.content_type.split(';').next().unwrap_or("").trim();
        media_type.to_ascii_lowercase().starts_with(&expected.to_ascii_lowercase())
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// First `max` characters of the body, for diagnostics
    pub fn snippet(&self, max: usize) -> String {
        let text = self.text();
        match text.char_indices().nth(max) {
            Some((idx, _)) => format!("{}...", &text[..idx]),
            None => text,
        }
    }
}

pub trait HttpClient {
    /// Perform one request. Transport failures are `ReportError::Network`;
    /// any HTTP status comes back as a response.
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Blocking client over a `ureq` agent with Basic auth on every request
pub struct UreqClient {
    agent: ureq::Agent,
    authorization: String,
}

impl UreqClient {
    pub fn new(credentials: &Credentials, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).user_agent(USER_AGENT).build();
        Self { agent, authorization: credentials.basic_header() }
    }
}

impl HttpClient for UreqClient {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        debug!("{} {}", request.method.as_str(), request.url);

        let mut req = self.agent.request(request.method.as_str(), &request.url).set("Authorization", &self.authorization);
        for (name, value) in &request.headers {
            req = req.set(name, value);
        }

        let outcome = match &request.body {
            Some(body) => req.send_bytes(body),
            None => req.call(),
        };

        let resp = match outcome {
            Ok(resp) => resp,
            Err(ureq::Error::Status(_, resp)) => resp,
            Err(ureq::Error::Transport(t)) => return Err(ReportError::Network(t.to_string())),
        };

        let status = resp.status();
        let content_type = resp.header("Content-Type").unwrap_or("").to_string();
        let mut body = Vec::new();
        resp.into_reader().read_to_end(&mut body)?;

        debug!("{} {} -> {} ({} bytes)", request.method.as_str(), request.url, status, body.len());
        Ok(HttpResponse { status, content_type, body })
    }
}

/// Percent-encode a value for use inside a URL path segment or query
pub fn encode_component(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect::<String>().replace('+', "%20")
}

/// Join a base URL and a path without doubling the slash
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// multipart/form-data body builder for attachment uploads
pub struct MultipartForm {
    boundary: String,
    parts: Vec<FormPart>,
}

struct FormPart {
    field: String,
    filename: String,
    content_type: String,
    data: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        let stamp = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        Self { boundary: format!("rtm-report-{:x}", stamp), parts: Vec::new() }
    }

    pub fn file(mut self, field: &str, filename: &str, content_type: &str, data: Vec<u8>) -> Self {
        self.parts.push(FormPart {
            field: field.to_string(),
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            data,
        });
        self
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn into_body(self) -> Vec<u8> {
        let mut body = Vec::new();
        for part in self.parts {
            body.extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    part.field, part.filename
                )
                .as_bytes(),
            );
            body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", part.content_type).as_bytes());
            body.extend_from_slice(&part.data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        body
    }
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
#[path = "http_test.rs"]
mod http_test;
