/// Tests for the http module, including the real ureq client against a
/// one-shot local server
#[cfg(test)]
mod tests {
    use crate::error::ReportError;
    use crate::http::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    /// Serve exactly one request with a fixed raw response, returning the
    /// base URL and a receiver for the captured request head
    fn serve_once(raw_response: &'static str) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone"));
            let mut head = String::new();
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap_or(0) == 0 || line == "\r\n" {
                    break;
                }
                head.push_str(&line);
            }
            let mut stream = stream;
            stream.write_all(raw_response.as_bytes()).ok();
            stream.flush().ok();
            tx.send(head).ok();
        });

        (format!("http://{}", addr), rx)
    }

    #[test]
    fn test_basic_header_encoding() {
        let creds = Credentials::new("user@example.com", "secret");
        assert_eq!(creds.basic_header(), "Basic dXNlckBleGFtcGxlLmNvbTpzZWNyZXQ=");
    }

    #[test]
    fn test_content_type_matching_ignores_parameters_and_case() {
        let resp = HttpResponse {
            status: 200,
            content_type: "Application/JSON; charset=UTF-8".to_string(),
            body: vec![],
        };
        assert!(resp.content_type_matches("application/json"));
        assert!(!resp.content_type_matches("application/pdf"));
    }

    #[test]
    fn test_empty_content_type_never_matches() {
        let resp = HttpResponse { status: 200, content_type: String::new(), body: vec![] };
        assert!(!resp.content_type_matches("application/pdf"));
    }

    #[test]
    fn test_snippet_truncates() {
        let resp = HttpResponse { status: 500, content_type: String::new(), body: b"abcdefghij".to_vec() };
        assert_eq!(resp.snippet(4), "abcd...");
        assert_eq!(resp.snippet(40), "abcdefghij");
    }

    #[test]
    fn test_encode_component() {
        assert_eq!(encode_component("Test Execution Summary"), "Test%20Execution%20Summary");
        assert_eq!(encode_component("a&b=c"), "a%26b%3Dc");
        assert_eq!(encode_component("RD-12"), "RD-12");
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("https://x.atlassian.net/", "/rest/api/3"), "https://x.atlassian.net/rest/api/3");
        assert_eq!(join_url("https://x.atlassian.net", "rest"), "https://x.atlassian.net/rest");
    }

    #[test]
    fn test_multipart_body_layout() {
        let form = MultipartForm::new().file("file", "report.pdf", "application/octet-stream", b"%PDF".to_vec());
        let content_type = form.content_type();
        let boundary = content_type.split("boundary=").nth(1).unwrap().to_string();
        let body = String::from_utf8(form.into_body()).unwrap();

        assert!(body.starts_with(&format!("--{}\r\n", boundary)));
        assert!(body.contains("name=\"file\"; filename=\"report.pdf\""));
        assert!(body.contains("\r\n\r\n%PDF\r\n"));
        assert!(body.ends_with(&format!("--{}--\r\n", boundary)));
    }

    #[test]
    fn test_ureq_client_returns_error_statuses_as_responses() {
        let (base, rx) = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Type: application/json\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}",
        );
        let client = UreqClient::new(&Credentials::new("u", "t"), Duration::from_secs(5));

        let resp = client.execute(&HttpRequest::get(format!("{}/rest/api/3/issue/X-1", base)).accept("application/json"));
        let resp = resp.expect("status errors are responses");
        assert_eq!(resp.status, 404);
        assert!(resp.content_type_matches("application/json"));
        assert_eq!(resp.body, b"{}");

        let head = rx.recv_timeout(Duration::from_secs(5)).expect("request head");
        assert!(head.starts_with("GET /rest/api/3/issue/X-1 HTTP/1.1"));
        assert!(head.contains("Authorization: Basic dTp0"));
        assert!(head.to_ascii_lowercase().contains("accept: application/json"));
    }

    #[test]
    fn test_ureq_client_reads_success_body() {
        let (base, _rx) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: application/pdf\r\nContent-Length: 8\r\nConnection: close\r\n\r\n%PDF-1.3",
        );
        let client = UreqClient::new(&Credentials::new("u", "t"), Duration::from_secs(5));

        let resp = client.execute(&HttpRequest::get(format!("{}/export", base))).unwrap();
        assert!(resp.is_ok());
        assert!(resp.content_type_matches("application/pdf"));
        assert_eq!(resp.body, b"%PDF-1.3");
    }

    #[test]
    fn test_ureq_client_maps_connection_failure_to_network_error() {
        // Bind then drop to get a port nobody listens on
        let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let client = UreqClient::new(&Credentials::new("u", "t"), Duration::from_secs(2));

        let result = client.execute(&HttpRequest::get(format!("http://127.0.0.1:{}/", port)));
        assert!(matches!(result, Err(ReportError::Network(_))));
    }
}
