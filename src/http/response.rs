//! The response value an endpoint handler returns.

use crate::StatusCode;
use std::collections::BTreeMap;

/// A status code, any extra headers, and the body bytes.
///
/// The connection handler owns serialization - the standing headers
/// (`date`, `server`, `content-length`, keep-alive) are added there, so a
/// handler only states what is specific to its answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status_code: StatusCode,
    extra_headers: BTreeMap<String, String>,
    body: Vec<u8>,
}

impl Response {
    /// A response with the given status and an empty body.
    pub fn new(status_code: StatusCode) -> Self {
        Self {
            status_code,
            extra_headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    /// A `200 OK` carrying `text` as UTF-8 HTML.
    pub fn html_ok(text: &str) -> Self {
        let mut extra_headers = BTreeMap::new();
        extra_headers.insert(
            "content-type".to_string(),
            "text/html; charset=UTF-8".to_string(),
        );

        Self {
            status_code: StatusCode::Ok,
            extra_headers,
            body: text.as_bytes().to_vec(),
        }
    }

    /// A `303 SEE OTHER` pointing at `location`.
    pub fn redirect_to(location: &str) -> Self {
        let mut extra_headers = BTreeMap::new();
        extra_headers.insert("location".to_string(), location.to_string());

        Self {
            status_code: StatusCode::SeeOther,
            extra_headers,
            body: Vec::new(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    pub fn extra_headers(&self) -> &BTreeMap<String, String> {
        &self.extra_headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_ok_shape() {
        let response = Response::html_ok("86");

        assert_eq!(response.status_code(), StatusCode::Ok);
        assert_eq!(response.body(), b"86");
        assert_eq!(
            response.extra_headers().get("content-type").map(String::as_str),
            Some("text/html; charset=UTF-8")
        );
    }

    #[test]
    fn redirect_shape() {
        let response = Response::redirect_to("https://localhost:8443");

        assert_eq!(response.status_code(), StatusCode::SeeOther);
        assert!(response.body().is_empty());
        assert_eq!(
            response.extra_headers().get("location").map(String::as_str),
            Some("https://localhost:8443")
        );
    }
}
