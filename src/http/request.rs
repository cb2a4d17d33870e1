//! The parsed request handed to endpoint handlers.

use crate::http::{body::Body, headers::Headers, start_line::StartLine};

/// Everything known about one request: start line, headers, decoded body,
/// and who sent it.  Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    headers: Headers,
    start_line: StartLine,
    body: Body,
    remote_requester: String,
}

impl Request {
    pub fn new(
        headers: Headers,
        start_line: StartLine,
        body: Body,
        remote_requester: impl Into<String>,
    ) -> Self {
        Self {
            headers,
            start_line,
            body,
            remote_requester: remote_requester.into(),
        }
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn start_line(&self) -> &StartLine {
        &self.start_line
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// The address of the peer this request arrived from.
    pub fn remote_requester(&self) -> &str {
        &self.remote_requester
    }
}
