use crate::StatusCode;
use std::{error, fmt, io};

/// Everything that can go wrong between the socket and a handler.
///
/// Parse failures carry enough context to reproduce the message the client
/// (or a test) will see.  [`ErrorKind::status_code`] decides which of these
/// become an HTTP error response and which close the connection silently.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    /// A line on the wire exceeded `max_line_bytes`.
    LineTooLong(usize),
    /// A chunk-size line in a chunked body was not valid hex.
    InvalidChunk(String),

    /// A header line without a `:` separator.
    InvalidHeader(String),
    /// More header lines than `max_headers`.
    TooManyHeaders(usize),
    /// The headers as a whole exceeded `max_header_bytes`.
    HeadersTooLarge(usize),
    /// A `content-length` value that is not a non-negative integer.
    InvalidContentLength(String),
    /// A declared or chunked body larger than `max_body_bytes`.
    BodyTooLarge(usize),

    /// More query-string pairs than `max_query_string_keys`.
    TooManyQueryKeys(usize),

    /// A url-encoded form key was empty.
    BlankKey,
    /// A url-encoded form key appeared twice.
    DuplicateKey {
        key: String,
        first: String,
        second: String,
    },
    /// A url-encoded form token without an equals sign.
    InvalidFormToken(String),

    /// A status line that does not match the status-line pattern.
    InvalidStatusLine(String),
    /// A status line with a syntactically valid but unknown code.
    NoSuchStatusCode(u16),

    Io(IoError),
}

impl ErrorKind {
    /// The status to answer with, or `None` when the connection just closes.
    ///
    /// Limit violations on the body respond `413`; every other client fault
    /// responds `400`.  Status-line failures and I/O errors have no response:
    /// the first happens on the client side of this library, the second has
    /// no client left to answer.
    pub(crate) fn status_code(&self) -> Option<StatusCode> {
        match self {
            ErrorKind::BodyTooLarge(_) => Some(StatusCode::PayloadTooLarge),

            ErrorKind::LineTooLong(_)
            | ErrorKind::InvalidChunk(_)
            | ErrorKind::InvalidHeader(_)
            | ErrorKind::TooManyHeaders(_)
            | ErrorKind::HeadersTooLarge(_)
            | ErrorKind::InvalidContentLength(_)
            | ErrorKind::TooManyQueryKeys(_)
            | ErrorKind::BlankKey
            | ErrorKind::DuplicateKey { .. }
            | ErrorKind::InvalidFormToken(_) => Some(StatusCode::BadRequest),

            ErrorKind::InvalidStatusLine(_)
            | ErrorKind::NoSuchStatusCode(_)
            | ErrorKind::Io(_) => None,
        }
    }
}

impl error::Error for ErrorKind {}
impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::LineTooLong(max) => {
                write!(f, "line exceeded the maximum length of {} bytes", max)
            }
            ErrorKind::InvalidChunk(line) => {
                write!(f, "invalid chunk size line: {}", line)
            }
            ErrorKind::InvalidHeader(line) => {
                write!(f, "improperly formatted header: {}", line)
            }
            ErrorKind::TooManyHeaders(max) => {
                write!(f, "more than the maximum allowed {} headers", max)
            }
            ErrorKind::HeadersTooLarge(max) => {
                write!(f, "headers exceeded the maximum of {} bytes", max)
            }
            ErrorKind::InvalidContentLength(value) => {
                write!(f, "content-length was not a non-negative integer: {}", value)
            }
            ErrorKind::BodyTooLarge(max) => {
                write!(f, "body exceeded the maximum of {} bytes", max)
            }
            ErrorKind::TooManyQueryKeys(max) => {
                write!(f, "query string had more than {} key-value pairs", max)
            }
            ErrorKind::BlankKey => {
                write!(f, "The key must not be blank")
            }
            ErrorKind::DuplicateKey { key, first, second } => {
                write!(
                    f,
                    "{} was duplicated in the post body - had values of {} and {}",
                    key, first, second
                )
            }
            ErrorKind::InvalidFormToken(token) => {
                write!(f, "expected a key=value pair but got: {}", token)
            }
            ErrorKind::InvalidStatusLine(line) => {
                write!(
                    f,
                    "{} must match the statusLinePattern: {}",
                    line,
                    crate::http::types::STATUS_LINE_PATTERN
                )
            }
            ErrorKind::NoSuchStatusCode(_) => {
                write!(f, "No value present")
            }
            ErrorKind::Io(err) => {
                write!(f, "{}", err.0)
            }
        }
    }
}

impl From<io::Error> for ErrorKind {
    fn from(err: io::Error) -> Self {
        ErrorKind::Io(IoError(err))
    }
}

#[derive(Debug)]
pub struct IoError(pub(crate) io::Error);

impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}
