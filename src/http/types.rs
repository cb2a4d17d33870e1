//! Core HTTP protocol types

use crate::errors::ErrorKind;

// VERB

/// HTTP request verbs
///
/// The closed set this server routes on, per
/// [RFC 7231, Section 4](https://datatracker.ietf.org/doc/html/rfc7231#section-4)
/// and [RFC 5789](https://datatracker.ietf.org/doc/html/rfc5789) (PATCH).
/// Anything else on the wire is a parse failure, not a new verb.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Trace,

    /// The verb of the empty start line - never produced by parsing.
    None,
}

impl Verb {
    pub(crate) fn parse(src: &str) -> Option<Self> {
        match src {
            "GET" => Some(Verb::Get),
            "POST" => Some(Verb::Post),
            "PUT" => Some(Verb::Put),
            "DELETE" => Some(Verb::Delete),
            "PATCH" => Some(Verb::Patch),
            "HEAD" => Some(Verb::Head),
            "OPTIONS" => Some(Verb::Options),
            "TRACE" => Some(Verb::Trace),
            _ => None,
        }
    }
}

// VERSION

/// HTTP protocol version
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum HttpVersion {
    /// HTTP/1.0 - [RFC 1945](https://tools.ietf.org/html/rfc1945)
    OneDotZero,

    /// HTTP/1.1 - [RFC 7230](https://tools.ietf.org/html/rfc7230) and related
    OneDotOne,

    /// The version of the empty start line - never produced by parsing.
    None,
}

impl HttpVersion {
    pub(crate) fn parse(src: &str) -> Option<Self> {
        match src {
            "HTTP/1.1" => Some(Self::OneDotOne),
            "HTTP/1.0" => Some(Self::OneDotZero),
            _ => None,
        }
    }

    pub(crate) const fn as_str(&self) -> &'static str {
        match self {
            Self::OneDotZero => "HTTP/1.0",
            Self::OneDotOne => "HTTP/1.1",
            Self::None => "",
        }
    }
}

// STATUS_CODE

macro_rules! set_status_codes {
    ($(
        $name:ident = ($num:expr, $str:expr);
    )+) => {
        /// The subset of HTTP status codes this system emits or understands.
        ///
        /// Each carries its integer and reason phrase.  Parsing an integer
        /// outside this set fails with [`ErrorKind::NoSuchStatusCode`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum StatusCode { $(
            #[doc = concat!(stringify!($num), " ", $str)]
            $name = $num,
        )+ }

        impl StatusCode {
            pub(crate) fn from_code(code: u16) -> Result<Self, ErrorKind> {
                $(
                    if code == $num {
                        return Ok(StatusCode::$name);
                    }
                )+
                Err(ErrorKind::NoSuchStatusCode(code))
            }

            /// The numeric code, e.g. `200`.
            pub const fn code(&self) -> u16 {
                *self as u16
            }

            /// The reason phrase, e.g. `OK`.
            pub const fn reason(&self) -> &'static str {
                match self { $(
                    StatusCode::$name => $str,
                )+ }
            }
        }
    }
}

set_status_codes! {
    Ok = (200, "OK");
    Created = (201, "CREATED");
    NoContent = (204, "NO CONTENT");

    MovedPermanently = (301, "MOVED PERMANENTLY");
    SeeOther = (303, "SEE OTHER");
    NotModified = (304, "NOT MODIFIED");

    BadRequest = (400, "BAD REQUEST");
    Unauthorized = (401, "UNAUTHORIZED");
    Forbidden = (403, "FORBIDDEN");
    NotFound = (404, "NOT FOUND");
    MethodNotAllowed = (405, "METHOD NOT ALLOWED");
    PayloadTooLarge = (413, "PAYLOAD TOO LARGE");
    TooManyRequests = (429, "TOO MANY REQUESTS");

    InternalServerError = (500, "INTERNAL SERVER ERROR");
    NotImplemented = (501, "NOT IMPLEMENTED");
    ServiceUnavailable = (503, "SERVICE UNAVAILABLE");
}

// STATUS LINE

/// The pattern a response's first line must match.
pub(crate) const STATUS_LINE_PATTERN: &str = r"^HTTP/(1.1|1.0) (\d{3}) (.*)$";

/// A parsed response status line, e.g. `HTTP/1.1 200 OK`.
///
/// Used symmetrically: the connection handler writes these, and test
/// clients built on this crate parse them back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    status: StatusCode,
    version: HttpVersion,
    raw_value: String,
}

impl StatusLine {
    /// Parses a status line, failing on anything that does not match
    /// [`STATUS_LINE_PATTERN`].
    ///
    /// A malformed line here is a broken peer, not tolerable input: the
    /// error message echoes the offending line and the expected pattern.
    pub fn extract_status_line(line: &str) -> Result<Self, ErrorKind> {
        let mismatch = || ErrorKind::InvalidStatusLine(line.to_string());

        let mut parts = line.splitn(3, ' ');
        let version_text = parts.next().ok_or_else(mismatch)?;
        let code_text = parts.next().ok_or_else(mismatch)?;
        let _reason = parts.next().ok_or_else(mismatch)?;

        let version = HttpVersion::parse(version_text).ok_or_else(mismatch)?;

        if code_text.len() != 3 || !code_text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(mismatch());
        }
        let code: u16 = code_text.parse().map_err(|_| mismatch())?;
        let status = StatusCode::from_code(code)?;

        Ok(StatusLine {
            status,
            version,
            raw_value: line.to_string(),
        })
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn version(&self) -> HttpVersion {
        self.version
    }

    /// The line exactly as it appeared on the wire.
    pub fn raw_value(&self) -> &str {
        &self.raw_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_happy_path() {
        let sl = StatusLine::extract_status_line("HTTP/1.1 200 OK").unwrap();

        assert_eq!(sl.status(), StatusCode::Ok);
        assert_eq!(sl.version(), HttpVersion::OneDotOne);
        assert_eq!(sl.raw_value(), "HTTP/1.1 200 OK");
    }

    #[test]
    fn status_line_one_dot_zero() {
        let sl = StatusLine::extract_status_line("HTTP/1.0 404 NOT FOUND").unwrap();

        assert_eq!(sl.status(), StatusCode::NotFound);
        assert_eq!(sl.version(), HttpVersion::OneDotZero);
    }

    #[test]
    fn status_line_mismatches() {
        #[rustfmt::skip]
        let cases = [
            "HTTP/1.1 200",     // missing status description
            "HTTP/1.1  OK",     // missing status code
            "HTTP 200 OK",      // missing http version
            "HTTP/1.3 200 OK",  // invalid http version
            "HTTP/1.1 20 OK",   // status code too short
            "HTTP/1.1 2000 OK", // status code too long
            "",
        ];

        for line in cases {
            let result = StatusLine::extract_status_line(line);
            assert_eq!(
                result,
                Err(ErrorKind::InvalidStatusLine(line.to_string())),
                "line was {:?}",
                line
            );
            assert_eq!(
                result.unwrap_err().to_string(),
                format!(
                    "{} must match the statusLinePattern: ^HTTP/(1.1|1.0) (\\d{{3}}) (.*)$",
                    line
                )
            );
        }
    }

    #[test]
    fn status_line_unknown_code() {
        let result = StatusLine::extract_status_line("HTTP/1.1 199 OK");

        assert_eq!(result, Err(ErrorKind::NoSuchStatusCode(199)));
        assert_eq!(result.unwrap_err().to_string(), "No value present");
    }

    #[test]
    fn status_code_round_trip() {
        #[rustfmt::skip]
        let cases = [
            (200, StatusCode::Ok,             "OK"),
            (303, StatusCode::SeeOther,       "SEE OTHER"),
            (400, StatusCode::BadRequest,     "BAD REQUEST"),
            (404, StatusCode::NotFound,       "NOT FOUND"),
            (413, StatusCode::PayloadTooLarge,"PAYLOAD TOO LARGE"),
        ];

        for (num, expected, reason) in cases {
            let status = StatusCode::from_code(num).unwrap();
            assert_eq!(status, expected);
            assert_eq!(status.code(), num);
            assert_eq!(status.reason(), reason);
        }
    }

    #[test]
    fn verb_parse() {
        #[rustfmt::skip]
        let cases = [
            ("GET",     Some(Verb::Get)),
            ("POST",    Some(Verb::Post)),
            ("PUT",     Some(Verb::Put)),
            ("DELETE",  Some(Verb::Delete)),
            ("PATCH",   Some(Verb::Patch)),
            ("HEAD",    Some(Verb::Head)),
            ("OPTIONS", Some(Verb::Options)),
            ("TRACE",   Some(Verb::Trace)),

            ("get",     None),
            ("CONNECT", None),
            ("",        None),
        ];

        for (text, expected) in cases {
            assert_eq!(Verb::parse(text), expected);
        }
    }
}
