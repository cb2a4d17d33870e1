//! Request and response headers.

use crate::{errors::ErrorKind, limits::ReqLimits, stream};
use std::collections::HashMap;
use tokio::io::AsyncBufRead;

/// The headers of a request, a response, or a multipart partition.
///
/// Keeps the raw lines in arrival order next to a case-insensitive index of
/// `lowercased name -> values`.  Duplicate names are preserved, in order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Headers {
    header_strings: Vec<String>,
    headers_map: HashMap<String, Vec<String>>,
}

impl Headers {
    /// Builds headers from raw lines like `Content-Type: text/html`.
    ///
    /// Each line splits at its first `:`; the name is lowercased, the value
    /// trimmed of surrounding whitespace.  A line without a colon, or with
    /// an empty name, is improperly formatted.
    pub fn new(header_strings: Vec<String>) -> Result<Self, ErrorKind> {
        let mut headers_map: HashMap<String, Vec<String>> = HashMap::new();

        for line in &header_strings {
            let Some((name, value)) = line.split_once(':') else {
                return Err(ErrorKind::InvalidHeader(line.clone()));
            };

            let name = name.trim().to_lowercase();
            if name.is_empty() {
                return Err(ErrorKind::InvalidHeader(line.clone()));
            }

            headers_map
                .entry(name)
                .or_default()
                .push(value.trim().to_string());
        }

        Ok(Self {
            header_strings,
            headers_map,
        })
    }

    /// Reads header lines from the stream up to the first empty line.
    ///
    /// Enforces both header caps: the number of lines (`max_headers`) and
    /// their total size (`max_header_bytes`).
    pub(crate) async fn extract_header_information<R>(
        reader: &mut R,
        limits: &ReqLimits,
    ) -> Result<Self, ErrorKind>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines: Vec<String> = Vec::new();
        let mut total_bytes = 0;

        loop {
            let Some(line) = stream::read_line(reader, limits).await? else {
                break;
            };
            if line.is_empty() {
                break;
            }

            total_bytes += line.len();
            if total_bytes > limits.max_header_bytes {
                return Err(ErrorKind::HeadersTooLarge(limits.max_header_bytes));
            }

            lines.push(line);
            if lines.len() > limits.max_headers {
                return Err(ErrorKind::TooManyHeaders(limits.max_headers));
            }
        }

        Self::new(lines)
    }

    /// The raw header lines, in arrival order.
    pub fn header_strings(&self) -> &[String] {
        &self.header_strings
    }

    /// All values recorded for `name`, case-insensitively.
    ///
    /// Returns `None` when the header is absent - deliberately not an empty
    /// list, so "absent" and "present but empty" stay distinguishable.
    pub fn value_by_key(&self, name: &str) -> Option<&[String]> {
        self.headers_map
            .get(&name.to_lowercase())
            .map(Vec::as_slice)
    }

    /// The value of the last `content-length` header, or 0 when absent.
    pub fn content_length(&self) -> Result<usize, ErrorKind> {
        let Some(values) = self.value_by_key("content-length") else {
            return Ok(0);
        };
        let Some(last) = values.last() else {
            return Ok(0);
        };

        last.parse::<i64>()
            .ok()
            .filter(|length| *length >= 0)
            .map(|length| length as usize)
            .ok_or_else(|| ErrorKind::InvalidContentLength(last.clone()))
    }

    /// The first `content-type` value, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.value_by_key("content-type")
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Whether any `transfer-encoding` value lists `chunked`.
    pub fn has_chunked_transfer_encoding(&self) -> bool {
        self.value_by_key("transfer-encoding")
            .into_iter()
            .flatten()
            .flat_map(|value| value.split(','))
            .any(|encoding| encoding.trim().eq_ignore_ascii_case("chunked"))
    }
}
