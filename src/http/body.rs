//! Request body decoding: url-encoded forms, multipart, chunked.

use crate::{errors::ErrorKind, http::headers::Headers, limits::ReqLimits, stream};
use memchr::memmem;
use std::collections::HashMap;
use tokio::io::AsyncBufRead;

/// The decoded body of a request.
///
/// `parts` maps a name to its bytes - one entry per form field or multipart
/// partition.  Multipart partitions also record their own headers under the
/// same name.  `raw` always holds the body as it arrived.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Body {
    body_map: HashMap<String, Vec<u8>>,
    partition_headers: HashMap<String, Headers>,
    raw: Vec<u8>,
}

impl Body {
    pub fn new(
        body_map: HashMap<String, Vec<u8>>,
        partition_headers: HashMap<String, Headers>,
        raw: Vec<u8>,
    ) -> Self {
        Self {
            body_map,
            partition_headers,
            raw,
        }
    }

    /// The distinguished empty body.
    pub fn empty() -> Self {
        Self::default()
    }

    fn raw_only(raw: Vec<u8>) -> Self {
        Self {
            raw,
            ..Self::default()
        }
    }

    /// The named part decoded as UTF-8, or the empty string when absent.
    pub fn as_string(&self, name: &str) -> String {
        self.body_map
            .get(name)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default()
    }

    /// The named part's bytes, untouched.
    pub fn as_bytes(&self, name: &str) -> Option<&[u8]> {
        self.body_map.get(name).map(Vec::as_slice)
    }

    /// The headers of the named multipart partition.
    pub fn partition_headers(&self, name: &str) -> Option<&Headers> {
        self.partition_headers.get(name)
    }

    /// The body exactly as it arrived on the wire.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
}

/// Decodes request bodies according to their framing and content type.
pub struct BodyProcessor {
    limits: ReqLimits,
}

impl BodyProcessor {
    pub fn new(limits: ReqLimits) -> Self {
        Self { limits }
    }

    /// Reads and decodes the body the headers describe.
    ///
    /// `transfer-encoding: chunked` wins over any content type; otherwise
    /// `content-length` bytes are read and routed by content type.  Bodies
    /// that are neither a form nor multipart are kept raw.
    pub async fn extract_data<R>(
        &self,
        reader: &mut R,
        headers: &Headers,
    ) -> Result<Body, ErrorKind>
    where
        R: AsyncBufRead + Unpin,
    {
        if headers.has_chunked_transfer_encoding() {
            let raw = stream::read_chunked_encoding(reader, &self.limits).await?;
            return Ok(Body::raw_only(raw));
        }

        let length = headers.content_length()?;
        if length == 0 {
            return Ok(Body::empty());
        }
        let raw = stream::read(reader, length, &self.limits).await?;

        match headers.content_type() {
            Some(content_type) if content_type.contains("application/x-www-form-urlencoded") => {
                self.parse_url_encoded_form(&String::from_utf8_lossy(&raw))
            }
            Some(content_type) if content_type.contains("multipart/form-data") => {
                match extract_boundary(content_type) {
                    Some(boundary) => self.parse_multiform(&raw, boundary),
                    None => Ok(Body::raw_only(raw)),
                }
            }
            _ => Ok(Body::raw_only(raw)),
        }
    }

    /// Parses an `application/x-www-form-urlencoded` body, e.g. `a=1&b=2`.
    ///
    /// Keys and values are percent-decoded.  A blank key, a duplicated key,
    /// and a token without `=` are all parse failures; a value of the
    /// literal `%NULL%` normalizes to the empty string.
    pub fn parse_url_encoded_form(&self, input: &str) -> Result<Body, ErrorKind> {
        let mut tokens: Vec<&str> = input.split('&').collect();
        while tokens.last() == Some(&"") {
            tokens.pop();
        }

        let mut body_map: HashMap<String, Vec<u8>> = HashMap::new();

        for token in tokens {
            let Some((raw_key, raw_value)) = token.split_once('=') else {
                return Err(ErrorKind::InvalidFormToken(token.to_string()));
            };
            if raw_key.is_empty() {
                return Err(ErrorKind::BlankKey);
            }

            let key = percent_decode(raw_key);
            let value = match raw_value {
                "%NULL%" => String::new(),
                other => percent_decode(other),
            };

            if let Some(first) = body_map.get(&key) {
                return Err(ErrorKind::DuplicateKey {
                    key,
                    first: String::from_utf8_lossy(first).into_owned(),
                    second: value,
                });
            }
            body_map.insert(key, value.into_bytes());
        }

        Ok(Body::new(body_map, HashMap::new(), input.as_bytes().to_vec()))
    }

    /// Splits a multipart body at every occurrence of `separator`.
    ///
    /// A pure byte-level scan: each returned segment runs from just past a
    /// separator (and its trailing line break) to the start of the next
    /// one.  The preamble before the first separator and the epilogue after
    /// the terminal one are discarded.  Correct for arbitrary binary
    /// content, including bytes that look like a separator prefix.
    pub fn split(&self, body: &[u8], separator: &str) -> Vec<Vec<u8>> {
        let positions: Vec<usize> = memmem::find_iter(body, separator.as_bytes()).collect();

        positions
            .windows(2)
            .filter_map(|pair| {
                let mut start = pair[0] + separator.len();
                if body[start..].starts_with(b"\r\n") {
                    start += 2;
                } else if body[start..].starts_with(b"\n") {
                    start += 1;
                }

                (start <= pair[1]).then(|| body[start..pair[1]].to_vec())
            })
            .collect()
    }

    /// Parses a `multipart/form-data` body against its boundary token.
    ///
    /// The wire separator is `--<boundary>`.  Each partition carries its
    /// own headers up to a blank line, then its payload.  Partitions
    /// without a `content-disposition` name are skipped.
    pub fn parse_multiform(&self, body: &[u8], boundary: &str) -> Result<Body, ErrorKind> {
        let separator = format!("--{}", boundary);

        let mut body_map: HashMap<String, Vec<u8>> = HashMap::new();
        let mut partition_headers: HashMap<String, Headers> = HashMap::new();

        for partition in self.split(body, &separator) {
            let Some((headers, payload)) = parse_partition(&partition)? else {
                continue;
            };

            let Some(name) = partition_name(&headers) else {
                continue;
            };

            body_map.insert(name.clone(), payload);
            partition_headers.insert(name, headers);
        }

        Ok(Body::new(body_map, partition_headers, body.to_vec()))
    }
}

/// Splits one partition into its headers and payload.
///
/// Returns `None` for a partition with no header/payload divider at all.
fn parse_partition(partition: &[u8]) -> Result<Option<(Headers, Vec<u8>)>, ErrorKind> {
    let (divider, divider_len) = match memmem::find(partition, b"\r\n\r\n") {
        Some(pos) => (pos, 4),
        None => match memmem::find(partition, b"\n\n") {
            Some(pos) => (pos, 2),
            None => return Ok(None),
        },
    };

    let header_text = String::from_utf8_lossy(&partition[..divider]);
    let headers = Headers::new(header_text.lines().map(str::to_string).collect())?;

    let mut payload = &partition[divider + divider_len..];
    // The line break framing the next separator belongs to the wire, not
    // the payload.
    if payload.ends_with(b"\r\n") {
        payload = &payload[..payload.len() - 2];
    } else if payload.ends_with(b"\n") {
        payload = &payload[..payload.len() - 1];
    }

    Ok(Some((headers, payload.to_vec())))
}

/// Pulls `name="..."` out of a partition's `content-disposition` header.
fn partition_name(headers: &Headers) -> Option<String> {
    let disposition = headers
        .value_by_key("content-disposition")?
        .first()?
        .as_str();

    let start = disposition.find("name=\"")? + "name=\"".len();
    let end = disposition[start..].find('"')? + start;
    Some(disposition[start..end].to_string())
}

/// Pulls the boundary token out of a `content-type` header value.
fn extract_boundary(content_type: &str) -> Option<&str> {
    let start = content_type.find("boundary=")? + "boundary=".len();
    let token = content_type[start..]
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .trim_matches('"');

    (!token.is_empty()).then_some(token)
}

/// Decodes `%XX` escapes and `+` as space, UTF-8 at the end.
///
/// Malformed escapes pass through untouched rather than failing the whole
/// form.
fn percent_decode(input: &str) -> String {
    let src = input.as_bytes();
    let mut decoded: Vec<u8> = Vec::with_capacity(src.len());

    let mut index = 0;
    while index < src.len() {
        match src[index] {
            b'%' => match src.get(index + 1..index + 3).and_then(hex_pair) {
                Some(byte) => {
                    decoded.push(byte);
                    index += 3;
                    continue;
                }
                None => decoded.push(b'%'),
            },
            b'+' => decoded.push(b' '),
            byte => decoded.push(byte),
        }
        index += 1;
    }

    String::from_utf8_lossy(&decoded).into_owned()
}

fn hex_pair(pair: &[u8]) -> Option<u8> {
    let high = (pair[0] as char).to_digit(16)?;
    let low = (pair[1] as char).to_digit(16)?;
    Some((high * 16 + low) as u8)
}
