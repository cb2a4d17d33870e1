//! The first line of a request, e.g. `GET /path?a=b HTTP/1.1`.

use crate::{
    errors::ErrorKind,
    http::types::{HttpVersion, Verb},
    limits::ReqLimits,
};
use std::{
    collections::HashMap,
    hash::{Hash, Hasher},
};

/// The path portion of a start line, broken into its useful views.
///
/// `isolated_path` never begins with `/` - the leading slash is stripped
/// during parsing, so `GET / HTTP/1.1` yields an empty isolated path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathDetails {
    isolated_path: String,
    raw_query_string: String,
    query_string: HashMap<String, String>,
}

impl PathDetails {
    pub fn new(
        isolated_path: impl Into<String>,
        raw_query_string: impl Into<String>,
        query_string: HashMap<String, String>,
    ) -> Self {
        Self {
            isolated_path: isolated_path.into(),
            raw_query_string: raw_query_string.into(),
            query_string,
        }
    }

    /// The path with its leading slash removed, e.g. `api/users`.
    pub fn isolated_path(&self) -> &str {
        &self.isolated_path
    }

    /// The query string as it appeared on the wire, without the `?`.
    pub fn raw_query_string(&self) -> &str {
        &self.raw_query_string
    }

    /// The query string split into key-value pairs.
    pub fn query_string(&self) -> &HashMap<String, String> {
        &self.query_string
    }
}

// The pair map is derived from the raw query string, so hashing the raw
// text keeps Hash consistent with the derived PartialEq.
impl Hash for PathDetails {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.isolated_path.hash(state);
        self.raw_query_string.hash(state);
    }
}

/// A parsed request start line.
///
/// Identity is structural over `(verb, path_details, version)` - the raw
/// text is excluded - so start lines can key a map and the empty sentinel
/// compares equal no matter where it was constructed.
#[derive(Debug, Clone, Eq)]
pub struct StartLine {
    verb: Verb,
    path_details: PathDetails,
    version: HttpVersion,
    raw_value: String,
}

impl PartialEq for StartLine {
    fn eq(&self, other: &Self) -> bool {
        self.verb == other.verb
            && self.path_details == other.path_details
            && self.version == other.version
    }
}

impl Hash for StartLine {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.verb.hash(state);
        self.path_details.hash(state);
        self.version.hash(state);
    }
}

impl StartLine {
    pub fn new(
        verb: Verb,
        path_details: PathDetails,
        version: HttpVersion,
        raw_value: impl Into<String>,
    ) -> Self {
        Self {
            verb,
            path_details,
            version,
            raw_value: raw_value.into(),
        }
    }

    /// The distinguished empty start line: the parse-failure sentinel, and
    /// a placeholder where one is genuinely needed.
    pub fn empty() -> Self {
        Self {
            verb: Verb::None,
            path_details: PathDetails::default(),
            version: HttpVersion::None,
            raw_value: String::new(),
        }
    }

    /// Parses a start line, leniently.
    ///
    /// Anything that does not match
    /// `^(GET|POST|...) /([^ ]*) HTTP/(1.1|1.0)$` - a missing verb, a
    /// missing path, a bad version, an empty string - yields the empty
    /// sentinel rather than an error, so garbage input flows through to a
    /// clean `404`.  The one hard failure is a query string with more pairs
    /// than `max_query_string_keys`.
    pub fn extract_start_line(line: &str, limits: &ReqLimits) -> Result<Self, ErrorKind> {
        let parts: Vec<&str> = line.split(' ').collect();
        let [verb_text, target, version_text] = parts.as_slice() else {
            return Ok(Self::empty());
        };

        let Some(verb) = Verb::parse(verb_text) else {
            return Ok(Self::empty());
        };
        let Some(version) = HttpVersion::parse(version_text) else {
            return Ok(Self::empty());
        };
        let Some(target) = target.strip_prefix('/') else {
            return Ok(Self::empty());
        };

        let (isolated_path, raw_query_string) = match target.split_once('?') {
            Some((path, query)) => (path, query),
            None => (target, ""),
        };
        let query_string = extract_map_from_query_string(raw_query_string, limits)?;

        Ok(Self {
            verb,
            path_details: PathDetails::new(isolated_path, raw_query_string, query_string),
            version,
            raw_value: line.to_string(),
        })
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    pub fn path_details(&self) -> &PathDetails {
        &self.path_details
    }

    /// Shorthand for the query-string pairs.
    pub fn query_string(&self) -> &HashMap<String, String> {
        self.path_details.query_string()
    }

    pub fn version(&self) -> HttpVersion {
        self.version
    }

    /// The line exactly as it appeared on the wire.  Empty for the sentinel.
    pub fn raw_value(&self) -> &str {
        &self.raw_value
    }
}

/// Splits a query string into pairs by `&`, then each token at its first `=`.
///
/// Tokens without an `=` are silently dropped; an input of nothing but such
/// tokens yields an empty map.  Repeated keys keep the last value.  More
/// pairs than `max_query_string_keys` is a forbidden use and fails hard.
pub fn extract_map_from_query_string(
    query: &str,
    limits: &ReqLimits,
) -> Result<HashMap<String, String>, ErrorKind> {
    let mut pairs = HashMap::new();

    for token in query.split('&') {
        let Some((key, value)) = token.split_once('=') else {
            continue;
        };

        pairs.insert(key.to_string(), value.to_string());
        if pairs.len() > limits.max_query_string_keys {
            return Err(ErrorKind::TooManyQueryKeys(limits.max_query_string_keys));
        }
    }

    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> ReqLimits {
        ReqLimits::default()
    }

    fn extract(line: &str) -> StartLine {
        StartLine::extract_start_line(line, &limits()).unwrap()
    }

    #[test]
    fn happy_path() {
        let sl = extract("GET /index.html HTTP/1.1");

        assert_eq!(sl.verb(), Verb::Get);
        assert_eq!(sl.path_details().isolated_path(), "index.html");
        assert_eq!(sl.version(), HttpVersion::OneDotOne);
        assert_eq!(sl.raw_value(), "GET /index.html HTTP/1.1");
    }

    #[test]
    fn post_one_dot_zero() {
        let sl = extract("POST /something HTTP/1.0");

        assert_eq!(sl.verb(), Verb::Post);
        assert_eq!(sl.version(), HttpVersion::OneDotZero);
    }

    #[test]
    fn empty_path() {
        let sl = extract("GET / HTTP/1.1");

        assert_eq!(sl.verb(), Verb::Get);
        assert_eq!(sl.path_details().isolated_path(), "");
    }

    #[test]
    fn malformed_yields_the_empty_sentinel() {
        #[rustfmt::skip]
        let cases = [
            "/something HTTP/1.1",    // missing verb
            "GET HTTP/1.1",           // missing path
            "GET /something",         // missing version
            "GET /something HTTP/1.2",
            "GET /something HTTP/",
            "GET index.html HTTP/1.1",
            "get / HTTP/1.1",
            "GET / HTTP/1.1 ",
            "",
        ];

        for line in cases {
            assert_eq!(extract(line), StartLine::empty(), "line was {:?}", line);
        }
    }

    #[test]
    fn empty_sentinel_is_a_fixed_point() {
        let sentinel = StartLine::empty();
        assert_eq!(extract(sentinel.raw_value()), sentinel);
    }

    #[test]
    fn query_string_pairs() {
        let sl = extract("GET /add_two_numbers?a=42&b=44 HTTP/1.1");

        assert_eq!(sl.path_details().isolated_path(), "add_two_numbers");
        assert_eq!(sl.path_details().raw_query_string(), "a=42&b=44");
        assert_eq!(sl.query_string().get("a").map(String::as_str), Some("42"));
        assert_eq!(sl.query_string().get("b").map(String::as_str), Some("44"));
    }

    #[test]
    fn query_string_without_equals_is_dropped() {
        let result = extract_map_from_query_string("foo", &limits()).unwrap();
        assert_eq!(result, HashMap::new());
    }

    #[test]
    fn query_string_too_many_pairs() {
        let mut query = String::new();
        for i in 0..limits().max_query_string_keys + 2 {
            query.push_str(&format!("foo{}=bar{}&", i, i));
        }

        assert_eq!(
            extract_map_from_query_string(&query, &limits()),
            Err(ErrorKind::TooManyQueryKeys(limits().max_query_string_keys))
        );
    }

    #[test]
    fn start_lines_key_a_map() {
        let entry = |path: &str| {
            StartLine::new(
                Verb::Get,
                PathDetails::new(path, "", HashMap::new()),
                HttpVersion::OneDotOne,
                "",
            )
        };

        let mut table = HashMap::new();
        table.insert(entry("foo"), "foo");
        table.insert(entry("bar"), "bar");
        table.insert(entry("baz"), "baz");

        assert_eq!(table.get(&entry("bar")), Some(&"bar"));
    }

    #[test]
    fn identity_ignores_the_raw_value() {
        let a = StartLine::new(
            Verb::Get,
            PathDetails::new("foo", "", HashMap::new()),
            HttpVersion::OneDotOne,
            "GET /foo HTTP/1.1",
        );
        let b = StartLine::new(
            Verb::Get,
            PathDetails::new("foo", "", HashMap::new()),
            HttpVersion::OneDotOne,
            "",
        );

        assert_eq!(a, b);
    }
}
