//! Server configuration and request parsing limits
//!
//! Default limits are intentionally conservative: the parsers refuse
//! oversized lines, header blocks and bodies before buffering them, so a
//! hostile client cannot make a connection allocate without bound.
//!
//! # Examples
//!
//! ```
//! use minum::limits::{ReqLimits, ServerConfig};
//! use std::time::Duration;
//!
//! let config = ServerConfig {
//!     hostname: "example.com".to_string(),
//!     keep_alive_timeout: Duration::from_secs(5),
//!     limits: ReqLimits {
//!         max_body_bytes: 16 * 1024,
//!         ..ReqLimits::default()
//!     },
//!     ..ServerConfig::default()
//! };
//! assert_eq!(config.limits.max_headers, 70);
//! ```

use std::time::Duration;

/// Server-level configuration: listening ports, identity, and concurrency.
///
/// Loading this from an external source (a properties file, environment,
/// flags) is the embedding application's concern; this struct is the
/// in-process surface the server and the parsers read.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port for the plain, non-TLS listener (default: `0`, an ephemeral port).
    ///
    /// The ephemeral default suits tests, where many servers bind and close
    /// in quick succession.  Production deployments set a fixed port.
    pub nonssl_server_port: u16,

    /// Port the TLS front-end listens on (default: `8443`).
    ///
    /// TLS itself is terminated elsewhere; this port only feeds the
    /// `location:` header of the HTTP-to-HTTPS redirect handler.
    pub ssl_server_port: u16,

    /// The name this host goes by when building self-referencing URLs
    /// (default: `localhost`).
    pub hostname: String,

    /// Idle time allowed between requests on a kept-alive connection
    /// (default: `3 seconds`).
    ///
    /// Advertised to clients as `keep-alive: timeout=N`.  A connection that
    /// stays silent past this deadline is closed.
    pub keep_alive_timeout: Duration,

    /// Number of worker tasks pulling accepted sockets off the shared queue
    /// (default: `100`).
    ///
    /// Workers are spawned once at startup and reused for the lifetime of
    /// the server.
    pub worker_count: usize,

    /// Request parsing limits, shared by every connection.
    pub limits: ReqLimits,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            nonssl_server_port: 0,
            ssl_server_port: 8443,
            hostname: "localhost".to_string(),
            keep_alive_timeout: Duration::from_secs(3),
            worker_count: 100,
            limits: ReqLimits::default(),
        }
    }
}

/// Hard caps applied while parsing a request.
///
/// Exceeding any of these is a client fault: the connection gets a
/// `400`-class response (a `413` for the body cap) and is closed.
#[derive(Debug, Clone)]
pub struct ReqLimits {
    /// Maximum number of `key=value` pairs in a query string (default: `50`).
    pub max_query_string_keys: usize,

    /// Maximum number of header lines per request (default: `70`).
    ///
    /// Typical browsers send 10-12 headers; 70 leaves room for proxies and
    /// instrumentation while still bounding header floods.
    pub max_headers: usize,

    /// Maximum total bytes across all header lines (default: `16 KB`).
    pub max_header_bytes: usize,

    /// Maximum length of a single line on the wire (default: `1024 B`).
    ///
    /// Applies to start lines, header lines and chunk-size lines alike.
    pub max_line_bytes: usize,

    /// Maximum request body size in bytes (default: `10 MB`).
    ///
    /// Enforced against the declared `content-length` before the body is
    /// read, and against the running total while decoding a chunked body.
    pub max_body_bytes: usize,

    /// Maximum time a single socket read may wait for data (default:
    /// `3 seconds`, matching the `keep-alive: timeout=3` advertisement).
    ///
    /// The deadline restarts on every read that makes progress, so a slow
    /// but steady transfer is fine; a peer that goes quiet gets its
    /// connection closed.
    pub socket_read_timeout: Duration,
}

impl Default for ReqLimits {
    fn default() -> Self {
        Self {
            max_query_string_keys: 50,
            max_headers: 70,
            max_header_bytes: 16 * 1024,
            max_line_bytes: 1024,
            max_body_bytes: 10 * 1024 * 1024,
            socket_read_timeout: Duration::from_secs(3),
        }
    }
}
