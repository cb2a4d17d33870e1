//! minum - A minimalist HTTP/1.x server framework
//!
//! The wire-level protocol engine plus the routing and body-decoding layer
//! around it: an HTTP/1.0 and HTTP/1.1 request parser tolerant of malformed
//! input, decoders for url-encoded forms, binary-safe `multipart/form-data`
//! and `transfer-encoding: chunked`, a router with exact and longest-prefix
//! registration, and a keep-alive-aware connection loop.
//!
//! # Protocol Support
//!
//! - **HTTP/1.1**: persistent connections by default, chunked request bodies
//! - **HTTP/1.0**: keep-alive by explicit opt-in
//!
//! # Quick Start
//!
//! ```no_run
//! use minum::{Response, Server, ServerConfig, Verb, WebFramework};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut wf = WebFramework::new(ServerConfig::default());
//!     wf.register_path(Verb::Get, "hello", |_| Response::html_ok("Hello World!"));
//!
//!     let server = Server::builder()
//!         .handler(wf.make_primary_http_handler())
//!         .start()
//!         .await
//!         .unwrap();
//!
//!     println!("listening on {}:{}", server.host(), server.port());
//!     // ... later:
//!     server.close().await;
//! }
//! ```
//!
//! # Design
//!
//! - Parsing is lenient where the router can answer with a clean `404` (a
//!   garbage start line becomes the empty sentinel), and strict where limits
//!   protect the process (header counts, line lengths, body sizes).
//! - Handlers are pure functions from [`Request`] to [`Response`]; the
//!   richer [`HandlerFinder`] shape sees the start line first and picks the
//!   function to run.
//! - The server accepts any [`SocketHandler`], so tests can inject raw
//!   socket handlers and the HTTP-to-HTTPS [`redirect
//!   handler`](WebFramework::make_redirect_handler) reuses the same plumbing.

pub(crate) mod http {
    pub(crate) mod body;
    pub(crate) mod headers;
    pub(crate) mod request;
    pub(crate) mod response;
    pub(crate) mod start_line;
    pub(crate) mod types;
}
pub(crate) mod server {
    pub(crate) mod connection;
    pub(crate) mod framework;
    pub(crate) mod server_impl;
}
pub(crate) mod errors;
pub mod limits;
pub(crate) mod stream;

pub use crate::{
    errors::{ErrorKind, IoError},
    http::{
        body::{Body, BodyProcessor},
        headers::Headers,
        request::Request,
        response::Response,
        start_line::{extract_map_from_query_string, PathDetails, StartLine},
        types::{HttpVersion, StatusCode, StatusLine, Verb},
    },
    limits::{ReqLimits, ServerConfig},
    server::{
        connection::{is_there_a_body, HttpHandler, RedirectHandler},
        framework::{HandlerFinder, RequestHandler, WebFramework},
        server_impl::{Server, ServerBuilder, SocketHandler},
    },
};
