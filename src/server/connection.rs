//! Per-connection request handling.
//!
//! [`HttpHandler`] owns the socket loop: read a start line, read headers,
//! decide whether a body follows, decode it, route, serialize the answer,
//! and either go around again (keep-alive) or close.  [`RedirectHandler`]
//! is the single-shot sibling that bounces plain-HTTP traffic to the HTTPS
//! endpoint.

use crate::{
    errors::ErrorKind,
    http::{
        body::{Body, BodyProcessor},
        headers::Headers,
        request::Request,
        response::Response,
        start_line::StartLine,
    },
    limits::ServerConfig,
    server::framework::HandlerFinder,
    server::server_impl::SocketHandler,
    HttpVersion, StatusCode,
};
use std::time::{Duration, SystemTime};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufStream};
use tracing::{debug, warn};

/// The composed HTTP handler: wire protocol on one side, registered
/// endpoints on the other.
pub struct HttpHandler {
    config: ServerConfig,
    clock: Option<SystemTime>,
    finder: HandlerFinder,
    body_processor: BodyProcessor,
}

impl HttpHandler {
    pub(crate) fn new(
        config: ServerConfig,
        clock: Option<SystemTime>,
        finder: HandlerFinder,
    ) -> Self {
        let body_processor = BodyProcessor::new(config.limits.clone());
        Self {
            config,
            clock,
            finder,
            body_processor,
        }
    }

    async fn run_requests<S>(
        &self,
        stream: &mut BufStream<S>,
        remote_requester: &str,
    ) -> Result<(), ErrorKind>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        loop {
            // Every read below carries the idle timeout, so the wait for
            // the next request and a stalled client are both bounded.
            let Some(line) = crate::stream::read_line(stream, &self.config.limits).await? else {
                return Ok(());
            };

            let start_line = StartLine::extract_start_line(&line, &self.config.limits)?;
            let headers =
                Headers::extract_header_information(stream, &self.config.limits).await?;

            let body = match is_there_a_body(&headers)? {
                true => self.body_processor.extract_data(stream, &headers).await?,
                false => Body::empty(),
            };

            let keep_alive = should_keep_alive(start_line.version(), &headers);

            let request = Request::new(headers, start_line.clone(), body, remote_requester);
            let response = match (self.finder)(&start_line) {
                Some(endpoint) => endpoint(request),
                None => Response::new(StatusCode::NotFound),
            };

            let date = self.clock.unwrap_or_else(SystemTime::now);
            let serialized = serialize_response(
                &response,
                keep_alive,
                self.config.keep_alive_timeout,
                date,
            );
            stream.write_all(&serialized).await?;
            stream.flush().await?;

            if !keep_alive {
                return Ok(());
            }
        }
    }
}

impl SocketHandler for HttpHandler {
    async fn handle<S>(&self, stream: S, remote_requester: String) -> Result<(), ErrorKind>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let mut stream = BufStream::new(stream);

        match self.run_requests(&mut stream, &remote_requester).await {
            Ok(()) => Ok(()),
            Err(ErrorKind::Io(err)) => {
                debug!(remote = %remote_requester, error = %err.0, "i/o failure, closing");
                Ok(())
            }
            Err(err) => match err.status_code() {
                Some(status) => {
                    debug!(remote = %remote_requester, error = %err, "bad request");
                    send_error(&mut stream, status).await
                }
                None => {
                    warn!(remote = %remote_requester, error = %err, "closing connection");
                    Err(err)
                }
            },
        }
    }
}

async fn send_error<S>(stream: &mut BufStream<S>, status: StatusCode) -> Result<(), ErrorKind>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let response = format!(
        "HTTP/1.1 {} {}\r\nconnection: close\r\ncontent-length: 0\r\n\r\n",
        status.code(),
        status.reason()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.flush().await?;
    Ok(())
}

/// Whether the headers declare a body.
///
/// True iff `transfer-encoding` lists `chunked`, or a `content-type` is
/// present alongside a positive `content-length`.  A content type with an
/// unknown transfer encoding and no usable length is *not* a body.
pub fn is_there_a_body(headers: &Headers) -> Result<bool, ErrorKind> {
    if headers.has_chunked_transfer_encoding() {
        return Ok(true);
    }

    Ok(headers.content_type().is_some() && headers.content_length()? > 0)
}

/// The keep-alive decision: opt-out for HTTP/1.1, opt-in for HTTP/1.0.
fn should_keep_alive(version: HttpVersion, headers: &Headers) -> bool {
    let connection_says = |wanted: &str| {
        headers
            .value_by_key("connection")
            .into_iter()
            .flatten()
            .any(|value| value.eq_ignore_ascii_case(wanted))
    };

    match version {
        HttpVersion::OneDotOne => !connection_says("close"),
        HttpVersion::OneDotZero => connection_says("keep-alive"),
        HttpVersion::None => false,
    }
}

/// Serializes a response: status line, standing headers, body.
///
/// When the connection stays alive the timeout is advertised as
/// `keep-alive: timeout=N`; when it closes, no keep-alive headers appear at
/// all.
pub(crate) fn serialize_response(
    response: &Response,
    keep_alive: bool,
    keep_alive_timeout: Duration,
    date: SystemTime,
) -> Vec<u8> {
    let status = response.status_code();

    let mut header_block = format!(
        "HTTP/1.1 {} {}\r\ndate: {}\r\nserver: minum\r\n",
        status.code(),
        status.reason(),
        httpdate::fmt_http_date(date),
    );
    for (name, value) in response.extra_headers() {
        header_block.push_str(&format!("{}: {}\r\n", name, value));
    }
    header_block.push_str(&format!("content-length: {}\r\n", response.body().len()));
    if keep_alive {
        header_block.push_str(&format!(
            "keep-alive: timeout={}\r\n",
            keep_alive_timeout.as_secs()
        ));
    }
    header_block.push_str("\r\n");

    let mut serialized = header_block.into_bytes();
    serialized.extend_from_slice(response.body());
    serialized
}

/// Answers one connection with a `303 SEE OTHER` pointing at the HTTPS
/// host, then closes.
///
/// Clients sometimes connect and hang up without sending anything; an
/// empty or absent first line gets no response at all.
pub struct RedirectHandler {
    config: ServerConfig,
}

impl RedirectHandler {
    pub(crate) fn new(config: ServerConfig) -> Self {
        Self { config }
    }
}

impl SocketHandler for RedirectHandler {
    async fn handle<S>(&self, stream: S, remote_requester: String) -> Result<(), ErrorKind>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let mut stream = BufStream::new(stream);

        let line = crate::stream::read_line(&mut stream, &self.config.limits).await?;
        match line {
            None => Ok(()),
            Some(line) if line.is_empty() => Ok(()),
            Some(_) => {
                debug!(remote = %remote_requester, "redirecting to https");
                let location = match self.config.ssl_server_port {
                    443 => format!("https://{}", self.config.hostname),
                    port => format!("https://{}:{}", self.config.hostname, port),
                };
                let response = Response::redirect_to(&location);
                let serialized = serialize_response(
                    &response,
                    false,
                    self.config.keep_alive_timeout,
                    SystemTime::now(),
                );
                stream.write_all(&serialized).await?;
                stream.flush().await?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};
    use tokio::io::AsyncReadExt;

    fn make(lines: &[&str]) -> Headers {
        Headers::new(lines.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    // 2022-01-04 09:25:00 UTC, the fixed clock the serialization tests use.
    fn fixed_clock() -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(1_641_288_300)
    }

    #[test]
    fn body_predicate_content_type_alone() {
        // content-type: foo is illegitimate, but it makes the system look
        // closer - and find no usable framing.
        let headers = make(&["content-type: foo"]);
        assert!(!is_there_a_body(&headers).unwrap());
    }

    #[test]
    fn body_predicate_unknown_transfer_encoding() {
        let headers = make(&["content-type: foo", "transfer-encoding: foo"]);
        assert!(!is_there_a_body(&headers).unwrap());
    }

    #[test]
    fn body_predicate_chunked() {
        let headers = make(&["content-type: foo", "transfer-encoding: chunked"]);
        assert!(is_there_a_body(&headers).unwrap());
    }

    #[test]
    fn body_predicate_content_length() {
        #[rustfmt::skip]
        let cases = [
            (vec!["content-type: text/plain", "content-length: 5"], true),
            (vec!["content-type: text/plain", "content-length: 0"], false),
            (vec!["content-length: 5"],                             false),
            (vec![],                                                false),
        ];

        for (lines, expected) in cases {
            assert_eq!(
                is_there_a_body(&make(&lines)).unwrap(),
                expected,
                "lines were {:?}",
                lines
            );
        }
    }

    #[test]
    fn keep_alive_decision() {
        #[rustfmt::skip]
        let cases = [
            (HttpVersion::OneDotOne,  vec![],                             true),
            (HttpVersion::OneDotOne,  vec!["connection: close"],          false),
            (HttpVersion::OneDotOne,  vec!["connection: keep-alive"],     true),
            (HttpVersion::OneDotZero, vec![],                             false),
            (HttpVersion::OneDotZero, vec!["connection: keep-alive"],     true),
            (HttpVersion::OneDotZero, vec!["Connection: Keep-Alive"],     true),
            (HttpVersion::OneDotZero, vec!["connection: close"],          false),
            (HttpVersion::None,       vec![],                             false),
        ];

        for (version, lines, expected) in cases {
            assert_eq!(
                should_keep_alive(version, &make(&lines)),
                expected,
                "version {:?}, lines {:?}",
                version,
                lines
            );
        }
    }

    #[test]
    fn serialization_with_keep_alive() {
        let response = Response::html_ok("86");
        let serialized = serialize_response(
            &response,
            true,
            Duration::from_secs(3),
            fixed_clock(),
        );

        let expected = "HTTP/1.1 200 OK\r\n\
            date: Tue, 04 Jan 2022 09:25:00 GMT\r\n\
            server: minum\r\n\
            content-type: text/html; charset=UTF-8\r\n\
            content-length: 2\r\n\
            keep-alive: timeout=3\r\n\
            \r\n\
            86";
        assert_eq!(String::from_utf8_lossy(&serialized), expected);
    }

    #[test]
    fn serialization_when_closing_omits_keep_alive() {
        let response = Response::new(StatusCode::NotFound);
        let serialized = serialize_response(
            &response,
            false,
            Duration::from_secs(3),
            fixed_clock(),
        );
        let text = String::from_utf8_lossy(&serialized);

        assert!(text.starts_with("HTTP/1.1 404 NOT FOUND\r\n"));
        assert!(text.contains("content-length: 0\r\n"));
        assert!(!text.contains("keep-alive"));
    }

    #[tokio::test]
    async fn redirect_handler_happy_path() {
        let (mut client, server_side) = tokio::io::duplex(1024);
        let handler = RedirectHandler::new(ServerConfig::default());

        let task = tokio::spawn(async move {
            handler.handle(server_side, "test".to_string()).await
        });

        tokio::io::AsyncWriteExt::write_all(&mut client, b"The startline\n")
            .await
            .unwrap();
        tokio::io::AsyncWriteExt::shutdown(&mut client).await.unwrap();

        let mut result = String::new();
        client.read_to_string(&mut result).await.unwrap();
        task.await.unwrap().unwrap();

        assert!(result.contains("303 SEE OTHER"), "result was: {}", result);
        assert!(result.contains("location: https://localhost"));
    }

    #[tokio::test]
    async fn redirect_handler_no_start_line() {
        let (mut client, server_side) = tokio::io::duplex(1024);
        let handler = RedirectHandler::new(ServerConfig::default());

        let task = tokio::spawn(async move {
            handler.handle(server_side, "test".to_string()).await
        });

        tokio::io::AsyncWriteExt::shutdown(&mut client).await.unwrap();

        let mut result = String::new();
        client.read_to_string(&mut result).await.unwrap();
        task.await.unwrap().unwrap();

        assert_eq!(result, "");
    }
}
