//! Bounded reads over the socket input stream.
//!
//! Three operations cover everything the protocol engine needs: a capped
//! line read, an exactly-n byte read, and the chunked-transfer decoder of
//! [RFC 7230 section 4.1](https://www.rfc-editor.org/rfc/rfc7230#section-4.1).
//! Lines may end in either `\r\n` or `\n` on input; the trailing `\r` is
//! stripped.
//!
//! Every underlying read is raced against `socket_read_timeout`.  The
//! deadline applies to each read individually, so a large body arriving
//! steadily never trips it - only a peer that goes quiet does.

use crate::{errors::ErrorKind, limits::ReqLimits};
use memchr::memchr;
use std::{io, time::Duration};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    time::timeout,
};

/// One buffered read, bounded by the idle timeout.
async fn fill_buf_timed<R>(reader: &mut R, read_timeout: Duration) -> Result<&[u8], ErrorKind>
where
    R: AsyncBufRead + Unpin,
{
    match timeout(read_timeout, reader.fill_buf()).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "read timeout").into()),
    }
}

/// Reads until the next `\n`, returning the line without its terminator.
///
/// Returns `Ok(None)` when the stream ends before a single byte was read,
/// and the partial line when the stream ends mid-line.  A line longer than
/// `max_line_bytes` fails instead of buffering further.
pub(crate) async fn read_line<R>(
    reader: &mut R,
    limits: &ReqLimits,
) -> Result<Option<String>, ErrorKind>
where
    R: AsyncBufRead + Unpin,
{
    let mut line: Vec<u8> = Vec::new();

    loop {
        let available = fill_buf_timed(reader, limits.socket_read_timeout).await?;
        if available.is_empty() {
            return match line.is_empty() {
                true => Ok(None),
                false => Ok(Some(decode_line(line))),
            };
        }

        match memchr(b'\n', available) {
            Some(pos) => {
                line.extend_from_slice(&available[..pos]);
                reader.consume(pos + 1);

                if line.len() > limits.max_line_bytes {
                    return Err(ErrorKind::LineTooLong(limits.max_line_bytes));
                }
                return Ok(Some(decode_line(line)));
            }
            None => {
                let taken = available.len();
                line.extend_from_slice(available);
                reader.consume(taken);

                if line.len() > limits.max_line_bytes {
                    return Err(ErrorKind::LineTooLong(limits.max_line_bytes));
                }
            }
        }
    }
}

fn decode_line(mut line: Vec<u8>) -> String {
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    String::from_utf8_lossy(&line).into_owned()
}

/// Reads exactly `count` bytes, or fails.
///
/// `count` is checked against `max_body_bytes` before anything is
/// buffered.  The idle timeout restarts with every read that makes
/// progress.
pub(crate) async fn read<R>(
    reader: &mut R,
    count: usize,
    limits: &ReqLimits,
) -> Result<Vec<u8>, ErrorKind>
where
    R: AsyncBufRead + Unpin,
{
    if count > limits.max_body_bytes {
        return Err(ErrorKind::BodyTooLarge(limits.max_body_bytes));
    }

    let mut buffer: Vec<u8> = Vec::with_capacity(count);
    while buffer.len() < count {
        let available = fill_buf_timed(reader, limits.socket_read_timeout).await?;
        if available.is_empty() {
            return Err(
                io::Error::new(io::ErrorKind::UnexpectedEof, "stream ended mid-read").into(),
            );
        }

        let take = available.len().min(count - buffer.len());
        buffer.extend_from_slice(&available[..take]);
        reader.consume(take);
    }

    Ok(buffer)
}

/// Decodes a `transfer-encoding: chunked` body into its payload bytes.
///
/// Repeatedly: read the chunk-size line, parse the hex length before any
/// `;` extension, read that many payload bytes, consume the terminator
/// line.  A zero-length chunk ends the body; optional trailer headers after
/// it are consumed up to the final blank line.  Binary-safe throughout.
pub(crate) async fn read_chunked_encoding<R>(
    reader: &mut R,
    limits: &ReqLimits,
) -> Result<Vec<u8>, ErrorKind>
where
    R: AsyncBufRead + Unpin,
{
    let mut body: Vec<u8> = Vec::new();

    loop {
        let Some(size_line) = read_line(reader, limits).await? else {
            return Err(ErrorKind::InvalidChunk("unexpected end of stream".to_string()));
        };

        let size_text = size_line
            .split(';')
            .next()
            .unwrap_or_default()
            .trim();
        let size = usize::from_str_radix(size_text, 16)
            .map_err(|_| ErrorKind::InvalidChunk(size_line.clone()))?;

        if size == 0 {
            // Trailer headers, if any, run up to a blank line.
            while let Some(trailer) = read_line(reader, limits).await? {
                if trailer.is_empty() {
                    break;
                }
            }
            return Ok(body);
        }

        if body.len() + size > limits.max_body_bytes {
            return Err(ErrorKind::BodyTooLarge(limits.max_body_bytes));
        }

        let chunk = read(reader, size, limits).await?;
        body.extend_from_slice(&chunk);

        // Each chunk's payload is followed by its own line terminator.
        match read_line(reader, limits).await? {
            Some(terminator) if terminator.is_empty() => {}
            Some(other) => return Err(ErrorKind::InvalidChunk(other)),
            None => {
                return Err(ErrorKind::InvalidChunk("unexpected end of stream".to_string()))
            }
        }
    }
}
