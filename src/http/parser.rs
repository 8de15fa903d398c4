//! Resumable HTTP/1.1 request parser.
//!
//! [`Request::parse`] consumes whatever bytes are currently buffered and
//! reports how many it used; unconsumed bytes stay with the caller, who appends
//! more data and calls again. State lives in [`Request::state`], so a request
//! line or header split across any number of reads is picked up where it left
//! off.
//!
//! [`request_from_stream`] drives the parser from an async reader through a
//! growable buffer, deliberately reading in small increments.

use async_std::io::{Read, ReadExt};
use thiserror::Error;

use crate::http::headers::{HeaderError, find_crlf};
use crate::http::request::{ParseState, Request};
use crate::http::validator::validate_request_line;
use crate::http::CRLF;

const DEFAULT_READ_SIZE: usize = 8;
const DEFAULT_INITIAL_BUFFER_SIZE: usize = 8;
const DEFAULT_MAX_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed request line: {0:?}")]
    MalformedRequestLine(String),

    #[error("malformed HTTP method: {0:?}")]
    MalformedMethod(String),

    #[error("malformed HTTP version: {0:?}")]
    MalformedVersion(String),

    #[error("unsupported HTTP version: {0}")]
    UnsupportedVersion(String),

    #[error(transparent)]
    MalformedHeader(#[from] HeaderError),

    #[error("invalid Content-Length: {0:?}")]
    InvalidContentLength(String),

    #[error("body exceeds Content-Length: declared {declared}, received {received}")]
    BodyOverflow { declared: usize, received: usize },

    #[error("parser already finished (state: {0})")]
    ParserExhausted(ParseState),

    #[error("incomplete request, in state: {state}, {buffered} bytes unparsed at end of stream")]
    IncompleteRequest { state: ParseState, buffered: usize },

    #[error("request line or header exceeds {0} bytes")]
    RequestTooLarge(usize),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ParseError {
    /// Whether the peer is at fault, i.e. a `400 Bad Request` is the right answer.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ParseError::Io(_))
    }
}

/// Buffering knobs for [`request_from_stream_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadLimits {
    /// Maximum bytes requested from the reader per read call.
    pub read_size: usize,
    pub initial_buffer_size: usize,
    /// The buffer only ever holds one unconsumed line, so this caps line length.
    pub max_buffer_size: usize,
}

impl Default for ReadLimits {
    fn default() -> Self {
        Self {
            read_size: DEFAULT_READ_SIZE,
            initial_buffer_size: DEFAULT_INITIAL_BUFFER_SIZE,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
        }
    }
}

impl Request {
    /// Feeds `data` through the state machine until it stalls or finishes.
    ///
    /// Returns the number of bytes consumed. Calling this on a request that is
    /// already done or failed is an error.
    pub fn parse(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        if matches!(self.state, ParseState::Done | ParseState::Error) {
            return Err(ParseError::ParserExhausted(self.state));
        }

        let mut total = 0;
        while self.state != ParseState::Done {
            let n = self.parse_single(&data[total..])?;
            if n == 0 {
                break;
            }
            total += n;
        }
        Ok(total)
    }

    /// Attempts exactly one sub-parse step. `Ok(0)` means more input is needed,
    /// unless the step just moved the request to [`ParseState::Done`].
    pub fn parse_single(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        let result = self.step(data);
        if result.is_err() {
            self.state = ParseState::Error;
        }
        result
    }

    fn step(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        match self.state {
            ParseState::AwaitingRequestLine => self.parse_request_line(data),
            ParseState::AwaitingHeaders => {
                let (n, finished) = self.headers.parse_one(data)?;
                if finished {
                    self.state = ParseState::AwaitingBody;
                }
                Ok(n)
            }
            ParseState::AwaitingBody => self.parse_body(data),
            ParseState::Done | ParseState::Error => Err(ParseError::ParserExhausted(self.state)),
        }
    }

    fn parse_request_line(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        let Some(line_end) = find_crlf(data) else {
            return Ok(0);
        };

        let line = std::str::from_utf8(&data[..line_end]).map_err(|_| {
            ParseError::MalformedRequestLine(String::from_utf8_lossy(&data[..line_end]).into_owned())
        })?;

        self.request_line = validate_request_line(line)?;
        self.state = ParseState::AwaitingHeaders;
        Ok(line_end + CRLF.len())
    }

    fn parse_body(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        // Without a Content-Length the body is empty; anything else buffered is dropped.
        let Some(value) = self.headers.get("content-length") else {
            self.state = ParseState::Done;
            return Ok(data.len());
        };

        let declared = parse_content_length(value)?;
        let received = self.body_read + data.len();
        if received > declared {
            return Err(ParseError::BodyOverflow { declared, received });
        }

        self.body.extend_from_slice(data);
        self.body_read = received;
        if self.body_read == declared {
            self.state = ParseState::Done;
        }
        Ok(data.len())
    }
}

fn parse_content_length(value: &str) -> Result<usize, ParseError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidContentLength(value.to_string()));
    }
    value
        .parse::<usize>()
        .map_err(|_| ParseError::InvalidContentLength(value.to_string()))
}

/// Reads and parses one request from `reader` with the default [`ReadLimits`].
pub async fn request_from_stream<R>(reader: &mut R) -> Result<Request, ParseError>
where
    R: Read + Unpin,
{
    request_from_stream_with(reader, &ReadLimits::default()).await
}

/// Reads from `reader` until a full request has been parsed.
///
/// End of stream before the request is complete yields
/// [`ParseError::IncompleteRequest`]; any parser error stops reading at once.
pub async fn request_from_stream_with<R>(
    reader: &mut R,
    limits: &ReadLimits,
) -> Result<Request, ParseError>
where
    R: Read + Unpin,
{
    let read_size = limits.read_size.max(1);
    let mut buf = vec![0u8; limits.initial_buffer_size.max(1)];
    let mut filled = 0;
    let mut req = Request::new();

    while !req.is_done() {
        if filled == buf.len() {
            if buf.len() >= limits.max_buffer_size {
                return Err(ParseError::RequestTooLarge(limits.max_buffer_size));
            }
            let grown = (buf.len() * 2).min(limits.max_buffer_size);
            buf.resize(grown, 0);
        }

        let end = (filled + read_size).min(buf.len());
        let n = match reader.read(&mut buf[filled..end]).await {
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ParseError::Io(e)),
        };

        if n == 0 {
            return Err(ParseError::IncompleteRequest {
                state: req.state,
                buffered: filled,
            });
        }
        filled += n;

        let consumed = req.parse(&buf[..filled])?;
        buf.copy_within(consumed..filled, 0);
        filled -= consumed;
    }

    Ok(req)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// Hands out at most `num_bytes_per_read` bytes per read call.
    pub struct ChunkReader {
        data: Vec<u8>,
        num_bytes_per_read: usize,
        pos: usize,
    }

    impl ChunkReader {
        pub fn new(data: &[u8], num_bytes_per_read: usize) -> Self {
            ChunkReader {
                data: data.to_vec(),
                num_bytes_per_read,
                pos: 0,
            }
        }
    }

    impl Read for ChunkReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut [u8],
        ) -> Poll<io::Result<usize>> {
            let this = self.get_mut();
            if this.pos >= this.data.len() {
                return Poll::Ready(Ok(0));
            }

            let remaining = this.data.len() - this.pos;
            let to_read = this.num_bytes_per_read.min(buf.len()).min(remaining);
            let end = this.pos + to_read;
            buf[..to_read].copy_from_slice(&this.data[this.pos..end]);
            this.pos = end;

            Poll::Ready(Ok(to_read))
        }
    }

    async fn parse_chunked(data: &[u8], per_read: usize) -> Result<Request, ParseError> {
        let mut reader = ChunkReader::new(data, per_read);
        request_from_stream(&mut reader).await
    }

    #[async_std::test]
    async fn good_get_request_line() {
        let req = parse_chunked(b"GET /path HTTP/1.1\r\nHost: localhost:42069\r\n\r\n", 3)
            .await
            .unwrap();

        assert_eq!(req.request_line.method, "GET");
        assert_eq!(req.request_line.request_target, "/path");
        assert_eq!(req.request_line.http_version, "1.1");
        assert_eq!(req.headers.get("host"), Some("localhost:42069"));
        assert_eq!(req.headers.len(), 1);
        assert!(req.body.is_empty());
        assert_eq!(req.state, ParseState::Done);
    }

    #[async_std::test]
    async fn standard_headers() {
        let req = parse_chunked(
            b"GET / HTTP/1.1\r\nHost: localhost:42069\r\nUser-Agent: curl/7.81.0\r\nAccept: */*\r\n\r\n",
            3,
        )
        .await
        .unwrap();

        assert_eq!(req.headers.get("Host"), Some("localhost:42069"));
        assert_eq!(req.headers.get("User-Agent"), Some("curl/7.81.0"));
        assert_eq!(req.headers.get("Accept"), Some("*/*"));
    }

    #[async_std::test]
    async fn parsing_is_fragmentation_invariant() {
        let raw: &[u8] = b"POST /submit HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nX-Multi: a\r\nX-Multi: b\r\nContent-Length: 15\r\n\r\n{\"key\":\"value\"}";
        let mut whole = Request::new();
        assert_eq!(whole.parse(raw).unwrap(), raw.len());
        assert!(whole.is_done());
        assert_eq!(whole.body, b"{\"key\":\"value\"}");
        assert_eq!(whole.headers.get("x-multi"), Some("a,b"));

        let limits = ReadLimits {
            read_size: raw.len(),
            ..ReadLimits::default()
        };
        for per_read in 1..=raw.len() {
            let mut reader = ChunkReader::new(raw, per_read);
            let fragmented = request_from_stream_with(&mut reader, &limits).await.unwrap();
            assert_eq!(fragmented, whole, "differs with {} bytes per read", per_read);
        }
    }

    #[async_std::test]
    async fn body_with_exact_content_length() {
        let req = parse_chunked(
            b"POST /submit HTTP/1.1\r\nHost: localhost:42069\r\nContent-Length: 5\r\n\r\nhello",
            3,
        )
        .await
        .unwrap();

        assert_eq!(req.body, b"hello");
        assert_eq!(req.body_read(), 5);
        assert_eq!(req.state, ParseState::Done);
    }

    #[async_std::test]
    async fn body_longer_than_content_length() {
        let result = parse_chunked(
            b"POST /submit HTTP/1.1\r\nHost: localhost:42069\r\nContent-Length: 5\r\n\r\nhello world",
            3,
        )
        .await;

        assert!(matches!(result, Err(ParseError::BodyOverflow { declared: 5, .. })));
    }

    #[test]
    fn body_overflow_is_detected_before_storing() {
        let mut req = Request::new();
        let n = req
            .parse(b"POST / HTTP/1.1\r\nContent-Length: 4\r\n\r\nab")
            .unwrap();
        assert_eq!(n, 40);
        assert_eq!(req.body, b"ab");

        let result = req.parse(b"cde");
        assert!(matches!(
            result,
            Err(ParseError::BodyOverflow { declared: 4, received: 5 })
        ));
        assert_eq!(req.body, b"ab");
        assert_eq!(req.state, ParseState::Error);
    }

    #[async_std::test]
    async fn zero_content_length_finishes_on_terminator() {
        let req = parse_chunked(b"POST / HTTP/1.1\r\nContent-Length: 0\r\n\r\n", 4)
            .await
            .unwrap();

        assert!(req.body.is_empty());
        assert!(req.is_done());
    }

    #[async_std::test]
    async fn body_shorter_than_content_length() {
        let result = parse_chunked(
            b"POST / HTTP/1.1\r\nHost: localhost\r\nContent-Length: 20\r\n\r\npartial content",
            3,
        )
        .await;

        assert!(matches!(
            result,
            Err(ParseError::IncompleteRequest {
                state: ParseState::AwaitingBody,
                ..
            })
        ));
    }

    #[async_std::test]
    async fn missing_terminator_is_incomplete() {
        let result = parse_chunked(b"GET / HTTP/1.1\r\nHost: localhost\r\n", 5).await;

        assert!(matches!(
            result,
            Err(ParseError::IncompleteRequest {
                state: ParseState::AwaitingHeaders,
                buffered: 0,
            })
        ));
    }

    #[async_std::test]
    async fn empty_stream_is_incomplete() {
        let result = parse_chunked(b"", 8).await;

        assert!(matches!(
            result,
            Err(ParseError::IncompleteRequest {
                state: ParseState::AwaitingRequestLine,
                buffered: 0,
            })
        ));
    }

    #[async_std::test]
    async fn missing_content_length_ignores_trailing_bytes() {
        let req = parse_chunked(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\nstray bytes", 2)
            .await
            .unwrap();

        assert!(req.body.is_empty());
        assert!(req.is_done());
    }

    #[async_std::test]
    async fn invalid_content_length() {
        for value in ["abc", "-5", "+5", ""] {
            let raw = format!("POST / HTTP/1.1\r\nContent-Length: {}\r\n\r\nhello", value);
            let result = parse_chunked(raw.as_bytes(), 8).await;
            assert!(
                matches!(result, Err(ParseError::InvalidContentLength(_))),
                "{:?} should be rejected",
                value
            );
        }
    }

    #[async_std::test]
    async fn lowercase_method() {
        let result = parse_chunked(b"get /path HTTP/1.1\r\n\r\n", 3).await;
        assert!(matches!(result, Err(ParseError::MalformedMethod(m)) if m == "get"));
    }

    #[async_std::test]
    async fn unsupported_version() {
        let result = parse_chunked(b"GET / HTTP/2.0\r\n\r\n", 3).await;
        assert!(matches!(result, Err(ParseError::UnsupportedVersion(v)) if v == "2.0"));
    }

    #[async_std::test]
    async fn invalid_number_of_parts() {
        let result = parse_chunked(b"/coffee HTTP/1.1\r\nHost: localhost:42069\r\n\r\n", 3).await;
        assert!(matches!(result, Err(ParseError::MalformedRequestLine(_))));
    }

    #[async_std::test]
    async fn malformed_header_aborts() {
        let result = parse_chunked(b"GET / HTTP/1.1\r\nHost : localhost\r\n\r\n", 3).await;
        assert!(matches!(
            result,
            Err(ParseError::MalformedHeader(HeaderError::WhitespaceInName(_)))
        ));
    }

    #[async_std::test]
    async fn header_line_filling_the_buffer_exactly() {
        // "X-Fill: abcdefg\r\n" is 17 bytes; with 8 byte reads the buffer grows
        // to 16 and is completely full right before the line's final byte.
        let raw = b"GET / HTTP/1.1\r\nX-Fill: abcdefg\r\nHost: a\r\n\r\n";
        let limits = ReadLimits {
            read_size: 8,
            initial_buffer_size: 8,
            max_buffer_size: 1024,
        };

        for per_read in [1, 8, 16, 17] {
            let mut reader = ChunkReader::new(raw, per_read);
            let req = request_from_stream_with(&mut reader, &limits).await.unwrap();
            assert_eq!(req.headers.get("x-fill"), Some("abcdefg"));
            assert_eq!(req.headers.get("host"), Some("a"));
        }
    }

    #[async_std::test]
    async fn oversized_line_is_rejected() {
        let mut raw = b"GET /".to_vec();
        raw.extend(std::iter::repeat_n(b'a', 100));
        raw.extend_from_slice(b" HTTP/1.1\r\n\r\n");

        let limits = ReadLimits {
            read_size: 8,
            initial_buffer_size: 8,
            max_buffer_size: 32,
        };
        let mut reader = ChunkReader::new(&raw, 8);
        let result = request_from_stream_with(&mut reader, &limits).await;

        assert!(matches!(result, Err(ParseError::RequestTooLarge(32))));
    }

    #[test]
    fn resumes_across_partial_lines() {
        let mut req = Request::new();
        assert_eq!(req.parse(b"GET / HT").unwrap(), 0);
        assert_eq!(req.state, ParseState::AwaitingRequestLine);

        assert_eq!(req.parse(b"GET / HTTP/1.1\r\nHo").unwrap(), 16);
        assert_eq!(req.state, ParseState::AwaitingHeaders);

        assert_eq!(req.parse(b"Host: x\r\n\r\n").unwrap(), 11);
        assert!(req.is_done());
        assert_eq!(req.headers.get("host"), Some("x"));
    }

    #[test]
    fn done_parser_is_exhausted() {
        let mut req = Request::new();
        req.parse(b"GET / HTTP/1.1\r\n\r\n").unwrap();
        assert!(req.is_done());

        assert!(matches!(
            req.parse(b"more"),
            Err(ParseError::ParserExhausted(ParseState::Done))
        ));
        assert!(matches!(
            req.parse_single(b"more"),
            Err(ParseError::ParserExhausted(_))
        ));
    }

    #[test]
    fn failed_parser_is_exhausted() {
        let mut req = Request::new();
        assert!(req.parse(b"get / HTTP/1.1\r\n").is_err());
        assert_eq!(req.state, ParseState::Error);
        assert!(matches!(
            req.parse(b"GET / HTTP/1.1\r\n"),
            Err(ParseError::ParserExhausted(ParseState::Error))
        ));
    }

    #[test]
    fn only_transport_errors_are_server_side() {
        let io_err = ParseError::Io(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        assert!(!io_err.is_client_error());
        assert!(ParseError::BodyOverflow { declared: 1, received: 2 }.is_client_error());
    }
}
