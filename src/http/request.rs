use std::fmt;

use crate::http::headers::Headers;

/// Progress marker of a [`Request`] being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    AwaitingRequestLine,
    AwaitingHeaders,
    AwaitingBody,
    Done,
    Error,
}

impl fmt::Display for ParseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParseState::AwaitingRequestLine => "awaiting request line",
            ParseState::AwaitingHeaders => "awaiting headers",
            ParseState::AwaitingBody => "awaiting body",
            ParseState::Done => "done",
            ParseState::Error => "error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    pub request_target: String,
    /// Version without the `HTTP/` prefix, always `1.1` once parsed.
    pub http_version: String,
}

/// An HTTP request, complete once `state` is [`ParseState::Done`].
///
/// Bytes are fed through `Request::parse`, usually by
/// [`request_from_stream`](crate::http::parser::request_from_stream).
#[derive(Debug, PartialEq, Eq)]
pub struct Request {
    pub request_line: RequestLine,
    pub headers: Headers,
    pub body: Vec<u8>,
    pub state: ParseState,
    pub(crate) body_read: usize,
}

impl Request {
    pub fn new() -> Self {
        Self {
            request_line: RequestLine::default(),
            headers: Headers::new(),
            body: Vec::new(),
            state: ParseState::AwaitingRequestLine,
            body_read: 0,
        }
    }

    pub fn method(&self) -> &str {
        &self.request_line.method
    }

    pub fn target(&self) -> &str {
        &self.request_line.request_target
    }

    pub fn is_done(&self) -> bool {
        self.state == ParseState::Done
    }

    /// Number of body bytes consumed so far.
    pub fn body_read(&self) -> usize {
        self.body_read
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}
