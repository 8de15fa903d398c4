//! Wire-level HTTP/1.1 response writer.
//!
//! A [`ResponseWriter`] is bound to one connection's output and writes each
//! part of a response as soon as it is asked to:
//!
//! ```text
//! write_status_line -> write_headers -> write_body
//!                                    -> write_chunked_body* -> write_chunked_body_done -> write_trailers
//! ```
//!
//! Nothing is buffered, so calls must come in that order. Going backwards
//! (a second status line, headers after the body, trailers before the final
//! chunk) is refused with [`WriteError::OutOfOrder`] instead of corrupting the
//! stream.

use async_std::io::{Write, WriteExt};
use thiserror::Error;

use crate::http::headers::Headers;
use crate::http::status::StatusCode;
use crate::http::CRLF;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("refusing to write an empty body")]
    EmptyBodyWrite,

    #[error("cannot write {attempted} after {current}")]
    OutOfOrder {
        attempted: WriterState,
        current: WriterState,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Furthest point the writer has reached in the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WriterState {
    Start,
    StatusLine,
    Headers,
    Body,
    ChunkedDone,
    Trailers,
}

impl std::fmt::Display for WriterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WriterState::Start => "nothing",
            WriterState::StatusLine => "status line",
            WriterState::Headers => "headers",
            WriterState::Body => "body",
            WriterState::ChunkedDone => "final chunk",
            WriterState::Trailers => "trailers",
        };
        f.write_str(name)
    }
}

/// `content-length: <n>`, `connection: close`, `content-type: text/plain`.
///
/// Handlers replace the content type with [`Headers::set_override`], and drop
/// `content-length` when switching to chunked framing.
pub fn default_headers(content_length: usize) -> Headers {
    let mut headers = Headers::new();
    headers.insert_unchecked("content-length", content_length.to_string());
    headers.insert_unchecked("connection", "close".to_string());
    headers.insert_unchecked("content-type", "text/plain".to_string());
    headers
}

pub struct ResponseWriter<W> {
    inner: W,
    state: WriterState,
}

impl<W> ResponseWriter<W>
where
    W: Write + Unpin,
{
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            state: WriterState::Start,
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub async fn write_status_line(&mut self, status: StatusCode) -> Result<(), WriteError> {
        self.advance(WriterState::StatusLine, false)?;
        self.inner.write_all(status.status_line().as_bytes()).await?;
        Ok(())
    }

    /// Writes every header followed by the blank line ending the head.
    pub async fn write_headers(&mut self, headers: &Headers) -> Result<(), WriteError> {
        self.advance(WriterState::Headers, false)?;
        self.write_header_block(headers).await
    }

    pub async fn write_body(&mut self, body: &[u8]) -> Result<usize, WriteError> {
        if body.is_empty() {
            return Err(WriteError::EmptyBodyWrite);
        }
        self.advance(WriterState::Body, true)?;
        self.inner.write_all(body).await?;
        Ok(body.len())
    }

    /// Frames `chunk` as `<hex size>\r\n<bytes>\r\n`.
    ///
    /// Returns the number of bytes put on the wire, framing included. An empty
    /// chunk writes nothing, since a zero size would end the body early.
    pub async fn write_chunked_body(&mut self, chunk: &[u8]) -> Result<usize, WriteError> {
        if chunk.is_empty() {
            return Ok(0);
        }
        self.advance(WriterState::Body, true)?;

        let size_line = format!("{:x}\r\n", chunk.len());
        self.inner.write_all(size_line.as_bytes()).await?;
        self.inner.write_all(chunk).await?;
        self.inner.write_all(CRLF).await?;
        Ok(size_line.len() + chunk.len() + CRLF.len())
    }

    /// Writes the zero-size chunk `0\r\n`.
    ///
    /// The body is only complete once [`write_trailers`](Self::write_trailers)
    /// has written the trailer block and its closing blank line.
    pub async fn write_chunked_body_done(&mut self) -> Result<usize, WriteError> {
        self.advance(WriterState::ChunkedDone, false)?;
        self.inner.write_all(b"0\r\n").await?;
        Ok(3)
    }

    /// Writes each trailer as `name: value\r\n`, then the closing blank line.
    pub async fn write_trailers(&mut self, trailers: &Headers) -> Result<(), WriteError> {
        if self.state != WriterState::ChunkedDone {
            return Err(WriteError::OutOfOrder {
                attempted: WriterState::Trailers,
                current: self.state,
            });
        }
        self.state = WriterState::Trailers;
        self.write_header_block(trailers).await
    }

    /// Ends a chunked body that carries no trailers: `0\r\n\r\n`.
    pub async fn finish_chunked_body(&mut self) -> Result<(), WriteError> {
        self.write_chunked_body_done().await?;
        self.write_trailers(&Headers::new()).await
    }

    pub async fn flush(&mut self) -> Result<(), WriteError> {
        self.inner.flush().await?;
        Ok(())
    }

    async fn write_header_block(&mut self, headers: &Headers) -> Result<(), WriteError> {
        let mut block = headers.stringify();
        block.push_str("\r\n");
        self.inner.write_all(block.as_bytes()).await?;
        Ok(())
    }

    fn advance(&mut self, next: WriterState, repeatable: bool) -> Result<(), WriteError> {
        let allowed = if repeatable {
            next >= self.state
        } else {
            next > self.state
        };
        if !allowed {
            return Err(WriteError::OutOfOrder {
                attempted: next,
                current: self.state,
            });
        }
        self.state = next;
        Ok(())
    }
}
