//! HTTP/1.1 served straight from TCP sockets.
//!
//! - [`http::headers`]: header collection with token validation
//! - [`http::parser`]: resumable request parser and its stream driver
//! - [`http::response`]: status line, header, fixed and chunked body writer
//! - [`net::server`]: accept loop dispatching requests to a [`net::Handler`]

pub mod config;
pub mod http;
pub mod net;

pub use http::headers::{HeaderError, Headers};
pub use http::parser::{ParseError, ReadLimits, request_from_stream, request_from_stream_with};
pub use http::request::{ParseState, Request, RequestLine};
pub use http::response::{ResponseWriter, WriteError, WriterState, default_headers};
pub use http::status::StatusCode;
