pub mod headers;
pub mod parser;
pub mod request;
pub mod response;
pub mod status;
pub mod validator;

pub(crate) const CRLF: &[u8] = b"\r\n";

/// The only protocol version this server speaks.
pub const HTTP_VERSION: &str = "1.1";
