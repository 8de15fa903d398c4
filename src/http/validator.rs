//! Request-line grammar checks used by the [`parser`](crate::http::parser).

use crate::http::HTTP_VERSION;
use crate::http::parser::ParseError;
use crate::http::request::RequestLine;

/// `METHOD SP TARGET SP HTTP/1.1`, split on single spaces.
pub fn validate_request_line(line: &str) -> Result<RequestLine, ParseError> {
    let parts: Vec<&str> = line.split(' ').collect();
    if parts.len() != 3 {
        return Err(ParseError::MalformedRequestLine(line.to_string()));
    }

    let method = validate_method(parts[0])?;
    let http_version = validate_version(parts[2])?;

    Ok(RequestLine {
        method: method.to_string(),
        request_target: parts[1].to_string(),
        http_version: http_version.to_string(),
    })
}

/// Methods must match `^[A-Z]+$`.
fn validate_method(method: &str) -> Result<&str, ParseError> {
    if method.is_empty() || !method.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(ParseError::MalformedMethod(method.to_string()));
    }
    Ok(method)
}

fn validate_version(version: &str) -> Result<&str, ParseError> {
    let parts: Vec<&str> = version.split('/').collect();
    if parts.len() != 2 || parts[0] != "HTTP" {
        return Err(ParseError::MalformedVersion(version.to_string()));
    }
    if parts[1] != HTTP_VERSION {
        return Err(ParseError::UnsupportedVersion(parts[1].to_string()));
    }
    Ok(parts[1])
}
