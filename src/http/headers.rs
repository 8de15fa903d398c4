//! HTTP headers abstraction shared by [`Request`](crate::http::request::Request)
//! and the [`ResponseWriter`](crate::http::response::ResponseWriter).
//!
//! Header names are case-insensitive: they are validated against the RFC 7230
//! token grammar and stored lower-cased. Setting a name that is already present
//! appends the new value separated by `,` (RFC 7230 §3.2.2), so repeated header
//! lines from the wire collapse into a single field. Only
//! [`set_override`](Headers::set_override) replaces a value outright; it is meant
//! for headers the response side controls itself, such as `Content-Type`.
//!
//! Entries are kept in an ordered map so serialization follows insertion order.

use indexmap::IndexMap;
use thiserror::Error;

use crate::http::CRLF;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeaderError {
    #[error("malformed header line: missing ':' separator")]
    MissingColon,

    #[error("malformed header line: empty field name")]
    EmptyName,

    #[error("malformed header line: whitespace in field name {0:?}")]
    WhitespaceInName(String),

    #[error("malformed header line: invalid character in field name {0:?}")]
    InvalidName(String),

    #[error("invalid value for header {0:?}: CR and LF are not allowed")]
    InvalidValue(String),

    #[error("malformed header line: not valid UTF-8")]
    InvalidUtf8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    headers: IndexMap<String, String>,
}

impl Headers {
    pub fn new() -> Self {
        Self {
            headers: IndexMap::new(),
        }
    }

    /// Parses at most one header line from the front of `data`.
    ///
    /// Returns the number of bytes consumed and whether the line was the empty
    /// line terminating the header block. `(0, false)` means no complete line is
    /// buffered yet and the caller should come back with more bytes. A malformed
    /// line consumes nothing and leaves the collection untouched.
    pub fn parse_one(&mut self, data: &[u8]) -> Result<(usize, bool), HeaderError> {
        let Some(line_end) = find_crlf(data) else {
            return Ok((0, false));
        };

        if line_end == 0 {
            return Ok((CRLF.len(), true));
        }

        let line = std::str::from_utf8(&data[..line_end]).map_err(|_| HeaderError::InvalidUtf8)?;
        let (name, value) = line.split_once(':').ok_or(HeaderError::MissingColon)?;

        self.set(name, value.trim())?;
        Ok((line_end + CRLF.len(), false))
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name.to_ascii_lowercase().as_str())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Adds a header, appending to an existing value with `,`.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), HeaderError> {
        let key = validate_name(name)?;
        validate_value(name, value)?;

        self.headers
            .entry(key)
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
        Ok(())
    }

    /// Replaces the value of `name`, inserting it when absent.
    pub fn set_override(&mut self, name: &str, value: &str) -> Result<(), HeaderError> {
        let key = validate_name(name)?;
        validate_value(name, value)?;

        self.headers.insert(key, value.to_string());
        Ok(())
    }

    /// For fixed names known to be valid tokens.
    pub(crate) fn insert_unchecked(&mut self, name: &str, value: String) {
        self.headers.insert(name.to_string(), value);
    }

    /// Removes `name`, keeping the order of the remaining entries.
    pub fn delete(&mut self, name: &str) -> Option<String> {
        self.headers.shift_remove(name.to_ascii_lowercase().as_str())
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Serializes every entry as `name: value\r\n`, without the closing blank line.
    pub fn stringify(&self) -> String {
        let mut result = String::new();
        for (name, value) in &self.headers {
            result.push_str(&format!("{}: {}\r\n", name, value));
        }
        result
    }
}

pub(crate) fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(CRLF.len()).position(|w| w == CRLF)
}

pub(crate) fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '!' | '#' | '$' | '%' | '&' | '\'' | '*' | '+' | '-' | '.' | '^' | '_' | '`' | '|' | '~'
        )
}

fn validate_name(name: &str) -> Result<String, HeaderError> {
    if name.is_empty() {
        return Err(HeaderError::EmptyName);
    }
    if name.chars().any(|c| c.is_whitespace()) {
        return Err(HeaderError::WhitespaceInName(name.to_string()));
    }
    if !name.chars().all(is_token_char) {
        return Err(HeaderError::InvalidName(name.to_string()));
    }
    Ok(name.to_ascii_lowercase())
}

fn validate_value(name: &str, value: &str) -> Result<(), HeaderError> {
    if value.contains(['\r', '\n']) {
        return Err(HeaderError::InvalidValue(name.to_string()));
    }
    Ok(())
}
