use thiserror::Error;

/// Status codes the response writer knows how to announce.
///
/// Anything else is rejected when converting from a raw code, so a handler can
/// never produce a response without a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok = 200,
    BadRequest = 400,
    InternalServerError = 500,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unsupported status code {0}")]
pub struct UnsupportedStatus(pub u16);

impl StatusCode {
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn reason(self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }

    /// `HTTP/1.1 <code> <reason>\r\n`
    pub fn status_line(self) -> String {
        format!("HTTP/1.1 {} {}\r\n", self.code(), self.reason())
    }
}

impl TryFrom<u16> for StatusCode {
    type Error = UnsupportedStatus;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            200 => Ok(StatusCode::Ok),
            400 => Ok(StatusCode::BadRequest),
            500 => Ok(StatusCode::InternalServerError),
            other => Err(UnsupportedStatus(other)),
        }
    }
}
