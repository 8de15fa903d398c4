use std::time::SystemTime;

use async_std::io::Write;

use rawhttp::{Headers, ResponseWriter, StatusCode, default_headers};

use crate::handler::HandlerError;

const OK_PAGE: &str = "<html>
  <head>
    <title>200 OK</title>
  </head>
  <body>
    <h1>Success!</h1>
    <p>Your request was an absolute banger.</p>
  </body>
</html>
";

const BAD_REQUEST_PAGE: &str = "<html>
  <head>
    <title>400 Bad Request</title>
  </head>
  <body>
    <h1>Bad Request</h1>
    <p>Your request honestly kinda sucked.</p>
  </body>
</html>
";

const INTERNAL_ERROR_PAGE: &str = "<html>
  <head>
    <title>500 Internal Server Error</title>
  </head>
  <body>
    <h1>Internal Server Error</h1>
    <p>Okay, you know what? This one is on me.</p>
  </body>
</html>
";

/// Default headers plus a `date` stamp.
pub fn headers_for(content_length: usize) -> Result<Headers, HandlerError> {
    let mut headers = default_headers(content_length);
    headers.set_override("Date", &httpdate::fmt_http_date(SystemTime::now()))?;
    Ok(headers)
}

pub async fn html<W>(
    w: &mut ResponseWriter<W>,
    status: StatusCode,
    page: &str,
) -> Result<(), HandlerError>
where
    W: Write + Unpin,
{
    let mut headers = headers_for(page.len())?;
    headers.set_override("Content-Type", "text/html")?;

    w.write_status_line(status).await?;
    w.write_headers(&headers).await?;
    w.write_body(page.as_bytes()).await?;
    Ok(())
}

pub async fn ok<W: Write + Unpin>(w: &mut ResponseWriter<W>) -> Result<(), HandlerError> {
    html(w, StatusCode::Ok, OK_PAGE).await
}

pub async fn bad_request<W: Write + Unpin>(w: &mut ResponseWriter<W>) -> Result<(), HandlerError> {
    html(w, StatusCode::BadRequest, BAD_REQUEST_PAGE).await
}

pub async fn internal_server_error<W: Write + Unpin>(
    w: &mut ResponseWriter<W>,
) -> Result<(), HandlerError> {
    html(w, StatusCode::InternalServerError, INTERNAL_ERROR_PAGE).await
}
