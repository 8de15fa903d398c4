use std::path::Path;

use async_std::fs;
use async_std::io::Write;

use rawhttp::config::config;
use rawhttp::{ResponseWriter, StatusCode};

use crate::handler::HandlerError;
use crate::handler::responses;

const VIDEO_FILE: &str = "vim.mp4";

/// Sends the demo video in one fixed-length body.
pub async fn video<W: Write + Unpin>(w: &mut ResponseWriter<W>) -> Result<(), HandlerError> {
    let path = Path::new(&config().assets_root).join(VIDEO_FILE);
    serve_file(w, &path).await
}

pub async fn serve_file<W>(w: &mut ResponseWriter<W>, path: &Path) -> Result<(), HandlerError>
where
    W: Write + Unpin,
{
    let body = match fs::read(path).await {
        Ok(body) if !body.is_empty() => body,
        Ok(_) => {
            tracing::warn!(path = %path.display(), "refusing to serve empty file");
            return responses::internal_server_error(w).await;
        }
        Err(err) => {
            tracing::error!(path = %path.display(), %err, "failed to read file");
            return responses::internal_server_error(w).await;
        }
    };

    let mut headers = responses::headers_for(body.len())?;
    headers.set_override("Content-Type", guess_mime(path))?;

    w.write_status_line(StatusCode::Ok).await?;
    w.write_headers(&headers).await?;
    w.write_body(&body).await?;
    Ok(())
}

fn guess_mime(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("htm") | Some("html") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("json") => "application/json",
        Some("txt") => "text/plain",
        Some("mp4") => "video/mp4",
        _ => "application/octet-stream",
    }
}
