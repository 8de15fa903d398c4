use async_std::io::Write;
use sha2::{Digest, Sha256};

use rawhttp::{Headers, ResponseWriter, StatusCode};

use crate::handler::HandlerError;
use crate::handler::responses;

const MAX_LINES: usize = 100;

/// Streams `count` JSON lines as a chunked body, one chunk per line, followed
/// by the body's SHA-256 and length as trailers.
pub async fn serve<W>(w: &mut ResponseWriter<W>, count: &str) -> Result<(), HandlerError>
where
    W: Write + Unpin,
{
    let Ok(count) = count.parse::<usize>() else {
        return responses::bad_request(w).await;
    };
    let count = count.min(MAX_LINES);

    let mut headers = responses::headers_for(0)?;
    headers.delete("Content-Length");
    headers.set_override("Content-Type", "application/json")?;
    headers.set_override("Transfer-Encoding", "chunked")?;
    headers.set_override("Trailer", "X-Content-SHA256, X-Content-Length")?;

    w.write_status_line(StatusCode::Ok).await?;
    w.write_headers(&headers).await?;

    let mut hasher = Sha256::new();
    let mut length = 0;
    for id in 0..count {
        let line = format!("{{\"id\": {}, \"url\": \"/stream/{}\"}}\n", id, count);
        hasher.update(line.as_bytes());
        length += line.len();
        w.write_chunked_body(line.as_bytes()).await?;
    }
    w.write_chunked_body_done().await?;

    let mut trailers = Headers::new();
    trailers.set("X-Content-SHA256", &hex::encode(hasher.finalize()))?;
    trailers.set("X-Content-Length", &length.to_string())?;
    w.write_trailers(&trailers).await?;
    Ok(())
}
