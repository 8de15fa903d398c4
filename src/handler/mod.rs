//! Demo application served by the `rawhttp` binary.

mod responses;
mod router;
mod static_files;
mod stream;

use async_std::io::Write;
use thiserror::Error;

use rawhttp::{HeaderError, Request, ResponseWriter, WriteError};

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Header(#[from] HeaderError),
}

pub async fn handle<W>(mut w: ResponseWriter<W>, req: Request)
where
    W: Write + Unpin,
{
    if let Err(err) = router::route(&mut w, &req).await {
        tracing::error!(path = req.target(), %err, "handler failed to write response");
    }
}
