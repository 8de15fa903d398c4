//! Connection-accepting HTTP server.
//!
//! This module owns the networking side only:
//! - binding the listener and running the accept loop,
//! - reading raw bytes from each connection into the
//!   [`parser`](crate::http::parser),
//! - handing the parsed [`Request`] and a [`ResponseWriter`] bound to the
//!   connection to the application [`Handler`].
//!
//! ## Connection lifecycle
//!
//! 1. Accept a TCP connection and spawn a task for it
//! 2. Parse one request from the stream
//! 3. On a malformed request, answer `400 Bad Request` directly;
//!    on a transport error, give up without answering
//! 4. Otherwise run the handler, which writes the whole response
//! 5. Close the connection (there is no keep-alive)
//!
//! Every accepted connection gets its own task and nothing caps how many run
//! at once. That suits a small demo server; anything facing real traffic
//! needs a limit in front of [`serve_with`].

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_std::net::{TcpListener, TcpStream};
use async_std::task::{self, JoinHandle};
use thiserror::Error;

use crate::config::ServerConfig;
use crate::http::parser::{ParseError, ReadLimits, request_from_stream_with};
use crate::http::request::Request;
use crate::http::response::{ResponseWriter, WriteError, default_headers};
use crate::http::status::StatusCode;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Application code answering parsed requests.
///
/// Implemented for any `Fn(ResponseWriter<TcpStream>, Request) -> impl Future<Output = ()>`.
/// The handler decides status, headers and framing; if it writes nothing the
/// client simply sees the connection close.
pub trait Handler: Send + Sync + 'static {
    type Future: Future<Output = ()> + Send + 'static;

    fn call(&self, writer: ResponseWriter<TcpStream>, req: Request) -> Self::Future;
}

impl<F, Fut> Handler for F
where
    F: Fn(ResponseWriter<TcpStream>, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    type Future = Fut;

    fn call(&self, writer: ResponseWriter<TcpStream>, req: Request) -> Fut {
        self(writer, req)
    }
}

/// A running server. Dropping the handle leaves the accept loop running.
pub struct ServerHandle {
    local_addr: SocketAddr,
    closed: Arc<AtomicBool>,
    accept_task: JoinHandle<()>,
}

/// Binds `port` on the default address and starts accepting in the background.
pub async fn serve<H: Handler>(port: u16, handler: H) -> Result<ServerHandle, ServerError> {
    let config = ServerConfig {
        port,
        ..ServerConfig::default()
    };
    serve_with(&config, handler).await
}

pub async fn serve_with<H: Handler>(
    config: &ServerConfig,
    handler: H,
) -> Result<ServerHandle, ServerError> {
    let addr = SocketAddr::new(config.address, config.port);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    let local_addr = listener
        .local_addr()
        .map_err(|source| ServerError::Bind { addr, source })?;

    tracing::info!(address = %local_addr, "server listening");

    let closed = Arc::new(AtomicBool::new(false));
    let accept_task = task::spawn(listen(
        listener,
        Arc::clone(&closed),
        config.read_limits(),
        Arc::new(handler),
    ));

    Ok(ServerHandle {
        local_addr,
        closed,
        accept_task,
    })
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stops accepting and drops the listener once the accept loop notices.
    ///
    /// Connections already handed to their own task keep running.
    pub async fn close(self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        // The accept loop is parked in accept(); a throwaway connection wakes it
        // so it can observe the flag.
        match TcpStream::connect(wake_addr(self.local_addr)).await {
            Ok(_) => self.accept_task.await,
            Err(err) => {
                tracing::warn!(%err, "could not wake accept loop, leaving it detached");
            }
        }
        tracing::info!(address = %self.local_addr, "server closed");
    }

    /// Waits until the accept loop exits.
    pub async fn wait(self) {
        self.accept_task.await
    }
}

fn wake_addr(addr: SocketAddr) -> SocketAddr {
    match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => SocketAddr::new(Ipv4Addr::LOCALHOST.into(), addr.port()),
        IpAddr::V6(ip) if ip.is_unspecified() => SocketAddr::new(Ipv6Addr::LOCALHOST.into(), addr.port()),
        _ => addr,
    }
}

async fn listen<H: Handler>(
    listener: TcpListener,
    closed: Arc<AtomicBool>,
    limits: ReadLimits,
    handler: Arc<H>,
) {
    loop {
        let accepted = listener.accept().await;
        if closed.load(Ordering::SeqCst) {
            tracing::debug!("server closed, accept loop exiting");
            return;
        }

        match accepted {
            Ok((stream, peer)) => {
                tracing::debug!(%peer, "accepted connection");
                task::spawn(handle_connection(stream, peer, limits, Arc::clone(&handler)));
            }
            Err(err) => {
                tracing::error!(%err, "error accepting connection");
            }
        }
    }
}

async fn handle_connection<H: Handler>(
    stream: TcpStream,
    peer: SocketAddr,
    limits: ReadLimits,
    handler: Arc<H>,
) {
    let mut reader = stream.clone();
    match request_from_stream_with(&mut reader, &limits).await {
        Ok(req) => {
            tracing::info!(%peer, method = req.method(), path = req.target(), "handling request");
            handler.call(ResponseWriter::new(stream.clone()), req).await;
        }
        Err(err) if err.is_client_error() => {
            tracing::warn!(%peer, %err, "rejecting malformed request");
            if let Err(write_err) = write_bad_request(&stream, &err).await {
                tracing::debug!(%peer, err = %write_err, "failed to send 400 response");
            }
        }
        Err(err) => {
            tracing::error!(%peer, %err, "transport error while reading request");
        }
    }

    if let Err(err) = stream.shutdown(Shutdown::Both) {
        tracing::debug!(%peer, %err, "error closing connection");
    }
}

async fn write_bad_request(stream: &TcpStream, err: &ParseError) -> Result<(), WriteError> {
    let body = format!("{}\n", err);
    let mut writer = ResponseWriter::new(stream);
    writer.write_status_line(StatusCode::BadRequest).await?;
    writer.write_headers(&default_headers(body.len())).await?;
    writer.write_body(body.as_bytes()).await?;
    Ok(())
}
