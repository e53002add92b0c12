//! The proxy's HTTP/1.1 listener.
//!
//! One tokio task per connection. A connection carries requests back to back
//! until the client sends `Connection: close`, speaks HTTP/1.0 without
//! asking for keep-alive, or hangs up.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::{Buf, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::http::StatusCode;
use crate::http::request::{Request, RequestError};
use crate::http::response::Response;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
}

/// Buffered bytes allowed for one request before it is refused with `413`.
const MAX_REQUEST_SIZE: usize = 8 * 1024 * 1024;

const INITIAL_BUF_SIZE: usize = 4096;

/// A bound listener waiting to be [run](Server::run).
///
/// ```rust,no_run
/// use geoproxy::server::Server;
/// use geoproxy::http::{Response, StatusCode};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = Server::bind("127.0.0.1:3000").await?;
///     server.run(|_req| async {
///         Response::new(StatusCode::Ok).body("pong")
///     }).await?;
///     Ok(())
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// # Errors
    ///
    /// [`ServerError::Bind`] when the address is taken, unresolvable, or not
    /// ours to bind.
    pub async fn bind(addr: impl AsRef<str>) -> Result<Self, ServerError> {
        let addr = addr.as_ref();
        let listener = TcpListener::bind(addr).await.map_err(|source| ServerError::Bind {
            addr: addr.to_owned(),
            source,
        })?;
        let local_addr = listener.local_addr()?;
        Ok(Self { listener, local_addr })
    }

    /// The bound address; useful after binding port `0`.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serves forever.
    pub async fn run<H, F>(self, handler: H) -> Result<(), ServerError>
    where
        H: Fn(Request) -> F + Send + Sync + 'static,
        F: Future<Output = Response> + Send + 'static,
    {
        self.run_until(handler, std::future::pending()).await
    }

    /// Serves until `shutdown` resolves.
    ///
    /// Only the accept loop stops; in-flight connections finish on their own
    /// tasks.
    pub async fn run_until<H, F, S>(self, handler: H, shutdown: S) -> Result<(), ServerError>
    where
        H: Fn(Request) -> F + Send + Sync + 'static,
        F: Future<Output = Response> + Send + 'static,
        S: Future<Output = ()>,
    {
        let handler = Arc::new(handler);
        tokio::pin!(shutdown);
        info!(address = %self.local_addr, "listening");

        loop {
            let (stream, peer) = tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!(error = %e, "accept failed");
                        continue;
                    }
                },
                () = &mut shutdown => {
                    info!("shutting down, no longer accepting connections");
                    return Ok(());
                }
            };

            debug!(%peer, "connection accepted");
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                if let Err(e) = serve_connection(stream, peer, handler).await {
                    warn!(%peer, error = %e, "connection dropped");
                }
            });
        }
    }
}

// Parses whatever is buffered before reading more, so pipelined requests are
// answered in order without waiting on the socket.
async fn serve_connection<H, F>(
    mut stream: TcpStream,
    peer: SocketAddr,
    handler: Arc<H>,
) -> io::Result<()>
where
    H: Fn(Request) -> F + Send + Sync + 'static,
    F: Future<Output = Response> + Send + 'static,
{
    let mut buf = BytesMut::with_capacity(INITIAL_BUF_SIZE);

    loop {
        let ready = match Request::parse(&buf) {
            Ok((request, head_len)) => {
                let declared = request.content_length().unwrap_or(0);
                let Some(frame_len) = head_len
                    .checked_add(declared)
                    .filter(|&len| len <= MAX_REQUEST_SIZE)
                else {
                    warn!(%peer, declared, "declared body exceeds size limit");
                    let message = "Request entity too large";
                    return reject(&mut stream, StatusCode::PayloadTooLarge, message).await;
                };
                (buf.len() >= frame_len).then_some((request, frame_len))
            }
            Err(RequestError::Incomplete) => None,
            Err(e) => {
                warn!(%peer, error = %e, "malformed request");
                let message = format!("Bad Request: {e}");
                return reject(&mut stream, StatusCode::BadRequest, message).await;
            }
        };

        let Some((request, frame_len)) = ready else {
            if buf.len() > MAX_REQUEST_SIZE {
                warn!(%peer, buffered = buf.len(), "request too large");
                let message = "Request entity too large";
                return reject(&mut stream, StatusCode::PayloadTooLarge, message).await;
            }
            if stream.read_buf(&mut buf).await? == 0 {
                debug!(%peer, "peer closed connection");
                return Ok(());
            }
            continue;
        };

        let keep_alive = request.is_keep_alive();
        let response = handler(request).await.keep_alive(keep_alive);
        stream.write_all(&response.into_bytes()).await?;
        stream.flush().await?;
        buf.advance(frame_len);

        if !keep_alive {
            return Ok(());
        }
    }
}

async fn reject(
    stream: &mut TcpStream,
    status: StatusCode,
    message: impl Into<String>,
) -> io::Result<()> {
    let response = Response::new(status).body(message).keep_alive(false);
    stream.write_all(&response.into_bytes()).await
}
