//! WebSocket transport for subscriber connections
//!
//! Wraps the tokio-tungstenite server handshake and stream behind the
//! registry's [`ClientConnection`] trait. Subscribers are write-mostly: the
//! server never acts on inbound frames beyond noticing a Close.
//!
//! The request head is read before the handshake so a plain HTTP request
//! (no `Upgrade: websocket` header) can be answered with an explicit 400;
//! the buffered bytes are replayed into the handshake via [`Rewind`] when
//! the request really is an upgrade.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::{FutureExt, SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::error::Result;
use crate::registry::ClientConnection;

/// Cap on the request head; anything longer is rejected
const MAX_REQUEST_HEAD: usize = 8 * 1024;

/// Sent to peers whose request is not a WebSocket upgrade
const REJECTION: &[u8] = b"HTTP/1.1 400 Bad Request\r\nconnection: close\r\ncontent-length: 0\r\n\r\n";

/// Complete the server-side upgrade handshake on an accepted socket
///
/// Only upgrade requests for `path` are admitted. A request without an
/// `Upgrade: websocket` header is answered with HTTP 400 and closed; a
/// request for any other path is answered 400 by the handshake callback.
pub(crate) async fn upgrade(mut stream: TcpStream, path: &str) -> Result<WsClient> {
    let head = read_request_head(&mut stream).await?;

    if !is_upgrade_request(&head) {
        // The peer may already be gone; the response is best-effort
        let _ = stream.write_all(REJECTION).await;
        let _ = stream.shutdown().await;
        return Err(
            tokio_tungstenite::tungstenite::Error::Protocol(
                ProtocolError::MissingUpgradeWebSocketHeader,
            )
            .into(),
        );
    }

    let expected = path.trim_end_matches('/').to_owned();
    let check_path = move |req: &Request, response: Response| {
        if req.uri().path().trim_end_matches('/') == expected {
            Ok(response)
        } else {
            let mut reject = ErrorResponse::new(None);
            *reject.status_mut() = StatusCode::BAD_REQUEST;
            Err(reject)
        }
    };

    let replay = Rewind::new(Bytes::from(head), stream);
    let socket = tokio_tungstenite::accept_hdr_async(replay, check_path).await?;
    Ok(WsClient { socket, open: true })
}

/// Read until the end of the HTTP request head (`\r\n\r\n`), EOF, or the cap
async fn read_request_head(stream: &mut TcpStream) -> io::Result<Vec<u8>> {
    let mut head = Vec::with_capacity(1024);
    let mut buf = [0u8; 1024];

    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        head.extend_from_slice(&buf[..n]);
        if head.windows(4).any(|w| w == b"\r\n\r\n") || head.len() > MAX_REQUEST_HEAD {
            break;
        }
    }

    Ok(head)
}

/// Whether the request head carries an `Upgrade: websocket` header
fn is_upgrade_request(head: &[u8]) -> bool {
    let text = String::from_utf8_lossy(head).to_ascii_lowercase();
    text.split("\r\n").skip(1).any(|line| {
        line.strip_prefix("upgrade:")
            .is_some_and(|value| value.contains("websocket"))
    })
}

/// Stream adapter that replays buffered bytes before reading the inner stream
///
/// The handshake parser re-reads the request head this way without the
/// socket having to support seeking.
pub(crate) struct Rewind<S> {
    pre: Option<Bytes>,
    inner: S,
}

impl<S> Rewind<S> {
    fn new(pre: Bytes, inner: S) -> Self {
        Self {
            pre: Some(pre),
            inner,
        }
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for Rewind<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if let Some(mut pre) = this.pre.take() {
            if !pre.is_empty() {
                let n = pre.len().min(buf.remaining());
                buf.put_slice(&pre.split_to(n));
                if !pre.is_empty() {
                    this.pre = Some(pre);
                }
                return Poll::Ready(Ok(()));
            }
        }
        Pin::new(&mut this.inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for Rewind<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

/// One upgraded subscriber connection
pub struct WsClient {
    socket: WebSocketStream<Rewind<TcpStream>>,
    open: bool,
}

impl WsClient {
    /// Drain frames the peer has already queued, without blocking
    ///
    /// A Close frame, a stream error, or EOF marks the connection closed so
    /// the next fan-out pass evicts it without attempting a write.
    fn drain_incoming(&mut self) {
        while let Some(polled) = self.socket.next().now_or_never() {
            match polled {
                Some(Ok(Message::Close(_))) | None => {
                    self.open = false;
                    return;
                }
                Some(Err(_)) => {
                    self.open = false;
                    return;
                }
                // Subscribers have nothing to say; ignore other frames
                Some(Ok(_)) => {}
            }
        }
    }
}

impl ClientConnection for WsClient {
    fn is_open(&mut self) -> bool {
        if self.open {
            self.drain_incoming();
        }
        self.open
    }

    async fn send_text(&mut self, text: &str) -> Result<()> {
        match self.socket.send(Message::text(text)).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.open = false;
                Err(e.into())
            }
        }
    }

    async fn close(&mut self) {
        if self.open {
            self.open = false;
            // Secondary close errors are swallowed; the peer may be gone
            let _ = self.socket.close(None).await;
        }
    }
}
