//! Error types for the mediacast service

use std::io;
use std::net::SocketAddr;

use tokio_tungstenite::tungstenite;

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for server and connection operations
#[derive(Debug)]
pub enum Error {
    /// The listening socket could not be bound
    Bind {
        /// Address the bind was attempted on
        addr: SocketAddr,
        /// Underlying I/O failure
        source: io::Error,
    },
    /// Transport-level I/O failure
    Io(io::Error),
    /// WebSocket handshake or protocol failure
    WebSocket(tungstenite::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Bind { addr, source } => write!(f, "failed to bind {}: {}", addr, source),
            Error::Io(e) => write!(f, "i/o error: {}", e),
            Error::WebSocket(e) => write!(f, "websocket error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Bind { source, .. } => Some(source),
            Error::Io(e) => Some(e),
            Error::WebSocket(e) => Some(e),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<tungstenite::Error> for Error {
    fn from(e: tungstenite::Error) -> Self {
        Error::WebSocket(e)
    }
}
