//! WebSocket broadcast server for "now playing" media-session snapshots.
//!
//! The service polls a [`snapshot::SessionProvider`] once per second,
//! serializes the result to a single JSON payload, and pushes it to every
//! connected WebSocket subscriber. Two independent loops share one
//! lock-protected [`registry::ClientRegistry`]:
//!
//! - the accept loop admits new subscribers after a successful upgrade
//!   handshake on the configured path,
//! - the broadcast loop fans each tick's payload out to all subscribers,
//!   evicting any connection that fails a write or is observed closed.
//!
//! [`MediaServer`] owns both loops and the shared cancellation token, and
//! guarantees that `stop()` quiesces background work and closes every
//! connection.
//!
//! # Example
//!
//! ```no_run
//! use mediacast::{IdleProvider, MediaServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> mediacast::Result<()> {
//!     let mut server = MediaServer::new(ServerConfig::default(), IdleProvider);
//!     server.start().await?;
//!     tokio::signal::ctrl_c().await.ok();
//!     server.stop().await;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod registry;
pub mod server;
pub mod snapshot;

pub use error::{Error, Result};
pub use registry::{ClientConnection, ClientRegistry, FanoutOutcome};
pub use server::{MediaServer, ServerConfig};
pub use snapshot::{IdleProvider, SessionProvider, Snapshot};
