//! Server runtime: configuration, WebSocket transport, and the two loops
//!
//! [`MediaServer`] is the service controller. `start()` binds the listening
//! socket and launches the accept loop and the broadcast loop as
//! independent tasks; `stop()` cancels both, waits for them to quiesce, and
//! closes every registered connection.

pub mod broadcast;
pub mod config;
pub mod listener;
pub mod ws;

pub use config::ServerConfig;
pub use listener::MediaServer;
pub use ws::WsClient;
