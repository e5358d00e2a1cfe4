//! Subscriber connection trait
//!
//! The registry stores anything implementing [`ClientConnection`]. The
//! production implementation is `server::ws::WsClient`; tests substitute
//! in-memory fakes to drive eviction and isolation scenarios.

use std::future::Future;

use crate::error::Result;

/// One open, bidirectional channel to a subscriber
///
/// Methods take `&mut self` because checking liveness may require draining
/// frames the peer has already queued (e.g. a Close frame).
pub trait ClientConnection: Send + 'static {
    /// Whether the connection is still open as far as the transport knows
    ///
    /// A connection that reported a write failure, was closed locally, or
    /// whose peer sent a Close frame must return `false`.
    fn is_open(&mut self) -> bool;

    /// Write one text frame to the subscriber
    ///
    /// A failed write leaves the connection unusable; the registry evicts it.
    fn send_text(&mut self, text: &str) -> impl Future<Output = Result<()>> + Send;

    /// Best-effort close; errors are swallowed
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}
