//! Subscriber registry for broadcast fan-out
//!
//! The registry is the only state shared between the accept loop (which adds
//! connections) and the broadcast loop (which writes to, and removes,
//! connections). All access goes through one `tokio::sync::Mutex`, held for
//! the full duration of each operation, including the iterate-with-removal
//! pass that delivers a payload.
//!
//! # Architecture
//!
//! ```text
//!                      Arc<ClientRegistry<WsClient>>
//!                     ┌───────────────────────────┐
//!                     │ clients: Mutex<Vec<C>>    │
//!                     └─────────────┬─────────────┘
//!                                   │
//!              ┌────────────────────┼────────────────────┐
//!              │                    │                    │
//!         [Accept loop]       [Broadcast loop]      [Controller]
//!         add(client)         broadcast(payload)    clear()
//! ```
//!
//! The write path is deliberately serial: one payload per tick, delivered to
//! every open connection in stable insertion order, with failed or closed
//! connections compacted out of the collection before the pass ends.

pub mod entry;
pub mod store;

pub use entry::ClientConnection;
pub use store::{ClientRegistry, FanoutOutcome};
