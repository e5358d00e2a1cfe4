//! Registry implementation
//!
//! A mutually-exclusive set of live subscriber connections. The accept loop
//! only ever adds; the broadcast loop reads, writes, and removes; the
//! controller clears on shutdown. No component touches the collection
//! without holding the single lock.

use tokio::sync::Mutex;

use super::entry::ClientConnection;

/// Result of one fan-out pass over the registry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutOutcome {
    /// Connections the payload was delivered to
    pub delivered: usize,
    /// Connections removed during the pass (failed write or observed closed)
    pub evicted: usize,
}

/// Lock-protected set of live subscriber connections
///
/// Generic over the connection type so eviction behavior is testable with
/// in-memory fakes. Iteration order is stable insertion order within a
/// single pass.
pub struct ClientRegistry<C: ClientConnection> {
    clients: Mutex<Vec<C>>,
}

impl<C: ClientConnection> ClientRegistry<C> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(Vec::new()),
        }
    }

    /// Insert a newly admitted, already-upgraded connection
    ///
    /// Insertion is unconditional; the caller guarantees the connection is
    /// valid at call time.
    pub async fn add(&self, client: C) {
        let mut clients = self.clients.lock().await;
        clients.push(client);
        tracing::debug!(total = clients.len(), "Subscriber registered");
    }

    /// Current number of registered connections (observability only)
    pub async fn count(&self) -> usize {
        self.clients.lock().await.len()
    }

    /// Deliver one payload to every registered connection
    ///
    /// Visits entries in insertion order under the lock. Open connections
    /// get one text write; a failed write evicts the connection and closes
    /// it best-effort. Connections observed closed are evicted without a
    /// write. A failure on one entry never aborts delivery to the rest.
    ///
    /// Removal is done by draining into a fresh collection rather than
    /// deleting by index mid-scan, so an eviction cannot skip the entry
    /// that follows it.
    pub async fn broadcast(&self, payload: &str) -> FanoutOutcome {
        let mut clients = self.clients.lock().await;
        let mut kept = Vec::with_capacity(clients.len());
        let mut outcome = FanoutOutcome::default();

        for (slot, mut client) in clients.drain(..).enumerate() {
            if !client.is_open() {
                tracing::debug!(slot, "Subscriber closed, dropping");
                outcome.evicted += 1;
                continue;
            }

            match client.send_text(payload).await {
                Ok(()) => {
                    outcome.delivered += 1;
                    kept.push(client);
                }
                Err(e) => {
                    tracing::warn!(slot, error = %e, "Send failed, evicting subscriber");
                    client.close().await;
                    outcome.evicted += 1;
                }
            }
        }

        *clients = kept;
        outcome
    }

    /// Close every connection (best-effort) and empty the collection
    pub async fn clear(&self) {
        let mut clients = self.clients.lock().await;
        let total = clients.len();

        for mut client in clients.drain(..) {
            // Already-closed connections are simply skipped
            if client.is_open() {
                client.close().await;
            }
        }

        if total > 0 {
            tracing::info!(closed = total, "Registry cleared");
        }
    }
}

impl<C: ClientConnection> Default for ClientRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex as StdMutex};

    use super::*;
    use crate::error::Error;

    /// Shared log of (connection id, payload) pairs, in delivery order
    type SendLog = Arc<StdMutex<Vec<(u32, String)>>>;

    struct FakeConn {
        id: u32,
        open: bool,
        fail_sends: bool,
        log: SendLog,
        closed: Arc<AtomicBool>,
    }

    impl FakeConn {
        fn new(id: u32, log: SendLog) -> Self {
            Self {
                id,
                open: true,
                fail_sends: false,
                log,
                closed: Arc::new(AtomicBool::new(false)),
            }
        }

        fn failing(id: u32, log: SendLog) -> Self {
            Self {
                fail_sends: true,
                ..Self::new(id, log)
            }
        }

        fn closed_already(id: u32, log: SendLog) -> Self {
            Self {
                open: false,
                ..Self::new(id, log)
            }
        }

        fn close_flag(&self) -> Arc<AtomicBool> {
            Arc::clone(&self.closed)
        }
    }

    impl ClientConnection for FakeConn {
        fn is_open(&mut self) -> bool {
            self.open
        }

        async fn send_text(&mut self, text: &str) -> crate::error::Result<()> {
            if self.fail_sends {
                self.open = false;
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "peer went away",
                )));
            }
            self.log.lock().unwrap().push((self.id, text.to_string()));
            Ok(())
        }

        async fn close(&mut self) {
            self.open = false;
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    fn send_log() -> SendLog {
        Arc::new(StdMutex::new(Vec::new()))
    }

    #[tokio::test]
    async fn test_add_and_count() {
        let registry = ClientRegistry::new();
        let log = send_log();

        assert_eq!(registry.count().await, 0);
        registry.add(FakeConn::new(1, Arc::clone(&log))).await;
        registry.add(FakeConn::new(2, Arc::clone(&log))).await;
        assert_eq!(registry.count().await, 2);
    }

    #[tokio::test]
    async fn test_broadcast_delivers_in_insertion_order() {
        let registry = ClientRegistry::new();
        let log = send_log();

        for id in 1..=3 {
            registry.add(FakeConn::new(id, Arc::clone(&log))).await;
        }

        let outcome = registry.broadcast("hello").await;
        assert_eq!(outcome.delivered, 3);
        assert_eq!(outcome.evicted, 0);

        let sent = log.lock().unwrap();
        let ids: Vec<u32> = sent.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(sent.iter().all(|(_, p)| p == "hello"));
    }

    #[tokio::test]
    async fn test_failed_send_is_isolated_to_one_connection() {
        let registry = ClientRegistry::new();
        let log = send_log();

        registry.add(FakeConn::new(1, Arc::clone(&log))).await;
        let bad = FakeConn::failing(2, Arc::clone(&log));
        let bad_closed = bad.close_flag();
        registry.add(bad).await;
        registry.add(FakeConn::new(3, Arc::clone(&log))).await;

        let outcome = registry.broadcast("tick").await;
        assert_eq!(outcome.delivered, 2);
        assert_eq!(outcome.evicted, 1);
        assert_eq!(registry.count().await, 2);

        // #1 and #3 both received the payload despite #2 failing mid-pass
        let ids: Vec<u32> = log.lock().unwrap().iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![1, 3]);

        // The evicted connection was closed best-effort
        assert!(bad_closed.load(Ordering::SeqCst));

        // The survivors keep receiving on the next tick
        let outcome = registry.broadcast("tick2").await;
        assert_eq!(outcome.delivered, 2);
        assert_eq!(outcome.evicted, 0);
    }

    #[tokio::test]
    async fn test_closed_connection_removed_without_write() {
        let registry = ClientRegistry::new();
        let log = send_log();

        registry
            .add(FakeConn::closed_already(1, Arc::clone(&log)))
            .await;
        registry.add(FakeConn::new(2, Arc::clone(&log))).await;

        let outcome = registry.broadcast("tick").await;
        assert_eq!(outcome.delivered, 1);
        assert_eq!(outcome.evicted, 1);
        assert_eq!(registry.count().await, 1);

        // No write was attempted on the closed connection
        let ids: Vec<u32> = log.lock().unwrap().iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[tokio::test]
    async fn test_count_after_fanout_matches_survivors() {
        let registry = ClientRegistry::new();
        let log = send_log();

        // 5 admitted: 2 fail their write, 1 is already closed
        registry.add(FakeConn::new(1, Arc::clone(&log))).await;
        registry.add(FakeConn::failing(2, Arc::clone(&log))).await;
        registry
            .add(FakeConn::closed_already(3, Arc::clone(&log)))
            .await;
        registry.add(FakeConn::failing(4, Arc::clone(&log))).await;
        registry.add(FakeConn::new(5, Arc::clone(&log))).await;

        let outcome = registry.broadcast("tick").await;
        assert_eq!(outcome.delivered, 2);
        assert_eq!(outcome.evicted, 3);
        assert_eq!(registry.count().await, 5 - 3);
    }

    #[tokio::test]
    async fn test_clear_closes_everything() {
        let registry = ClientRegistry::new();
        let log = send_log();

        let a = FakeConn::new(1, Arc::clone(&log));
        let b = FakeConn::new(2, Arc::clone(&log));
        let a_closed = a.close_flag();
        let b_closed = b.close_flag();
        registry.add(a).await;
        registry.add(b).await;

        registry.clear().await;
        assert_eq!(registry.count().await, 0);
        assert!(a_closed.load(Ordering::SeqCst));
        assert!(b_closed.load(Ordering::SeqCst));

        // Clearing an empty registry is a no-op
        registry.clear().await;
        assert_eq!(registry.count().await, 0);
    }
}
