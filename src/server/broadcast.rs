//! Fixed-interval broadcast loop
//!
//! `ACQUIRE → SERIALIZE → FANOUT → SLEEP`, terminating on cancellation.
//! The snapshot is acquired before the registry lock is taken, serialized
//! once, and fanned out identically to every subscriber registered at that
//! moment. The inter-tick sleep races the cancellation token so shutdown
//! is never delayed by a full interval.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::registry::{ClientConnection, ClientRegistry};
use crate::snapshot::{self, SessionProvider};

/// Run the broadcast loop until the token is cancelled
///
/// No final broadcast is sent on exit.
pub(crate) async fn run<P, C>(
    provider: Arc<P>,
    registry: Arc<ClientRegistry<C>>,
    interval: Duration,
    cancel: CancellationToken,
) where
    P: SessionProvider,
    C: ClientConnection,
{
    tracing::info!(interval_ms = interval.as_millis() as u64, "Broadcast loop started");

    while !cancel.is_cancelled() {
        tick(provider.as_ref(), registry.as_ref()).await;

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    tracing::info!("Broadcast loop stopped");
}

/// One tick: acquire a snapshot, serialize it, fan it out
pub(crate) async fn tick<P, C>(provider: &P, registry: &ClientRegistry<C>)
where
    P: SessionProvider,
    C: ClientConnection,
{
    // Provider query happens outside the registry lock
    let snapshot = snapshot::acquire(provider).await;

    let payload = match snapshot.to_json() {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to serialize snapshot, skipping tick");
            return;
        }
    };

    let outcome = registry.broadcast(&payload).await;
    tracing::debug!(
        delivered = outcome.delivered,
        evicted = outcome.evicted,
        "Tick complete"
    );
}
