use crate::db::Store;
use crate::errors::Result;
use crate::metrics::{BROADCAST_FAILURES_TOTAL, BROADCAST_TICKS_TOTAL};
use crate::serialize::{self, EVENT_SENSOR_UPDATE};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Seconds between pushes of the latest reading.
pub const BROADCAST_INTERVAL_SECS: u64 = 2;

const CHANNEL_CAPACITY: usize = 32;

/// Owns the real-time fan-out channel and the one-shot start guard for the
/// background push loop. Started lazily by the first client connection and
/// eagerly by the standalone entry point; both paths are idempotent.
pub struct Broadcaster {
    tx: broadcast::Sender<String>,
    started: AtomicBool,
    store: Store,
    shutdown: watch::Receiver<bool>,
}

impl Broadcaster {
    pub fn new(store: Store, shutdown: watch::Receiver<bool>) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            started: AtomicBool::new(false),
            store,
            shutdown,
        }
    }

    /// Spawn the push loop unless it is already running. Concurrent callers
    /// race on the started flag; exactly one wins.
    pub fn ensure_started(&self) {
        if !self.try_claim_start() {
            return;
        }

        info!(
            "Starting broadcast loop ({}s interval)",
            BROADCAST_INTERVAL_SECS
        );
        let store = self.store.clone();
        let tx = self.tx.clone();
        let shutdown = self.shutdown.clone();
        let period = Duration::from_secs(BROADCAST_INTERVAL_SECS);
        tokio::spawn(run_loop(store, tx, shutdown, period));
    }

    fn try_claim_start(&self) -> bool {
        self.started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    /// Clients watch the same shutdown channel as the push loop so open
    /// sessions end instead of pinning the graceful shutdown.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.clone()
    }

    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Push loop: sleep one interval, fetch the latest reading, publish it to
/// every subscriber. A failed tick is logged and swallowed so a transient
/// store outage never kills the loop; only the shutdown signal ends it.
async fn run_loop(
    store: Store,
    tx: broadcast::Sender<String>,
    mut shutdown: watch::Receiver<bool>,
    period: Duration,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    // A slow fetch delays the next tick instead of replaying missed ones.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = tick(&store, &tx).await {
                    BROADCAST_FAILURES_TOTAL.inc();
                    warn!("Broadcast tick failed: {}", e);
                }
            }
            _ = shutdown.changed() => {
                info!("Broadcast loop stopped");
                break;
            }
        }
    }
}

async fn tick(store: &Store, tx: &broadcast::Sender<String>) -> Result<()> {
    let reading = match store.latest().await? {
        Some(reading) => reading,
        // Empty store: nothing to push yet.
        None => return Ok(()),
    };

    let frame = serialize::event_frame(EVENT_SENSOR_UPDATE, &reading)?;
    BROADCAST_TICKS_TOTAL.inc();

    // send only errs when nobody is subscribed, which is not a failure.
    let _ = tx.send(frame);
    debug!(
        "Published reading {} to {} clients",
        reading.id,
        tx.receiver_count()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    fn test_broadcaster() -> Broadcaster {
        // connect_lazy defers the connection, but the pool still spawns its
        // maintenance task, so even guard tests need a runtime.
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost:5432/unused")
            .unwrap();
        let (_tx, rx) = watch::channel(false);
        Broadcaster::new(Store::new(pool), rx)
    }

    fn unreachable_store() -> Store {
        // Nothing listens on port 1; a short acquire timeout keeps the
        // failure fast instead of waiting out the 30s default.
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy("postgres://127.0.0.1:1/unused")
            .unwrap();
        Store::new(pool)
    }

    #[test]
    fn start_guard_is_claimed_exactly_once() {
        tokio_test::block_on(async {
            let broadcaster = test_broadcaster();
            assert!(broadcaster.try_claim_start());
            assert!(!broadcaster.try_claim_start());
            assert!(!broadcaster.try_claim_start());
        });
    }

    #[test]
    fn ensure_started_is_idempotent() {
        tokio_test::block_on(async {
            let broadcaster = test_broadcaster();
            broadcaster.ensure_started();
            broadcaster.ensure_started();
            // The first call consumed the one-shot flag.
            assert!(!broadcaster.try_claim_start());
        });
    }

    #[test]
    fn subscriptions_are_counted() {
        tokio_test::block_on(async {
            let broadcaster = test_broadcaster();
            assert_eq!(broadcaster.client_count(), 0);
            let rx = broadcaster.subscribe();
            assert_eq!(broadcaster.client_count(), 1);
            drop(rx);
        });
    }

    #[test]
    fn tick_reports_store_failures() {
        tokio_test::block_on(async {
            let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
            assert!(tick(&unreachable_store(), &tx).await.is_err());
        });
    }

    #[test]
    fn store_failures_do_not_stop_the_loop() {
        tokio_test::block_on(async {
            let failures_before = BROADCAST_FAILURES_TOTAL.get();
            let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            let handle = tokio::spawn(run_loop(
                unreachable_store(),
                tx,
                shutdown_rx,
                Duration::from_millis(20),
            ));

            // Wait until at least one tick has failed, then check the loop
            // is still alive and still answers the shutdown signal.
            let deadline = Instant::now() + Duration::from_secs(10);
            while BROADCAST_FAILURES_TOTAL.get() < failures_before + 1.0 {
                assert!(Instant::now() < deadline, "no failed tick was recorded");
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            assert!(!handle.is_finished());

            shutdown_tx.send(true).unwrap();
            handle.await.unwrap();
        });
    }
}
