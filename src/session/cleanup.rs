use super::registry::SessionRegistry;
use crate::server::metrics;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Periodic sweep that evicts idle sessions.
///
/// Started lazily by the registry when its first session is created. Holds
/// only a weak reference to the registry, so dropping the registry ends the
/// loop as well as cancelling the token does.
pub struct CleanupScheduler {
    interval: Duration,
    started: AtomicBool,
    running: Arc<AtomicBool>,
    shutdown_token: CancellationToken,
}

impl CleanupScheduler {
    pub fn new(interval: Duration, shutdown_token: CancellationToken) -> Self {
        Self {
            interval,
            started: AtomicBool::new(false),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_token,
        }
    }

    /// Spawns the sweep loop unless it was already spawned. Calling this
    /// outside a tokio runtime does nothing; a later call can still start it.
    pub fn ensure_started(&self, registry: Weak<SessionRegistry>) {
        let Ok(handle) = Handle::try_current() else {
            debug!("No async runtime available, session cleanup not started");
            return;
        };
        if self.shutdown_token.is_cancelled() {
            return;
        }
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        self.running.store(true, Ordering::Release);
        let interval = self.interval;
        let token = self.shutdown_token.clone();
        let running = self.running.clone();
        handle.spawn(async move {
            run_cleanup_loop(registry, interval, token).await;
            running.store(false, Ordering::Release);
        });
        info!("Session cleanup started, sweeping every {:?}", interval);
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn shutdown(&self) {
        self.shutdown_token.cancel();
    }
}

async fn run_cleanup_loop(
    registry: Weak<SessionRegistry>,
    interval: Duration,
    shutdown_token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown_token.cancelled() => {
                info!("Session cleanup received shutdown signal");
                break;
            }
        }

        let Some(registry) = registry.upgrade() else {
            debug!("Session registry dropped, stopping cleanup");
            break;
        };

        // The sweep runs in its own task so a panic in it is contained to
        // this iteration.
        let sweep = tokio::spawn(async move {
            let evicted = registry.evict_idle(Utc::now()).await;
            let remaining = registry.len().await;
            (evicted, remaining)
        });

        match sweep.await {
            Ok((evicted, remaining)) => {
                metrics::set_active_sessions(remaining);
                if evicted.is_empty() {
                    debug!("Session cleanup: nothing to evict ({} active)", remaining);
                } else {
                    metrics::record_sessions_evicted(evicted.len());
                    info!(
                        "Session cleanup: evicted {} idle sessions ({} active)",
                        evicted.len(),
                        remaining
                    );
                }
            }
            Err(e) => {
                error!("Session cleanup sweep failed: {}", e);
            }
        }
    }

    info!("Session cleanup stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CapabilityCatalog;
    use crate::session::{ConnectionContext, SessionIdentity, SessionSettings, TransportKind};

    fn identity(addr: &str) -> SessionIdentity {
        let ctx = ConnectionContext::network(addr.parse().unwrap());
        SessionIdentity::resolve(TransportKind::Http, Some(&ctx), "managed").unwrap()
    }

    fn registry(idle_timeout: Duration, cleanup_interval: Duration) -> Arc<SessionRegistry> {
        SessionRegistry::new(
            &SessionSettings {
                idle_timeout,
                cleanup_interval,
            },
            CapabilityCatalog::builtin().essential_tools(),
            CancellationToken::new(),
        )
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..100 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_started_lazily_on_first_session() {
        let registry = registry(Duration::from_secs(3600), Duration::from_secs(300));
        assert!(!registry.cleanup().is_started());

        registry.get_or_create(&identity("10.0.0.1:5000")).await;
        assert!(registry.cleanup().is_started());
        assert!(registry.cleanup().is_running());

        // Second start is a no-op.
        registry.cleanup().ensure_started(Arc::downgrade(&registry));
        registry.get_or_create(&identity("10.0.0.2:5000")).await;
        assert!(registry.cleanup().is_running());

        registry.shutdown();
        let cleanup_registry = registry.clone();
        wait_until(|| !cleanup_registry.cleanup().is_running()).await;
        assert!(!registry.cleanup().is_running());
    }

    #[tokio::test]
    async fn test_sweep_evicts_idle_sessions() {
        let registry = registry(Duration::from_secs(60 * 60), Duration::from_millis(20));
        let stale = registry.get_or_create(&identity("10.0.0.1:5000")).await;
        let active = registry.get_or_create(&identity("10.0.0.2:5000")).await;
        registry
            .backdate(&stale.id, chrono::Duration::minutes(61))
            .await;

        for _ in 0..100 {
            if registry.get(&stale.id).await.is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert!(registry.get(&stale.id).await.is_none());
        assert!(registry.get(&active.id).await.is_some());
        registry.shutdown();
    }

    #[tokio::test]
    async fn test_loop_stops_when_registry_dropped() {
        let registry = registry(Duration::from_secs(3600), Duration::from_millis(10));
        registry.get_or_create(&identity("10.0.0.1:5000")).await;
        let running = registry.cleanup().running.clone();
        drop(registry);

        wait_until(|| !running.load(Ordering::Acquire)).await;
        assert!(!running.load(Ordering::Acquire));
    }

    #[test]
    fn test_no_runtime_does_not_start() {
        let scheduler = CleanupScheduler::new(Duration::from_secs(1), CancellationToken::new());
        scheduler.ensure_started(Weak::new());
        assert!(!scheduler.is_started());
    }
}
