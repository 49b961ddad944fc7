//! Shutdown coordinator
//!
//! Supervises the acceptor and every session worker. `shutdown()` runs a
//! bounded number of rounds; each round first asks every live worker to stop
//! and then forcibly closes it, since a worker blocked in a read may not look
//! at its cancellation signal in time.

use log::{debug, info, warn};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::{self, JoinHandle};
use tokio::time::sleep;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::shutdown::registry::{CancelSignal, WorkerId, WorkerKind, WorkerRegistry};

/// A spawned, registered worker
pub struct Worker {
    pub id: WorkerId,
    pub join: JoinHandle<()>,
}

struct CoordinatorInner {
    registry: Arc<WorkerRegistry>,
    shutting_down: AtomicBool,
    rounds: u32,
    pause: Duration,
}

/// Cheaply cloneable handle shared by the server, the acceptor and `main`.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl ShutdownCoordinator {
    pub fn new(rounds: u32, pause: Duration) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                registry: Arc::new(WorkerRegistry::new()),
                shutting_down: AtomicBool::new(false),
                rounds,
                pause,
            }),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.shutdown_rounds, config.shutdown_pause())
    }

    /// Spawns `make(signal)` as a supervised worker.
    ///
    /// Fails with `ServerError::ShuttingDown` once `shutdown()` has started.
    pub fn spawn<F, Fut>(&self, kind: WorkerKind, make: F) -> Result<Worker, ServerError>
    where
        F: FnOnce(CancelSignal) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let inner = &self.inner;
        inner
            .registry
            .spawn(kind, || !inner.shutting_down.load(Ordering::SeqCst), make)
            .map(|(id, join)| Worker { id, join })
            .ok_or(ServerError::ShuttingDown)
    }

    /// Sends the cooperative stop signal to one worker.
    pub fn cancel(&self, id: WorkerId) {
        if let Some(worker) = self.inner.registry.get(id) {
            worker.cancel();
        }
    }

    /// Forcibly closes one worker and every socket it owns. Idempotent;
    /// returns false if the worker is already gone.
    pub fn force_close(&self, id: WorkerId) -> bool {
        match self.inner.registry.get(id) {
            Some(worker) => {
                worker.cancel();
                worker.force_close();
                true
            }
            None => false,
        }
    }

    pub fn live_workers(&self) -> usize {
        self.inner.registry.len()
    }

    /// Stops every live worker.
    ///
    /// Returns true as soon as the registry is empty, false if workers are
    /// still registered after the configured number of rounds.
    pub async fn shutdown(&self) -> bool {
        self.inner.shutting_down.store(true, Ordering::SeqCst);
        info!("Shutdown requested, {} live workers", self.live_workers());

        for round in 0..self.inner.rounds {
            // later rounds give in-flight I/O time to unwind first
            if round > 0 {
                sleep(self.inner.pause).await;
            }

            let workers = self.inner.registry.snapshot();
            if workers.is_empty() {
                info!("Shutdown complete after {} round(s)", round);
                return true;
            }

            debug!(
                "Shutdown round {}/{}: stopping {} workers",
                round + 1,
                self.inner.rounds,
                workers.len()
            );

            for worker in &workers {
                worker.cancel();
                task::yield_now().await;
                worker.force_close();
                task::yield_now().await;
            }
        }

        let remaining = self.live_workers();
        if remaining == 0 {
            info!("Shutdown complete");
            true
        } else {
            warn!(
                "Shutdown gave up after {} rounds with {} workers still live",
                self.inner.rounds, remaining
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    fn coordinator() -> ShutdownCoordinator {
        ShutdownCoordinator::new(4, Duration::from_millis(20))
    }

    fn peer(port: u16) -> WorkerKind {
        WorkerKind::Session(SocketAddr::from(([127, 0, 0, 1], port)))
    }

    #[tokio::test]
    async fn shutdown_with_no_workers_succeeds() {
        assert!(coordinator().shutdown().await);
    }

    #[tokio::test]
    async fn shutdown_drains_stuck_workers() {
        let coordinator = coordinator();
        for port in 0..5 {
            coordinator
                .spawn(peer(40000 + port), |_| std::future::pending::<()>())
                .unwrap();
        }
        assert_eq!(coordinator.live_workers(), 5);

        assert!(coordinator.shutdown().await);
        assert_eq!(coordinator.live_workers(), 0);
    }

    #[tokio::test]
    async fn no_workers_admitted_after_shutdown() {
        let coordinator = coordinator();
        coordinator.shutdown().await;
        let result = coordinator.spawn(WorkerKind::Acceptor, |_| async {});
        assert!(matches!(result, Err(ServerError::ShuttingDown)));
    }

    #[tokio::test]
    async fn concurrent_shutdowns_and_force_closes_agree() {
        let coordinator = coordinator();
        let ids: Vec<WorkerId> = (0..8)
            .map(|port| {
                coordinator
                    .spawn(peer(41000 + port), |_| std::future::pending::<()>())
                    .unwrap()
                    .id
            })
            .collect();

        let hammer = {
            let coordinator = coordinator.clone();
            let ids = ids.clone();
            tokio::spawn(async move {
                for id in ids {
                    coordinator.force_close(id);
                    coordinator.force_close(id);
                    task::yield_now().await;
                }
            })
        };

        let (first, second) = tokio::join!(coordinator.shutdown(), coordinator.shutdown());
        hammer.await.unwrap();

        assert!(first && second);
        assert!(ids.iter().all(|id| !coordinator.force_close(*id)));
    }

    #[tokio::test]
    async fn force_close_of_unknown_worker_is_a_no_op() {
        let coordinator = coordinator();
        let worker = coordinator.spawn(WorkerKind::Acceptor, |_| async {}).unwrap();
        worker.join.await.unwrap();
        assert!(!coordinator.force_close(worker.id));
    }
}
