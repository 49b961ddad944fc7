//! Worker registry
//!
//! Maps worker ids to the handles needed to stop them: a cancellation
//! channel for the polite signal and the task's abort handle for forced
//! closure. Workers remove themselves through a drop guard, so an aborted
//! task deregisters as its future is dropped.

use log::debug;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{oneshot, watch};
use tokio::task::{AbortHandle, JoinHandle};

/// Unique identifier for a live worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerId(u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerKind {
    Acceptor,
    Session(SocketAddr),
}

impl fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerKind::Acceptor => write!(f, "acceptor"),
            WorkerKind::Session(peer) => write!(f, "session {}", peer),
        }
    }
}

/// Receiving side of a worker's cancellation signal.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// Resolves once the worker has been asked to stop. Never resolves if
    /// the worker's registration is gone without a cancellation.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

struct WorkerEntry {
    kind: WorkerKind,
    cancel_tx: Arc<watch::Sender<bool>>,
    abort: AbortHandle,
}

/// Snapshot of one worker's stop handles, taken without holding the lock.
#[derive(Clone)]
pub struct WorkerHandle {
    pub id: WorkerId,
    pub kind: WorkerKind,
    cancel_tx: Arc<watch::Sender<bool>>,
    abort: AbortHandle,
}

impl WorkerHandle {
    /// Polite phase: raise the worker's cancellation signal.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    /// Forced phase: abort the task, dropping every socket it owns.
    /// Repeated calls are no-ops.
    pub fn force_close(&self) {
        self.abort.abort();
    }
}

pub struct WorkerRegistry {
    workers: Mutex<HashMap<WorkerId, WorkerEntry>>,
    next_id: AtomicU64,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self {
            workers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<WorkerId, WorkerEntry>> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawns `make(signal)` as a registered worker.
    ///
    /// `admit` is evaluated under the registry lock; when it returns false
    /// the task is released without running `make`'s future. The task waits
    /// on a start gate until its entry is in the map, so it can never
    /// deregister before it was registered. The lock is never held while
    /// the task is spawned or dropped.
    pub fn spawn<F, Fut>(
        self: &Arc<Self>,
        kind: WorkerKind,
        admit: impl FnOnce() -> bool,
        make: F,
    ) -> Option<(WorkerId, JoinHandle<()>)>
    where
        F: FnOnce(CancelSignal) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = WorkerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (start_tx, start_rx) = oneshot::channel::<()>();
        let guard = WorkerGuard {
            registry: Arc::clone(self),
            id,
        };
        let work = make(CancelSignal { rx: cancel_rx });

        let join = tokio::spawn(async move {
            let _guard = guard;
            if start_rx.await.is_ok() {
                work.await;
            }
        });

        {
            let mut workers = self.lock();
            if !admit() {
                debug!("Refused {} as worker {}", kind, id);
                return None;
            }
            workers.insert(
                id,
                WorkerEntry {
                    kind,
                    cancel_tx: Arc::new(cancel_tx),
                    abort: join.abort_handle(),
                },
            );
        }

        if start_tx.send(()).is_err() {
            // the runtime dropped the task before it could start
            self.deregister(id);
            return None;
        }
        debug!("Registered {} as worker {}", kind, id);

        Some((id, join))
    }

    fn deregister(&self, id: WorkerId) {
        if let Some(entry) = self.lock().remove(&id) {
            debug!("Worker {} ({}) finished", id, entry.kind);
        }
    }

    pub fn get(&self, id: WorkerId) -> Option<WorkerHandle> {
        self.lock().get(&id).map(|entry| WorkerHandle {
            id,
            kind: entry.kind,
            cancel_tx: Arc::clone(&entry.cancel_tx),
            abort: entry.abort.clone(),
        })
    }

    pub fn snapshot(&self) -> Vec<WorkerHandle> {
        self.lock()
            .iter()
            .map(|(id, entry)| WorkerHandle {
                id: *id,
                kind: entry.kind,
                cancel_tx: Arc::clone(&entry.cancel_tx),
                abort: entry.abort.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for WorkerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes its worker from the registry when the task's future is dropped,
/// whether it completed or was aborted.
struct WorkerGuard {
    registry: Arc<WorkerRegistry>,
    id: WorkerId,
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.registry.deregister(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn finished_worker_deregisters_itself() {
        let registry = Arc::new(WorkerRegistry::new());
        let (_, join) = registry
            .spawn(WorkerKind::Acceptor, || true, |_| async {})
            .unwrap();
        join.await.unwrap();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn refused_admission_spawns_nothing() {
        let registry = Arc::new(WorkerRegistry::new());
        let spawned = registry.spawn(WorkerKind::Acceptor, || false, |_| async {});
        assert!(spawned.is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn cancel_reaches_a_cooperative_worker() {
        let registry = Arc::new(WorkerRegistry::new());
        let (id, join) = registry
            .spawn(WorkerKind::Acceptor, || true, |mut signal| async move {
                signal.cancelled().await;
            })
            .unwrap();

        registry.get(id).unwrap().cancel();
        tokio::time::timeout(Duration::from_secs(2), join)
            .await
            .unwrap()
            .unwrap();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn force_close_aborts_and_deregisters() {
        let registry = Arc::new(WorkerRegistry::new());
        let (id, join) = registry
            .spawn(WorkerKind::Acceptor, || true, |_| std::future::pending::<()>())
            .unwrap();

        let handle = registry.get(id).unwrap();
        handle.force_close();
        handle.force_close();

        assert!(join.await.unwrap_err().is_cancelled());
        assert!(registry.is_empty());
    }

    #[test]
    fn spawn_on_a_stopped_runtime_leaves_no_entry() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let handle = runtime.handle().clone();
        drop(runtime);

        let _enter = handle.enter();
        let registry = Arc::new(WorkerRegistry::new());
        let spawned = registry.spawn(WorkerKind::Acceptor, || true, |_| async {});

        assert!(spawned.is_none());
        assert!(registry.is_empty());
    }
}
