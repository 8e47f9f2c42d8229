//! Background task ownership for job watchers.

use std::sync::{Arc, atomic::{AtomicBool, Ordering}};
use tokio::{task::JoinHandle, sync::Notify};

/// A handle to a spawned watch loop.
///
/// The loop is told to stop through a shared `running` flag plus a [`Notify`]
/// that wakes it if it is parked. Dropping the handle stops the loop; the
/// task itself finishes on its own once it observes the flag.
pub(crate) struct WatchWorker {
    /// Cleared when the loop should stop.
    running: Arc<AtomicBool>,

    /// `None` once the worker has been stopped.
    handle: Option<JoinHandle<()>>,

    notifier: Arc<Notify>,
}

impl WatchWorker {
    /// Spawns the loop built by `task`.
    ///
    /// # Parameters
    ///
    /// * `task` - Receives the running flag and the stop notifier, and returns
    ///   the `JoinHandle` of the task it spawned.
    pub fn new<F>(task: F) -> Self
    where
        F: FnOnce(Arc<AtomicBool>, Arc<Notify>) -> JoinHandle<()>,
    {
        let running = Arc::new(AtomicBool::new(true));
        let notifier = Arc::new(Notify::new());
        let handle = task(running.clone(), notifier.clone());

        Self {
            running,
            handle: Some(handle),
            notifier,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Asks the loop to stop without waiting for it.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        // a stored permit wakes the loop even if it is not parked yet
        self.notifier.notify_one();
        self.handle.take();
    }

    /// Asks the loop to stop and waits until the task has exited.
    pub async fn stop_and_join(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.notifier.notify_one();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for WatchWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Resolves once the worker owning `running` has been stopped.
pub(crate) async fn stop_requested(running: &AtomicBool, notifier: &Notify) {
    while running.load(Ordering::SeqCst) {
        notifier.notified().await;
    }
}
