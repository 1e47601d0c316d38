//! Listener registration and callback dispatch
//!
//! All listener callbacks of one manager instance run on a single dispatcher
//! task, the crate's stand-in for a UI/main thread: deliveries are serialized
//! with each other, FIFO per registration, with no ordering guarantee across
//! registrations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

pub(crate) type Job = Box<dyn FnOnce() + Send>;

/// Serialized callback context shared by every registration of one manager.
#[derive(Clone)]
pub(crate) struct Dispatcher {
    tx: mpsc::UnboundedSender<Job>,
}

impl Dispatcher {
    /// Spawn the dispatcher task. Must be called from within a Tokio runtime.
    pub(crate) fn spawn() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                job();
            }
        });
        Self { tx }
    }

    pub(crate) fn enqueue(&self, job: Job) {
        // The dispatcher only stops once every sender is gone, so this can
        // fail only during teardown, where dropping the job is the point.
        let _ = self.tx.send(job);
    }
}

/// Handle for an active push subscription.
///
/// Call [`remove`](ListenerRegistration::remove) to stop receiving updates
/// and release store-side resources; dropping the registration does the
/// same. After cancellation no further deliveries occur, except at most one
/// notification that was already being dispatched.
pub struct ListenerRegistration {
    active: Arc<AtomicBool>,
    cancel_tx: Option<oneshot::Sender<()>>,
}

impl ListenerRegistration {
    pub(crate) fn new(active: Arc<AtomicBool>, cancel_tx: oneshot::Sender<()>) -> Self {
        Self {
            active,
            cancel_tx: Some(cancel_tx),
        }
    }

    /// Removes the listener and stops receiving updates
    pub fn remove(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        self.cancel();
    }
}
