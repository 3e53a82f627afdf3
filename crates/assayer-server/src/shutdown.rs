//! One-shot shutdown signal shared by the accept loop and its connections.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

/// Tells the accept loop and open connections to stop.
#[derive(Debug, Clone)]
pub(crate) struct ShutdownSignal {
    triggered: Arc<AtomicBool>,
    sender: broadcast::Sender<()>,
}

impl ShutdownSignal {
    pub(crate) fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            triggered: Arc::new(AtomicBool::new(false)),
            sender,
        }
    }

    /// Triggers shutdown. Later calls are no-ops.
    pub(crate) fn trigger(&self) {
        if self
            .triggered
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            // No receivers is fine
            let _ = self.sender.send(());
        }
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Resolves once [`trigger`](Self::trigger) has been called.
    pub(crate) async fn recv(&self) {
        // Subscribe before checking the flag so a concurrent trigger is not missed
        let mut receiver = self.sender.subscribe();
        if self.is_shutdown() {
            return;
        }
        let _ = receiver.recv().await;
    }
}
