use crate::session::Session;
use log::{debug, info, trace};
use std::sync::Arc;
use std::sync::atomic::Ordering;

impl Session {
    /// Pulls callbacks from the protocol client and routes them, strictly in
    /// arrival order, until the session is stopped.
    pub(crate) async fn dispatch_loop(self: Arc<Self>) {
        info!(target: "Session/Dispatcher", "Starting callback dispatch loop...");
        let _running = scopeguard::guard((), |_| {
            self.is_running.store(false, Ordering::Relaxed);
        });

        while self.is_running.load(Ordering::Relaxed) {
            tokio::select! {
                biased;
                _ = self.shutdown_notifier.notified() => {
                    debug!(target: "Session/Dispatcher", "Shutdown signaled, leaving dispatch loop.");
                    break;
                }
                event = self.protocol.wait_for_event(self.config.poll_interval) => {
                    let Some(event) = event else {
                        continue;
                    };
                    let kind = event.kind();
                    trace!(target: "Session/Dispatcher", "<-- {kind:?}");
                    if !self.router.dispatch(self.clone(), event).await {
                        debug!(target: "Session/Dispatcher", "Unhandled callback {kind:?}");
                    }
                }
            }
        }
        info!(target: "Session/Dispatcher", "Callback dispatch loop has shut down.");
    }
}
