//! One-shot cancellable timer used to debounce single-button actions.

use std::{
    sync::mpsc::{Receiver, channel},
    time::Duration,
};

use tokio::{runtime::Handle, time};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Bound on how long a synchronous cancel waits for the timer task.
pub(crate) const STOP_WAIT_TIMEOUT_MS: u64 = 50;

/// A single pending deadline. Cancelling before the deadline guarantees the
/// callback never runs; `cancel_sync` additionally waits for the task to
/// acknowledge so the caller can tear down what the callback touches.
pub(crate) struct PendingTimer {
    token: CancellationToken,
    done_rx: Receiver<()>,
}

impl PendingTimer {
    /// Schedule `on_fire` to run once after `delay` on the given runtime.
    pub(crate) fn arm<F>(rt: &Handle, delay: Duration, on_fire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let token = CancellationToken::new();
        let cancel = token.clone();
        let (done_tx, done_rx) = channel::<()>();
        rt.spawn(async move {
            tokio::select! {
                _ = time::sleep(delay) => {
                    on_fire();
                }
                _ = cancel.cancelled() => {
                    trace!("pending_timer_cancelled");
                }
            }
            let _ = done_tx.send(());
        });
        Self { token, done_rx }
    }

    /// Cancel without waiting.
    pub(crate) fn cancel(&self) {
        self.token.cancel();
    }

    /// Cancel and wait briefly for the task to finish.
    pub(crate) fn cancel_sync(self) {
        self.token.cancel();
        let _ = self
            .done_rx
            .recv_timeout(Duration::from_millis(STOP_WAIT_TIMEOUT_MS));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_time()
            .build()
            .expect("runtime")
    }

    #[test]
    fn fires_after_delay() {
        let rt = runtime();
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        let _timer = PendingTimer::arm(rt.handle(), Duration::from_millis(20), move || {
            f.fetch_add(1, Ordering::SeqCst);
        });
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancel_before_deadline_prevents_fire() {
        let rt = runtime();
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        let timer = PendingTimer::arm(rt.handle(), Duration::from_millis(200), move || {
            f.fetch_add(1, Ordering::SeqCst);
        });
        timer.cancel_sync();
        std::thread::sleep(Duration::from_millis(250));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
