use crate::CacheError;
use crate::cache::Shared;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::debug;

/// One-shot stop flag the sweep worker sleeps on between sweeps.
#[derive(Debug, Default)]
pub(crate) struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl StopSignal {
    pub(crate) fn stop(&self) {
        *self.stopped.lock() = true;
        self.wake.notify_all();
    }

    pub(crate) fn is_stopped(&self) -> bool {
        *self.stopped.lock()
    }

    /// Sleeps for `timeout` unless stopped earlier. Returns whether the signal is stopped.
    pub(crate) fn wait_for(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut stopped = self.stopped.lock();

        while !*stopped {
            if self.wake.wait_until(&mut stopped, deadline).timed_out() {
                break;
            }
        }

        *stopped
    }
}

/// Spawns the thread that applies queued touches to the recency list.
///
/// It exits once the touch queue is closed and drained.
pub(crate) fn spawn_maintenance(shared: Arc<Shared>) -> Result<JoinHandle<()>, CacheError> {
    spawn("config-lru-maintenance", move || {
        debug!("maintenance worker started");
        while shared.touches.wait() {
            shared.apply_touches();
        }
        debug!("maintenance worker stopped");
    })
}

/// Spawns the thread that sweeps the cache every `sweep_interval` until stopped.
pub(crate) fn spawn_sweeper(shared: Arc<Shared>) -> Result<JoinHandle<()>, CacheError> {
    spawn("config-lru-sweeper", move || {
        debug!(interval = ?shared.config.sweep_interval, "sweep worker started");
        while !shared.stop.wait_for(shared.config.sweep_interval) {
            shared.sweep();
        }
        debug!("sweep worker stopped");
    })
}

fn spawn<F>(name: &str, f: F) -> Result<JoinHandle<()>, CacheError>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_owned())
        .spawn(f)
        .map_err(|err| CacheError::WorkerSpawn(err.to_string()))
}
