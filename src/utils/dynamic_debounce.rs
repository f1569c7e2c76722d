use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Trailing debounce whose delay is chosen by the caller on every call.
///
/// Each call replaces whatever is pending. Once the delay elapses the
/// deferred operation runs on its own task, so a later call never cancels an
/// operation that has already started.
#[derive(Debug, Default)]
pub struct DynamicDebounce {
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl DynamicDebounce {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn call<F>(&self, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut pending = self.pending.lock();
        if let Some(previous) = pending.take() {
            previous.abort();
        }
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(task);
        }));
    }

    pub fn cancel(&self) {
        if let Some(previous) = self.pending.lock().take() {
            previous.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for DynamicDebounce {
    fn drop(&mut self) {
        self.cancel();
    }
}
