//! Cancellable scheduled tasks: debounce and latest-request-wins.
//!
//! Both primitives spawn onto the ambient tokio runtime. [`Debouncer`] reports
//! a missing runtime to its caller; [`LatestRequest`] must run inside one.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{AbortHandle, JoinHandle};

/// Handle to a scheduled task.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    abort: AbortHandle,
}

impl TaskHandle {
    pub fn cancel(&self) {
        self.abort.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }
}

/// Runs only the last task scheduled within a quiet period.
///
/// Scheduling aborts whatever is still pending, so a burst of calls collapses
/// into one execution `delay` after the final call.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<TaskHandle>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, pending: None }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Cancels the pending task and schedules `task`. Returns `None`, without
    /// running `task`, when called outside a tokio runtime.
    pub fn schedule<F>(&mut self, task: F) -> Option<TaskHandle>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let runtime = tokio::runtime::Handle::try_current().ok()?;
        let delay = self.delay;
        let join = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });
        let handle = TaskHandle {
            abort: join.abort_handle(),
        };
        self.pending = Some(handle.clone());
        Some(handle)
    }

    /// Aborts the pending task. Returns true if one was still waiting.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) if !handle.is_finished() => {
                handle.cancel();
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().map_or(false, |h| !h.is_finished())
    }
}

/// Proof that a request was issued; stale once a newer request begins.
#[derive(Debug, Clone)]
pub struct RequestTicket {
    generation: u64,
    latest: Arc<AtomicU64>,
}

impl RequestTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::SeqCst) == self.generation
    }
}

/// Latest-request-wins guard for auxiliary network calls
/// (search-as-you-type, suggestions).
#[derive(Debug, Default)]
pub struct LatestRequest {
    latest: Arc<AtomicU64>,
    in_flight: Option<AbortHandle>,
}

impl LatestRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidates every earlier ticket and aborts the in-flight request.
    pub fn begin(&mut self) -> RequestTicket {
        if let Some(prev) = self.in_flight.take() {
            prev.abort();
        }
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        RequestTicket {
            generation,
            latest: Arc::clone(&self.latest),
        }
    }

    /// Spawns `request`. Resolves to `None` when a newer request began before
    /// this one finished, so stale responses are never applied.
    pub fn run<F, T>(&mut self, request: F) -> JoinHandle<Option<T>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let ticket = self.begin();
        let join = tokio::spawn(async move {
            let response = request.await;
            ticket.is_current().then_some(response)
        });
        self.in_flight = Some(join.abort_handle());
        join
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_into_single_run() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(1000));

        for _ in 0..5 {
            let runs = Arc::clone(&runs);
            debouncer.schedule(async move {
                runs.fetch_add(1, Ordering::SeqCst);
            });
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_run() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(1000));
        let r = Arc::clone(&runs);
        debouncer.schedule(async move {
            r.fetch_add(1, Ordering::SeqCst);
        });

        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_schedule_outside_runtime_declines() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(10));
        let r = Arc::clone(&runs);
        let handle = debouncer.schedule(async move {
            r.fetch_add(1, Ordering::SeqCst);
        });

        assert!(handle.is_none());
        assert!(!debouncer.is_pending());
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_response_is_dropped() {
        let mut latest = LatestRequest::new();

        let slow = latest.run(async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            "slow"
        });
        let fast = latest.run(async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            "fast"
        });

        assert_eq!(fast.await.unwrap(), Some("fast"));
        // The superseded request was aborted.
        assert!(slow.await.unwrap_err().is_cancelled());
    }

    #[test]
    fn test_ticket_generations() {
        let mut latest = LatestRequest::new();
        let first = latest.begin();
        assert!(first.is_current());
        let second = latest.begin();
        assert!(!first.is_current());
        assert!(second.is_current());
        assert!(second.generation() > first.generation());
    }
}
