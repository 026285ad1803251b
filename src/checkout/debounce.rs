// Cancel-and-reschedule timer, one per owner

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

/// Identifies one scheduled run. A ticket stops being current as soon as a
/// newer run is scheduled or the debouncer is cancelled, which lets a task
/// that already passed its await points drop a result nobody wants.
#[derive(Debug, Clone)]
pub struct Ticket {
    generation: u64,
    latest: Arc<AtomicU64>,
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::SeqCst) == self.generation
    }
}

#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
    latest: Arc<AtomicU64>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Abort whatever is pending and run `task` once `delay` has passed
    /// without another call. Must be called from within a tokio runtime.
    pub fn schedule<F, Fut>(&mut self, task: F) -> Ticket
    where
        F: FnOnce(Ticket) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.abort_pending();
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let ticket = Ticket {
            generation,
            latest: Arc::clone(&self.latest),
        };

        let delay = self.delay;
        let run_ticket = ticket.clone();
        debug!(generation, delay_ms = delay.as_millis() as u64, "Debounced task scheduled");
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task(run_ticket).await;
        }));
        ticket
    }

    /// Drop the pending run, if any, and invalidate outstanding tickets
    pub fn cancel(&mut self) {
        self.abort_pending();
        self.latest.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn abort_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test(start_paused = true)]
    async fn test_only_last_call_fires() {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let mut debouncer = Debouncer::new(Duration::from_millis(300));

        for value in ["07", "077", "0771"] {
            let fired = Arc::clone(&fired);
            debouncer.schedule(move |_| async move {
                fired.lock().unwrap().push(value);
            });
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(*fired.lock().unwrap(), vec!["0771"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_run_and_invalidates_ticket() {
        let fired = Arc::new(Mutex::new(false));
        let mut debouncer = Debouncer::new(Duration::from_millis(300));

        let flag = Arc::clone(&fired);
        let ticket = debouncer.schedule(move |_| async move {
            *flag.lock().unwrap() = true;
        });
        assert!(ticket.is_current());
        assert!(debouncer.is_pending());

        debouncer.cancel();
        assert!(!ticket.is_current());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!*fired.lock().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_pending_task() {
        let fired = Arc::new(Mutex::new(false));
        {
            let mut debouncer = Debouncer::new(Duration::from_millis(300));
            let flag = Arc::clone(&fired);
            debouncer.schedule(move |_| async move {
                *flag.lock().unwrap() = true;
            });
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!*fired.lock().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_schedule_supersedes_ticket() {
        let mut debouncer = Debouncer::new(Duration::from_millis(50));
        let first = debouncer.schedule(|_| async {});
        let second = debouncer.schedule(|_| async {});
        assert!(!first.is_current());
        assert!(second.is_current());
        assert_eq!(second.generation(), first.generation() + 1);
    }
}
