use std::{
    future::Future,
    sync::atomic::{AtomicU64, Ordering},
};

use tokio::{runtime::Handle, task::JoinHandle, time::Instant};

use super::schedule::Schedule;

static NEXT_TIMER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of an armed timer. A firing task acts only while its id is still
/// the one recorded on the owning entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct TimerId(u64);

impl TimerId {
    fn next() -> Self {
        Self(NEXT_TIMER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// An armed entry timer.
///
/// Dropping a `Timer` aborts its task, so removing it from an entry is the
/// cancellation.
#[derive(Debug)]
pub(crate) struct Timer {
    id: TimerId,
    schedule: Schedule,
    due_at: Instant,
    task: Option<JoinHandle<()>>,
}

impl Timer {
    /// Arms a timer by spawning the future produced by `job` onto `runtime`.
    pub(crate) fn spawn<F, Fut>(
        runtime: &Handle,
        schedule: Schedule,
        due_at: Instant,
        job: F,
    ) -> Self
    where
        F: FnOnce(TimerId) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = TimerId::next();
        let task = runtime.spawn(job(id));

        Self {
            id,
            schedule,
            due_at,
            task: Some(task),
        }
    }

    pub(crate) fn id(&self) -> TimerId {
        self.id
    }

    pub(crate) fn schedule(&self) -> Schedule {
        self.schedule
    }

    pub(crate) fn due_at(&self) -> Instant {
        self.due_at
    }

    /// Records the next due instant of a periodic timer after it fired.
    pub(crate) fn advance(&mut self, due_at: Instant) {
        self.due_at = due_at;
    }

    /// Releases the timer without aborting its task. Used by a task that is
    /// retiring its own timer from inside its final firing.
    pub(crate) fn detach(mut self) {
        self.task.take();
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use tokio::time::{sleep, sleep_until, Duration};

    use super::*;

    fn counting_timer(hits: Arc<AtomicUsize>, delay: Duration) -> Timer {
        let schedule = Schedule::once(delay);
        let due_at = schedule.first_due(Instant::now()).unwrap();

        Timer::spawn(&Handle::current(), schedule, due_at, move |_| async move {
            sleep_until(due_at).await;
            hits.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn armed_timer_runs_its_job() {
        let hits = Arc::new(AtomicUsize::new(0));
        let _timer = counting_timer(hits.clone(), Duration::from_millis(10));

        sleep(Duration::from_millis(11)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_a_timer_cancels_it() {
        let hits = Arc::new(AtomicUsize::new(0));
        let timer = counting_timer(hits.clone(), Duration::from_millis(10));

        sleep(Duration::from_millis(5)).await;
        drop(timer);

        sleep(Duration::from_millis(20)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn detached_timer_keeps_running() {
        let hits = Arc::new(AtomicUsize::new(0));
        counting_timer(hits.clone(), Duration::from_millis(10)).detach();

        sleep(Duration::from_millis(11)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn ids_are_unique() {
        let hits = Arc::new(AtomicUsize::new(0));
        let a = counting_timer(hits.clone(), Duration::from_secs(60));
        let b = counting_timer(hits, Duration::from_secs(60));

        assert_ne!(a.id(), b.id());
    }
}
