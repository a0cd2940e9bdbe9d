//! One-second countdown timer driven by the tokio runtime

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::{
    runtime::Handle,
    task::JoinHandle,
    time::{interval_at, Instant},
};
use tracing::{debug, info};

use super::{
    countdown::{Countdown, Firing, TimerPhase},
    error::TimerError,
};

const TICK_PERIOD: Duration = Duration::from_secs(1);

type TickCallback = Box<dyn FnMut(u64) + Send + 'static>;
type TimeoutCallback = Box<dyn FnMut(&ExpiredCycle) + Send + 'static>;

/// Timing of a cycle that ran out, captured at the firing that expired it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiredCycle {
    pub duration_seconds: u64,
    /// Wall-clock seconds from the last start to expiry, paused time included
    pub question_time_seconds: u64,
    pub expired_at: DateTime<Utc>,
}

struct Inner {
    countdown: Countdown,
    started_at: Instant,
    started_at_utc: DateTime<Utc>,
    task: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct Callbacks {
    on_tick: Option<TickCallback>,
    on_timeout: Option<TimeoutCallback>,
}

struct Shared {
    inner: Mutex<Inner>,
    callbacks: Mutex<Callbacks>,
}

impl Shared {
    fn lock_inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_callbacks(&self) -> MutexGuard<'_, Callbacks> {
        self.callbacks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Handle one firing; returns whether the schedule should keep running
    fn fire(&self, generation: u64) -> bool {
        // The countdown lock is released before callbacks run so they can
        // call back into the timer.
        let (firing, expired) = {
            let mut inner = self.lock_inner();
            let firing = inner.countdown.fire(generation);
            let expired = (firing == Firing::Expired).then(|| {
                inner.task = None;
                ExpiredCycle {
                    duration_seconds: inner.countdown.duration(),
                    question_time_seconds: inner.started_at.elapsed().as_secs(),
                    expired_at: Utc::now(),
                }
            });
            (firing, expired)
        };

        match firing {
            Firing::Stale => false,
            Firing::Paused => true,
            Firing::Tick(remaining) => {
                debug!("Timer tick: {}s remaining", remaining);
                if let Some(on_tick) = self.lock_callbacks().on_tick.as_mut() {
                    on_tick(remaining);
                }
                true
            }
            Firing::Expired => {
                info!("Timer expired");
                let mut callbacks = self.lock_callbacks();
                if let Some(on_tick) = callbacks.on_tick.as_mut() {
                    on_tick(0);
                }
                if let (Some(on_timeout), Some(cycle)) = (callbacks.on_timeout.as_mut(), expired.as_ref()) {
                    on_timeout(cycle);
                }
                false
            }
        }
    }
}

/// Pausable, resettable one-second countdown with tick and timeout callbacks.
///
/// The schedule runs as a tokio task that holds only a weak reference to the
/// timer; dropping the `Timer` cancels it.
///
/// A firing settles the countdown under the state lock, then releases it
/// before invoking callbacks, so callbacks may call `stop`, `pause` or
/// `reset` on the same timer. On a multi-thread runtime this leaves a window:
/// a firing that decremented just before another thread's `stop()` or
/// `reset()` still delivers its `on_tick`/`on_timeout` after that call
/// returns. The countdown itself never changes after `stop()` returns, and
/// the late callback reports the value of the firing that produced it.
///
/// ```no_run
/// # async fn demo() -> Result<(), quiz_timer::TimerError> {
/// use quiz_timer::Timer;
///
/// let timer = Timer::new(30)?
///     .on_tick(|remaining| println!("{remaining}s left"))
///     .on_timeout(|| println!("time is up"));
/// timer.start()?;
/// # Ok(())
/// # }
/// ```
pub struct Timer {
    shared: Arc<Shared>,
}

impl Timer {
    /// Create an idle timer counting down `duration` seconds
    pub fn new(duration: u64) -> Result<Self, TimerError> {
        let countdown = Countdown::new(duration)?;
        Ok(Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    countdown,
                    started_at: Instant::now(),
                    started_at_utc: Utc::now(),
                    task: None,
                }),
                callbacks: Mutex::new(Callbacks::default()),
            }),
        })
    }

    /// Register the callback invoked with the remaining seconds after every decrement
    pub fn on_tick<F>(self, callback: F) -> Self
    where
        F: FnMut(u64) + Send + 'static,
    {
        self.shared.lock_callbacks().on_tick = Some(Box::new(callback));
        self
    }

    /// Register the callback invoked once when the countdown reaches zero
    pub fn on_timeout<F>(self, mut callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.on_expired(move |_| callback())
    }

    /// Like [`on_timeout`](Self::on_timeout), but receives the timing of the
    /// expired cycle as it was when the last tick fired. Replaces any
    /// timeout callback set before.
    pub fn on_expired<F>(self, callback: F) -> Self
    where
        F: FnMut(&ExpiredCycle) + Send + 'static,
    {
        self.shared.lock_callbacks().on_timeout = Some(Box::new(callback));
        self
    }

    /// Start counting down; the first tick fires one second from now.
    ///
    /// Starting a timer that is already running, or that has expired and not
    /// been reset, does nothing.
    pub fn start(&self) -> Result<(), TimerError> {
        let runtime = Handle::try_current().map_err(|_| TimerError::NoRuntime)?;

        let mut inner = self.shared.lock_inner();
        let Some(generation) = inner.countdown.start() else {
            debug!("Timer start ignored in phase {:?}", inner.countdown.phase());
            return Ok(());
        };

        let now = Instant::now();
        inner.started_at = now;
        inner.started_at_utc = Utc::now();
        inner.task = Some(runtime.spawn(run_schedule(
            Arc::downgrade(&self.shared),
            generation,
            now + TICK_PERIOD,
        )));

        info!("Timer started with {}s remaining", inner.countdown.remaining());
        Ok(())
    }

    /// Cancel the schedule, keeping the remaining time. Idempotent.
    pub fn stop(&self) {
        let mut inner = self.shared.lock_inner();
        let was_running = inner.countdown.stop();
        if let Some(task) = inner.task.take() {
            task.abort();
        }
        if was_running {
            info!("Timer stopped with {}s remaining", inner.countdown.remaining());
        }
    }

    pub fn pause(&self) {
        self.shared.lock_inner().countdown.pause();
        debug!("Timer paused");
    }

    pub fn resume(&self) {
        self.shared.lock_inner().countdown.resume();
        debug!("Timer resumed");
    }

    /// Stop and restore a full countdown of `duration` seconds without
    /// restarting. `None` keeps the current duration.
    pub fn reset(&self, duration: Option<u64>) -> Result<(), TimerError> {
        let mut inner = self.shared.lock_inner();
        let duration = duration.unwrap_or_else(|| inner.countdown.duration());
        inner.countdown.reset(duration)?;
        if let Some(task) = inner.task.take() {
            task.abort();
        }
        inner.started_at = Instant::now();
        inner.started_at_utc = Utc::now();

        info!("Timer reset to {}s", duration);
        Ok(())
    }

    pub fn time_remaining(&self) -> u64 {
        self.shared.lock_inner().countdown.remaining()
    }

    /// Seconds counted down in the current cycle (duration minus remaining)
    pub fn time_spent(&self) -> u64 {
        self.shared.lock_inner().countdown.spent()
    }

    /// Whole wall-clock seconds since the last start or reset, paused time included
    pub fn question_time(&self) -> u64 {
        self.shared.lock_inner().started_at.elapsed().as_secs()
    }

    pub fn duration(&self) -> u64 {
        self.shared.lock_inner().countdown.duration()
    }

    pub fn is_paused(&self) -> bool {
        self.shared.lock_inner().countdown.is_paused()
    }

    pub fn phase(&self) -> TimerPhase {
        self.shared.lock_inner().countdown.phase()
    }

    /// Consistent copy of the countdown, taken under a single lock
    pub fn countdown(&self) -> Countdown {
        self.shared.lock_inner().countdown.clone()
    }

    /// UTC timestamp of the last start or reset
    pub fn started_at(&self) -> DateTime<Utc> {
        self.shared.lock_inner().started_at_utc
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.lock_inner();
        f.debug_struct("Timer")
            .field("countdown", &inner.countdown)
            .field("started_at", &inner.started_at_utc)
            .finish()
    }
}

/// Recurring one-second schedule for a single start cycle
async fn run_schedule(shared: Weak<Shared>, generation: u64, first_tick: Instant) {
    let mut interval = interval_at(first_tick, TICK_PERIOD);

    loop {
        interval.tick().await;

        let Some(shared) = shared.upgrade() else {
            break;
        };
        if !shared.fire(generation) {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        OnceLock,
    };
    use tokio::time::sleep;

    use super::*;

    struct Recorder {
        ticks: Arc<Mutex<Vec<u64>>>,
        timeouts: Arc<AtomicUsize>,
    }

    impl Recorder {
        fn ticks(&self) -> Vec<u64> {
            self.ticks.lock().unwrap().clone()
        }

        fn timeouts(&self) -> usize {
            self.timeouts.load(Ordering::SeqCst)
        }
    }

    fn recorded(duration: u64) -> (Timer, Recorder) {
        let ticks = Arc::new(Mutex::new(Vec::new()));
        let timeouts = Arc::new(AtomicUsize::new(0));
        let tick_log = Arc::clone(&ticks);
        let timeout_count = Arc::clone(&timeouts);

        let timer = Timer::new(duration)
            .unwrap()
            .on_tick(move |remaining| tick_log.lock().unwrap().push(remaining))
            .on_timeout(move || {
                timeout_count.fetch_add(1, Ordering::SeqCst);
            });
        (timer, Recorder { ticks, timeouts })
    }

    /// Let `seconds` firings happen, landing half a second past the last one
    async fn elapse(seconds: u64) {
        sleep(Duration::from_millis(seconds * 1000 + 500)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_second_countdown() {
        let (timer, recorder) = recorded(3);
        timer.start().unwrap();

        elapse(3).await;

        assert_eq!(recorder.ticks(), vec![2, 1, 0]);
        assert_eq!(recorder.timeouts(), 1);
        assert_eq!(timer.time_remaining(), 0);
        assert_eq!(timer.phase(), TimerPhase::Expired);

        elapse(5).await;
        assert_eq!(recorder.timeouts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_holds_remaining_time() {
        let (timer, recorder) = recorded(5);
        timer.start().unwrap();

        elapse(2).await;
        timer.pause();
        assert_eq!(timer.phase(), TimerPhase::Paused);

        sleep(Duration::from_secs(10)).await;
        assert_eq!(timer.time_remaining(), 3);
        timer.resume();

        sleep(Duration::from_secs(1)).await;
        assert_eq!(timer.time_remaining(), 2);
        assert_eq!(recorder.ticks(), vec![4, 3, 2]);
        assert_eq!(recorder.timeouts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_silences_callbacks() {
        let (timer, recorder) = recorded(5);
        timer.start().unwrap();

        elapse(2).await;
        timer.stop();
        timer.stop();
        assert_eq!(timer.phase(), TimerPhase::Idle);

        elapse(10).await;
        assert_eq!(timer.time_remaining(), 3);
        assert_eq!(recorder.ticks(), vec![4, 3]);
        assert_eq!(recorder.timeouts(), 0);

        // starting again continues from the preserved remaining time
        timer.start().unwrap();
        elapse(3).await;
        assert_eq!(recorder.ticks(), vec![4, 3, 2, 1, 0]);
        assert_eq!(recorder.timeouts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_start_is_ignored() {
        let (timer, recorder) = recorded(3);
        timer.start().unwrap();
        timer.start().unwrap();

        elapse(1).await;
        timer.start().unwrap();
        elapse(4).await;

        assert_eq!(recorder.ticks(), vec![2, 1, 0]);
        assert_eq!(recorder.timeouts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_from_each_phase() {
        let (timer, recorder) = recorded(4);

        timer.start().unwrap();
        elapse(1).await;
        timer.reset(Some(6)).unwrap();
        assert_eq!((timer.time_remaining(), timer.duration()), (6, 6));
        assert_eq!(timer.phase(), TimerPhase::Idle);

        timer.start().unwrap();
        timer.pause();
        timer.reset(None).unwrap();
        assert_eq!(timer.time_remaining(), 6);
        assert!(!timer.is_paused());

        timer.reset(Some(2)).unwrap();
        timer.start().unwrap();
        elapse(2).await;
        assert_eq!(timer.phase(), TimerPhase::Expired);
        assert_eq!(recorder.timeouts(), 1);

        timer.reset(Some(2)).unwrap();
        assert_eq!(timer.time_remaining(), 2);
        assert_eq!(timer.time_spent(), 0);
        timer.start().unwrap();
        elapse(2).await;
        assert_eq!(recorder.timeouts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_question_time_includes_paused_time() {
        let (timer, _recorder) = recorded(30);
        timer.start().unwrap();

        elapse(2).await;
        timer.pause();
        sleep(Duration::from_secs(5)).await;

        assert_eq!(timer.time_spent(), 2);
        assert_eq!(timer.question_time(), 7);

        timer.reset(None).unwrap();
        assert_eq!(timer.question_time(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_timer_ends_schedule() {
        let (timer, recorder) = recorded(5);
        timer.start().unwrap();
        elapse(1).await;
        drop(timer);

        elapse(10).await;
        assert_eq!(recorder.ticks(), vec![4]);
        assert_eq!(recorder.timeouts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_cycle_outlives_reset() {
        let captured = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&captured);
        let timer = Timer::new(3)
            .unwrap()
            .on_expired(move |cycle| *slot.lock().unwrap() = Some(*cycle));

        timer.start().unwrap();
        elapse(1).await;
        timer.pause();
        sleep(Duration::from_secs(4)).await;
        timer.resume();
        elapse(2).await;

        // the next question starts before anyone looks at the expiry
        timer.reset(Some(10)).unwrap();

        let cycle = captured.lock().unwrap().take().unwrap();
        assert_eq!(cycle.duration_seconds, 3);
        assert_eq!(cycle.question_time_seconds, 7);
        assert_eq!(timer.duration(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_can_stop_its_own_timer() {
        let handle: Arc<OnceLock<Weak<Timer>>> = Arc::new(OnceLock::new());
        let ticks = Arc::new(Mutex::new(Vec::new()));

        let own = Arc::clone(&handle);
        let tick_log = Arc::clone(&ticks);
        let timer = Arc::new(Timer::new(5).unwrap().on_tick(move |remaining| {
            tick_log.lock().unwrap().push(remaining);
            if remaining == 3 {
                if let Some(timer) = own.get().and_then(Weak::upgrade) {
                    timer.stop();
                }
            }
        }));
        handle.set(Arc::downgrade(&timer)).unwrap();

        timer.start().unwrap();
        elapse(10).await;

        assert_eq!(*ticks.lock().unwrap(), vec![4, 3]);
        assert_eq!(timer.time_remaining(), 3);
        assert_eq!(timer.phase(), TimerPhase::Idle);
    }

    #[test]
    fn test_start_requires_runtime() {
        let timer = Timer::new(3).unwrap();
        assert_eq!(timer.start(), Err(TimerError::NoRuntime));
        assert_eq!(timer.phase(), TimerPhase::Idle);
    }

    #[test]
    fn test_invalid_durations() {
        assert_eq!(Timer::new(0).unwrap_err(), TimerError::InvalidDuration(0));

        let timer = Timer::new(3).unwrap();
        assert_eq!(timer.reset(Some(0)), Err(TimerError::InvalidDuration(0)));
        assert_eq!(timer.duration(), 3);
    }
}
