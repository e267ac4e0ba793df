//! UI-update channel.
//!
//! Worker threads never hold a reference to UI state. They post boxed
//! closures through a [`UiSender`]; the interactive thread owns the
//! [`Dispatcher`] and applies those closures to the state it owns, in the
//! order they were posted. Delayed callbacks and repeating timers (the
//! metrics ticker, the progress reset after a task) live in the same
//! dispatcher so a single `shutdown` cancels all of them.
//!
//! ```
//! use rboost::core::dispatch::Dispatcher;
//!
//! let mut dispatcher: Dispatcher<Vec<&'static str>> = Dispatcher::new();
//! let ui = dispatcher.sender();
//!
//! std::thread::spawn(move || {
//!     ui.post(|log| log.push("from worker"));
//! })
//! .join()
//! .unwrap();
//!
//! let mut log = Vec::new();
//! dispatcher.pump(&mut log);
//! assert_eq!(log, vec!["from worker"]);
//! ```

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc};

/// A deferred mutation of the UI state, executed on the interactive thread.
pub type UiUpdate<S> = Box<dyn FnOnce(&mut S) + Send + 'static>;

type RepeatingTick<S> = Box<dyn FnMut(&mut S, Instant) + 'static>;

const MIN_TIMER_PERIOD: Duration = Duration::from_millis(1);

enum Envelope<S> {
    Now(UiUpdate<S>),
    At { due: Instant, update: UiUpdate<S> },
}

/// Cloneable, thread-safe handle used to post updates to the interactive loop.
pub struct UiSender<S> {
    tx: mpsc::UnboundedSender<Envelope<S>>,
}

impl<S> Clone for UiSender<S> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<S> UiSender<S> {
    /// Enqueue `update` to run on the interactive thread.
    ///
    /// Returns `false` when the interactive loop has already shut down; the
    /// update is dropped in that case.
    pub fn post<F>(&self, update: F) -> bool
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        self.send(Envelope::Now(Box::new(update)))
    }

    /// Enqueue `update` to run on the interactive thread no earlier than
    /// `delay` from now.
    pub fn post_after<F>(&self, delay: Duration, update: F) -> bool
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        self.send(Envelope::At {
            due: Instant::now() + delay,
            update: Box::new(update),
        })
    }

    /// Whether the receiving dispatcher is gone or shut down.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send(&self, envelope: Envelope<S>) -> bool {
        match self.tx.send(envelope) {
            Ok(()) => true,
            Err(_) => {
                log::debug!("UI update dropped: interactive loop has shut down");
                false
            }
        }
    }
}

/// Stop token for a repeating timer.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
}

impl TimerHandle {
    fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Stop the timer. Its next scheduled tick is discarded.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

enum Callback<S> {
    Once(UiUpdate<S>),
    Repeating {
        period: Duration,
        tick: RepeatingTick<S>,
        handle: TimerHandle,
    },
}

struct Scheduled<S> {
    due: Instant,
    seq: u64,
    callback: Callback<S>,
}

impl<S> PartialEq for Scheduled<S> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl<S> Eq for Scheduled<S> {}

impl<S> PartialOrd for Scheduled<S> {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl<S> Ord for Scheduled<S> {
    // BinaryHeap is a max-heap: invert so the earliest (due, seq) pops first.
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Why an async run of the dispatcher returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    Done,
    Shutdown,
}

/// What woke the async driver up.
enum Wake<S> {
    Message(Option<Envelope<S>>),
    Timer,
    Shutdown,
}

/// Interactive-thread side of the UI-update channel.
pub struct Dispatcher<S> {
    tx: mpsc::UnboundedSender<Envelope<S>>,
    rx: mpsc::UnboundedReceiver<Envelope<S>>,
    timers: BinaryHeap<Scheduled<S>>,
    next_seq: u64,
    closed: bool,
}

impl<S> Default for Dispatcher<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Dispatcher<S> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx,
            timers: BinaryHeap::new(),
            next_seq: 0,
            closed: false,
        }
    }

    /// Create a sender that posts into this dispatcher.
    pub fn sender(&self) -> UiSender<S> {
        UiSender {
            tx: self.tx.clone(),
        }
    }

    /// Install a repeating timer whose first tick is one `period` from now.
    pub fn every<F>(&mut self, period: Duration, tick: F) -> TimerHandle
    where
        F: FnMut(&mut S, Instant) + 'static,
    {
        self.every_after(period, period, tick)
    }

    /// Install a repeating timer whose first tick is `initial_delay` from now.
    ///
    /// A tick that runs late fires once and the next one is scheduled a full
    /// period after the late instant; missed ticks are skipped.
    pub fn every_after<F>(&mut self, initial_delay: Duration, period: Duration, tick: F) -> TimerHandle
    where
        F: FnMut(&mut S, Instant) + 'static,
    {
        let handle = TimerHandle::new();
        if self.closed {
            handle.cancel();
            return handle;
        }

        let due = Instant::now() + initial_delay;
        self.schedule(
            due,
            Callback::Repeating {
                period: period.max(MIN_TIMER_PERIOD),
                tick: Box::new(tick),
                handle: handle.clone(),
            },
        );
        handle
    }

    /// Number of delayed callbacks and timers still scheduled.
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Earliest instant at which a scheduled callback becomes due.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.peek().map(|entry| entry.due)
    }

    pub fn is_shut_down(&self) -> bool {
        self.closed
    }

    /// Apply everything that is ready as of now.
    pub fn pump(&mut self, state: &mut S) -> usize {
        self.pump_at(state, Instant::now())
    }

    /// Apply every queued update in arrival order, then every scheduled
    /// callback due at `now` in (due, insertion) order. Updates posted by
    /// those callbacks are taken in by the same pump. Returns the number of
    /// callbacks executed.
    pub fn pump_at(&mut self, state: &mut S, now: Instant) -> usize {
        if self.closed {
            return 0;
        }

        let mut applied = 0;
        loop {
            while let Ok(envelope) = self.rx.try_recv() {
                applied += self.accept(envelope, state);
            }
            let fired = self.fire_due(state, now);
            applied += fired;
            if fired == 0 {
                return applied;
            }
        }
    }

    /// Cancel every pending delayed callback and repeating timer. Updates
    /// posted afterwards are discarded.
    pub fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let cancelled = self.timers.len();
        for entry in self.timers.drain() {
            if let Callback::Repeating { handle, .. } = entry.callback {
                handle.cancel();
            }
        }
        self.rx.close();
        while self.rx.try_recv().is_ok() {}

        log::info!("UI dispatcher shut down, cancelled {} scheduled callbacks", cancelled);
    }

    /// Drive the dispatcher until `done` reports true or `shutdown` fires.
    ///
    /// Meant to be the body of a single-threaded tokio runtime: it never
    /// blocks, it only waits for the next posted update, the next timer
    /// deadline or the shutdown signal. A shutdown signal also shuts the
    /// dispatcher down; returning on `done` leaves it running.
    pub async fn run_until<D>(
        &mut self,
        state: &mut S,
        shutdown: &mut broadcast::Receiver<()>,
        done: D,
    ) -> RunExit
    where
        D: Fn(&S) -> bool,
    {
        self.drive(state, shutdown, |state, _| done(state)).await
    }

    /// Drive the dispatcher until nothing is scheduled any more, e.g. until
    /// the delayed follow-ups of a finished task have fired.
    pub async fn run_until_idle(
        &mut self,
        state: &mut S,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> RunExit {
        self.drive(state, shutdown, |_, pending| pending == 0).await
    }

    async fn drive<D>(
        &mut self,
        state: &mut S,
        shutdown: &mut broadcast::Receiver<()>,
        done: D,
    ) -> RunExit
    where
        D: Fn(&S, usize) -> bool,
    {
        loop {
            self.pump(state);
            if self.closed {
                return RunExit::Shutdown;
            }
            if done(state, self.timers.len()) {
                return RunExit::Done;
            }

            let deadline = self.next_deadline();
            let wake = tokio::select! {
                envelope = self.rx.recv() => Wake::Message(envelope),
                _ = sleep_until_deadline(deadline) => Wake::Timer,
                _ = shutdown.recv() => Wake::Shutdown,
            };

            match wake {
                Wake::Message(Some(envelope)) => {
                    self.accept(envelope, state);
                }
                Wake::Message(None) => return RunExit::Shutdown,
                Wake::Timer => {}
                Wake::Shutdown => {
                    log::info!("Shutdown requested, stopping interactive loop");
                    self.shutdown();
                    return RunExit::Shutdown;
                }
            }
        }
    }

    fn accept(&mut self, envelope: Envelope<S>, state: &mut S) -> usize {
        match envelope {
            Envelope::Now(update) => {
                update(state);
                1
            }
            Envelope::At { due, update } => {
                self.schedule(due, Callback::Once(update));
                0
            }
        }
    }

    fn schedule(&mut self, due: Instant, callback: Callback<S>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.timers.push(Scheduled { due, seq, callback });
    }

    fn fire_due(&mut self, state: &mut S, now: Instant) -> usize {
        let mut fired = 0;

        while self.timers.peek().is_some_and(|entry| entry.due <= now) {
            let Some(entry) = self.timers.pop() else {
                break;
            };

            match entry.callback {
                Callback::Once(update) => {
                    update(state);
                    fired += 1;
                }
                Callback::Repeating {
                    period,
                    mut tick,
                    handle,
                } => {
                    if handle.is_cancelled() {
                        continue;
                    }
                    tick(state, now);
                    fired += 1;

                    if handle.is_cancelled() {
                        continue;
                    }
                    let mut next = entry.due + period;
                    if next <= now {
                        next = now + period;
                    }
                    self.schedule(
                        next,
                        Callback::Repeating {
                            period,
                            tick,
                            handle,
                        },
                    );
                }
            }
        }

        fired
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending::<()>().await,
    }
}
