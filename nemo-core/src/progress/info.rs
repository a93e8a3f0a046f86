use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

use super::{CancellationToken, ListenerId, lock};
use crate::event_loop::{LoopHandle, SourceId};

/// Delay used to coalesce status, details and progress updates
pub const SIGNAL_DELAY: Duration = Duration::from_millis(100);

/// Minimum movement (0.5%) before a new progress value is worth a notification
const PROGRESS_NOTIFY_THRESHOLD: f64 = 0.005;

/// Text reported for status and details that were never set
const UNSET_TEXT: &str = "Preparing";

static NEXT_INFO_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a progress record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InfoId(u64);

impl fmt::Display for InfoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Completion of an operation as seen by a reader
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progress {
    /// No known completion fraction (pulsing)
    Indeterminate,
    /// Fraction in `[0, 1]`
    Fraction(f64),
}

/// Notification kinds, listed in delivery order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgressEvent {
    Queued,
    Started,
    Changed,
    ProgressChanged,
    Finished,
}

type Listener = Arc<dyn Fn(&ProgressInfo, ProgressEvent) + Send + Sync>;

/// Notifications waiting for the next delivery
#[derive(Debug, Default, Clone, Copy)]
struct PendingEvents {
    queued: bool,
    started: bool,
    changed: bool,
    progress: bool,
    finished: bool,
}

impl PendingEvents {
    fn events(self) -> impl Iterator<Item = ProgressEvent> {
        [
            (self.queued, ProgressEvent::Queued),
            (self.started, ProgressEvent::Started),
            (self.changed, ProgressEvent::Changed),
            (self.progress, ProgressEvent::ProgressChanged),
            (self.finished, ProgressEvent::Finished),
        ]
        .into_iter()
        .filter_map(|(set, event)| set.then_some(event))
    }
}

#[derive(Debug, Clone, Copy)]
struct ScheduledSource {
    id: SourceId,
    now: bool,
}

enum Delivery {
    Now,
    Delayed,
}

/// Loop work decided under the lock and carried out after releasing it
struct Schedule {
    id: SourceId,
    delay: Option<Duration>,
    replaces: Option<SourceId>,
}

#[derive(Debug, Default)]
struct Stopwatch {
    accumulated: Duration,
    running_since: Option<Instant>,
}

impl Stopwatch {
    fn restart(&mut self) {
        self.accumulated = Duration::ZERO;
        self.running_since = Some(Instant::now());
    }

    fn stop(&mut self) {
        if let Some(since) = self.running_since.take() {
            self.accumulated += since.elapsed();
        }
    }

    fn resume(&mut self) {
        if self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }

    fn elapsed(&self) -> Duration {
        self.accumulated + self.running_since.map_or(Duration::ZERO, |s| s.elapsed())
    }
}

#[derive(Debug, Default)]
struct State {
    status: Option<String>,
    details: Option<String>,
    initial_details: Option<String>,
    progress: f64,
    /// Last value that was flagged for a ProgressChanged delivery
    notified_progress: f64,
    activity_mode: bool,
    queued: bool,
    started: bool,
    finished: bool,
    paused: bool,
    stopwatch: Stopwatch,
    source: Option<ScheduledSource>,
    pending: PendingEvents,
}

impl State {
    /// Decide whether a new loop source is needed. Must be called with the lock held.
    ///
    /// An immediate request replaces a pending delayed source; a delayed
    /// request piggybacks on whatever is already pending.
    fn queue_delivery(&mut self, main_loop: &LoopHandle, delivery: Delivery) -> Option<Schedule> {
        let now = matches!(delivery, Delivery::Now);

        match self.source {
            None => {}
            Some(source) if now && !source.now => {}
            Some(_) => return None,
        }

        let replaces = self.source.map(|s| s.id);
        let id = main_loop.reserve();
        self.source = Some(ScheduledSource { id, now });

        Some(Schedule {
            id,
            delay: if now { None } else { Some(SIGNAL_DELAY) },
            replaces,
        })
    }
}

struct Inner {
    id: InfoId,
    state: Mutex<State>,
    unpaused: Condvar,
    cancellable: CancellationToken,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_listener: AtomicU64,
    main_loop: LoopHandle,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self
            .state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(source) = state.source.take() {
            self.main_loop.remove(source.id);
        }
    }
}

/// Observable state of one file operation.
///
/// Cheap to clone; all clones share the same record. Every method may be
/// called from any thread, while listeners only ever run on the event loop
/// the record was created with.
#[derive(Clone)]
pub struct ProgressInfo {
    inner: Arc<Inner>,
}

impl ProgressInfo {
    pub fn new(main_loop: LoopHandle) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: InfoId(NEXT_INFO_ID.fetch_add(1, Ordering::Relaxed)),
                state: Mutex::new(State::default()),
                unpaused: Condvar::new(),
                cancellable: CancellationToken::new(),
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(1),
                main_loop,
            }),
        }
    }

    pub fn id(&self) -> InfoId {
        self.inner.id
    }

    fn state(&self) -> MutexGuard<'_, State> {
        lock(&self.inner.state)
    }

    /// Mutate under the lock, then talk to the loop once the lock is released
    fn update(&self, mutate: impl FnOnce(&mut State) -> Option<Delivery>) {
        let schedule = {
            let mut state = self.state();
            match mutate(&mut state) {
                Some(delivery) => state.queue_delivery(&self.inner.main_loop, delivery),
                None => None,
            }
        };

        let Some(schedule) = schedule else {
            return;
        };
        if let Some(old) = schedule.replaces {
            self.inner.main_loop.remove(old);
        }
        let weak = Arc::downgrade(&self.inner);
        let id = schedule.id;
        self.inner
            .main_loop
            .attach(id, schedule.delay, move || deliver(&weak, id));
    }

    // Listener registration

    /// Register a listener; it runs on the event loop thread for every delivered event
    pub fn connect<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&ProgressInfo, ProgressEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_listener.fetch_add(1, Ordering::Relaxed));
        lock(&self.inner.listeners).push((id, Arc::new(listener)));
        id
    }

    pub fn disconnect(&self, id: ListenerId) -> bool {
        let mut listeners = lock(&self.inner.listeners);
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    fn emit(&self, event: ProgressEvent) {
        // Snapshot so listeners may connect or disconnect while being called
        let listeners: Vec<Listener> = lock(&self.inner.listeners)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(self, event);
        }
    }

    // Mutators

    pub fn set_status(&self, status: impl Into<String>) {
        let status = status.into();
        self.update(move |state| {
            if state.status.as_deref() == Some(status.as_str()) {
                return None;
            }
            state.status = Some(status);
            state.pending.changed = true;
            Some(Delivery::Delayed)
        });
    }

    pub fn set_details(&self, details: impl Into<String>) {
        let details = details.into();
        self.update(move |state| {
            if state.details.as_deref() == Some(details.as_str()) {
                return None;
            }
            state.details = Some(details);
            state.pending.changed = true;
            Some(Delivery::Delayed)
        });
    }

    /// Summary of the work as it was first described (e.g. "Preparing to copy 3 files")
    pub fn set_initial_details(&self, initial_details: impl Into<String>) {
        let initial_details = initial_details.into();
        self.update(move |state| {
            if state.initial_details.as_deref() == Some(initial_details.as_str()) {
                return None;
            }
            state.initial_details = Some(initial_details);
            state.pending.changed = true;
            Some(Delivery::Delayed)
        });
    }

    /// Record `current / total`. The stored value is always exact; a
    /// notification is only flagged when leaving activity mode or when the
    /// value drifted more than 0.5% from the last notified one.
    pub fn set_progress(&self, current: f64, total: f64) {
        let fraction = progress_fraction(current, total);

        self.update(move |state| {
            let leaving_activity = state.activity_mode;
            state.activity_mode = false;
            state.progress = fraction;

            if leaving_activity
                || (fraction - state.notified_progress).abs() > PROGRESS_NOTIFY_THRESHOLD
            {
                state.notified_progress = fraction;
                state.pending.progress = true;
                Some(Delivery::Delayed)
            } else {
                None
            }
        });
    }

    /// Switch to indeterminate mode
    pub fn pulse_progress(&self) {
        self.update(|state| {
            state.activity_mode = true;
            state.progress = 0.0;
            state.pending.progress = true;
            Some(Delivery::Delayed)
        });
    }

    /// Mark the operation as waiting for its turn
    pub fn queue(&self) {
        self.update(|state| {
            if state.queued {
                return None;
            }
            state.queued = true;
            state.pending.queued = true;
            Some(Delivery::Now)
        });
    }

    pub fn start(&self) {
        self.update(|state| {
            if state.started {
                return None;
            }
            state.started = true;
            if !state.paused {
                state.stopwatch.restart();
            }
            state.pending.started = true;
            Some(Delivery::Now)
        });
    }

    pub fn finish(&self) {
        self.update(|state| {
            if state.finished {
                return None;
            }
            state.finished = true;
            state.stopwatch.stop();
            state.pending.finished = true;
            Some(Delivery::Now)
        });
    }

    pub fn pause(&self) {
        self.update(|state| {
            if !state.paused {
                state.paused = true;
                state.stopwatch.stop();
            }
            None
        });
    }

    pub fn resume(&self) {
        self.update(|state| {
            if state.paused {
                state.paused = false;
                if state.started && !state.finished {
                    state.stopwatch.resume();
                }
            }
            None
        });
        self.inner.unpaused.notify_all();
    }

    /// Request cancellation. Also releases a worker blocked in
    /// [`wait_while_paused`](Self::wait_while_paused).
    pub fn cancel(&self) {
        self.inner.cancellable.cancel();
        self.update(|state| {
            state.paused = false;
            None
        });
        self.inner.unpaused.notify_all();
    }

    /// Block the calling worker while the operation is paused
    pub fn wait_while_paused(&self) {
        let mut state = self.state();
        while state.paused && !self.inner.cancellable.is_cancelled() {
            state = self
                .inner
                .unpaused
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    // Getters

    pub fn status(&self) -> String {
        self.state()
            .status
            .clone()
            .unwrap_or_else(|| UNSET_TEXT.to_string())
    }

    pub fn details(&self) -> String {
        self.state()
            .details
            .clone()
            .unwrap_or_else(|| UNSET_TEXT.to_string())
    }

    pub fn initial_details(&self) -> String {
        self.state()
            .initial_details
            .clone()
            .unwrap_or_else(|| UNSET_TEXT.to_string())
    }

    pub fn progress(&self) -> Progress {
        let state = self.state();
        if state.activity_mode {
            Progress::Indeterminate
        } else {
            Progress::Fraction(state.progress)
        }
    }

    pub fn is_queued(&self) -> bool {
        self.state().queued
    }

    pub fn is_started(&self) -> bool {
        self.state().started
    }

    pub fn is_finished(&self) -> bool {
        self.state().finished
    }

    pub fn is_paused(&self) -> bool {
        self.state().paused
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancellable.is_cancelled()
    }

    pub fn cancellable(&self) -> CancellationToken {
        self.inner.cancellable.clone()
    }

    /// Running time since `start()`, excluding paused stretches
    pub fn elapsed(&self) -> Duration {
        self.state().stopwatch.elapsed()
    }

    /// Linear extrapolation from elapsed time and current fraction
    pub fn estimated_remaining(&self) -> Option<Duration> {
        let state = self.state();
        if state.activity_mode || !state.started || state.finished || state.progress <= 0.0 {
            return None;
        }
        let ratio = (1.0 - state.progress) / state.progress;
        Duration::try_from_secs_f64(state.stopwatch.elapsed().as_secs_f64() * ratio).ok()
    }
}

impl PartialEq for ProgressInfo {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for ProgressInfo {}

impl fmt::Debug for ProgressInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("ProgressInfo")
            .field("id", &self.inner.id)
            .field("status", &state.status)
            .field("details", &state.details)
            .field("progress", &state.progress)
            .field("activity_mode", &state.activity_mode)
            .field("started", &state.started)
            .field("finished", &state.finished)
            .field("paused", &state.paused)
            .finish()
    }
}

fn progress_fraction(current: f64, total: f64) -> f64 {
    if total.is_nan() || total <= 0.0 {
        return 1.0;
    }
    let fraction = current / total;
    if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    }
}

/// Loop callback: flush pending notifications for one record
fn deliver(weak: &Weak<Inner>, source: SourceId) {
    // The strong reference keeps the record alive while listeners run
    let Some(inner) = weak.upgrade() else {
        return;
    };
    let info = ProgressInfo { inner };

    let pending = {
        let mut state = info.state();
        // Replaced or destroyed after this callback was queued
        if state.source.map(|s| s.id) != Some(source) {
            return;
        }
        state.source = None;
        std::mem::take(&mut state.pending)
    };

    for event in pending.events() {
        info.emit(event);
    }
}
