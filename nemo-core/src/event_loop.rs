//! Single-threaded dispatch loop.
//!
//! Any thread may schedule work through a [`LoopHandle`]; callbacks only ever
//! run on the thread that owns the [`EventLoop`] and calls one of its
//! dispatch methods. This is the "main loop" that progress notifications are
//! delivered on.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Identifier of a scheduled callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

enum LoopMessage {
    Reserve(SourceId),
    Attach(Source),
    Remove(SourceId),
}

struct Source {
    id: SourceId,
    due: Instant,
    callback: Callback,
}

// BinaryHeap is a max-heap: invert so the earliest due time (then lowest id) pops first
impl Ord for Source {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Source {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Source {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Source {}

/// Thread-safe handle used to schedule callbacks on an [`EventLoop`]
#[derive(Clone)]
pub struct LoopHandle {
    tx: Sender<LoopMessage>,
    next_id: Arc<AtomicU64>,
}

impl LoopHandle {
    /// Reserve an id without attaching anything yet.
    ///
    /// Lets a caller record the id while holding its own lock and attach the
    /// callback after releasing it.
    pub fn reserve(&self) -> SourceId {
        let id = SourceId(self.next_id.fetch_add(1, AtomicOrdering::Relaxed));
        let _ = self.tx.send(LoopMessage::Reserve(id));
        id
    }

    /// Attach a callback under a reserved id. `None` means "as soon as possible".
    pub fn attach<F>(&self, id: SourceId, delay: Option<Duration>, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let due = Instant::now() + delay.unwrap_or_default();
        let _ = self.tx.send(LoopMessage::Attach(Source {
            id,
            due,
            callback: Box::new(callback),
        }));
    }

    /// Run a callback on the next loop iteration
    pub fn idle_add<F>(&self, callback: F) -> SourceId
    where
        F: FnOnce() + Send + 'static,
    {
        let id = self.reserve();
        self.attach(id, None, callback);
        id
    }

    /// Run a callback once `delay` has elapsed
    pub fn timeout_add<F>(&self, delay: Duration, callback: F) -> SourceId
    where
        F: FnOnce() + Send + 'static,
    {
        let id = self.reserve();
        self.attach(id, Some(delay), callback);
        id
    }

    /// Destroy a source. It will not run, even if it has not been attached yet.
    pub fn remove(&self, id: SourceId) {
        let _ = self.tx.send(LoopMessage::Remove(id));
    }
}

impl fmt::Debug for LoopHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopHandle")
            .field("queued_messages", &self.tx.len())
            .finish()
    }
}

/// Owner side of the loop; lives on the UI thread
pub struct EventLoop {
    rx: Receiver<LoopMessage>,
    handle: LoopHandle,
    pending: BinaryHeap<Source>,
    /// Ids currently sitting in `pending` that have not been removed
    live: HashSet<SourceId>,
    /// Reserved ids whose callback has not been attached yet
    reserved: HashSet<SourceId>,
    /// Reserved ids removed before the matching attach
    removed_early: HashSet<SourceId>,
}

impl EventLoop {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            rx,
            handle: LoopHandle {
                tx,
                next_id: Arc::new(AtomicU64::new(1)),
            },
            pending: BinaryHeap::new(),
            live: HashSet::new(),
            reserved: HashSet::new(),
            removed_early: HashSet::new(),
        }
    }

    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    /// Number of sources waiting to run
    pub fn pending(&mut self) -> usize {
        self.drain_messages();
        self.live.len()
    }

    /// Earliest due time among waiting sources
    pub fn next_deadline(&mut self) -> Option<Instant> {
        self.drain_messages();
        self.pending.peek().map(|s| s.due)
    }

    /// Run every source that is due now, without blocking
    pub fn dispatch_ready(&mut self) -> usize {
        self.drain_messages();
        self.fire_due(Instant::now())
    }

    /// Block until at least one source ran or `max_wait` elapsed.
    /// Returns the number of callbacks that ran.
    pub fn iterate(&mut self, max_wait: Duration) -> usize {
        let deadline = Instant::now() + max_wait;

        loop {
            self.drain_messages();
            let now = Instant::now();

            let fired = self.fire_due(now);
            if fired > 0 {
                return fired;
            }
            if now >= deadline {
                return 0;
            }

            let wake = self
                .pending
                .peek()
                .map_or(deadline, |s| s.due.min(deadline));

            match self.rx.recv_timeout(wake.saturating_duration_since(now)) {
                Ok(msg) => self.accept(msg),
                Err(RecvTimeoutError::Timeout) => {}
                // The loop keeps its own sender alive
                Err(RecvTimeoutError::Disconnected) => return 0,
            }
        }
    }

    fn drain_messages(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            self.accept(msg);
        }
    }

    fn accept(&mut self, msg: LoopMessage) {
        match msg {
            LoopMessage::Reserve(id) => {
                self.reserved.insert(id);
            }
            LoopMessage::Attach(source) => {
                self.reserved.remove(&source.id);
                if self.removed_early.remove(&source.id) {
                    return;
                }
                self.live.insert(source.id);
                self.pending.push(source);
            }
            // A reserve is always queued before any remove of the same id.
            // Ids that are neither live nor reserved already ran.
            LoopMessage::Remove(id) => {
                if !self.live.remove(&id) && self.reserved.contains(&id) {
                    self.removed_early.insert(id);
                }
            }
        }
    }

    fn fire_due(&mut self, now: Instant) -> usize {
        let mut fired = 0;

        while self.pending.peek().is_some_and(|s| s.due <= now) {
            let Some(source) = self.pending.pop() else {
                break;
            };
            if !self.live.remove(&source.id) {
                continue;
            }
            (source.callback)();
            fired += 1;
        }

        fired
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<u32>>>, impl Fn(u32) -> Box<dyn FnOnce() + Send>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_for_make = Arc::clone(&log);
        let make = move |n: u32| {
            let log = Arc::clone(&log_for_make);
            Box::new(move || log.lock().unwrap().push(n)) as Box<dyn FnOnce() + Send>
        };
        (log, make)
    }

    #[test]
    fn test_idle_runs_on_dispatch() {
        let mut event_loop = EventLoop::new();
        let (log, make) = recorder();

        event_loop.handle().idle_add(make(1));
        event_loop.handle().idle_add(make(2));

        assert_eq!(event_loop.dispatch_ready(), 2);
        assert_eq!(*log.lock().unwrap(), vec![1, 2]);
        assert_eq!(event_loop.dispatch_ready(), 0);
    }

    #[test]
    fn test_timeout_waits_for_due_time() {
        let mut event_loop = EventLoop::new();
        let (log, make) = recorder();

        event_loop
            .handle()
            .timeout_add(Duration::from_millis(50), make(1));

        assert_eq!(event_loop.dispatch_ready(), 0);
        assert_eq!(event_loop.pending(), 1);

        assert_eq!(event_loop.iterate(Duration::from_secs(2)), 1);
        assert_eq!(*log.lock().unwrap(), vec![1]);
    }

    #[test]
    fn test_iterate_gives_up_after_max_wait() {
        let mut event_loop = EventLoop::new();
        let (_log, make) = recorder();

        event_loop.handle().timeout_add(Duration::from_secs(60), make(1));
        assert_eq!(event_loop.iterate(Duration::from_millis(10)), 0);
        assert_eq!(event_loop.pending(), 1);
    }

    #[test]
    fn test_removed_source_never_runs() {
        let mut event_loop = EventLoop::new();
        let handle = event_loop.handle();
        let (log, make) = recorder();

        let id = handle.idle_add(make(1));
        handle.remove(id);
        handle.idle_add(make(2));

        assert_eq!(event_loop.dispatch_ready(), 1);
        assert_eq!(*log.lock().unwrap(), vec![2]);
    }

    #[test]
    fn test_remove_before_attach() {
        let mut event_loop = EventLoop::new();
        let handle = event_loop.handle();
        let (log, make) = recorder();

        let id = handle.reserve();
        handle.remove(id);
        handle.attach(id, None, make(1));

        assert_eq!(event_loop.dispatch_ready(), 0);
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(event_loop.pending(), 0);
        assert!(event_loop.reserved.is_empty());
        assert!(event_loop.removed_early.is_empty());
    }

    #[test]
    fn test_remove_after_run_is_forgotten() {
        let mut event_loop = EventLoop::new();
        let handle = event_loop.handle();
        let (log, make) = recorder();

        let ran = handle.idle_add(make(1));
        let delayed = handle.timeout_add(Duration::from_secs(60), make(2));
        assert_eq!(event_loop.dispatch_ready(), 1);

        // Late removals, as when a replacement races the delivery it replaces
        handle.remove(ran);
        handle.remove(ran);
        handle.remove(delayed);
        assert_eq!(event_loop.pending(), 0);
        assert!(event_loop.reserved.is_empty());
        assert!(event_loop.removed_early.is_empty());
        assert_eq!(*log.lock().unwrap(), vec![1]);
    }

    #[test]
    fn test_callbacks_from_other_threads() {
        let mut event_loop = EventLoop::new();
        let handle = event_loop.handle();
        let (log, make) = recorder();

        let make = Arc::new(make);
        let workers: Vec<_> = (0..4)
            .map(|n| {
                let handle = handle.clone();
                let make = Arc::clone(&make);
                std::thread::spawn(move || {
                    handle.idle_add(make(n));
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(event_loop.dispatch_ready(), 4);
        let mut seen = log.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }
}
