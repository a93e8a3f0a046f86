use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use super::{ListenerId, ProgressEvent, ProgressInfo, lock};
use crate::event_loop::LoopHandle;

type NewInfoListener = Arc<dyn Fn(&ProgressInfo) + Send + Sync>;

struct Registered {
    info: ProgressInfo,
    finished_listener: ListenerId,
}

struct ManagerInner {
    main_loop: LoopHandle,
    /// Most recently added first
    infos: Mutex<Vec<Registered>>,
    listeners: Mutex<Vec<(ListenerId, NewInfoListener)>>,
    next_listener: AtomicU64,
}

impl ManagerInner {
    fn remove(&self, info: &ProgressInfo) {
        let removed = {
            let mut infos = lock(&self.infos);
            let Some(pos) = infos.iter().position(|r| r.info == *info) else {
                return;
            };
            infos.remove(pos)
        };
        info.disconnect(removed.finished_listener);
        debug!(info = %info.id(), "Operation finished, unregistered");
    }
}

/// Registry of the operations that are currently running.
///
/// Create one at startup and clone it into whatever publishes or lists
/// operations. Records unregister themselves once their `Finished` event
/// has been delivered on the event loop.
#[derive(Clone)]
pub struct ProgressInfoManager {
    inner: Arc<ManagerInner>,
}

impl ProgressInfoManager {
    pub fn new(main_loop: LoopHandle) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                main_loop,
                infos: Mutex::new(Vec::new()),
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(1),
            }),
        }
    }

    /// Create a record bound to this manager's loop and register it
    pub fn new_info(&self) -> ProgressInfo {
        let info = ProgressInfo::new(self.inner.main_loop.clone());
        self.add_new_info(&info);
        info
    }

    /// Register a record and announce it to `connect_new_info` listeners.
    /// Registering the same record twice is a logic error: it is logged and ignored.
    pub fn add_new_info(&self, info: &ProgressInfo) -> bool {
        {
            let mut infos = lock(&self.inner.infos);
            if infos.iter().any(|r| r.info == *info) {
                warn!(info = %info.id(), "Adding two times the same progress info object to the manager");
                return false;
            }

            // Connected while the list is locked so a Finished delivery
            // racing with registration cannot miss the entry
            let weak = Arc::downgrade(&self.inner);
            let finished_listener = info.connect(move |info, event| {
                if event != ProgressEvent::Finished {
                    return;
                }
                if let Some(inner) = weak.upgrade() {
                    inner.remove(info);
                }
            });

            infos.insert(
                0,
                Registered {
                    info: info.clone(),
                    finished_listener,
                },
            );
        }
        debug!(info = %info.id(), "Operation registered");

        let listeners: Vec<NewInfoListener> = lock(&self.inner.listeners)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(info);
        }
        true
    }

    /// Live records, most recently added first
    pub fn all_infos(&self) -> Vec<ProgressInfo> {
        lock(&self.inner.infos)
            .iter()
            .map(|r| r.info.clone())
            .collect()
    }

    /// Called on the registering thread for every newly added record
    pub fn connect_new_info<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&ProgressInfo) + Send + Sync + 'static,
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

    pub fn len(&self) -> usize {
        lock(&self.inner.infos).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ProgressInfoManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressInfoManager")
            .field("infos", &self.len())
            .finish()
    }
}
