use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, unbounded};
use nemo_core::{
    FileOperation, InfoId, LoopHandle, NemoError, OperationKind, OperationReport, ProgressEvent,
    ProgressInfo, ProgressInfoManager, format_count, format_size,
};
use tracing::{debug, info, warn};

/// A progress notification forwarded to the UI thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationEvent {
    pub info: InfoId,
    pub event: ProgressEvent,
}

struct Worker {
    info: ProgressInfo,
    kind: OperationKind,
    handle: JoinHandle<nemo_core::Result<OperationReport>>,
}

/// Running file operations and the manager that lists them
pub struct Operations {
    manager: ProgressInfoManager,
    events: Receiver<OperationEvent>,
    /// Oldest first
    workers: Vec<Worker>,
}

impl Operations {
    pub fn new(main_loop: LoopHandle) -> Self {
        let manager = ProgressInfoManager::new(main_loop);
        let (tx, rx) = unbounded();
        manager.connect_new_info(move |info| {
            let tx = tx.clone();
            info.connect(move |info, event| {
                let _ = tx.send(OperationEvent {
                    info: info.id(),
                    event,
                });
            });
        });

        Self {
            manager,
            events: rx,
            workers: Vec::new(),
        }
    }

    /// Register a record for `operation` and run it on a worker thread
    pub fn start(&mut self, operation: FileOperation) -> InfoId {
        let info = self.manager.new_info();
        info.queue();
        let kind = operation.kind();
        info!(info = %info.id(), operation = kind.verb(), "Starting operation");

        let handle = operation.spawn(info.clone());
        let id = info.id();
        self.workers.push(Worker { info, kind, handle });
        id
    }

    /// Records still listed by the manager, newest first
    pub fn infos(&self) -> Vec<ProgressInfo> {
        self.manager.all_infos()
    }

    pub fn drain_events(&self) -> Vec<OperationEvent> {
        self.events.try_iter().collect()
    }

    /// Join workers whose thread has exited and describe how each one ended
    pub fn collect_finished(&mut self) -> Vec<Result<String, String>> {
        let mut outcomes = Vec::new();
        let mut i = 0;
        while i < self.workers.len() {
            if !self.workers[i].handle.is_finished() {
                i += 1;
                continue;
            }
            let worker = self.workers.remove(i);
            debug!(info = %worker.info.id(), "Worker joined");
            outcomes.push(summarize(worker.kind, worker.handle.join()));
        }
        outcomes
    }

    fn newest_running(&self) -> Option<&ProgressInfo> {
        self.workers
            .iter()
            .rev()
            .map(|w| &w.info)
            .find(|info| !info.is_finished())
    }

    pub fn cancel_newest(&self) -> bool {
        match self.newest_running() {
            Some(info) => {
                info.cancel();
                true
            }
            None => false,
        }
    }

    /// Returns the new paused state, or `None` if nothing is running
    pub fn toggle_pause_newest(&self) -> Option<bool> {
        let info = self.newest_running()?;
        if info.is_paused() {
            info.resume();
            Some(false)
        } else {
            info.pause();
            Some(true)
        }
    }

    pub fn is_busy(&self) -> bool {
        !self.workers.is_empty()
    }

    /// Cancel everything still running and wait for the workers
    pub fn shutdown(&mut self) {
        for worker in &self.workers {
            worker.info.cancel();
        }
        for worker in self.workers.drain(..) {
            if worker.handle.join().is_err() {
                warn!(info = %worker.info.id(), "Worker panicked during shutdown");
            }
        }
    }
}

fn items(n: u64) -> String {
    if n == 1 {
        "1 item".to_string()
    } else {
        format!("{} items", format_count(n))
    }
}

fn summarize(
    kind: OperationKind,
    joined: std::thread::Result<nemo_core::Result<OperationReport>>,
) -> Result<String, String> {
    let report = match joined {
        Ok(Ok(report)) => report,
        Ok(Err(NemoError::Cancelled)) => return Ok(format!("Cancelled {}", kind.verb())),
        Ok(Err(e)) => return Err(format!("Could not {}: {}", kind.verb(), e)),
        Err(_) => return Err(format!("The {} worker crashed", kind.verb())),
    };

    let done = match kind {
        OperationKind::Delete => "Deleted",
        OperationKind::Copy => "Copied",
        OperationKind::Duplicate => "Duplicated",
    };
    Ok(format!(
        "{} {} ({})",
        done,
        items(report.files),
        format_size(report.bytes)
    ))
}
