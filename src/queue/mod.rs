use std::sync::mpsc::{Receiver, SyncSender, TrySendError, sync_channel};
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::{Context, Result};

/// A deferred unit of work. No identity, no result, no cancellation.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Default queue depth. Orders of magnitude above any realistic burst of
/// refresh/mutation submissions; overflow means a capacity-planning bug,
/// not a recoverable runtime condition.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Default worker count. One worker gives strict FIFO execution, which is
/// what keeps unsynchronized view-model updates safe.
pub const DEFAULT_WORKERS: usize = 1;

/// Bounded queue of deferred tasks drained by a fixed pool of worker threads.
///
/// Each worker runs one task to completion before taking the next; with a
/// single worker the whole queue is strictly FIFO.
pub struct TaskQueue {
    tx: SyncSender<Task>,
}

impl TaskQueue {
    pub fn new(capacity: usize, workers: usize) -> Result<Self> {
        let (tx, rx) = sync_channel::<Task>(capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));

        for n in 0..workers.max(1) {
            let rx = Arc::clone(&rx);
            thread::Builder::new()
                .name(format!("muxman-worker-{n}"))
                .spawn(move || worker_loop(&rx))
                .context("failed to spawn queue worker")?;
        }

        Ok(TaskQueue { tx })
    }

    /// Non-blocking enqueue. A full buffer is fatal by contract: the queue is
    /// sized so that it cannot fill up under any realistic load, and a
    /// blocked UI thread would deadlock the application anyway.
    pub fn submit(&self, task: impl FnOnce() + Send + 'static) {
        match self.tx.try_send(Box::new(task)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                panic!("task queue overflow: buffer exhausted")
            }
            Err(TrySendError::Disconnected(_)) => {
                panic!("task queue workers are gone")
            }
        }
    }
}

fn worker_loop(rx: &Arc<Mutex<Receiver<Task>>>) {
    loop {
        let task = {
            let Ok(rx) = rx.lock() else {
                tracing::warn!("task queue receiver poisoned, worker exiting");
                return;
            };
            rx.recv()
        };
        match task {
            Ok(task) => task(),
            // Sender dropped: the queue was torn down, drain is complete.
            Err(_) => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn single_worker_runs_tasks_in_submission_order() {
        let queue = TaskQueue::new(16, 1).unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done_rx) = mpsc::channel();

        for i in 0..5 {
            let log = Arc::clone(&log);
            let done_tx = done_tx.clone();
            queue.submit(move || {
                log.lock().unwrap().push(i);
                if i == 4 {
                    done_tx.send(()).unwrap();
                }
            });
        }

        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn tasks_run_to_completion_before_the_next_starts() {
        let queue = TaskQueue::new(16, 1).unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done_rx) = mpsc::channel();

        {
            let log = Arc::clone(&log);
            queue.submit(move || {
                log.lock().unwrap().push("t1-start");
                // A slow first task must finish before t2 begins.
                thread::sleep(Duration::from_millis(50));
                log.lock().unwrap().push("t1-end");
            });
        }
        {
            let log = Arc::clone(&log);
            queue.submit(move || {
                log.lock().unwrap().push("t2");
                done_tx.send(()).unwrap();
            });
        }

        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["t1-start", "t1-end", "t2"]);
    }

    #[test]
    fn multiple_workers_drain_everything() {
        let queue = TaskQueue::new(64, 4).unwrap();
        let (done_tx, done_rx) = mpsc::channel();

        for _ in 0..32 {
            let done_tx = done_tx.clone();
            queue.submit(move || done_tx.send(()).unwrap());
        }

        for _ in 0..32 {
            done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        }
    }

    #[test]
    fn zero_sizes_are_clamped() {
        // Must not panic on construction, and must still execute work.
        let queue = TaskQueue::new(0, 0).unwrap();
        let (done_tx, done_rx) = mpsc::channel();
        queue.submit(move || done_tx.send(()).unwrap());
        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }
}
