//! Idle dispatch bridge between the real-time thread and consumers
//!
//! The real-time side only enqueues; a single consumer drains the queue,
//! either on a dedicated thread ([`IdleDispatcher::spawn`]) or manually
//! ([`DispatchQueue::run_pending`]).
//!
//! Queued work is tagged with the owner's serial. Work whose serial has been
//! marked ignored, or whose owner no longer exists, is discarded unrun.

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use log::{debug, trace};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, Weak};
use std::thread::JoinHandle;

/// Work deferred from the real-time thread
pub trait DeferredWork: Send + Sync {
    fn run_deferred(&self);

    /// Called instead of `run_deferred` when the queued task is skipped
    /// because its serial is ignored
    fn discarded(&self) {}
}

struct IdleTask {
    serial: u64,
    work: Weak<dyn DeferredWork>,
}

enum Message {
    Run(IdleTask),
    Stop,
}

/// Serials whose pending work must be discarded
type IgnoreSet = Arc<Mutex<HashSet<u64>>>;

/// Producer end of the idle queue (cheap to clone)
#[derive(Clone)]
pub struct IdleDispatcher {
    sender: Sender<Message>,
    ignored: IgnoreSet,
}

/// Consumer end of the idle queue
pub struct DispatchQueue {
    receiver: Receiver<Message>,
    ignored: IgnoreSet,
}

/// Create a bounded idle queue
///
/// # Arguments
/// * `capacity` - Maximum number of pending tasks (at least 1)
pub fn idle_channel(capacity: usize) -> (IdleDispatcher, DispatchQueue) {
    let (sender, receiver) = bounded(capacity.max(1));
    let ignored: IgnoreSet = Arc::new(Mutex::new(HashSet::new()));

    (
        IdleDispatcher {
            sender,
            ignored: Arc::clone(&ignored),
        },
        DispatchQueue { receiver, ignored },
    )
}

impl IdleDispatcher {
    /// Start a consumer thread draining a new queue
    pub fn spawn(capacity: usize) -> std::io::Result<(Self, DispatchThread)> {
        let (dispatcher, queue) = idle_channel(capacity);

        let handle = std::thread::Builder::new()
            .name("idle-dispatch".into())
            .spawn(move || queue.run())?;

        debug!("idle dispatch thread started (capacity {})", capacity.max(1));

        let thread = DispatchThread {
            dispatcher: dispatcher.clone(),
            handle: Some(handle),
        };

        Ok((dispatcher, thread))
    }

    /// Enqueue `work` for the consumer
    ///
    /// Never blocks. Returns `false` if the queue is full or the consumer is
    /// gone; the request is dropped in that case.
    pub fn idle_add(&self, serial: u64, work: Weak<dyn DeferredWork>) -> bool {
        match self.sender.try_send(Message::Run(IdleTask { serial, work })) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                trace!("idle queue full, dropping task for serial {serial}");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Mark (or unmark) a serial whose queued work must be skipped
    pub fn set_ignore(&self, serial: u64, ignore: bool) {
        let mut ignored = self.ignored.lock().unwrap_or_else(|p| p.into_inner());
        if ignore {
            ignored.insert(serial);
        } else {
            ignored.remove(&serial);
        }
    }

    pub fn is_ignored(&self, serial: u64) -> bool {
        is_ignored(&self.ignored, serial)
    }
}

fn is_ignored(ignored: &IgnoreSet, serial: u64) -> bool {
    ignored
        .lock()
        .map(|set| set.contains(&serial))
        .unwrap_or(true)
}

impl DispatchQueue {
    /// Run every task queued so far, returning how many were executed
    pub fn run_pending(&self) -> usize {
        let mut executed = 0;

        loop {
            match self.receiver.try_recv() {
                Ok(Message::Run(task)) => {
                    if self.execute(task) {
                        executed += 1;
                    }
                }
                Ok(Message::Stop) | Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {
                    break
                }
            }
        }

        executed
    }

    /// Drain tasks until stopped or every producer is dropped
    pub fn run(self) {
        while let Ok(message) = self.receiver.recv() {
            match message {
                Message::Run(task) => {
                    self.execute(task);
                }
                Message::Stop => break,
            }
        }

        debug!("idle dispatch loop finished");
    }

    fn execute(&self, task: IdleTask) -> bool {
        if is_ignored(&self.ignored, task.serial) {
            trace!("skipping idle task for ignored serial {}", task.serial);
            if let Some(work) = task.work.upgrade() {
                work.discarded();
            }
            return false;
        }

        match task.work.upgrade() {
            Some(work) => {
                work.run_deferred();
                true
            }
            None => false,
        }
    }
}

/// Handle to a running dispatch thread; stops and joins it on drop
pub struct DispatchThread {
    dispatcher: IdleDispatcher,
    handle: Option<JoinHandle<()>>,
}

impl DispatchThread {
    /// Stop the consumer and wait for it to exit
    ///
    /// Tasks queued ahead of the stop request still run.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.dispatcher.sender.send(Message::Stop);
            let _ = handle.join();
        }
    }
}

impl Drop for DispatchThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(AtomicUsize, AtomicUsize);

    impl DeferredWork for Counter {
        fn run_deferred(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }

        fn discarded(&self) {
            self.1.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counter() -> (Arc<Counter>, Weak<dyn DeferredWork>) {
        let counter = Arc::new(Counter(AtomicUsize::new(0), AtomicUsize::new(0)));
        let weak: Weak<dyn DeferredWork> = Arc::downgrade(&counter) as Weak<dyn DeferredWork>;
        (counter, weak)
    }

    #[test]
    fn test_run_pending_executes_in_order() {
        let (dispatcher, queue) = idle_channel(8);
        let (work, weak) = counter();

        assert!(dispatcher.idle_add(1, weak.clone()));
        assert!(dispatcher.idle_add(1, weak));
        assert_eq!(work.0.load(Ordering::SeqCst), 0);

        assert_eq!(queue.run_pending(), 2);
        assert_eq!(work.0.load(Ordering::SeqCst), 2);
        assert_eq!(queue.run_pending(), 0);
    }

    #[test]
    fn test_full_queue_drops_without_blocking() {
        let (dispatcher, queue) = idle_channel(1);
        let (work, weak) = counter();

        assert!(dispatcher.idle_add(7, weak.clone()));
        assert!(!dispatcher.idle_add(7, weak));

        queue.run_pending();
        assert_eq!(work.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_ignored_serial_is_skipped() {
        let (dispatcher, queue) = idle_channel(4);
        let (work, weak) = counter();

        dispatcher.idle_add(3, weak.clone());
        dispatcher.set_ignore(3, true);
        assert!(dispatcher.is_ignored(3));
        assert_eq!(queue.run_pending(), 0);

        dispatcher.set_ignore(3, false);
        dispatcher.idle_add(3, weak);
        assert_eq!(queue.run_pending(), 1);
        assert_eq!(work.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_skipped_task_notifies_owner() {
        let (dispatcher, queue) = idle_channel(4);
        let (work, weak) = counter();

        dispatcher.idle_add(5, weak.clone());
        dispatcher.set_ignore(5, true);
        assert_eq!(queue.run_pending(), 0);
        assert_eq!(work.0.load(Ordering::SeqCst), 0);
        assert_eq!(work.1.load(Ordering::SeqCst), 1);

        // A run that executes is not reported as discarded
        dispatcher.set_ignore(5, false);
        dispatcher.idle_add(5, weak);
        assert_eq!(queue.run_pending(), 1);
        assert_eq!(work.1.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dropped_owner_is_skipped() {
        let (dispatcher, queue) = idle_channel(4);
        let (work, weak) = counter();

        dispatcher.idle_add(9, weak);
        drop(work);

        assert_eq!(queue.run_pending(), 0);
    }

    #[test]
    fn test_spawned_thread_drains_queue() {
        let (dispatcher, thread) = IdleDispatcher::spawn(16).unwrap();
        let (work, weak) = counter();

        for _ in 0..5 {
            assert!(dispatcher.idle_add(11, weak.clone()));
        }

        // Stop is queued behind the tasks, so they all run first
        thread.stop();
        assert_eq!(work.0.load(Ordering::SeqCst), 5);
    }
}
