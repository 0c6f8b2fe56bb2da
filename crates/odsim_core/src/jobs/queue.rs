//! Blocking work queue with a completion barrier.
//!
//! `WorkQueue` is a FIFO shared between producers and a pool of consumer
//! threads. Every item `put` on the queue counts as unfinished until a
//! consumer calls `task_done`; `join` blocks until that count reaches zero.
//! `requeue` puts an item back without touching the count, so retried items
//! keep the barrier closed until they finally succeed or are abandoned.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

/// An item together with the number of processing attempts made so far.
#[derive(Debug, Clone)]
pub struct Task<T> {
    pub item: T,
    pub attempts: u32,
}

impl<T> Task<T> {
    fn fresh(item: T) -> Self {
        Self { item, attempts: 0 }
    }
}

#[derive(Debug)]
struct QueueState<T> {
    items: VecDeque<Task<T>>,
    unfinished: usize,
    closed: bool,
}

/// Thread-safe FIFO with blocking `get` and a `join` barrier.
#[derive(Debug)]
pub struct WorkQueue<T> {
    name: String,
    state: Mutex<QueueState<T>>,
    available: Condvar,
    drained: Condvar,
}

impl<T> WorkQueue<T> {
    /// Create an empty, open queue.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                unfinished: 0,
                closed: false,
            }),
            available: Condvar::new(),
            drained: Condvar::new(),
        }
    }

    /// Queue name (for logging).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a new item. It stays unfinished until `task_done`.
    pub fn put(&self, item: T) {
        let mut state = self.state.lock();
        state.items.push_back(Task::fresh(item));
        state.unfinished += 1;
        self.available.notify_one();
    }

    /// Put a task back at the tail without changing the unfinished count.
    pub fn requeue(&self, task: Task<T>) {
        let mut state = self.state.lock();
        state.items.push_back(task);
        self.available.notify_one();
    }

    /// Take the next task, blocking while the queue is empty.
    ///
    /// Returns `None` once the queue has been closed and emptied.
    pub fn get(&self) -> Option<Task<T>> {
        let mut state = self.state.lock();
        loop {
            if let Some(task) = state.items.pop_front() {
                return Some(task);
            }
            if state.closed {
                return None;
            }
            self.available.wait(&mut state);
        }
    }

    /// Mark one previously taken task as finished.
    pub fn task_done(&self) {
        let mut state = self.state.lock();
        if state.unfinished == 0 {
            tracing::warn!("task_done called on '{}' with no unfinished tasks", self.name);
            return;
        }
        state.unfinished -= 1;
        if state.unfinished == 0 {
            self.drained.notify_all();
        }
    }

    /// Block until every task ever `put` has been marked done.
    pub fn join(&self) {
        let mut state = self.state.lock();
        while state.unfinished > 0 {
            self.drained.wait(&mut state);
        }
    }

    /// Stop handing out work once the queue is empty and wake all waiters.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.available.notify_all();
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Number of tasks waiting to be taken.
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Whether no task is waiting to be taken.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of tasks not yet marked done (waiting or in flight).
    pub fn unfinished(&self) -> usize {
        self.state.lock().unfinished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn fifo_order() {
        let queue = WorkQueue::new("test");
        queue.put(1);
        queue.put(2);
        queue.put(3);
        assert_eq!(queue.get().unwrap().item, 1);
        assert_eq!(queue.get().unwrap().item, 2);
        assert_eq!(queue.get().unwrap().item, 3);
    }

    #[test]
    fn requeue_keeps_unfinished_count() {
        let queue = WorkQueue::new("test");
        queue.put("a");
        let mut task = queue.get().unwrap();
        task.attempts += 1;
        queue.requeue(task);

        assert_eq!(queue.unfinished(), 1);
        let task = queue.get().unwrap();
        assert_eq!(task.attempts, 1);
        queue.task_done();
        assert_eq!(queue.unfinished(), 0);
    }

    #[test]
    fn join_returns_immediately_when_idle() {
        let queue: WorkQueue<u8> = WorkQueue::new("idle");
        queue.join();
    }

    #[test]
    fn join_waits_for_all_tasks() {
        let queue = Arc::new(WorkQueue::new("join"));
        let processed = Arc::new(AtomicUsize::new(0));
        for i in 0..20 {
            queue.put(i);
        }

        let workers: Vec<_> = (0..3)
            .map(|_| {
                let queue = Arc::clone(&queue);
                let processed = Arc::clone(&processed);
                thread::spawn(move || {
                    while let Some(_task) = queue.get() {
                        thread::sleep(Duration::from_millis(1));
                        processed.fetch_add(1, Ordering::SeqCst);
                        queue.task_done();
                    }
                })
            })
            .collect();

        queue.join();
        assert_eq!(processed.load(Ordering::SeqCst), 20);
        assert!(queue.is_empty());

        queue.close();
        for worker in workers {
            worker.join().unwrap();
        }
    }

    #[test]
    fn close_wakes_blocked_consumers() {
        let queue: Arc<WorkQueue<u8>> = Arc::new(WorkQueue::new("close"));
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.get().is_none())
        };
        thread::sleep(Duration::from_millis(20));
        queue.close();
        assert!(consumer.join().unwrap());
        assert!(queue.is_closed());
    }

    #[test]
    fn closed_queue_still_drains_pending_items() {
        let queue = WorkQueue::new("drain");
        queue.put(9);
        queue.close();
        assert_eq!(queue.get().unwrap().item, 9);
        assert!(queue.get().is_none());
    }

    #[test]
    fn spurious_task_done_is_ignored() {
        let queue: WorkQueue<u8> = WorkQueue::new("spurious");
        queue.task_done();
        assert_eq!(queue.unfinished(), 0);
    }
}
