//! Bounded, drop-oldest queues and the auto-reset signal the worker waits on.
//!
//! Two independent [`BoundedQueue`] instances back the engine: the outbound
//! command queue (producers are caller threads, consumer is the worker) and
//! the inbound message queue (producer is the worker, consumers are caller
//! threads in manual-events mode). Both share the same overflow policy:
//! drop the oldest entry and keep going, logging at the severity the caller
//! asked for.

use log::{error, warn};
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// What happened when an item was pushed onto a [`BoundedQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The item was enqueued without disturbing anything else.
    Enqueued,
    /// The queue was at capacity; the oldest item was dropped to make room.
    DroppedOldest,
    /// The queue has zero capacity ("never buffer") and the item was not kept.
    NotBuffered,
}

/// A `VecDeque` guarded by its own mutex, bounded at `capacity` with a
/// drop-oldest overflow policy. A capacity of 0 means "never buffer": pushes
/// are accepted but immediately discarded, matching §4.4's callback-only mode.
pub struct BoundedQueue<T> {
    inner: Mutex<VecDeque<T>>,
    capacity: usize,
    name: &'static str,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize, name: &'static str) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
            name,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Pushes `item` to the back of the queue, dropping the oldest entry if
    /// the queue is already at capacity. Logs a warning on every drop; the
    /// caller decides whether to additionally surface it as an error.
    pub fn push(&self, item: T) -> PushOutcome {
        if self.capacity == 0 {
            return PushOutcome::NotBuffered;
        }

        let mut queue = self.inner.lock().expect("queue mutex poisoned");
        if queue.len() >= self.capacity {
            queue.pop_front();
            queue.push_back(item);
            warn!(
                "{} queue at capacity ({}), dropped oldest entry",
                self.name, self.capacity
            );
            PushOutcome::DroppedOldest
        } else {
            queue.push_back(item);
            PushOutcome::Enqueued
        }
    }

    pub fn pop(&self) -> Option<T> {
        self.inner.lock().expect("queue mutex poisoned").pop_front()
    }

    /// Looks at (without removing) the head of the queue via a closure, so
    /// the caller can decide whether to pop it without a second lock round-trip.
    pub fn peek_front<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        let queue = self.inner.lock().expect("queue mutex poisoned");
        f(queue.front())
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().expect("queue mutex poisoned").is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("queue mutex poisoned").len()
    }

    pub fn clear(&self) {
        self.inner.lock().expect("queue mutex poisoned").clear();
    }

    /// Atomically drains and returns every item currently queued, in FIFO order.
    pub fn drain_all(&self) -> Vec<T> {
        let mut queue = self.inner.lock().expect("queue mutex poisoned");
        queue.drain(..).collect()
    }
}

impl<T> BoundedQueue<T> {
    /// Like [`Self::push`], but escalates the drop to an error-level log. The
    /// façade uses this for the outbound queue: overflow there indicates the
    /// caller is producing commands faster than the worker can transmit them.
    pub fn push_reporting_overflow_as_error(&self, item: T) -> PushOutcome {
        let outcome = self.push(item);
        if outcome == PushOutcome::DroppedOldest {
            error!(
                "{} queue overflow: caller is enqueueing faster than the worker drains",
                self.name
            );
        }
        outcome
    }
}

/// Auto-reset signaling primitive: `notify()` wakes at most one waiter, and
/// the flag clears itself on observation (by a woken waiter or by a waiter
/// that times out). Set on every outbound enqueue and on shutdown/abort;
/// waited on by the worker with a poll timeout so it stays responsive even
/// if a signal is missed.
#[derive(Default)]
pub struct QueueSignal {
    signaled: Mutex<bool>,
    condvar: Condvar,
}

impl QueueSignal {
    pub fn new() -> Self {
        Self {
            signaled: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    pub fn notify(&self) {
        let mut signaled = self.signaled.lock().expect("signal mutex poisoned");
        *signaled = true;
        self.condvar.notify_one();
    }

    /// Blocks until notified or `timeout` elapses, then clears the flag.
    pub fn wait_timeout(&self, timeout: Duration) {
        let signaled = self.signaled.lock().expect("signal mutex poisoned");
        let mut signaled = if *signaled {
            signaled
        } else {
            self.condvar
                .wait_timeout(signaled, timeout)
                .expect("signal mutex poisoned")
                .0
        };
        *signaled = false;
    }
}
