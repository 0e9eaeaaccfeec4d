use crate::engine::op::Operation;
use crate::foundation::error::{FitError, FitResult};
use parking_lot::{Condvar, Mutex};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

struct Entry<T> {
    op: Operation,
    seq: u64,
    item: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.op == other.op && self.seq == other.seq
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    // Max-heap: higher ordinal first, then the earlier submission.
    fn cmp(&self, other: &Self) -> Ordering {
        self.op
            .cmp(&other.op)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct State<T> {
    heap: BinaryHeap<Entry<T>>,
    next_seq: u64,
    closed: bool,
}

/// Many-producer / single-consumer priority queue of operations.
///
/// Push never blocks; pop blocks on a condition variable while the queue is empty.
pub(crate) struct OpQueue<T> {
    state: Mutex<State<T>>,
    available: Condvar,
}

impl<T> OpQueue<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(State {
                heap: BinaryHeap::new(),
                next_seq: 0,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    pub(crate) fn push(&self, op: Operation, item: T) -> FitResult<()> {
        let mut st = self.state.lock();
        if st.closed {
            return Err(FitError::EngineStopped);
        }
        let seq = st.next_seq;
        st.next_seq += 1;
        st.heap.push(Entry { op, seq, item });
        drop(st);
        self.available.notify_one();
        Ok(())
    }

    /// Block until an entry is available. Returns `None` once the queue is closed and drained.
    pub(crate) fn pop(&self) -> Option<(Operation, T)> {
        let mut st = self.state.lock();
        loop {
            if let Some(e) = st.heap.pop() {
                return Some((e.op, e.item));
            }
            if st.closed {
                return None;
            }
            self.available.wait(&mut st);
        }
    }

    #[cfg(test)]
    pub(crate) fn try_pop(&self) -> Option<(Operation, T)> {
        self.state.lock().heap.pop().map(|e| (e.op, e.item))
    }

    /// Drop every pending entry whose operation matches; returns how many were removed.
    pub(crate) fn purge(&self, matches: impl Fn(Operation) -> bool) -> usize {
        let mut st = self.state.lock();
        let before = st.heap.len();
        st.heap.retain(|e| !matches(e.op));
        before - st.heap.len()
    }

    /// Refuse further pushes and hand back whatever was still pending.
    pub(crate) fn close(&self) -> Vec<(Operation, T)> {
        let mut st = self.state.lock();
        st.closed = true;
        let drained = std::mem::take(&mut st.heap)
            .into_sorted_vec()
            .into_iter()
            .rev()
            .map(|e| (e.op, e.item))
            .collect();
        drop(st);
        self.available.notify_all();
        drained
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.state.lock().heap.len()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/engine/queue.rs"]
mod tests;
