use crate::cache::ring_buffer::RingBuffer;
use parking_lot::{Condvar, Mutex};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Push {
    Queued,
    /// The queue was full and its oldest item was dropped.
    DroppedOldest,
    Closed,
}

/// Bounded queue of recency touches between callers and the maintenance worker.
///
/// Pushing never blocks: a full queue drops its oldest touch. Losing a touch only degrades the
/// eviction order.
#[derive(Debug)]
pub(crate) struct TouchQueue<T> {
    state: Mutex<State<T>>,
    ready: Condvar,
}

#[derive(Debug)]
struct State<T> {
    buffer: RingBuffer<T>,
    closed: bool,
}

impl<T> TouchQueue<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(State {
                buffer: RingBuffer::with_capacity(capacity),
                closed: false,
            }),
            ready: Condvar::new(),
        }
    }

    pub(crate) fn push(&self, item: T) -> Push {
        let mut state = self.state.lock();
        if state.closed {
            return Push::Closed;
        }

        let outcome = match state.buffer.push_back_overwriting(item) {
            Some(_) => Push::DroppedOldest,
            None => Push::Queued,
        };
        drop(state);

        self.ready.notify_one();
        outcome
    }

    /// Blocks until there is something to pop or the queue is closed.
    ///
    /// Returns `false` once the queue is closed and fully drained.
    pub(crate) fn wait(&self) -> bool {
        let mut state = self.state.lock();
        while state.buffer.is_empty() && !state.closed {
            self.ready.wait(&mut state);
        }
        !state.buffer.is_empty()
    }

    /// Takes every queued item, oldest first.
    pub(crate) fn pop_all(&self) -> Vec<T> {
        let mut state = self.state.lock();
        let mut items = Vec::with_capacity(state.buffer.len());
        while let Some(item) = state.buffer.pop_front() {
            items.push(item);
        }
        items
    }

    /// Rejects further pushes and wakes the consumer. Items already queued can still be popped.
    pub(crate) fn close(&self) {
        self.state.lock().closed = true;
        self.ready.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn it_pops_in_fifo_order() {
        // given
        let queue = TouchQueue::with_capacity(4);
        queue.push(1);
        queue.push(2);
        queue.push(3);

        // when
        let items = queue.pop_all();

        // then
        assert_eq!(items, vec![1, 2, 3]);
        assert!(queue.pop_all().is_empty());
    }

    #[test]
    fn it_drops_the_oldest_touch_when_full() {
        // given
        let queue = TouchQueue::with_capacity(2);
        assert_eq!(queue.push(1), Push::Queued);
        assert_eq!(queue.push(2), Push::Queued);

        // when
        let outcome = queue.push(3);

        // then
        assert_eq!(outcome, Push::DroppedOldest);
        assert_eq!(queue.pop_all(), vec![2, 3]);
    }

    #[test]
    fn it_rejects_pushes_after_close_but_keeps_queued_items() {
        // given
        let queue = TouchQueue::with_capacity(2);
        queue.push(1);

        // when
        queue.close();

        // then
        assert_eq!(queue.push(2), Push::Closed);
        assert!(queue.wait());
        assert_eq!(queue.pop_all(), vec![1]);
        assert!(!queue.wait());
    }

    #[test]
    fn it_wakes_a_waiting_consumer() {
        // given
        let queue = Arc::new(TouchQueue::with_capacity(8));
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let mut received = Vec::new();
                while queue.wait() {
                    received.extend(queue.pop_all());
                }
                received
            })
        };

        // when
        queue.push(1);
        thread::sleep(Duration::from_millis(10));
        queue.push(2);
        queue.close();

        // then
        assert_eq!(consumer.join().unwrap(), vec![1, 2]);
    }
}
