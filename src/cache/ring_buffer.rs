/// Fixed-capacity FIFO queue.
#[derive(Debug)]
pub(crate) struct RingBuffer<T> {
    head: usize,
    len: usize,
    buffer: Vec<Option<T>>,
}

impl<T> RingBuffer<T> {
    pub(crate) fn with_capacity(capacity: usize) -> RingBuffer<T> {
        let mut buffer = Vec::with_capacity(capacity);
        buffer.resize_with(capacity, || None);
        RingBuffer {
            head: 0,
            len: 0,
            buffer,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn is_full(&self) -> bool {
        self.len == self.buffer.len()
    }

    /// Adds an item to the back of the queue. If the queue is full, the item at the front is
    /// dropped to make room and returned.
    ///
    /// A zero-capacity buffer hands the pushed item straight back.
    pub(crate) fn push_back_overwriting(&mut self, value: T) -> Option<T> {
        if self.buffer.is_empty() {
            return Some(value);
        }

        let overwritten = if self.is_full() {
            self.pop_front()
        } else {
            None
        };

        // buffer.len   - - - - -
        // len                - -
        // head               |
        //             [N N N S S ]
        let physical_idx = self.wrap_add(self.head, self.len);
        self.buffer[physical_idx] = Some(value);
        self.len += 1;
        // buffer.len   - - - - -
        // len          -     - -
        // head               |
        //             [S N N S S ]
        overwritten
    }

    /// Pops an element from the front of the queue and returns it.
    ///
    /// If the queue is empty, [None] is returned.
    pub(crate) fn pop_front(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }

        let item = self.buffer[self.head].take();
        self.head = self.wrap_add(self.head, 1);
        self.len -= 1;
        item
    }

    fn wrap_add(&self, idx: usize, addend: usize) -> usize {
        let capacity = self.buffer.len();
        let idx = idx.wrapping_add(addend);
        if idx >= capacity { idx - capacity } else { idx }
    }
}
