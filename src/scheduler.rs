use std::collections::VecDeque;

/// Work queued from inside an event callback, run once the callback has returned.
///
/// Each [`DeferredQueue::take_batch`] hands out only what was queued before the call, so anything
/// queued while a batch runs waits for the next event-loop iteration.
#[derive(Debug)]
pub struct DeferredQueue<T> {
    pending: VecDeque<T>,
}

impl<T> Default for DeferredQueue<T> {
    fn default() -> Self {
        Self {
            pending: VecDeque::new(),
        }
    }
}

impl<T> DeferredQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, task: T) {
        self.pending.push_back(task);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.pending.iter()
    }

    pub fn take_batch(&mut self) -> VecDeque<T> {
        std::mem::take(&mut self.pending)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
