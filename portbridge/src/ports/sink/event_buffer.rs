use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::{EventSink, EventSinkStream, EventSinkWriter};

/// The shared data of an `EventBuffer`.
struct Inner<T> {
    capacity: usize,
    is_open: AtomicBool,
    buffer: Mutex<VecDeque<T>>,
}

/// An [`EventSink`] and [`EventSinkStream`] with a bounded size.
///
/// If the maximum capacity is exceeded, the oldest events are discarded.
/// Events are returned in emission order. Note that even if the iterator
/// returns `None`, it may still produce more items once the module emits again
/// (in other words, it is not a [`FusedIterator`](std::iter::FusedIterator)).
pub struct EventBuffer<T> {
    inner: Arc<Inner<T>>,
}

impl<T> EventBuffer<T> {
    /// Default capacity when constructed with `new`.
    pub const DEFAULT_CAPACITY: usize = 16;

    /// Creates an open `EventBuffer` with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Creates an open `EventBuffer` with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::build(capacity, true)
    }

    /// Creates a closed `EventBuffer` with the specified capacity.
    pub fn with_capacity_closed(capacity: usize) -> Self {
        Self::build(capacity, false)
    }

    fn build(capacity: usize, is_open: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                capacity,
                is_open: AtomicBool::new(is_open),
                buffer: Mutex::new(VecDeque::with_capacity(capacity)),
            }),
        }
    }

    /// Returns the number of buffered events.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if no event is buffered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<T>> {
        self.inner
            .buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Send + 'static> EventSink<T> for EventBuffer<T> {
    type Writer = EventBufferWriter<T>;

    fn writer(&self) -> Self::Writer {
        EventBufferWriter {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Iterator for EventBuffer<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.lock().pop_front()
    }
}

impl<T: Send + 'static> EventSinkStream for EventBuffer<T> {
    fn open(&mut self) {
        self.inner.is_open.store(true, Ordering::Relaxed);
    }

    fn close(&mut self) {
        self.inner.is_open.store(false, Ordering::Relaxed);
    }
}

impl<T> Default for EventBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for EventBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("EventBuffer")
            .field("capacity", &self.inner.capacity)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

/// A writer handle of an `EventBuffer`.
pub struct EventBufferWriter<T> {
    inner: Arc<Inner<T>>,
}

impl<T: Send + 'static> EventSinkWriter<T> for EventBufferWriter<T> {
    /// Pushes an event onto the queue, discarding the oldest event if the
    /// buffer is full.
    fn write(&self, event: T) {
        if !self.inner.is_open.load(Ordering::Relaxed) || self.inner.capacity == 0 {
            return;
        }

        let mut buffer = self
            .inner
            .buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if buffer.len() == self.inner.capacity {
            buffer.pop_front();
        }

        buffer.push_back(event);
    }
}

impl<T> fmt::Debug for EventBufferWriter<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("EventBufferWriter").finish_non_exhaustive()
    }
}
