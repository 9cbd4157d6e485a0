use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::{EventSink, EventSinkStream, EventSinkWriter};

/// The shared data of an `EventSlot`.
struct Inner<T> {
    is_open: AtomicBool,
    slot: Mutex<Option<T>>,
}

/// An `EventSink` and `EventSinkStream` that only keeps the last event.
///
/// Once the value is read, the iterator will return `None` until a new value is
/// received. If the slot contains a value when a new value is received, the
/// previous value is overwritten.
pub struct EventSlot<T> {
    inner: Arc<Inner<T>>,
}

impl<T> EventSlot<T> {
    /// Creates an open `EventSlot`.
    pub fn new() -> Self {
        Self::build(true)
    }

    /// Creates a closed `EventSlot`.
    pub fn new_closed() -> Self {
        Self::build(false)
    }

    fn build(is_open: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                is_open: AtomicBool::new(is_open),
                slot: Mutex::new(None),
            }),
        }
    }
}

impl<T: Send + 'static> EventSink<T> for EventSlot<T> {
    type Writer = EventSlotWriter<T>;

    /// Returns a writer handle.
    fn writer(&self) -> EventSlotWriter<T> {
        EventSlotWriter {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Iterator for EventSlot<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl<T: Send + 'static> EventSinkStream for EventSlot<T> {
    fn open(&mut self) {
        self.inner.is_open.store(true, Ordering::Relaxed);
    }
    fn close(&mut self) {
        self.inner.is_open.store(false, Ordering::Relaxed);
    }
}

impl<T> Default for EventSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for EventSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("EventSlot").finish_non_exhaustive()
    }
}

/// A writer handle of an `EventSlot`.
pub struct EventSlotWriter<T> {
    inner: Arc<Inner<T>>,
}

impl<T: Send + 'static> EventSinkWriter<T> for EventSlotWriter<T> {
    /// Write an event into the slot.
    fn write(&self, event: T) {
        // Ignore if the sink is closed.
        if !self.inner.is_open.load(Ordering::Relaxed) {
            return;
        }

        *self
            .inner
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(event);
    }
}

impl<T> fmt::Debug for EventSlotWriter<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("EventSlotWriter").finish_non_exhaustive()
    }
}
