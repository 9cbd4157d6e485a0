use std::error::Error;
use std::fmt;

use futures_channel::mpsc;

use super::output::{
    EventSinkSender, FallibleHandlerSender, HandlerSender, PortLink, StreamSender,
};
use super::{EventSink, SubscriptionHandle};

/// A lazy, non-restartable sequence of the events emitted on a port.
///
/// The stream ends when the port is closed or its subscription is ended.
/// Dropping the stream ends its subscription at the next emission.
pub type EventStream<T> = mpsc::UnboundedReceiver<T>;

/// A host-side handle to an output port.
///
/// A `PortHandle` can subscribe to the port but cannot emit on it. Handles are
/// cheap to clone and all clones refer to the same port.
pub struct PortHandle<T: Clone + Send + 'static> {
    link: PortLink<T>,
}

impl<T: Clone + Send + 'static> PortHandle<T> {
    pub(crate) fn new(link: PortLink<T>) -> Self {
        Self { link }
    }

    /// Returns the name of the port.
    pub fn name(&self) -> &str {
        self.link.name()
    }

    /// Registers a handler invoked with every subsequent event of the port.
    ///
    /// Handlers are invoked on the thread of the emitting module, in the order
    /// of their registration; a handler that blocks therefore holds back the
    /// module. A panicking handler is reported to the failure handler of the
    /// module instance and keeps receiving subsequent events.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionHandle
    where
        F: FnMut(T) + Send + 'static,
    {
        self.link.subscribe(Box::new(HandlerSender::new(handler)))
    }

    /// Registers a handler that may fail.
    ///
    /// Errors returned by the handler are reported to the failure handler of
    /// the module instance like panics are.
    pub fn subscribe_fallible<F, E>(&self, handler: F) -> SubscriptionHandle
    where
        F: FnMut(T) -> Result<(), E> + Send + 'static,
        E: Into<Box<dyn Error + Send + Sync>> + 'static,
    {
        self.link
            .subscribe(Box::new(FallibleHandlerSender::new(handler)))
    }

    /// Registers an event sink such as an
    /// [`EventBuffer`](crate::ports::EventBuffer) or
    /// [`EventSlot`](crate::ports::EventSlot).
    pub fn connect_sink<S: EventSink<T>>(&self, sink: &S) -> SubscriptionHandle {
        self.link
            .subscribe(Box::new(EventSinkSender::new(sink.writer())))
    }

    /// Returns a stream of all subsequent events of the port.
    pub fn stream(&self) -> EventStream<T> {
        let (sender, receiver) = mpsc::unbounded();
        self.link.subscribe(Box::new(StreamSender::new(sender)));

        receiver
    }

    /// Returns the number of current subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.link.subscriber_count()
    }
}

impl<T: Clone + Send + 'static> Clone for PortHandle<T> {
    fn clone(&self) -> Self {
        Self {
            link: self.link.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> fmt::Debug for PortHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortHandle")
            .field("name", &self.name())
            .field("subscriptions", &self.subscriber_count())
            .finish()
    }
}

/// Description of a port exposed by a module instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortInfo {
    name: String,
    event_type_name: &'static str,
}

impl PortInfo {
    pub(crate) fn new(name: impl Into<String>, event_type_name: &'static str) -> Self {
        Self {
            name: name.into(),
            event_type_name,
        }
    }

    /// Name of the port.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable name of the event type, as returned by
    /// `std::any::type_name()`.
    pub fn event_type_name(&self) -> &'static str {
        self.event_type_name
    }
}
