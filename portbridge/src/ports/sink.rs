pub(crate) mod event_buffer;
pub(crate) mod event_slot;

/// A host-side endpoint that collects the events emitted on a port.
///
/// Sinks are connected with
/// [`PortHandle::connect_sink`](crate::ports::PortHandle::connect_sink) and
/// let the host consume events at its own pace rather than from within the
/// module's emission.
pub trait EventSink<T> {
    /// Writer handle to an event sink.
    type Writer: EventSinkWriter<T>;

    /// Returns the writer handle associated to this sink.
    fn writer(&self) -> Self::Writer;
}

/// A writer handle to an event sink.
pub trait EventSinkWriter<T>: Send + 'static {
    /// Writes a value to the associated sink.
    fn write(&self, event: T);
}

/// An iterator over collected events with the ability to pause and resume
/// event collection.
///
/// An `EventSinkStream` will typically be implemented on an `EventSink` for
/// which it will constitute a draining iterator.
pub trait EventSinkStream: Iterator {
    /// Starts or resumes the collection of new events.
    fn open(&mut self);

    /// Pauses the collection of new events.
    ///
    /// Events that were previously in the stream remain available.
    fn close(&mut self);
}
