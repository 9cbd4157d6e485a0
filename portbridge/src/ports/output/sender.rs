use std::error::Error;
use std::marker::PhantomData;

use futures_channel::mpsc;

use crate::ports::EventSinkWriter;

/// A recipient of the events of a single subscription, abstracting over host
/// closures, event sinks and streams.
pub(crate) trait Sender<T>: Send {
    /// Synchronously hands over the event.
    fn send(&mut self, arg: T) -> Result<(), SendError>;
}

/// Error returned by a [`Sender`].
pub(crate) enum SendError {
    /// The recipient reported a failure for this event only.
    Failed(Box<dyn Error + Send + Sync + 'static>),
    /// The recipient is gone and will never accept another event.
    Disconnected,
}

/// An object that hands events to a host closure.
pub(crate) struct HandlerSender<F, T> {
    func: F,
    _phantom_event: PhantomData<fn(T)>,
}

impl<F, T> HandlerSender<F, T> {
    pub(crate) fn new(func: F) -> Self {
        Self {
            func,
            _phantom_event: PhantomData,
        }
    }
}

impl<F, T> Sender<T> for HandlerSender<F, T>
where
    F: FnMut(T) + Send + 'static,
    T: 'static,
{
    fn send(&mut self, arg: T) -> Result<(), SendError> {
        (self.func)(arg);

        Ok(())
    }
}

/// An object that hands events to a host closure which may return an error.
pub(crate) struct FallibleHandlerSender<F, T, E> {
    func: F,
    _phantom_event: PhantomData<fn(T) -> E>,
}

impl<F, T, E> FallibleHandlerSender<F, T, E> {
    pub(crate) fn new(func: F) -> Self {
        Self {
            func,
            _phantom_event: PhantomData,
        }
    }
}

impl<F, T, E> Sender<T> for FallibleHandlerSender<F, T, E>
where
    F: FnMut(T) -> Result<(), E> + Send + 'static,
    T: 'static,
    E: Into<Box<dyn Error + Send + Sync>> + 'static,
{
    fn send(&mut self, arg: T) -> Result<(), SendError> {
        (self.func)(arg).map_err(|err| SendError::Failed(err.into()))
    }
}

/// An object that writes events to an event sink.
pub(crate) struct EventSinkSender<T, W> {
    writer: W,
    _phantom_event: PhantomData<fn(T)>,
}

impl<T, W> EventSinkSender<T, W> {
    pub(crate) fn new(writer: W) -> Self {
        Self {
            writer,
            _phantom_event: PhantomData,
        }
    }
}

impl<T, W> Sender<T> for EventSinkSender<T, W>
where
    T: 'static,
    W: EventSinkWriter<T>,
{
    fn send(&mut self, arg: T) -> Result<(), SendError> {
        self.writer.write(arg);

        Ok(())
    }
}

/// An object that forwards events to an unbounded stream.
pub(crate) struct StreamSender<T> {
    sender: mpsc::UnboundedSender<T>,
}

impl<T> StreamSender<T> {
    pub(crate) fn new(sender: mpsc::UnboundedSender<T>) -> Self {
        Self { sender }
    }
}

impl<T: Send + 'static> Sender<T> for StreamSender<T> {
    fn send(&mut self, arg: T) -> Result<(), SendError> {
        self.sender
            .unbounded_send(arg)
            .map_err(|_| SendError::Disconnected)
    }
}
