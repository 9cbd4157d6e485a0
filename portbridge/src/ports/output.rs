mod broadcaster;
mod sender;

use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tracing::{debug, error, trace};

use crate::ports::dispatch;
use crate::ports::failure::{log_failure, FailureKind, FailureReporter, HandlerFailure};
use crate::ports::subscription::{Subscription, SubscriptionHandle, Unsubscribe};
use crate::ports::{PortHandle, SubscriptionId};
use crate::util::cached_rw_lock::{CachedRwLock, SharedHandle};

use broadcaster::EventBroadcaster;

pub(crate) use sender::{
    EventSinkSender, FallibleHandlerSender, HandlerSender, SendError, Sender, StreamSender,
};

static NEXT_PORT_UID: AtomicU64 = AtomicU64::new(0);

/// An output port.
///
/// `Output` ports are owned by modules, which use them to emit events. Every
/// event is delivered synchronously to all current subscriptions of the port,
/// in the order of their registration, before [`Output::emit`] returns.
///
/// When an `Output` is cloned, its subscriptions remain shared and therefore
/// all clones emit to, and see changes of, the same list of subscriptions.
#[derive(Clone)]
pub struct Output<T: Clone + Send + 'static> {
    broadcaster: CachedRwLock<EventBroadcaster<T>>,
    state: Arc<PortState<T>>,
}

impl<T: Clone + Send + 'static> Output<T> {
    /// Creates a new `Output` port without subscriptions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the name under which the port was declared, if it was declared
    /// to a module instance.
    pub fn name(&self) -> Option<&str> {
        self.state.binding.get().map(|b| b.name.as_str())
    }

    /// Returns a host-side handle that can be used to subscribe to this port.
    pub fn handle(&self) -> PortHandle<T> {
        PortHandle::new(self.link())
    }

    /// Returns the number of subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.broadcaster
            .read_shared()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Delivers an event to all subscriptions.
    ///
    /// Subscriptions registered while the delivery is in progress only receive
    /// subsequent events. An event emitted on this port from within one of its
    /// own handlers is queued and delivered once the current event has reached
    /// all subscriptions.
    pub fn emit(&mut self, arg: T) {
        if dispatch::is_emitting(self.state.uid) {
            self.state
                .deferred
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_back(arg);

            return;
        }

        let state = self.state.clone();
        let _emission = state
            .emission
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let _scope = dispatch::enter_emission(state.uid);

        let mut next = Some(arg);
        while let Some(arg) = next {
            self.dispatch(arg);
            next = self
                .state
                .deferred
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();
        }
    }

    fn dispatch(&mut self, arg: T) {
        let disconnected = {
            let broadcaster = self
                .broadcaster
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            trace!(
                port = self.state.name(),
                subscriptions = broadcaster.len(),
                "dispatching event"
            );

            broadcaster.broadcast(arg, &self.state)
        };

        if !disconnected.is_empty() {
            let mut broadcaster = self
                .broadcaster
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            for id in disconnected {
                broadcaster.remove(id);
            }
        }
    }

    /// Names the port and routes its handler failures to the reporter.
    ///
    /// Returns `false` if the port was already bound.
    pub(crate) fn bind(&self, name: String, reporter: FailureReporter) -> bool {
        self.state.binding.set(Binding { name, reporter }).is_ok()
    }

    pub(crate) fn link(&self) -> PortLink<T> {
        PortLink {
            broadcaster: self.broadcaster.shared_handle(),
            state: self.state.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> Default for Output<T> {
    fn default() -> Self {
        Self {
            broadcaster: CachedRwLock::new(EventBroadcaster::default()),
            state: Arc::new(PortState::new()),
        }
    }
}

impl<T: Clone + Send + 'static> fmt::Debug for Output<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Output ({} subscriptions)", self.subscriber_count())
    }
}

/// Name and failure reporter given to a port when it is declared.
struct Binding {
    name: String,
    reporter: FailureReporter,
}

/// The state of a port shared by all its outputs and handles.
pub(crate) struct PortState<T> {
    /// Process-unique identifier used to recognize re-entrant emissions.
    uid: u64,
    binding: OnceLock<Binding>,
    /// Serializes emissions so that deliveries of successive events never
    /// overlap.
    emission: Mutex<()>,
    /// Events emitted from within a delivery of this port.
    deferred: Mutex<VecDeque<T>>,
}

impl<T> PortState<T> {
    pub(crate) fn new() -> Self {
        Self {
            uid: NEXT_PORT_UID.fetch_add(1, Ordering::Relaxed),
            binding: OnceLock::new(),
            emission: Mutex::new(()),
            deferred: Mutex::new(VecDeque::new()),
        }
    }

    /// Returns the port name, or the empty string if the port is not bound.
    pub(crate) fn name(&self) -> &str {
        self.binding.get().map(|b| b.name.as_str()).unwrap_or("")
    }

    /// Forwards a handler failure to the reporter of the port.
    pub(crate) fn report(&self, subscription: SubscriptionId, kind: FailureKind) {
        let failure = HandlerFailure::new(self.name(), subscription, kind);

        match self.binding.get() {
            Some(binding) => {
                let reporter = &binding.reporter;
                if panic::catch_unwind(AssertUnwindSafe(|| reporter(failure))).is_err() {
                    error!(
                        port = self.name(),
                        subscription = %subscription,
                        "failure handler panicked"
                    );
                }
            }
            None => log_failure(failure),
        }
    }
}

/// A handle to the subscriptions of a port, without the ability to emit.
pub(crate) struct PortLink<T: Clone + Send + 'static> {
    broadcaster: SharedHandle<EventBroadcaster<T>>,
    state: Arc<PortState<T>>,
}

impl<T: Clone + Send + 'static> PortLink<T> {
    pub(crate) fn name(&self) -> &str {
        self.state.name()
    }

    /// Registers a new subscription at the end of the list.
    ///
    /// If the port was closed, the recipient is dropped and an inert handle is
    /// returned.
    pub(crate) fn subscribe(&self, sender: Box<dyn Sender<T>>) -> SubscriptionHandle {
        let subscription = Arc::new(Subscription::new(sender));
        let id = subscription.id();

        let is_added = self
            .broadcaster
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .add(subscription);

        if is_added {
            debug!(port = self.name(), subscription = %id, "subscribed");

            SubscriptionHandle::new(id, Arc::new(self.clone()))
        } else {
            debug!(port = self.name(), subscription = %id, "port closed, subscription refused");

            SubscriptionHandle::inert(id)
        }
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.broadcaster
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Ends all subscriptions and refuses new ones.
    ///
    /// Returns the number of subscriptions that were ended.
    pub(crate) fn close(&self) -> usize {
        let subscriptions = self
            .broadcaster
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .close();

        for subscription in &subscriptions {
            subscription.deactivate();
        }

        subscriptions.len()
    }
}

impl<T: Clone + Send + 'static> Unsubscribe for PortLink<T> {
    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self
            .broadcaster
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);

        match removed {
            Some(subscription) => {
                subscription.deactivate();
                debug!(port = self.name(), subscription = %id, "unsubscribed");

                true
            }
            None => false,
        }
    }
}

impl<T: Clone + Send + 'static> Clone for PortLink<T> {
    fn clone(&self) -> Self {
        Self {
            broadcaster: self.broadcaster.clone(),
            state: self.state.clone(),
        }
    }
}
