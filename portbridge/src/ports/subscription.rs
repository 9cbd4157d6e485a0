use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::dispatch;
use super::failure::FailureKind;
use super::output::{SendError, Sender};

static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(0);

/// Unique identifier of a subscription.
///
/// Identifiers are unique within the process, so a subscription can be told
/// apart from those of other ports and other module instances.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn next() -> Self {
        Self(NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outcome of the delivery of an event to a single subscription.
pub(crate) enum Delivery {
    /// The recipient accepted the event.
    Delivered,
    /// The subscription was deactivated before it could be invoked.
    Skipped,
    /// The recipient panicked or returned an error.
    Failed(FailureKind),
    /// The recipient is gone; the subscription has deactivated itself.
    Disconnected,
}

/// The shared record of a subscription.
///
/// The recipient sits behind a mutex so a subscription is never invoked
/// concurrently with itself. The activity flag is checked under this mutex,
/// which lets [`Subscription::deactivate`] guarantee that no invocation starts
/// after it returns.
pub(crate) struct Subscription<T> {
    id: SubscriptionId,
    is_active: AtomicBool,
    sender: Mutex<Option<Box<dyn Sender<T>>>>,
}

impl<T> Subscription<T> {
    pub(crate) fn new(sender: Box<dyn Sender<T>>) -> Self {
        Self {
            id: SubscriptionId::next(),
            is_active: AtomicBool::new(true),
            sender: Mutex::new(Some(sender)),
        }
    }

    pub(crate) fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Hands the event to the recipient, catching any panic.
    pub(crate) fn deliver(&self, arg: T) -> Delivery {
        let mut guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);

        if !self.is_active.load(Ordering::Acquire) {
            return Delivery::Skipped;
        }
        let Some(sender) = guard.as_mut() else {
            return Delivery::Skipped;
        };

        let outcome = {
            let _scope = dispatch::enter_handler(self.id);

            panic::catch_unwind(AssertUnwindSafe(|| sender.send(arg)))
        };

        let delivery = match outcome {
            Ok(Ok(())) => Delivery::Delivered,
            Ok(Err(SendError::Failed(err))) => Delivery::Failed(FailureKind::Error(err)),
            Ok(Err(SendError::Disconnected)) => {
                self.is_active.store(false, Ordering::Release);

                Delivery::Disconnected
            }
            Err(payload) => Delivery::Failed(FailureKind::Panic(payload)),
        };

        // The handler may have unsubscribed itself.
        if !self.is_active.load(Ordering::Acquire) {
            guard.take();
        }

        delivery
    }

    /// Stops all further deliveries and releases the recipient.
    ///
    /// An invocation in progress on another thread is waited for. When called
    /// from within the subscription's own handler, the recipient is released
    /// as soon as the handler returns.
    pub(crate) fn deactivate(&self) {
        self.is_active.store(false, Ordering::Release);

        if !dispatch::is_running(self.id) {
            self.sender
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
        }
    }
}

/// Removal of a subscription from the port that holds it.
pub(crate) trait Unsubscribe: Send + Sync {
    /// Removes and deactivates the subscription.
    ///
    /// Returns `false` if the subscription was not registered anymore.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

/// A handle to a subscription.
///
/// Dropping the handle does not end the subscription, which then lives as
/// long as the module instance.
pub struct SubscriptionHandle {
    id: SubscriptionId,
    port: Option<Arc<dyn Unsubscribe>>,
}

impl SubscriptionHandle {
    pub(crate) fn new(id: SubscriptionId, port: Arc<dyn Unsubscribe>) -> Self {
        Self {
            id,
            port: Some(port),
        }
    }

    /// Creates a handle to a subscription that was refused because its port
    /// was already closed.
    pub(crate) fn inert(id: SubscriptionId) -> Self {
        Self { id, port: None }
    }

    /// Returns the identifier of the subscription.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Checks whether the subscription was refused by a closed port.
    pub(crate) fn is_refused(&self) -> bool {
        self.port.is_none()
    }

    /// Ends the subscription.
    ///
    /// No event is delivered to the subscription once this method returns. It
    /// is safe to call from within the subscription's own handler.
    ///
    /// Returns `false` if the subscription had already ended, for instance
    /// because the module instance was disposed.
    pub fn unsubscribe(self) -> bool {
        match self.port {
            Some(port) => port.unsubscribe(self.id),
            None => false,
        }
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
