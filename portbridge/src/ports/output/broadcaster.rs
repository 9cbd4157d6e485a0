use std::sync::Arc;

use tracing::debug;

use super::PortState;
use crate::ports::subscription::{Delivery, Subscription};
use crate::ports::SubscriptionId;

/// The list of subscriptions of a port, in registration order.
///
/// This object is cheap to clone since subscriptions are shared. The emitter
/// delivers events to a private clone of the list, so the shared list can be
/// modified while a delivery is in progress.
pub(super) struct EventBroadcaster<T> {
    subscriptions: Vec<Arc<Subscription<T>>>,
    is_closed: bool,
}

impl<T> EventBroadcaster<T> {
    /// Appends a subscription.
    ///
    /// Returns `false` and leaves the list untouched if the broadcaster was
    /// closed.
    pub(super) fn add(&mut self, subscription: Arc<Subscription<T>>) -> bool {
        if self.is_closed {
            return false;
        }
        self.subscriptions.push(subscription);

        true
    }

    /// Removes the subscription with the specified identifier, if any,
    /// preserving the order of the remaining subscriptions.
    pub(super) fn remove(&mut self, id: SubscriptionId) -> Option<Arc<Subscription<T>>> {
        let pos = self.subscriptions.iter().position(|s| s.id() == id)?;

        Some(self.subscriptions.remove(pos))
    }

    /// Removes all subscriptions and refuses any future one.
    pub(super) fn close(&mut self) -> Vec<Arc<Subscription<T>>> {
        self.is_closed = true;

        std::mem::take(&mut self.subscriptions)
    }

    /// Returns the number of subscriptions.
    pub(super) fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Delivers an event to all subscriptions in registration order.
    ///
    /// Each subscription is invoked only after the previous one has returned.
    /// Failures are reported to the port and do not interrupt the delivery.
    /// The identifiers of the subscriptions whose recipient is gone are
    /// returned so they can be pruned.
    pub(super) fn broadcast(&self, arg: T, port: &PortState<T>) -> Vec<SubscriptionId>
    where
        T: Clone,
    {
        let mut disconnected = Vec::new();

        let mut iter = self.subscriptions.iter();
        while let Some(subscription) = iter.next() {
            // Move the argument rather than clone it for the last subscription.
            if iter.len() == 0 {
                let delivery = subscription.deliver(arg);
                handle_delivery(subscription, delivery, port, &mut disconnected);
                break;
            }

            let delivery = subscription.deliver(arg.clone());
            handle_delivery(subscription, delivery, port, &mut disconnected);
        }

        disconnected
    }
}

impl<T> Clone for EventBroadcaster<T> {
    fn clone(&self) -> Self {
        Self {
            subscriptions: self.subscriptions.clone(),
            is_closed: self.is_closed,
        }
    }
}

impl<T> Default for EventBroadcaster<T> {
    fn default() -> Self {
        Self {
            subscriptions: Vec::new(),
            is_closed: false,
        }
    }
}

fn handle_delivery<T>(
    subscription: &Subscription<T>,
    delivery: Delivery,
    port: &PortState<T>,
    disconnected: &mut Vec<SubscriptionId>,
) {
    match delivery {
        Delivery::Delivered | Delivery::Skipped => {}
        Delivery::Failed(kind) => port.report(subscription.id(), kind),
        Delivery::Disconnected => {
            debug!(
                port = port.name(),
                subscription = %subscription.id(),
                "recipient dropped, ending subscription"
            );
            disconnected.push(subscription.id());
        }
    }
}
