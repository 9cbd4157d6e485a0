//! Per-thread record of the deliveries in progress.
//!
//! Emissions and handler invocations nest on the emitting thread: a handler
//! may emit on another port, which runs the handlers of that port before
//! returning. These scopes let the bridge recognize re-entrant calls made from
//! within a delivery so it can avoid waiting on itself.

use std::cell::RefCell;

use super::SubscriptionId;

thread_local! {
    static EMITTING_PORTS: RefCell<Vec<u64>> = const { RefCell::new(Vec::new()) };
    static RUNNING_SUBSCRIPTIONS: RefCell<Vec<SubscriptionId>> = const { RefCell::new(Vec::new()) };
}

/// Marks a port as emitting on the current thread until dropped.
pub(crate) struct EmissionScope {
    _not_send: std::marker::PhantomData<*const ()>,
}

impl Drop for EmissionScope {
    fn drop(&mut self) {
        EMITTING_PORTS.with(|ports| ports.borrow_mut().pop());
    }
}

/// Marks a subscription as running on the current thread until dropped.
pub(crate) struct HandlerScope {
    _not_send: std::marker::PhantomData<*const ()>,
}

impl Drop for HandlerScope {
    fn drop(&mut self) {
        RUNNING_SUBSCRIPTIONS.with(|subscriptions| subscriptions.borrow_mut().pop());
    }
}

pub(crate) fn enter_emission(port_uid: u64) -> EmissionScope {
    EMITTING_PORTS.with(|ports| ports.borrow_mut().push(port_uid));

    EmissionScope {
        _not_send: std::marker::PhantomData,
    }
}

pub(crate) fn is_emitting(port_uid: u64) -> bool {
    EMITTING_PORTS.with(|ports| ports.borrow().contains(&port_uid))
}

pub(crate) fn enter_handler(id: SubscriptionId) -> HandlerScope {
    RUNNING_SUBSCRIPTIONS.with(|subscriptions| subscriptions.borrow_mut().push(id));

    HandlerScope {
        _not_send: std::marker::PhantomData,
    }
}

pub(crate) fn is_running(id: SubscriptionId) -> bool {
    RUNNING_SUBSCRIPTIONS.with(|subscriptions| subscriptions.borrow().contains(&id))
}
