#[cfg(portbridge_loom)]
pub(crate) mod sync {
    pub(crate) use loom::sync::{Arc, LockResult, Mutex, MutexGuard};
    pub(crate) use std::sync::PoisonError;

    pub(crate) mod atomic {
        pub(crate) use loom::sync::atomic::{AtomicUsize, Ordering};
    }
}
#[cfg(not(portbridge_loom))]
pub(crate) mod sync {
    pub(crate) use std::sync::{Arc, LockResult, Mutex, MutexGuard, PoisonError};

    pub(crate) mod atomic {
        pub(crate) use std::sync::atomic::{AtomicUsize, Ordering};
    }
}
