//! Cached read-write lock.

use std::ops::{Deref, DerefMut};

use crate::loom_exports::sync::atomic::{AtomicUsize, Ordering};
use crate::loom_exports::sync::{Arc, LockResult, Mutex, MutexGuard, PoisonError};

/// A cached read-write lock.
///
/// Each clone keeps a private copy of the shared value. Writes are always
/// performed on the shared value under a lock and bump a shared epoch. Reads
/// through [`CachedRwLock::read`] only take the lock when the epoch has moved
/// since the private copy was last refreshed, so that a reader iterating its
/// private copy never holds the lock and never observes a concurrent write.
#[derive(Clone)]
pub(crate) struct CachedRwLock<T: Clone> {
    value: T,
    epoch: usize,
    shared: Arc<Shared<T>>,
}

impl<T: Clone> CachedRwLock<T> {
    /// Creates a new cached read-write lock in unlocked state.
    pub(crate) fn new(t: T) -> Self {
        let shared = t.clone();
        Self {
            value: t,
            epoch: 0,
            shared: Arc::new(Shared {
                value: Mutex::new(shared),
                epoch: AtomicUsize::new(0),
            }),
        }
    }

    /// Refreshes the private copy if it is behind the shared value and gives
    /// access to it.
    pub(crate) fn read(&mut self) -> LockResult<&T> {
        if self.shared.epoch.load(Ordering::Acquire) != self.epoch {
            match self.shared.value.lock() {
                LockResult::Ok(shared) => {
                    self.value = shared.clone();
                    self.epoch = self.shared.epoch.load(Ordering::Relaxed)
                }
                LockResult::Err(_) => return LockResult::Err(PoisonError::new(&self.value)),
            }
        }
        LockResult::Ok(&self.value)
    }

    /// Locks the shared value for inspection without invalidating the
    /// private copies.
    pub(crate) fn read_shared(&self) -> LockResult<CachedRwLockReadGuard<'_, T>> {
        self.shared.read()
    }

    /// Acquires a write lock on the shared value.
    ///
    /// All private copies, including the one of this clone, are considered
    /// stale once the lock is acquired.
    pub(crate) fn write(&self) -> LockResult<CachedRwLockWriteGuard<'_, T>> {
        self.shared.write()
    }

    /// Returns a handle to the shared value that carries no private copy.
    pub(crate) fn shared_handle(&self) -> SharedHandle<T> {
        SharedHandle {
            shared: self.shared.clone(),
        }
    }
}

/// A handle to the shared value of a [`CachedRwLock`] without private copy.
///
/// Writes made through this handle invalidate the private copies of all
/// `CachedRwLock` clones.
pub(crate) struct SharedHandle<T: Clone> {
    shared: Arc<Shared<T>>,
}

impl<T: Clone> SharedHandle<T> {
    /// Locks the shared value for inspection.
    pub(crate) fn read(&self) -> LockResult<CachedRwLockReadGuard<'_, T>> {
        self.shared.read()
    }

    /// Acquires a write lock on the shared value.
    pub(crate) fn write(&self) -> LockResult<CachedRwLockWriteGuard<'_, T>> {
        self.shared.write()
    }
}

impl<T: Clone> Clone for SharedHandle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

struct Shared<T> {
    epoch: AtomicUsize,
    value: Mutex<T>,
}

impl<T: Clone> Shared<T> {
    fn read(&self) -> LockResult<CachedRwLockReadGuard<'_, T>> {
        match self.value.lock() {
            LockResult::Ok(guard) => LockResult::Ok(CachedRwLockReadGuard { guard }),
            LockResult::Err(poison) => LockResult::Err(PoisonError::new(CachedRwLockReadGuard {
                guard: poison.into_inner(),
            })),
        }
    }

    fn write(&self) -> LockResult<CachedRwLockWriteGuard<'_, T>> {
        let guard = self.value.lock();
        let epoch = self.epoch.load(Ordering::Relaxed) + 1;
        self.epoch.store(epoch, Ordering::Release);

        match guard {
            LockResult::Ok(guard) => LockResult::Ok(CachedRwLockWriteGuard { guard }),
            LockResult::Err(poison) => LockResult::Err(PoisonError::new(CachedRwLockWriteGuard {
                guard: poison.into_inner(),
            })),
        }
    }
}

/// Read guard on the shared value.
pub(crate) struct CachedRwLockReadGuard<'a, T: Clone> {
    guard: MutexGuard<'a, T>,
}

impl<T: Clone> Deref for CachedRwLockReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

/// Write guard.
///
/// The lock is released when the guard is dropped.
pub(crate) struct CachedRwLockWriteGuard<'a, T: Clone> {
    guard: MutexGuard<'a, T>,
}

impl<T: Clone> Deref for CachedRwLockWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T: Clone> DerefMut for CachedRwLockWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}
