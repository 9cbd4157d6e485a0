//! Observable values.
//!
//! An observable value owns an output port and emits a copy of itself on that
//! port every time it is changed.

use std::ops::Deref;

use portbridge::ports::Output;

/// A value whose every change is emitted on an output.
///
/// The owning module declares the output during setup with
/// [`ObservableValue::output`]. Reading the value goes through `Deref`.
#[derive(Debug)]
pub struct ObservableValue<T>
where
    T: Clone + Send + 'static,
{
    value: T,
    out: Output<T>,
}

impl<T> ObservableValue<T>
where
    T: Clone + Send + 'static,
{
    /// Creates an observable value with a fresh output. Nothing is emitted.
    pub fn new(value: T) -> Self {
        Self {
            value,
            out: Output::new(),
        }
    }

    /// Output on which changes are emitted.
    pub fn output(&self) -> &Output<T> {
        &self.out
    }

    /// Replaces the value and emits it.
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.out.emit(self.value.clone());
    }

    /// Changes the value in place, emits the result and returns whatever the
    /// closure returned.
    pub fn modify<F, R>(&mut self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        let r = f(&mut self.value);
        self.out.emit(self.value.clone());

        r
    }
}

impl<T> Deref for ObservableValue<T>
where
    T: Clone + Send + 'static,
{
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}
