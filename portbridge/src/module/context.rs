use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_utils::sync::Parker;

use crate::instance::{InitializationError, Signal};
use crate::ports::{FailureReporter, Output};
use crate::registry::PortRegistry;

/// A local context for the execution of a module.
///
/// A `Context` is handed to [`Module::run()`](crate::module::Module::run) and
/// lets the module know whether its instance is still alive.
///
/// # Examples
///
/// A module that counts in bursts and stops as soon as it is disposed.
///
/// ```
/// use std::time::Duration;
/// use portbridge::module::{Context, Module};
/// use portbridge::ports::Output;
///
/// pub struct Burst {
///     out: Output<u32>,
/// }
///
/// impl Module for Burst {
///     fn run(&mut self, context: &Context) {
///         loop {
///             for i in 0..10 {
///                 if !context.is_running() {
///                     return;
///                 }
///                 self.out.emit(i);
///             }
///             if !context.sleep(Duration::from_secs(1)) {
///                 return;
///             }
///         }
///     }
/// }
/// ```
pub struct Context {
    name: String,
    signal: Arc<Signal>,
    parker: Parker,
}

impl Context {
    pub(crate) fn new(name: String, signal: Arc<Signal>, parker: Parker) -> Self {
        Self {
            name,
            signal,
            parker,
        }
    }

    /// Returns the name of the module instance.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `false` once the instance has been disposed.
    pub fn is_running(&self) -> bool {
        self.signal.is_running()
    }

    /// Blocks the execution thread for the specified duration or until the
    /// instance is disposed, whichever comes first.
    ///
    /// Returns `true` if the full duration elapsed and the instance is still
    /// running, `false` otherwise.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now().checked_add(duration);

        loop {
            if !self.signal.is_running() {
                return false;
            }
            match deadline {
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        return true;
                    }
                    self.parker.park_deadline(deadline);
                }
                None => self.parker.park(),
            }
        }
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("name", &self.name)
            .field("is_running", &self.is_running())
            .finish_non_exhaustive()
    }
}

/// A setup context for modules.
///
/// A `SetupContext` is handed to
/// [`Module::setup()`](crate::module::Module::setup) to let the module declare
/// its output ports.
///
/// # Examples
///
/// A module with two ports.
///
/// ```
/// use portbridge::instance::InitializationError;
/// use portbridge::module::{Module, SetupContext};
/// use portbridge::ports::Output;
///
/// #[derive(Default)]
/// pub struct Thermometer {
///     celsius: Output<f64>,
///     alarm: Output<()>,
/// }
///
/// impl Module for Thermometer {
///     fn setup(&mut self, setup: &mut SetupContext<'_>) -> Result<(), InitializationError> {
///         setup.add_output(&self.celsius, "celsius")?;
///         setup.add_output(&self.alarm, "alarm")
///     }
/// }
/// ```
pub struct SetupContext<'a> {
    registry: &'a mut PortRegistry,
    reporter: &'a FailureReporter,
}

impl<'a> SetupContext<'a> {
    pub(crate) fn new(registry: &'a mut PortRegistry, reporter: &'a FailureReporter) -> Self {
        Self { registry, reporter }
    }

    /// Declares an output port under the specified name.
    ///
    /// Any clone of the output emits on the declared port. An error is
    /// returned if the name is already taken by another port of the module or
    /// if the output, or one of its clones, was already declared.
    pub fn add_output<T>(
        &mut self,
        output: &Output<T>,
        name: impl Into<String>,
    ) -> Result<(), InitializationError>
    where
        T: Clone + Send + 'static,
    {
        let name = name.into();

        if self.registry.contains(&name) {
            return Err(InitializationError::DuplicatePort { name });
        }
        if !output.bind(name.clone(), self.reporter.clone()) {
            return Err(InitializationError::PortAlreadyBound { name });
        }

        self.registry
            .add(name.clone(), output.link())
            .map_err(|_| InitializationError::DuplicatePort { name })
    }
}

impl std::fmt::Debug for SetupContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetupContext")
            .field("ports", &self.registry.len())
            .finish_non_exhaustive()
    }
}
