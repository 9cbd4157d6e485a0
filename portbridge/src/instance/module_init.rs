use std::fmt;
use std::sync::Arc;

use crossbeam_utils::sync::Parker;
use tracing::info;

use crate::module::{Context, Module, SetupContext};
use crate::ports::{default_reporter, FailureReporter, HandlerFailure};
use crate::registry::PortRegistry;

use super::execution::{self, Signal, Task};
use super::{InitializationError, ModuleInstance};

/// Builder for a module instance.
pub struct ModuleInit<M: Module> {
    module: M,
    name: String,
    reporter: FailureReporter,
}

impl<M: Module> ModuleInit<M> {
    /// Name given to instances when none is specified.
    pub const DEFAULT_NAME: &'static str = "module";

    /// Creates a builder for an instance of the specified module.
    ///
    /// Handler failures are logged at the `error` level unless a failure
    /// handler is set with [`ModuleInit::with_failure_handler()`].
    pub fn new(module: M) -> Self {
        Self {
            module,
            name: Self::DEFAULT_NAME.to_string(),
            reporter: default_reporter(),
        }
    }

    /// Sets the name of the instance.
    ///
    /// The name needs not be unique. It is used for the execution thread and
    /// for logging purposes.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();

        self
    }

    /// Sets the handler receiving the failures of host handlers.
    ///
    /// The failure handler is called on the thread of the emitting module,
    /// right after the failing handler has returned. A panic in the failure
    /// handler is logged and otherwise ignored.
    pub fn with_failure_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(HandlerFailure) + Send + Sync + 'static,
    {
        self.reporter = Arc::new(handler);

        self
    }

    /// Builds an instance in the `Initializing` state.
    ///
    /// The module declares its ports in
    /// [`Module::setup()`](crate::module::Module::setup) and its execution
    /// thread is spawned, but the execution only begins once
    /// [`ModuleInstance::start()`] is called.
    pub fn build(self) -> Result<ModuleInstance, InitializationError> {
        let Self {
            mut module,
            name,
            reporter,
        } = self;

        let mut registry = PortRegistry::new();
        module.setup(&mut SetupContext::new(&mut registry, &reporter))?;

        let parker = Parker::new();
        let signal = Arc::new(Signal::new(parker.unparker().clone()));
        let task: Task = Box::new(move |context: &Context| module.run(context));
        let thread = execution::spawn(&name, signal.clone(), parker, task)
            .map_err(InitializationError::Spawn)?;

        info!(module = %name, ports = registry.len(), "module initialized");

        Ok(ModuleInstance::new(name, registry, signal, thread))
    }

    /// Builds and starts an instance.
    pub fn init(self) -> Result<ModuleInstance, InitializationError> {
        let instance = self.build()?;

        // A freshly built instance is always in the `Initializing` state.
        let _ = instance.start();

        Ok(instance)
    }
}

impl<M: Module> fmt::Debug for ModuleInit<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleInit")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
